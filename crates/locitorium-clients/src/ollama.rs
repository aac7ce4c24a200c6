//! Ollama chat client implementing the `LanguageModel` capability.

use std::time::Duration;

use async_trait::async_trait;
use locitorium_core::{AppConfig, Error, LanguageModel, Result};
use reqwest::Client;
use serde_json::{Map, Value};
use tracing::debug;

use crate::debug::DebugSink;
use crate::json::parse_object;
use crate::retry::{with_retry, RetryPolicy};
use crate::types::{ChatMessage, ChatOptions, ChatRequest, ChatResponse};

/// Non-streaming `/api/chat` client. Every reply must be a JSON object
/// matching the schema passed as `format`.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    http: Client,
    base_url: String,
    model: String,
    thinking: Option<bool>,
    debug: Option<DebugSink>,
    retry: RetryPolicy,
}

impl OllamaClient {
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            thinking: None,
            debug: None,
            retry: RetryPolicy::generate(),
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let client = Self::new(
            &config.ollama_base_url,
            &config.ollama_model,
            config.ollama_timeout(),
        )?
        .with_thinking(config.ollama_thinking);
        Ok(match &config.debug_dir {
            Some(dir) => client.with_debug_sink(DebugSink::new(dir)),
            None => client,
        })
    }

    pub fn with_thinking(mut self, thinking: Option<bool>) -> Self {
        self.thinking = thinking;
        self
    }

    pub fn with_debug_sink(mut self, sink: DebugSink) -> Self {
        self.debug = Some(sink);
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn generate_once(&self, prompt: &str, schema: &Value, tag: &str) -> Result<Map<String, Value>> {
        if let Some(sink) = &self.debug {
            sink.write(tag, "prompt", prompt).await;
        }

        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user".into(),
                content: prompt.to_string(),
            }],
            stream: false,
            format: schema,
            options: ChatOptions {
                temperature: 0.0,
                thinking: self.thinking,
            },
        };

        let url = format!("{}/api/chat", self.base_url);
        debug!("Generating with model {} at {} (tag {})", self.model, url, tag);

        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Http(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Http(format!("Ollama error {}: {}", status, body)));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::InvalidOutput(format!("Malformed chat response: {}", e)))?;
        let content = body.content();

        if let Some(sink) = &self.debug {
            sink.write(tag, "response", content).await;
        }

        if content.trim().is_empty() {
            return Err(Error::InvalidOutput("empty message content".into()));
        }
        parse_object(content)
    }
}

#[async_trait]
impl LanguageModel for OllamaClient {
    async fn generate(&self, prompt: &str, schema: &Value, tag: &str) -> Result<Map<String, Value>> {
        let label = format!("generate[{}]", tag);
        with_retry(&self.retry, &label, || self.generate_once(prompt, schema, tag)).await
    }
}
