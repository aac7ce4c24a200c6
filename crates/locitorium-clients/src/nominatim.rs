//! Nominatim search client implementing the `Gazetteer` capability.

use std::time::Duration;

use async_trait::async_trait;
use locitorium_core::{AppConfig, Candidate, Error, Gazetteer, Result};
use reqwest::Client;
use tracing::debug;

use crate::retry::{with_retry, RetryPolicy};
use crate::types::NominatimPlace;

/// Nominatim asks every client to identify itself.
const USER_AGENT: &str = concat!("locitorium/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct NominatimClient {
    http: Client,
    base_url: String,
    limit: usize,
    retry: RetryPolicy,
}

impl NominatimClient {
    pub fn new(base_url: &str, limit: usize, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::Http(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            limit,
            retry: RetryPolicy::search(),
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(
            &config.nominatim_base_url,
            config.nominatim_limit,
            config.nominatim_timeout(),
        )
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn search_once(&self, query: &str) -> Result<Vec<Candidate>> {
        let url = format!("{}/search", self.base_url);
        let limit = self.limit.to_string();
        debug!("Searching {} for {:?}", url, query);

        let response = self
            .http
            .get(&url)
            .query(&[
                ("q", query),
                ("format", "jsonv2"),
                ("addressdetails", "1"),
                ("limit", limit.as_str()),
            ])
            .send()
            .await
            .map_err(|e| Error::Http(format!("Request failed: {}", e)))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(Error::UpstreamUnavailable(format!(
                "Nominatim returned {} for {:?}",
                status, query
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Http(format!("Nominatim error {}: {}", status, body)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Http(format!("Failed to read response: {}", e)))?;
        let places: Vec<NominatimPlace> = serde_json::from_slice(&bytes)?;

        Ok(places
            .into_iter()
            .enumerate()
            .map(|(idx, place)| place.into_candidate(idx as u32 + 1))
            .collect())
    }
}

#[async_trait]
impl Gazetteer for NominatimClient {
    async fn search(&self, query: &str) -> Result<Vec<Candidate>> {
        let label = format!("search[{}]", query);
        with_retry(&self.retry, &label, || self.search_once(query)).await
    }
}
