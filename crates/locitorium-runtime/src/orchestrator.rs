//! Runner: sequences extract → candidates → resolve for one document under a
//! single deadline and assembles the prediction record.

use std::sync::Arc;
use std::time::Instant;

use locitorium_clients::{NominatimClient, OllamaClient};
use locitorium_core::{
    AppConfig, Error, Gazetteer, LanguageModel, Mention, ModelInfo, PredDoc, PredResult,
    ResolutionStatus, Result,
};
use locitorium_pipeline::{extract_mentions, generate_candidates, resolve_candidates};
use tracing::{debug, error, info, warn};

use crate::types::{Stage, StageTimings};

/// Runs documents through the pipeline with one fixed configuration.
///
/// Holds no per-document state, so one runner may serve concurrent documents.
pub struct Runner {
    config: AppConfig,
    config_hash: String,
    model: Arc<dyn LanguageModel>,
    gazetteer: Arc<dyn Gazetteer>,
}

impl Runner {
    pub fn new(
        config: AppConfig,
        model: Arc<dyn LanguageModel>,
        gazetteer: Arc<dyn Gazetteer>,
    ) -> Self {
        if let Err(e) = config.validate() {
            warn!("Runner built with an unvalidated configuration: {}", e);
        }
        let config_hash = config.config_hash();
        Self {
            config,
            config_hash,
            model,
            gazetteer,
        }
    }

    /// Build a runner backed by the Ollama and Nominatim HTTP clients.
    pub fn from_config(config: AppConfig) -> Result<Self> {
        config.validate()?;
        let model = OllamaClient::from_config(&config)?;
        let gazetteer = NominatimClient::from_config(&config)?;
        info!(
            "Runner initialized: model={}, ollama={}, nominatim={}",
            config.ollama_model, config.ollama_base_url, config.nominatim_base_url
        );
        Ok(Self::new(config, Arc::new(model), Arc::new(gazetteer)))
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn gazetteer(&self) -> &dyn Gazetteer {
        self.gazetteer.as_ref()
    }

    pub fn model_info(&self) -> ModelInfo {
        ModelInfo {
            ollama_model: self.config.ollama_model.clone(),
            ollama_base_url: self.config.ollama_base_url.clone(),
            nominatim_base_url: self.config.nominatim_base_url.clone(),
            config_hash: self.config_hash.clone(),
        }
    }

    /// Resolve the place mentions in `text`.
    ///
    /// Errors only for input over `max_chars` (before any network call) and
    /// for `UpstreamUnavailable`. Every other failure becomes a single
    /// `invalid_output` result, and an elapsed deadline a single `timeout`
    /// result.
    pub async fn run_doc(&self, text: &str, doc_id: &str) -> Result<PredDoc> {
        let chars = text.chars().count();
        if chars > self.config.max_chars {
            return Err(Error::PreconditionFailed(format!(
                "input too long: {} characters (max {})",
                chars, self.config.max_chars
            )));
        }

        let started = Instant::now();
        let mut timings = StageTimings::default();
        let deadline = self.config.deadline();

        let outcome = tokio::time::timeout(deadline, self.run_stages(text, doc_id, &mut timings)).await;
        let results = match outcome {
            Ok(Ok(results)) => results,
            Ok(Err(Error::UpstreamUnavailable(message))) => {
                error!("Gazetteer unavailable while processing {}: {}", doc_id, message);
                return Err(Error::UpstreamUnavailable(message));
            }
            Ok(Err(e)) => {
                warn!("Pipeline failed for {}: {}", doc_id, e);
                vec![PredResult::synthetic(doc_id, ResolutionStatus::InvalidOutput)]
            }
            Err(_) => {
                warn!("{} for {}", Error::Timeout(deadline), doc_id);
                vec![PredResult::synthetic(doc_id, ResolutionStatus::Timeout)]
            }
        };

        let total_s = started.elapsed().as_secs_f64();
        debug!("Finished {} in {:.3}s with {} results", doc_id, total_s, results.len());

        Ok(PredDoc {
            doc_id: doc_id.to_string(),
            model_info: self.model_info(),
            results,
            metrics: timings.into_metrics(total_s),
        })
    }

    async fn run_stages(
        &self,
        text: &str,
        doc_id: &str,
        timings: &mut StageTimings,
    ) -> Result<Vec<PredResult>> {
        let started = Instant::now();
        let texts = extract_mentions(
            self.model.as_ref(),
            text,
            self.config.max_mentions,
            &Stage::Extract.tag(doc_id),
        )
        .await?;
        timings.record(Stage::Extract, started);

        let mentions: Vec<Mention> = texts
            .into_iter()
            .enumerate()
            .map(|(ordinal, mention)| Mention::for_doc(doc_id, ordinal, mention))
            .collect();
        if mentions.is_empty() {
            timings.skip(Stage::Candidates);
            timings.skip(Stage::Resolve);
            return Ok(Vec::new());
        }

        let started = Instant::now();
        let mapping = generate_candidates(
            self.gazetteer.as_ref(),
            &mentions,
            self.config.nominatim_concurrency,
            self.config.max_candidates_per_mention,
        )
        .await?;
        timings.record(Stage::Candidates, started);

        let started = Instant::now();
        let results = resolve_candidates(
            self.model.as_ref(),
            text,
            &mapping,
            &Stage::Resolve.tag(doc_id),
        )
        .await?;
        timings.record(Stage::Resolve, started);

        Ok(results)
    }
}
