//! Batch runs over a list of documents.

use std::path::Path;
use std::time::Instant;

use locitorium_core::{AppConfig, Gazetteer, InputDoc, PredDoc, Result};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::orchestrator::Runner;

/// Query used to check the gazetteer is reachable before a batch starts.
pub const PREFLIGHT_QUERY: &str = "Tokyo";

/// Fail fast if the gazetteer cannot answer a trivial search.
pub async fn preflight(gazetteer: &dyn Gazetteer) -> Result<()> {
    let hits = gazetteer.search(PREFLIGHT_QUERY).await?;
    debug!("Preflight search returned {} candidates", hits.len());
    Ok(())
}

impl Runner {
    /// Run every document in order and collect the predictions.
    pub async fn run_dataset(&self, docs: &[InputDoc]) -> Result<Vec<PredDoc>> {
        preflight(self.gazetteer()).await?;
        let started = Instant::now();

        let mut outputs = Vec::with_capacity(docs.len());
        for doc in docs {
            outputs.push(self.run_doc(&doc.text, &doc.doc_id).await?);
        }

        info!(
            "Processed {} documents in {:.1}s",
            outputs.len(),
            started.elapsed().as_secs_f64()
        );
        Ok(outputs)
    }

    /// Run every document in order, appending one JSON line per prediction
    /// to `output`. Each line is flushed as soon as it is written so an
    /// interrupted run leaves a usable prefix. Returns the number written.
    pub async fn run_dataset_to_file(&self, docs: &[InputDoc], output: &Path) -> Result<usize> {
        preflight(self.gazetteer()).await?;
        let started = Instant::now();

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::File::create(output).await?;

        let mut written = 0;
        for doc in docs {
            let pred = self.run_doc(&doc.text, &doc.doc_id).await?;
            let mut line = serde_json::to_string(&pred)?;
            line.push('\n');
            file.write_all(line.as_bytes()).await?;
            file.flush().await?;
            written += 1;
            debug!("Wrote prediction {}/{} ({})", written, docs.len(), doc.doc_id);
        }

        info!(
            "Wrote {} predictions to {} in {:.1}s",
            written,
            output.display(),
            started.elapsed().as_secs_f64()
        );
        Ok(written)
    }
}

/// [`Runner::run_dataset`] with HTTP clients built from `config`.
pub async fn run_dataset(docs: &[InputDoc], config: AppConfig) -> Result<Vec<PredDoc>> {
    Runner::from_config(config)?.run_dataset(docs).await
}

/// [`Runner::run_dataset_to_file`] with HTTP clients built from `config`.
pub async fn run_dataset_to_file(docs: &[InputDoc], config: AppConfig, output: &Path) -> Result<usize> {
    Runner::from_config(config)?.run_dataset_to_file(docs, output).await
}
