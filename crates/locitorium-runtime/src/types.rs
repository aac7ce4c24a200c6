//! Runtime types.

use std::time::Instant;

use locitorium_core::PredMetrics;

/// Pipeline stage, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extract,
    Candidates,
    Resolve,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Extract => "extract",
            Stage::Candidates => "candidates",
            Stage::Resolve => "resolve",
        }
    }

    /// Debug-correlation tag for this stage of one document.
    pub fn tag(&self, doc_id: &str) -> String {
        format!("{}_{}", doc_id, self.as_str())
    }
}

/// Per-stage wall-clock seconds collected while a document runs. Stages that
/// never started stay `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StageTimings {
    pub extract: Option<f64>,
    pub candidates: Option<f64>,
    pub resolve: Option<f64>,
}

impl StageTimings {
    pub fn record(&mut self, stage: Stage, started: Instant) {
        self.set(stage, started.elapsed().as_secs_f64());
    }

    /// Record a stage that had nothing to do.
    pub fn skip(&mut self, stage: Stage) {
        self.set(stage, 0.0);
    }

    fn set(&mut self, stage: Stage, seconds: f64) {
        match stage {
            Stage::Extract => self.extract = Some(seconds),
            Stage::Candidates => self.candidates = Some(seconds),
            Stage::Resolve => self.resolve = Some(seconds),
        }
    }

    pub fn into_metrics(self, total_s: f64) -> PredMetrics {
        PredMetrics {
            total_s,
            extract_s: self.extract,
            candidate_s: self.candidates,
            resolve_s: self.resolve,
        }
    }
}
