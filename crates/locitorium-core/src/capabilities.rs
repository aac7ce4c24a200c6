//! Capability traits for the two opaque upstream services.
//!
//! The pipeline only ever talks to a language model through [`LanguageModel`]
//! and to the gazetteer through [`Gazetteer`]. HTTP clients implement them in
//! `locitorium-clients`; tests substitute in-process fakes.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::Result;
use crate::types::Candidate;

/// Structured generation: `Generate(prompt, outputSchema) -> object`.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Run `prompt` with the output constrained to `schema`.
    ///
    /// `tag` correlates debug artifacts (e.g. `"doc-1_extract"`). The returned
    /// value is always a JSON object; anything else is `Error::InvalidOutput`.
    async fn generate(&self, prompt: &str, schema: &Value, tag: &str) -> Result<Map<String, Value>>;
}

/// Free-text place search: `Search(text) -> orderedCandidateList`.
#[async_trait]
pub trait Gazetteer: Send + Sync {
    /// Candidates in gazetteer rank order (rank 1 first).
    ///
    /// Server-side failures surface as `Error::UpstreamUnavailable`.
    async fn search(&self, query: &str) -> Result<Vec<Candidate>>;
}
