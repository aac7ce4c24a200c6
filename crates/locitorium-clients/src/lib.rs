//! HTTP implementations of the pipeline capabilities.
//!
//! `OllamaClient` provides structured generation, `NominatimClient` provides
//! gazetteer search. Both retry transient failures with jittered backoff.

pub mod debug;
pub mod json;
pub mod nominatim;
pub mod ollama;
pub mod retry;
pub mod types;

pub use debug::DebugSink;
pub use json::parse_object;
pub use nominatim::NominatimClient;
pub use ollama::OllamaClient;
pub use retry::{with_retry, RetryPolicy};
