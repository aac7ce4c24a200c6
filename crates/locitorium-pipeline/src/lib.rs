//! The three resolution stages.
//!
//! Each stage is a free async function over the capability traits, so the
//! orchestrator can sequence them and tests can drive them with fakes.

pub mod candidates;
pub mod extractor;
pub mod prompts;
pub mod resolver;
pub mod types;

pub use candidates::generate_candidates;
pub use extractor::{dedupe_mentions, extract_mentions, filter_mentions};
pub use resolver::resolve_candidates;
