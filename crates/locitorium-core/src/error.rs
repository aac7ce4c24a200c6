//! Error types for locitorium.

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Input rejected before any network call (e.g. text over `max_chars`).
    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    /// The gazetteer reported a server-side failure. Never absorbed into a
    /// per-document status.
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Deadline of {0:?} elapsed")]
    Timeout(Duration),

    /// The language model returned empty, unparseable or schema-violating content.
    #[error("Invalid model output: {0}")]
    InvalidOutput(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether a client may repeat the call that produced this error.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Error::UpstreamUnavailable(_) | Error::PreconditionFailed(_) | Error::Config(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
