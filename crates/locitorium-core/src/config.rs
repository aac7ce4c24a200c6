//! Run configuration.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{Error, Result};

pub const DEFAULT_OLLAMA_BASE_URL: &str = "https://ollama.yuiseki.net";
pub const DEFAULT_NOMINATIM_BASE_URL: &str = "https://nominatim.yuiseki.net";
pub const DEFAULT_OLLAMA_MODEL: &str = "lfm2.5-thinking:1.2b";

const ENV_PREFIX: &str = "LOCITORIUM_";

/// Settings for one pipeline run. Constructed once, never mutated while a run
/// is in flight; overrides produce a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub ollama_base_url: String,
    pub nominatim_base_url: String,
    pub ollama_model: String,
    /// Tri-state: `None` leaves the model's own default untouched.
    pub ollama_thinking: Option<bool>,
    pub ollama_timeout_s: f64,
    /// Where raw prompts/responses are written, if anywhere.
    pub debug_dir: Option<PathBuf>,
    pub max_chars: usize,
    pub max_mentions: usize,
    pub max_candidates_per_mention: usize,
    pub nominatim_timeout_s: f64,
    pub nominatim_limit: usize,
    pub nominatim_concurrency: usize,
    /// Wall-clock bound for a whole per-document run.
    pub deadline_s: f64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ollama_base_url: DEFAULT_OLLAMA_BASE_URL.into(),
            nominatim_base_url: DEFAULT_NOMINATIM_BASE_URL.into(),
            ollama_model: DEFAULT_OLLAMA_MODEL.into(),
            ollama_thinking: None,
            ollama_timeout_s: 30.0,
            debug_dir: None,
            max_chars: 2000,
            max_mentions: 20,
            max_candidates_per_mention: 10,
            nominatim_timeout_s: 10.0,
            nominatim_limit: 10,
            nominatim_concurrency: 5,
            deadline_s: 60.0,
        }
    }
}

impl AppConfig {
    /// Defaults overlaid with `LOCITORIUM_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(v) = env_string("OLLAMA_BASE_URL") {
            config.ollama_base_url = v;
        }
        if let Some(v) = env_string("NOMINATIM_BASE_URL") {
            config.nominatim_base_url = v;
        }
        if let Some(v) = env_string("OLLAMA_MODEL") {
            config.ollama_model = v;
        }
        if let Some(v) = env_parse::<bool>("OLLAMA_THINKING")? {
            config.ollama_thinking = Some(v);
        }
        if let Some(v) = env_string("DEBUG_DIR") {
            config.debug_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = env_parse("OLLAMA_TIMEOUT_S")? {
            config.ollama_timeout_s = v;
        }
        if let Some(v) = env_parse("MAX_CHARS")? {
            config.max_chars = v;
        }
        if let Some(v) = env_parse("MAX_MENTIONS")? {
            config.max_mentions = v;
        }
        if let Some(v) = env_parse("MAX_CANDIDATES")? {
            config.max_candidates_per_mention = v;
        }
        if let Some(v) = env_parse("NOMINATIM_TIMEOUT_S")? {
            config.nominatim_timeout_s = v;
        }
        if let Some(v) = env_parse("NOMINATIM_LIMIT")? {
            config.nominatim_limit = v;
        }
        if let Some(v) = env_parse("NOMINATIM_CONCURRENCY")? {
            config.nominatim_concurrency = v;
        }
        if let Some(v) = env_parse("DEADLINE_S")? {
            config.deadline_s = v;
        }

        config.validate()?;
        debug!(
            "Configuration loaded: model={}, hash={}",
            config.ollama_model,
            config.config_hash()
        );
        Ok(config)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.ollama_model = model.into();
        self
    }

    pub fn with_thinking(mut self, thinking: Option<bool>) -> Self {
        self.ollama_thinking = thinking;
        self
    }

    pub fn with_debug_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.debug_dir = dir;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline_s = deadline.as_secs_f64();
        self
    }

    /// Reject settings that would stall or disable a stage.
    pub fn validate(&self) -> Result<()> {
        if self.nominatim_concurrency == 0 {
            return Err(Error::Config("nominatim_concurrency must be > 0".into()));
        }
        if self.nominatim_limit == 0 {
            return Err(Error::Config("nominatim_limit must be > 0".into()));
        }
        if self.max_chars == 0 {
            return Err(Error::Config("max_chars must be > 0".into()));
        }
        for (name, value) in [
            ("deadline_s", self.deadline_s),
            ("nominatim_timeout_s", self.nominatim_timeout_s),
            ("ollama_timeout_s", self.ollama_timeout_s),
        ] {
            if !(value > 0.0 && Duration::try_from_secs_f64(value).is_ok()) {
                return Err(Error::Config(format!(
                    "{} must be a positive number of seconds, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }

    pub fn deadline(&self) -> Duration {
        seconds(self.deadline_s)
    }

    pub fn ollama_timeout(&self) -> Duration {
        seconds(self.ollama_timeout_s)
    }

    pub fn nominatim_timeout(&self) -> Duration {
        seconds(self.nominatim_timeout_s)
    }

    /// Stable 12-hex-char digest of the sorted key/value pairs.
    pub fn config_hash(&self) -> String {
        let sorted: BTreeMap<String, serde_json::Value> = match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map.into_iter().collect(),
            _ => BTreeMap::new(),
        };
        let payload = serde_json::to_string(&sorted).unwrap_or_default();
        let digest = Sha256::digest(payload.as_bytes());
        let mut hash = hex::encode(digest);
        hash.truncate(12);
        hash
    }
}

/// Saturating conversion for configs that skipped `validate`: oversized
/// values clamp to `Duration::MAX`, negative or NaN ones to zero.
fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(if value > 0.0 {
        Duration::MAX
    } else {
        Duration::ZERO
    })
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(format!("{}{}", ENV_PREFIX, key))
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: FromStr>(key: &str) -> Result<Option<T>> {
    match env_string(key) {
        Some(raw) => raw.parse::<T>().map(Some).map_err(|_| {
            Error::Config(format!("invalid value for {}{}: {:?}", ENV_PREFIX, key, raw))
        }),
        None => Ok(None),
    }
}
