//! Data model shared by the pipeline, the persisted prediction records and
//! the evaluation side.

use serde::{Deserialize, Deserializer, Serialize};

/// Uppercase a country code; blank or missing values become `None`.
pub fn normalize_country_code(value: Option<&str>) -> Option<String> {
    let trimmed = value?.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_uppercase())
    }
}

fn deserialize_country_code<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(normalize_country_code(raw.as_deref()))
}

fn deserialize_iso_country<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_country_code(deserializer).map(Option::unwrap_or_default)
}

/// A gazetteer value kept exactly as received: coordinates and ids arrive as
/// either strings or JSON numbers and are never re-parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Text(String),
    Number(serde_json::Number),
}

impl Default for Scalar {
    fn default() -> Self {
        Scalar::Text(String::new())
    }
}

impl std::fmt::Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scalar::Text(s) => write!(f, "{}", s),
            Scalar::Number(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Number(value.into())
    }
}

/// A place mention found in a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mention {
    pub id: String,
    pub text: String,
}

impl Mention {
    /// Ids are `"{doc_id}:{ordinal}"`, ordinal 0-based in extraction order.
    pub fn for_doc(doc_id: &str, ordinal: usize, text: impl Into<String>) -> Self {
        Self {
            id: format!("{}:{}", doc_id, ordinal),
            text: text.into(),
        }
    }
}

/// One gazetteer match for a mention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// 1-based position in the gazetteer response.
    pub rank: u32,
    pub osm_type: String,
    pub osm_id: Scalar,
    pub display_name: String,
    pub lat: Scalar,
    pub lon: Scalar,
    #[serde(default)]
    pub bbox: Vec<Scalar>,
    #[serde(default, deserialize_with = "deserialize_country_code")]
    pub country_code: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub place_rank: Option<i64>,
    #[serde(default)]
    pub importance: Option<f64>,
}

/// The candidate chosen for a resolved mention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedCandidate {
    pub osm_type: String,
    pub osm_id: Scalar,
    pub lat: Scalar,
    pub lon: Scalar,
    #[serde(default)]
    pub bbox: Vec<Scalar>,
    pub display_name: String,
    #[serde(default, deserialize_with = "deserialize_country_code")]
    pub country_code: Option<String>,
    /// Reserved; the resolver makes a discrete choice and never fills this.
    #[serde(default)]
    pub confidence: Option<f64>,
}

impl From<&Candidate> for SelectedCandidate {
    fn from(c: &Candidate) -> Self {
        Self {
            osm_type: c.osm_type.clone(),
            osm_id: c.osm_id.clone(),
            lat: c.lat.clone(),
            lon: c.lon.clone(),
            bbox: c.bbox.clone(),
            display_name: c.display_name.clone(),
            country_code: c.country_code.clone(),
            confidence: None,
        }
    }
}

/// A mention together with the candidates the gazetteer offered for it.
#[derive(Debug, Clone, PartialEq)]
pub struct MentionCandidates {
    pub mention: Mention,
    pub candidates: Vec<Candidate>,
}

/// Terminal status of one mention (or of a whole document for the
/// synthetic `InvalidOutput`/`Timeout` results).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStatus {
    Resolved,
    NoCandidate,
    Rejected,
    InvalidOutput,
    Timeout,
}

impl ResolutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resolved => "resolved",
            Self::NoCandidate => "no_candidate",
            Self::Rejected => "rejected",
            Self::InvalidOutput => "invalid_output",
            Self::Timeout => "timeout",
        }
    }
}

impl std::fmt::Display for ResolutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome for one mention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredResult {
    pub mention_id: String,
    pub mention: String,
    pub status: ResolutionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected: Option<SelectedCandidate>,
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

impl PredResult {
    /// Result for a mention that was not matched to any candidate.
    pub fn unmatched(mention: &Mention, candidates: Vec<Candidate>) -> Self {
        let status = if candidates.is_empty() {
            ResolutionStatus::NoCandidate
        } else {
            ResolutionStatus::Rejected
        };
        Self {
            mention_id: mention.id.clone(),
            mention: mention.text.clone(),
            status,
            selected: None,
            candidates,
        }
    }

    /// Document-level stand-in used when the pipeline could not finish.
    pub fn synthetic(doc_id: &str, status: ResolutionStatus) -> Self {
        Self {
            mention_id: format!("{}:{}", doc_id, status),
            mention: String::new(),
            status,
            selected: None,
            candidates: Vec::new(),
        }
    }
}

/// Reproducibility metadata attached to every prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub ollama_model: String,
    #[serde(default)]
    pub ollama_base_url: String,
    pub nominatim_base_url: String,
    pub config_hash: String,
}

/// Wall-clock seconds per stage. A stage that never ran is `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredMetrics {
    pub total_s: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extract_s: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidate_s: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolve_s: Option<f64>,
}

/// Prediction record for one document (one JSONL line).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredDoc {
    pub doc_id: String,
    pub model_info: ModelInfo,
    pub results: Vec<PredResult>,
    #[serde(default)]
    pub metrics: PredMetrics,
}

/// A document to run through the pipeline. Gold records deserialize into
/// this as well; extra fields are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputDoc {
    pub doc_id: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoldMention {
    pub mention_id: String,
    pub mention: String,
    /// Uppercase alpha-2, or empty.
    #[serde(deserialize_with = "deserialize_iso_country")]
    pub iso_country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoldDoc {
    pub doc_id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
    pub mentions: Vec<GoldMention>,
}
