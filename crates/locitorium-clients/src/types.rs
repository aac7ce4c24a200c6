//! Wire types for the Ollama chat API and the Nominatim search API.

use locitorium_core::{normalize_country_code, Candidate, Scalar};
use serde::{Deserialize, Serialize};

/// Chat message in an Ollama request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Generation options. Temperature is pinned to 0.
#[derive(Debug, Clone, Serialize)]
pub struct ChatOptions {
    pub temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking: Option<bool>,
}

/// `POST /api/chat` body.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    /// JSON schema the reply must conform to.
    pub format: &'a serde_json::Value,
    pub options: ChatOptions,
}

/// `POST /api/chat` response (non-streaming).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub message: Option<ChatMessageContent>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatMessageContent {
    #[serde(default)]
    pub content: String,
}

impl ChatResponse {
    pub fn content(&self) -> &str {
        self.message.as_ref().map(|m| m.content.as_str()).unwrap_or("")
    }
}

/// One entry of a Nominatim `format=jsonv2` search response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NominatimPlace {
    #[serde(default)]
    pub osm_type: String,
    #[serde(default)]
    pub osm_id: Scalar,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub lat: Scalar,
    #[serde(default)]
    pub lon: Scalar,
    #[serde(default)]
    pub boundingbox: Option<Vec<Scalar>>,
    #[serde(default)]
    pub address: Option<NominatimAddress>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub place_rank: Option<i64>,
    #[serde(default)]
    pub importance: Option<f64>,
}

/// `addressdetails=1` sub-object; only the country code is used.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NominatimAddress {
    #[serde(default)]
    pub country_code: Option<String>,
}

impl NominatimPlace {
    pub fn into_candidate(self, rank: u32) -> Candidate {
        let country_code = self
            .address
            .as_ref()
            .and_then(|a| normalize_country_code(a.country_code.as_deref()));
        Candidate {
            rank,
            osm_type: self.osm_type,
            osm_id: self.osm_id,
            display_name: self.display_name,
            lat: self.lat,
            lon: self.lon,
            bbox: self.boundingbox.unwrap_or_default(),
            country_code,
            category: self.category,
            place_rank: self.place_rank,
            importance: self.importance,
        }
    }
}
