//! Structured shapes the language model is asked to return.

use locitorium_core::{Error, Result};
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Extraction reply: `{"mentions": [{"mention": "..."}]}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractOutput {
    pub mentions: Vec<ExtractedMention>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedMention {
    /// Mention text as it appears in the document.
    pub mention: String,
}

/// Resolution reply: one entry per mention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveOutput {
    pub results: Vec<ResolveEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveEntry {
    pub mention_id: String,
    #[serde(default)]
    pub mention: String,
    /// Index into the mention's candidate list, -1 for none.
    #[serde(deserialize_with = "lenient_index")]
    pub choice: i64,
    /// The model's own label. Advisory only; the final status is derived
    /// from `choice` and the candidate list.
    #[serde(default)]
    pub status: String,
}

/// Accept `1`, `1.0` and `"1"`; reject fractional or non-numeric values.
fn lenient_index<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<i64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    let parsed = match &value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && f.abs() < 1e15).map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| de::Error::custom(format!("choice must be an integer, got {}", value)))
}

/// Validate a generated object against one of the reply shapes.
pub fn from_reply<T: DeserializeOwned>(reply: Map<String, Value>) -> Result<T> {
    serde_json::from_value(Value::Object(reply))
        .map_err(|e| Error::InvalidOutput(format!("reply does not match schema: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_extract_reply() {
        let parsed: ExtractOutput =
            from_reply(object(json!({"mentions": [{"mention": "広島県"}, {"mention": "広島市"}]}))).unwrap();
        assert_eq!(parsed.mentions.len(), 2);
        assert_eq!(parsed.mentions[1].mention, "広島市");
    }

    #[test]
    fn test_extract_reply_rejects_plain_strings() {
        let result: Result<ExtractOutput> = from_reply(object(json!({"mentions": ["広島"]})));
        assert!(matches!(result, Err(Error::InvalidOutput(_))));
    }

    #[test]
    fn test_resolve_reply_requires_choice() {
        let result: Result<ResolveOutput> =
            from_reply(object(json!({"results": [{"mention_id": "d1:0", "mention": "Tokyo"}]})));
        assert!(result.is_err());

        let parsed: ResolveOutput =
            from_reply(object(json!({"results": [{"mention_id": "d1:0", "choice": -1}]}))).unwrap();
        assert_eq!(parsed.results[0].choice, -1);
        assert!(parsed.results[0].status.is_empty());
    }

    #[test]
    fn test_resolve_reply_coerces_integral_choice() {
        let parsed: ResolveOutput = from_reply(object(json!({"results": [
            {"mention_id": "d1:0", "choice": "1"},
            {"mention_id": "d1:1", "choice": 2.0},
            {"mention_id": "d1:2", "choice": " -1 "}
        ]})))
        .unwrap();
        let choices: Vec<i64> = parsed.results.iter().map(|r| r.choice).collect();
        assert_eq!(choices, vec![1, 2, -1]);

        for bad in [json!(1.5), json!("first"), json!(true), json!(null)] {
            let result: Result<ResolveOutput> =
                from_reply(object(json!({"results": [{"mention_id": "d1:0", "choice": bad}]})));
            assert!(matches!(result, Err(Error::InvalidOutput(_))));
        }
    }
}
