//! Recovery of a JSON object from model output that may carry extra text
//! (code fences, preambles, trailing commentary).

use locitorium_core::{Error, Result};
use serde_json::{Map, Value};

/// Parse `payload` as a JSON object.
///
/// Pure JSON is tried first. Otherwise every `{` or `[` offset is tried in
/// order with an incremental decoder, and the first value that decodes to an
/// object wins. Arrays are skipped, so an object nested in a leading array can
/// still be picked up at its own offset.
pub fn parse_object(payload: &str) -> Result<Map<String, Value>> {
    if payload.trim().is_empty() {
        return Err(Error::InvalidOutput("empty response".into()));
    }

    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(payload) {
        return Ok(map);
    }

    for (idx, ch) in payload.char_indices() {
        if ch != '{' && ch != '[' {
            continue;
        }
        let mut values = serde_json::Deserializer::from_str(&payload[idx..]).into_iter::<Value>();
        if let Some(Ok(Value::Object(map))) = values.next() {
            return Ok(map);
        }
    }

    Err(Error::InvalidOutput("no JSON object found in response".into()))
}
