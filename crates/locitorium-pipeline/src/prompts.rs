//! Prompt text and reply schemas for the two model calls.

use locitorium_core::MentionCandidates;
use serde_json::{json, Value};

pub fn extract_prompt(text: &str) -> String {
    format!(
        "Extract location-like mentions from the text. \
         Return only likely toponyms (including country names). \
         Mentions must appear verbatim in the input text; do not infer or translate. \
         Do not add countries unless they are explicitly present in the text. \
         Prefer returning administrative areas and venues when present. \
         Return JSON only, matching the provided schema.\n\n\
         EXAMPLES:\n\
         Text: 大会は広島県で開催。会場は広島市の広島国際会議場。\n\
         Output: {{\"mentions\":[{{\"mention\":\"広島県\"}},{{\"mention\":\"広島市\"}},{{\"mention\":\"広島国際会議場\"}}]}}\n\n\
         TEXT:\n{}",
        text
    )
}

pub fn extract_schema() -> Value {
    json!({
        "title": "ExtractOutput",
        "type": "object",
        "properties": {
            "mentions": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "mention": {
                            "type": "string",
                            "description": "Mention text as it appears"
                        }
                    },
                    "required": ["mention"]
                }
            }
        },
        "required": ["mentions"]
    })
}

/// Compact view of the candidates: names, countries and OSM identity only.
pub fn candidates_payload(mapping: &[MentionCandidates]) -> Value {
    Value::Array(
        mapping
            .iter()
            .map(|entry| {
                let candidates: Vec<Value> = entry
                    .candidates
                    .iter()
                    .enumerate()
                    .map(|(idx, c)| {
                        json!({
                            "index": idx,
                            "display_name": c.display_name,
                            "country_code": c.country_code,
                            "osm_type": c.osm_type,
                            "osm_id": c.osm_id,
                        })
                    })
                    .collect();
                json!({
                    "mention_id": entry.mention.id,
                    "mention": entry.mention.text,
                    "candidates": candidates,
                })
            })
            .collect(),
    )
}

pub fn resolve_prompt(text: &str, mapping: &[MentionCandidates]) -> String {
    format!(
        "You are selecting the best candidate for each mention based on context. \
         You must return one result for every mention_id in CANDIDATES. \
         If none match, choose -1 and status 'rejected'. \
         Return JSON only, matching the provided schema.\n\n\
         TEXT:\n{}\n\n\
         CANDIDATES (index starts at 0):\n{}",
        text,
        candidates_payload(mapping)
    )
}

pub fn resolve_schema() -> Value {
    json!({
        "title": "ResolveOutput",
        "type": "object",
        "properties": {
            "results": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "mention_id": {"type": "string"},
                        "mention": {"type": "string"},
                        "choice": {
                            "type": "integer",
                            "description": "Index of best candidate, -1 if none"
                        },
                        "status": {
                            "type": "string",
                            "enum": ["resolved", "no_candidate", "rejected"]
                        }
                    },
                    "required": ["mention_id", "mention", "choice", "status"]
                }
            }
        },
        "required": ["results"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use locitorium_core::testing::candidate;
    use locitorium_core::Mention;

    #[test]
    fn test_extract_prompt_embeds_text() {
        let prompt = extract_prompt("会場は広島国際会議場");
        assert!(prompt.ends_with("TEXT:\n会場は広島国際会議場"));
        assert!(prompt.contains("{\"mentions\":[{\"mention\":\"広島県\"}"));
    }

    #[test]
    fn test_payload_withholds_coordinates() {
        let mapping = vec![MentionCandidates {
            mention: Mention::for_doc("d1", 0, "Tokyo"),
            candidates: vec![candidate(1, "東京都", Some("jp")), candidate(2, "Tokyo, Ohio", Some("us"))],
        }];
        let payload = candidates_payload(&mapping);
        let first = &payload[0]["candidates"][0];

        assert_eq!(payload[0]["mention_id"], json!("d1:0"));
        assert_eq!(first["index"], json!(0));
        assert_eq!(first["country_code"], json!("JP"));
        assert_eq!(payload[0]["candidates"][1]["index"], json!(1));
        assert!(first.get("lat").is_none());
        assert!(first.get("bbox").is_none());
    }

    #[test]
    fn test_resolve_prompt_keeps_non_ascii() {
        let mapping = vec![MentionCandidates {
            mention: Mention::for_doc("d1", 0, "広島"),
            candidates: vec![candidate(1, "広島市", Some("JP"))],
        }];
        let prompt = resolve_prompt("広島で開催", &mapping);
        assert!(prompt.contains("\"mention\":\"広島\""));
        assert!(prompt.contains("CANDIDATES (index starts at 0):"));
    }

    #[test]
    fn test_schemas_require_top_level_keys() {
        assert_eq!(extract_schema()["required"], json!(["mentions"]));
        assert_eq!(resolve_schema()["required"], json!(["results"]));
    }
}
