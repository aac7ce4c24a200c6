//! Resolution: pick one candidate per mention with a single model call.

use std::collections::HashMap;

use locitorium_core::{
    LanguageModel, MentionCandidates, PredResult, ResolutionStatus, Result, SelectedCandidate,
};
use tracing::{debug, warn};

use crate::prompts::{resolve_prompt, resolve_schema};
use crate::types::{from_reply, ResolveOutput};

/// Resolve every mention in `mapping`.
///
/// Returns exactly one result per input mention, in input order:
/// - an empty mapping, or a mapping where no mention has candidates, is
///   answered without calling the model;
/// - a valid `choice` index yields `resolved` with that candidate selected;
/// - anything else (bad index, `-1`, mention missing from the reply) yields
///   `no_candidate` or `rejected` depending on whether candidates existed.
///
/// Reply entries for unknown mention ids are ignored, and only the first entry
/// for a given id counts.
pub async fn resolve_candidates(
    model: &dyn LanguageModel,
    text: &str,
    mapping: &[MentionCandidates],
    tag: &str,
) -> Result<Vec<PredResult>> {
    if mapping.is_empty() {
        return Ok(Vec::new());
    }

    if mapping.iter().all(|entry| entry.candidates.is_empty()) {
        debug!("No candidates for any of {} mentions, skipping model", mapping.len());
        return Ok(default_results(mapping));
    }

    let reply = model
        .generate(&resolve_prompt(text, mapping), &resolve_schema(), tag)
        .await?;
    let parsed: ResolveOutput = from_reply(reply)?;

    let mut choices: HashMap<&str, i64> = HashMap::new();
    for entry in &parsed.results {
        if !mapping.iter().any(|m| m.mention.id == entry.mention_id) {
            warn!("Ignoring resolution for unknown mention id {:?}", entry.mention_id);
            continue;
        }
        choices.entry(entry.mention_id.as_str()).or_insert(entry.choice);
    }

    let results = mapping
        .iter()
        .map(|entry| match choices.get(entry.mention.id.as_str()) {
            Some(&choice) => apply_choice(entry, choice),
            None => PredResult::unmatched(&entry.mention, entry.candidates.clone()),
        })
        .collect::<Vec<_>>();

    let resolved = results
        .iter()
        .filter(|r| r.status == ResolutionStatus::Resolved)
        .count();
    debug!(
        "Resolved {}/{} mentions ({} answered by model) for {}",
        resolved,
        results.len(),
        choices.len(),
        tag
    );
    Ok(results)
}

fn default_results(mapping: &[MentionCandidates]) -> Vec<PredResult> {
    mapping
        .iter()
        .map(|entry| PredResult::unmatched(&entry.mention, entry.candidates.clone()))
        .collect()
}

fn apply_choice(entry: &MentionCandidates, choice: i64) -> PredResult {
    let picked = usize::try_from(choice)
        .ok()
        .and_then(|idx| entry.candidates.get(idx));
    match picked {
        Some(candidate) => PredResult {
            mention_id: entry.mention.id.clone(),
            mention: entry.mention.text.clone(),
            status: ResolutionStatus::Resolved,
            selected: Some(SelectedCandidate::from(candidate)),
            candidates: entry.candidates.clone(),
        },
        None => PredResult::unmatched(&entry.mention, entry.candidates.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use locitorium_core::testing::{candidate, ScriptedModel};
    use locitorium_core::{Error, Mention};
    use serde_json::json;

    fn entry(ordinal: usize, text: &str, candidates: Vec<locitorium_core::Candidate>) -> MentionCandidates {
        MentionCandidates {
            mention: Mention::for_doc("d1", ordinal, text),
            candidates,
        }
    }

    #[tokio::test]
    async fn test_empty_mapping_skips_model() {
        let model = ScriptedModel::new();
        let results = resolve_candidates(&model, "text", &[], "t").await.unwrap();
        assert!(results.is_empty());
        assert!(model.calls().is_empty());
    }

    #[tokio::test]
    async fn test_all_empty_candidates_skip_model() {
        let model = ScriptedModel::new();
        let mapping = vec![entry(0, "Atlantis", vec![]), entry(1, "El Dorado", vec![])];

        let results = resolve_candidates(&model, "text", &mapping, "t").await.unwrap();

        assert!(model.calls().is_empty());
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.status == ResolutionStatus::NoCandidate));
        assert!(results.iter().all(|r| r.selected.is_none()));
    }

    #[tokio::test]
    async fn test_fills_mentions_missing_from_reply() {
        let model = ScriptedModel::new().reply(json!({
            "results": [
                {"mention_id": "d1:0", "mention": "Minneapolis", "choice": 0, "status": "resolved"}
            ]
        }));
        let mapping = vec![
            entry(0, "Minneapolis", vec![candidate(1, "Minneapolis", Some("US"))]),
            entry(1, "Alex Pretti", vec![]),
            entry(2, "Springfield", vec![candidate(1, "Springfield, IL", Some("US"))]),
        ];

        let results = resolve_candidates(&model, "text", &mapping, "d1_resolve").await.unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].status, ResolutionStatus::Resolved);
        let selected = results[0].selected.as_ref().unwrap();
        assert_eq!(selected.display_name, "Minneapolis");
        assert_eq!(selected.country_code.as_deref(), Some("US"));
        assert_eq!(selected.confidence, None);
        assert_eq!(results[1].status, ResolutionStatus::NoCandidate);
        assert_eq!(results[2].status, ResolutionStatus::Rejected);
        assert_eq!(results[2].candidates.len(), 1);
        assert_eq!(model.calls()[0].tag, "d1_resolve");
    }

    #[tokio::test]
    async fn test_choice_overrides_model_status() {
        let model = ScriptedModel::new().reply(json!({
            "results": [
                {"mention_id": "d1:0", "mention": "Paris", "choice": 1, "status": "rejected"},
                {"mention_id": "d1:1", "mention": "Lyon", "choice": 5, "status": "resolved"},
                {"mention_id": "d1:2", "mention": "Nice", "choice": -1, "status": "resolved"}
            ]
        }));
        let mapping = vec![
            entry(
                0,
                "Paris",
                vec![candidate(1, "Paris, France", Some("FR")), candidate(2, "Paris, Texas", Some("US"))],
            ),
            entry(1, "Lyon", vec![candidate(1, "Lyon", Some("FR"))]),
            entry(2, "Nice", vec![candidate(1, "Nice", Some("FR"))]),
        ];

        let results = resolve_candidates(&model, "text", &mapping, "t").await.unwrap();

        assert_eq!(results[0].status, ResolutionStatus::Resolved);
        assert_eq!(results[0].selected.as_ref().unwrap().display_name, "Paris, Texas");
        assert_eq!(results[1].status, ResolutionStatus::Rejected);
        assert!(results[1].selected.is_none());
        assert_eq!(results[2].status, ResolutionStatus::Rejected);
    }

    #[tokio::test]
    async fn test_unknown_and_duplicate_ids_are_ignored() {
        let model = ScriptedModel::new().reply(json!({
            "results": [
                {"mention_id": "d1:9", "mention": "Ghost", "choice": 0, "status": "resolved"},
                {"mention_id": "d1:0", "mention": "Tokyo", "choice": 0, "status": "resolved"},
                {"mention_id": "d1:0", "mention": "Tokyo", "choice": -1, "status": "rejected"}
            ]
        }));
        let mapping = vec![entry(0, "Tokyo", vec![candidate(1, "東京都", Some("JP"))])];

        let results = resolve_candidates(&model, "text", &mapping, "t").await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].mention_id, "d1:0");
        assert_eq!(results[0].status, ResolutionStatus::Resolved);
    }

    #[tokio::test]
    async fn test_model_failure_propagates() {
        let model = ScriptedModel::new().fail("garbage");
        let mapping = vec![entry(0, "Tokyo", vec![candidate(1, "東京都", Some("JP"))])];
        let result = resolve_candidates(&model, "text", &mapping, "t").await;
        assert!(matches!(result, Err(Error::InvalidOutput(_))));
    }
}
