//! Mention extraction: one model call, then dedupe, verbatim filter, cap.

use std::collections::HashSet;

use locitorium_core::{LanguageModel, Result};
use tracing::debug;

use crate::prompts::{extract_prompt, extract_schema};
use crate::types::{from_reply, ExtractOutput};

/// Drop blanks and repeats (compared after trimming), keeping first-seen order.
pub fn dedupe_mentions<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut output = Vec::new();
    for item in items {
        let key = item.as_ref().trim();
        if key.is_empty() || !seen.insert(key.to_string()) {
            continue;
        }
        output.push(key.to_string());
    }
    output
}

/// Keep only mentions found in `text`, literally or case-insensitively.
pub fn filter_mentions(text: &str, mentions: Vec<String>) -> Vec<String> {
    let folded = text.to_lowercase();
    mentions
        .into_iter()
        .filter(|m| text.contains(m.as_str()) || folded.contains(&m.to_lowercase()))
        .collect()
}

/// Ask the model for place mentions in `text` and return at most
/// `max_mentions` of them, each guaranteed to occur in the text.
pub async fn extract_mentions(
    model: &dyn LanguageModel,
    text: &str,
    max_mentions: usize,
    tag: &str,
) -> Result<Vec<String>> {
    let reply = model.generate(&extract_prompt(text), &extract_schema(), tag).await?;
    let parsed: ExtractOutput = from_reply(reply)?;

    let proposed = parsed.mentions.len();
    let mut mentions = filter_mentions(text, dedupe_mentions(parsed.mentions.iter().map(|m| &m.mention)));
    mentions.truncate(max_mentions);

    debug!(
        "Extracted {} mentions ({} proposed) for {}",
        mentions.len(),
        proposed,
        tag
    );
    Ok(mentions)
}
