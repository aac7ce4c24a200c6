//! Candidate generation: one gazetteer search per mention, bounded fan-out.

use std::sync::Arc;

use futures::future::try_join_all;
use locitorium_core::{Error, Gazetteer, Mention, MentionCandidates, Result};
use tokio::sync::Semaphore;
use tracing::debug;

/// Search every mention with at most `concurrency` requests in flight and keep
/// the first `max_candidates` hits of each. Output order follows `mentions`.
///
/// The first failing search aborts the batch; remaining searches are dropped.
pub async fn generate_candidates(
    gazetteer: &dyn Gazetteer,
    mentions: &[Mention],
    concurrency: usize,
    max_candidates: usize,
) -> Result<Vec<MentionCandidates>> {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));

    let searches = mentions.iter().map(|mention| {
        let semaphore = Arc::clone(&semaphore);
        async move {
            let _permit = semaphore
                .acquire()
                .await
                .map_err(|e| Error::Http(format!("search pool closed: {}", e)))?;
            let mut candidates = gazetteer.search(&mention.text).await?;
            candidates.truncate(max_candidates);
            debug!("{} candidates for {:?}", candidates.len(), mention.text);
            Ok::<_, Error>(MentionCandidates {
                mention: mention.clone(),
                candidates,
            })
        }
    });

    try_join_all(searches).await
}
