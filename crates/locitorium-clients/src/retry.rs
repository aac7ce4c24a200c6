//! Bounded retry with jittered exponential backoff.

use std::future::Future;
use std::time::Duration;

use locitorium_core::Result;
use rand::Rng;
use tracing::warn;

/// How many times a call may be attempted and how long to wait in between.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Two attempts for model generation.
    pub const fn generate() -> Self {
        Self {
            max_attempts: 2,
            min_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(1),
        }
    }

    /// Three attempts for gazetteer search.
    pub const fn search() -> Self {
        Self {
            max_attempts: 3,
            min_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(1),
        }
    }

    /// Un-jittered delay after the given failed attempt (1-based), capped at `max_delay`.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let min_ms = self.min_delay.as_millis() as u64;
        let shift = attempt.saturating_sub(1).min(10);
        let delay_ms = min_ms.saturating_mul(1u64 << shift);
        Duration::from_millis(delay_ms).min(self.max_delay)
    }

    /// Base delay plus up to 50% random jitter, still capped at `max_delay`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let base = self.base_delay(attempt);
        (base + jitter(base / 2)).min(self.max_delay)
    }
}

fn jitter(bound: Duration) -> Duration {
    let bound_ms = bound.as_millis() as u64;
    if bound_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::thread_rng().gen_range(0..=bound_ms))
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// attempt budget is spent. The last error is returned unchanged.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, label: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < policy.max_attempts => {
                let delay = policy.backoff(attempt);
                warn!(
                    "{} failed (attempt {}/{}): {}. Retrying in {:?}",
                    label, attempt, policy.max_attempts, e, delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use locitorium_core::Error;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            min_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        }
    }

    #[test]
    fn test_base_delay_doubles_and_caps() {
        let policy = RetryPolicy::search();
        assert_eq!(policy.base_delay(1), Duration::from_millis(200));
        assert_eq!(policy.base_delay(2), Duration::from_millis(400));
        assert_eq!(policy.base_delay(3), Duration::from_millis(800));
        assert_eq!(policy.base_delay(4), Duration::from_secs(1));
        assert_eq!(policy.base_delay(40), Duration::from_secs(1));
    }

    #[test]
    fn test_backoff_stays_within_bounds() {
        let policy = RetryPolicy::generate();
        for attempt in 1..5 {
            let delay = policy.backoff(attempt);
            assert!(delay >= policy.base_delay(attempt));
            assert!(delay <= policy.max_delay);
        }
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let calls = AtomicU32::new(0);
        let result = with_retry(&fast_policy(3), "flaky", || async {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n < 3 {
                Err(Error::Http(format!("attempt {}", n)))
            } else {
                Ok(n)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_budget() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_retry(&fast_policy(2), "always failing", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::InvalidOutput("garbage".into()))
        })
        .await;
        assert!(matches!(result, Err(Error::InvalidOutput(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_upstream_unavailable_is_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_retry(&fast_policy(3), "search", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::UpstreamUnavailable("503".into()))
        })
        .await;
        assert!(matches!(result, Err(Error::UpstreamUnavailable(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
