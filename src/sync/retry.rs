use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::PortalError;

/// Fixed-backoff retry settings for collection fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn no_backoff(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            backoff: Duration::ZERO,
        }
    }
}

/// Runs `op` until it returns a value `accept` takes, up to `policy.max_attempts` times.
///
/// Transport failures and rejected values are retried after `policy.backoff`.
/// An authentication failure stops the loop at once. Returns `None` once
/// attempts run out; the error itself is only logged.
pub async fn fetch_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    collection: &'static str,
    accept: impl Fn(&T) -> bool,
    mut op: F,
) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, PortalError>>,
{
    for attempt in 1..=policy.max_attempts {
        match op().await {
            Ok(value) if accept(&value) => {
                debug!(collection, attempt, "Fetch succeeded");
                return Some(value);
            }
            Ok(_) => {
                warn!(collection, attempt, "Fetch returned no usable data");
            }
            Err(e) if e.is_auth() => {
                warn!(collection, attempt, error = %e, "Session rejected, not retrying");
                return None;
            }
            Err(e) => {
                warn!(collection, attempt, error = %e, "Fetch attempt failed");
            }
        }

        if attempt < policy.max_attempts && !policy.backoff.is_zero() {
            tokio::time::sleep(policy.backoff).await;
        }
    }

    warn!(collection, attempts = policy.max_attempts, "Giving up, no data");
    None
}
