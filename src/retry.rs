//! Bounded retry with exponential backoff for external service calls.
//!
//! Every attempt runs under a per-call timeout. Transient failures
//! (including timeouts) are retried up to `max_retries` times; fatal
//! failures return immediately.
//!
//! Backoff before attempt `n` (1-based retry count) is
//! `base_delay × 2^(n-1)`, capped at `max_delay`: with the defaults
//! 1s, 2s, 4s, 8s, 16s.

use std::future::Future;
use std::time::Duration;

use documind_core::ServiceError;
use tracing::{debug, warn};

/// Retry and timeout settings injected into each service client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; total attempts are `max_retries + 1`.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Ceiling for a single attempt.
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(32),
            timeout: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 1u32 << retry.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Run `op` until it succeeds, fails fatally, or retries are exhausted.
///
/// Returns the last transient error when every attempt failed.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    what: &str,
    mut op: F,
) -> Result<T, ServiceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
{
    let mut last_err = None;

    for attempt in 0..=policy.max_retries {
        if attempt > 0 {
            let delay = policy.backoff(attempt);
            debug!(what, attempt, delay_ms = delay.as_millis() as u64, "retrying");
            tokio::time::sleep(delay).await;
        }

        match tokio::time::timeout(policy.timeout, op()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(err)) if err.is_transient() => {
                warn!(what, attempt, error = %err, "transient failure");
                last_err = Some(err);
            }
            Ok(Err(err)) => return Err(err),
            Err(_) => {
                warn!(what, attempt, "attempt timed out");
                last_err = Some(ServiceError::Transient(format!(
                    "{} timed out after {}s",
                    what,
                    policy.timeout.as_secs_f32()
                )));
            }
        }
    }

    Err(last_err.unwrap_or_else(|| ServiceError::Transient(format!("{} failed after retries", what))))
}
