//! Bounded retry with exponential backoff.

use std::future::Future;
use std::time::Duration;

use crate::error::SourceError;

/// Retry policy shared by the source adapters.
///
/// Only transient failures (see [`SourceError::is_transient`]) are retried;
/// the delay doubles per attempt and is capped at `max_delay`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Upper bound for the backoff delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries, for tests and administrative calls.
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Runs `op` until it succeeds, fails terminally, or attempts run out.
    ///
    /// `op` receives the 1-based attempt number. The last error is surfaced
    /// unchanged once the budget is exhausted.
    pub async fn run<T, F, Fut>(&self, op: F) -> Result<T, SourceError>
    where
        F: Fn(u32) -> Fut,
        Fut: Future<Output = Result<T, SourceError>>,
    {
        let mut delay = self.base_delay;
        let mut attempt = 1;

        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.max_attempts => {
                    tracing::warn!(
                        provider = err.provider(),
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient source failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(self.max_delay);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
        }
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let calls = AtomicU32::new(0);
        let result = fast_policy(3)
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, SourceError>(42) }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried_until_success() {
        let calls = AtomicU32::new(0);
        let result = fast_policy(3)
            .run(|attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 3 {
                        Err(SourceError::http("EPO", 503))
                    } else {
                        Ok("ok")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausted_attempts_surface_last_error() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = fast_policy(3)
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(SourceError::network("EPO", "timed out")) }
            })
            .await;

        assert!(matches!(result, Err(SourceError::Network { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_terminal_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = fast_policy(3)
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(SourceError::http("USPTO", 400)) }
            })
            .await;

        assert!(matches!(result, Err(SourceError::Http { status: 400, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
