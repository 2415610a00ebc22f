//! Bounded retry with exponential backoff for calls to external services.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

/// Marker error for a single attempt that exceeded its time budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("attempt timed out after {0:?}")]
pub struct AttemptTimedOut(pub Duration);

/// Retry policy: each attempt is bounded by `attempt_timeout`; failed
/// attempts are retried up to `max_retries` times, sleeping
/// `base_delay * 2^n` (capped at `max_delay`) between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt (total attempts = `max_retries + 1`).
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
    /// Time budget for one attempt.
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            attempt_timeout: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt.
    #[must_use]
    pub fn single_attempt(attempt_timeout: Duration) -> Self {
        Self {
            max_retries: 0,
            attempt_timeout,
            ..Self::default()
        }
    }

    /// Delay to wait before retry number `retry` (1-based).
    #[must_use]
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    /// Runs `attempt` until it succeeds or the retry budget is spent.
    ///
    /// `attempt` receives the zero-based attempt number.
    ///
    /// # Errors
    ///
    /// Returns the error of the last attempt. A timed-out attempt is
    /// reported as `E::from(AttemptTimedOut)`.
    pub async fn run<T, E, F, Fut>(&self, operation: &str, mut attempt: F) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<AttemptTimedOut> + std::fmt::Display,
    {
        let mut attempt_number = 0;
        loop {
            let result = match tokio::time::timeout(self.attempt_timeout, attempt(attempt_number))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(E::from(AttemptTimedOut(self.attempt_timeout))),
            };

            match result {
                Ok(value) => return Ok(value),
                Err(error) if attempt_number < self.max_retries => {
                    attempt_number += 1;
                    let delay = self.delay_for(attempt_number);
                    warn!(
                        operation,
                        attempt = attempt_number,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %error,
                        "attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[derive(Debug, PartialEq, Eq)]
    enum TestError {
        Boom,
        TimedOut,
    }

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{self:?}")
        }
    }

    impl From<AttemptTimedOut> for TestError {
        fn from(_: AttemptTimedOut) -> Self {
            Self::TimedOut
        }
    }

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
            attempt_timeout: Duration::from_millis(200),
        }
    }

    #[test]
    fn test_delay_doubles_and_caps() {
        let policy = RetryPolicy {
            max_retries: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(3),
            attempt_timeout: Duration::from_secs(1),
        };

        assert_eq!(policy.delay_for(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(2), Duration::from_secs(2));
        assert_eq!(policy.delay_for(3), Duration::from_secs(3));
        assert_eq!(policy.delay_for(30), Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_run_returns_first_success() {
        let calls = AtomicU32::new(0);

        let result: Result<u32, TestError> = fast_policy(2)
            .run("test", |n| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { if n < 1 { Err(TestError::Boom) } else { Ok(n) } }
            })
            .await;

        assert_eq!(result, Ok(1));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_run_gives_up_after_budget() {
        let calls = AtomicU32::new(0);

        let result: Result<(), TestError> = fast_policy(2)
            .run("test", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(TestError::Boom) }
            })
            .await;

        assert_eq!(result, Err(TestError::Boom));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_run_maps_slow_attempt_to_timeout() {
        let policy = RetryPolicy {
            attempt_timeout: Duration::from_millis(5),
            ..fast_policy(0)
        };

        let result: Result<(), TestError> = policy
            .run("test", |_| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;

        assert_eq!(result, Err(TestError::TimedOut));
    }
}
