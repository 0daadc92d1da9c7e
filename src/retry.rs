//! Retry with exponential backoff
//!
//! Every statement the binding issues is idempotent, so any retriable error
//! (see [`Error::is_retriable`]) re-runs the request after a delay that
//! doubles per attempt, capped at `max_delay`.

use std::time::Duration;

use futures_util::future::BoxFuture;

use crate::error::{Error, Result};

/// Default number of attempts, including the first
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Retry policy for idempotent requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Create a builder for the retry policy
    pub fn builder() -> RetryPolicyBuilder {
        RetryPolicyBuilder::default()
    }

    /// A policy that runs the request exactly once
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Maximum number of attempts, including the first
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before the first retry
    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Upper bound on any single delay
    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Delay after the given failed attempt (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(31);
        self.base_delay
            .saturating_mul(1u32 << shift)
            .min(self.max_delay)
    }
}

/// Builder for RetryPolicy
#[derive(Debug, Default)]
pub struct RetryPolicyBuilder {
    max_attempts: Option<u32>,
    base_delay: Option<Duration>,
    max_delay: Option<Duration>,
}

impl RetryPolicyBuilder {
    /// Set the maximum number of attempts; values below 1 are raised to 1
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts.max(1));
        self
    }

    /// Set the delay before the first retry
    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = Some(delay);
        self
    }

    /// Set the upper bound on any single delay
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = Some(delay);
        self
    }

    /// Build the retry policy
    pub fn build(self) -> RetryPolicy {
        let default = RetryPolicy::default();
        RetryPolicy {
            max_attempts: self.max_attempts.unwrap_or(default.max_attempts),
            base_delay: self.base_delay.unwrap_or(default.base_delay),
            max_delay: self.max_delay.unwrap_or(default.max_delay),
        }
    }
}

/// Outcome of a retried operation
#[derive(Debug)]
pub struct Retried<T> {
    /// Final result
    pub result: Result<T>,
    /// Number of attempts made
    pub attempts: u32,
}

/// Run `op` until it succeeds, fails with a non-retriable error, or the
/// policy runs out of attempts
pub async fn retry<'a, T, F>(policy: &RetryPolicy, mut op: F) -> Retried<T>
where
    F: FnMut(u32) -> BoxFuture<'a, Result<T>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op(attempt).await {
            Ok(value) => {
                return Retried {
                    result: Ok(value),
                    attempts: attempt,
                }
            }
            Err(e) if e.is_retriable() && attempt < policy.max_attempts => {
                let delay = policy.delay_for(attempt);
                tracing::debug!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "retrying request"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                return Retried {
                    result: Err(e),
                    attempts: attempt,
                }
            }
        }
    }
}

impl<T> Retried<T> {
    /// Discard the attempt count
    pub fn into_result(self) -> Result<T> {
        self.result
    }

    /// Whether the final result is an error
    pub fn is_err(&self) -> bool {
        self.result.is_err()
    }

    /// Borrow the final error, if any
    pub fn err(&self) -> Option<&Error> {
        self.result.as_ref().err()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::FutureExt;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::builder()
            .max_attempts(max_attempts)
            .base_delay(Duration::from_millis(1))
            .max_delay(Duration::from_millis(2))
            .build()
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), DEFAULT_MAX_ATTEMPTS);
        assert_eq!(RetryPolicy::no_retry().max_attempts(), 1);
        assert_eq!(RetryPolicy::builder().max_attempts(0).build().max_attempts(), 1);
    }

    #[test]
    fn test_delay_doubles_and_caps() {
        let policy = RetryPolicy::builder()
            .base_delay(Duration::from_millis(10))
            .max_delay(Duration::from_millis(50))
            .build();
        assert_eq!(policy.delay_for(1), Duration::from_millis(10));
        assert_eq!(policy.delay_for(2), Duration::from_millis(20));
        assert_eq!(policy.delay_for(3), Duration::from_millis(40));
        assert_eq!(policy.delay_for(4), Duration::from_millis(50));
        assert_eq!(policy.delay_for(100), Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let calls = AtomicU32::new(0);
        let outcome = retry(&fast_policy(5), |_| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(Error::status("OVERLOADED", "busy"))
                } else {
                    Ok(n)
                }
            }
            .boxed()
        })
        .await;

        assert_eq!(outcome.attempts, 3);
        assert_eq!(outcome.into_result().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_non_retriable_fails_fast() {
        let outcome: Retried<()> = retry(&fast_policy(5), |_| {
            async { Err(Error::status("SCHEME_ERROR", "no table")) }.boxed()
        })
        .await;

        assert_eq!(outcome.attempts, 1);
        assert!(matches!(outcome.err(), Some(Error::Status { .. })));
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let outcome: Retried<()> = retry(&fast_policy(3), |attempt| {
            async move {
                Err(Error::Http {
                    status: 503,
                    body: format!("attempt {}", attempt),
                })
            }
            .boxed()
        })
        .await;

        assert_eq!(outcome.attempts, 3);
        assert!(outcome.is_err());
        assert_eq!(outcome.err().unwrap().to_string(), "HTTP error 503: attempt 3");
    }
}
