//! Fixed-delay retry
//!
//! Every failure is retried the same way: no backoff, no jitter and no
//! inspection of the error. After the last attempt the final error is
//! returned unchanged.

use crate::config::RetryConfig;
use crate::domain::Result;
use crate::log_retry_attempt;
use std::future::Future;
use std::time::Duration;

/// Default number of attempts, the first one included
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default pause between attempts
pub const DEFAULT_DELAY: Duration = Duration::from_millis(3000);

/// Attempt count and pause for [`retry_fixed`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Single attempt, no waiting
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_DELAY)
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, Duration::from_millis(config.delay_ms))
    }
}

/// Runs `attempt` until it succeeds or `policy.max_attempts` is reached
///
/// A policy with zero attempts still runs once. Dropping the returned future
/// cancels both the in-flight attempt and any pending sleep.
pub async fn retry_fixed<T, F, Fut>(policy: &RetryPolicy, operation: &str, mut attempt: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut current = 1;

    loop {
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(e) if current < max_attempts => {
                log_retry_attempt!(operation, current + 1, max_attempts, e);
                tokio::time::sleep(policy.delay).await;
                current += 1;
            }
            Err(e) => {
                tracing::error!(
                    operation = operation,
                    attempts = current,
                    error = %e,
                    "Operation failed after all retry attempts"
                );
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RepositoryError;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.delay, Duration::from_millis(3000));
    }

    #[test]
    fn test_policy_from_config() {
        let config = RetryConfig {
            max_attempts: 5,
            delay_ms: 250,
        };
        assert_eq!(
            RetryPolicy::from(&config),
            RetryPolicy::new(5, Duration::from_millis(250))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_transient_failure() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let policy = RetryPolicy::new(3, Duration::from_millis(100));

        let value = retry_fixed(&policy, "probe", || async move {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(RepositoryError::Validation("transient".to_string()))
            } else {
                Ok(7)
            }
        })
        .await
        .unwrap();

        assert_eq!(value, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_zero_attempts_runs_once() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let policy = RetryPolicy::new(0, Duration::ZERO);

        let result: Result<()> = retry_fixed(&policy, "probe", || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(RepositoryError::Validation("nope".to_string()))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
