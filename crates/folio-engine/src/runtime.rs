//! Retry and timeout policy for collaborator calls.
//!
//! Every call into a holdings store or market data gateway goes through
//! [`CallPolicy::call`]: each attempt is bounded by a timeout, transient
//! failures are retried with exponential backoff, and the last error is
//! returned once attempts are exhausted.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::{sleep, timeout};

use folio_traits::TraitError;

// =============================================================================
// RETRY CONFIGURATION
// =============================================================================

/// Configuration for retry logic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the first retry, in milliseconds.
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    /// Upper bound on any single delay, in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Multiplier for exponential backoff.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    /// Add random jitter to delays.
    #[serde(default = "default_jitter")]
    pub jitter: bool,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    100
}

fn default_max_delay_ms() -> u64 {
    10_000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_jitter() -> bool {
    true
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: default_jitter(),
        }
    }
}

impl RetryConfig {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Calculates the delay before retry number `attempt` (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let base_delay = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(exponent);

        let delay_ms = if self.jitter {
            // Up to 25% jitter
            base_delay * (1.0 + rand::random::<f64>() * 0.25)
        } else {
            base_delay
        };

        // The cap holds with jitter applied.
        Duration::from_millis(delay_ms.min(self.max_delay_ms as f64) as u64)
    }

    /// Executes an async operation, retrying failures accepted by `retryable`.
    pub async fn execute_if<F, Fut, T, E, P>(&self, mut f: F, retryable: P) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Debug,
        P: Fn(&E) -> bool,
    {
        let mut attempt = 0;

        loop {
            match f().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    attempt += 1;
                    if attempt >= self.max_attempts || !retryable(&e) {
                        if attempt > 1 {
                            tracing::warn!(
                                attempt,
                                max_attempts = self.max_attempts,
                                error = ?e,
                                "All retry attempts exhausted"
                            );
                        }
                        return Err(e);
                    }

                    let delay = self.delay_for_attempt(attempt);
                    tracing::debug!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = ?e,
                        "Retrying after delay"
                    );
                    sleep(delay).await;
                }
            }
        }
    }

    /// Executes an async operation, retrying every failure.
    pub async fn execute<F, Fut, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Debug,
    {
        self.execute_if(f, |_| true).await
    }
}

// =============================================================================
// CALL POLICY
// =============================================================================

/// Per-attempt timeout plus retry for collaborator calls.
#[derive(Debug, Clone)]
pub struct CallPolicy {
    /// Timeout for each attempt.
    pub timeout: Duration,
    /// Retry configuration.
    pub retry: RetryConfig,
}

impl CallPolicy {
    /// Creates a policy.
    pub fn new(timeout: Duration, retry: RetryConfig) -> Self {
        Self { timeout, retry }
    }

    /// Runs `f` under the policy. An attempt that exceeds the timeout fails
    /// with [`TraitError::Timeout`]; only transient errors are retried.
    pub async fn call<F, Fut, T>(&self, operation: &str, mut f: F) -> Result<T, TraitError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, TraitError>>,
    {
        let limit = self.timeout;
        let result = self
            .retry
            .execute_if(
                || {
                    let attempt = f();
                    async move {
                        match timeout(limit, attempt).await {
                            Ok(r) => r,
                            Err(_) => Err(TraitError::Timeout),
                        }
                    }
                },
                TraitError::is_transient,
            )
            .await;
        if let Err(e) = &result {
            tracing::warn!(operation, error = %e, "Collaborator call failed");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_retry(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            initial_delay_ms: 1,
            max_delay_ms: 5,
            backoff_multiplier: 2.0,
            jitter: false,
        }
    }

    #[test]
    fn test_backoff_is_exponential_and_capped() {
        let config = RetryConfig {
            initial_delay_ms: 100,
            max_delay_ms: 350,
            jitter: false,
            ..RetryConfig::default()
        };
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(config.delay_for_attempt(3), Duration::from_millis(350));
    }

    #[test]
    fn test_jitter_bounded() {
        let config = RetryConfig::default();
        for _ in 0..20 {
            let d = config.delay_for_attempt(1).as_millis();
            assert!((100..=125).contains(&d));
        }
    }

    #[test]
    fn test_jitter_never_exceeds_max_delay() {
        let config = RetryConfig {
            initial_delay_ms: 100,
            max_delay_ms: 350,
            jitter: true,
            ..RetryConfig::default()
        };
        for attempt in 1..=8 {
            for _ in 0..20 {
                assert!(config.delay_for_attempt(attempt) <= Duration::from_millis(350));
            }
        }
        assert!(config.delay_for_attempt(6) >= Duration::from_millis(350));
    }

    #[tokio::test]
    async fn test_retries_transient_until_success() {
        let calls = AtomicU32::new(0);
        let policy = CallPolicy::new(Duration::from_secs(1), fast_retry(3));

        let result = policy
            .call("flaky", || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(TraitError::ConnectionFailed("reset".into()))
                } else {
                    Ok(7)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_errors_not_retried() {
        let calls = AtomicU32::new(0);
        let policy = CallPolicy::new(Duration::from_secs(1), fast_retry(5));

        let result: Result<(), _> = policy
            .call("lookup", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(TraitError::NotFound("X".into()))
            })
            .await;

        assert!(matches!(result, Err(TraitError::NotFound(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_slow_call_times_out() {
        let calls = AtomicU32::new(0);
        let policy = CallPolicy::new(Duration::from_millis(10), fast_retry(2));

        let result: Result<(), _> = policy
            .call("slow", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(TraitError::Timeout)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
