//! Bounded exponential backoff for remote calls.
//!
//! One decorator wraps every page fetch and batch submit instead of each
//! adapter carrying its own backoff loop. Only transient failures (timeouts,
//! 5xx, rate limits) are retried; client/contract errors propagate
//! immediately, and exhaustion converts the error into a fatal one exactly
//! once.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use thiserror::Error;
use tracing::warn;

/// An error that knows whether retrying could help.
pub trait Retryable {
    fn is_transient(&self) -> bool;
}

impl Retryable for devradar_store::StoreError {
    fn is_transient(&self) -> bool {
        devradar_store::StoreError::is_transient(self)
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub initial_interval: Duration,
    pub multiplier: f64,
    pub max_interval: Duration,
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(120),
            multiplier: 1.2,
            max_interval: Duration::from_secs(600),
            max_attempts: 5,
        }
    }
}

#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// Not retryable; surfaced on the first occurrence.
    #[error("{0}")]
    Fatal(E),

    /// All attempts failed with transient errors.
    #[error("retries exhausted after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: E },
}

/// Run `op` until it succeeds, fails fatally, or the attempt budget runs out.
pub async fn with_retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut op: F,
) -> Result<T, RetryError<E>>
where
    E: Retryable + Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut interval = policy.initial_interval;
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_transient() => return Err(RetryError::Fatal(e)),
            Err(e) => {
                if attempt >= policy.max_attempts {
                    return Err(RetryError::Exhausted { attempts: attempt, last: e });
                }
                let delay = interval + jitter(interval);
                warn!(
                    label,
                    attempt,
                    delay_secs = delay.as_secs(),
                    error = %e,
                    "Transient failure, backing off"
                );
                tokio::time::sleep(delay).await;
                interval = next_interval(interval, policy);
            }
        }
    }
}

fn next_interval(current: Duration, policy: &RetryPolicy) -> Duration {
    current.mul_f64(policy.multiplier).min(policy.max_interval)
}

/// Up to 10% of the interval, so concurrent pipelines don't thunder in step.
fn jitter(interval: Duration) -> Duration {
    let max_jitter = interval.as_millis() as u64 / 10;
    if max_jitter == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::rng().random_range(0..=max_jitter))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug, thiserror::Error)]
    enum TestError {
        #[error("timeout")]
        Transient,
        #[error("bad request")]
        Fatal,
    }

    impl Retryable for TestError {
        fn is_transient(&self) -> bool {
            matches!(self, TestError::Transient)
        }
    }

    fn tiny_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            initial_interval: Duration::from_millis(1),
            multiplier: 1.2,
            max_interval: Duration::from_millis(5),
            max_attempts,
        }
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = with_retry(&tiny_policy(5), "test", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(TestError::Transient)
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn always_transient_exhausts_within_attempt_budget() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retry(&tiny_policy(4), "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(TestError::Transient) }
        })
        .await;
        match result.unwrap_err() {
            RetryError::Exhausted { attempts, .. } => assert_eq!(attempts, 4),
            other => panic!("expected Exhausted, got {other}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn fatal_error_is_never_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retry(&tiny_policy(5), "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(TestError::Fatal) }
        })
        .await;
        assert!(matches!(result.unwrap_err(), RetryError::Fatal(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn default_multi_minute_policy_terminates_under_paused_time() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::default();
        let result: Result<(), _> = with_retry(&policy, "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(TestError::Transient) }
        })
        .await;
        match result.unwrap_err() {
            RetryError::Exhausted { attempts, .. } => {
                assert_eq!(attempts, policy.max_attempts)
            }
            other => panic!("expected Exhausted, got {other}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), policy.max_attempts);
    }

    #[test]
    fn interval_growth_is_capped() {
        let policy = RetryPolicy {
            initial_interval: Duration::from_secs(120),
            multiplier: 1.2,
            max_interval: Duration::from_secs(600),
            max_attempts: 50,
        };
        let mut interval = policy.initial_interval;
        for _ in 0..50 {
            interval = next_interval(interval, &policy);
        }
        assert_eq!(interval, policy.max_interval);
    }
}
