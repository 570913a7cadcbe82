//! Bounded exponential backoff with jitter.
//!
//! Every outbound call in the service (metadata fetch, backend writes,
//! websocket connects, subscription replay) goes through [`retry`] or
//! [`retry_if`].

use rand::Rng;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::info;

/// Upper bound of the random jitter added to every delay.
pub const MAX_JITTER_MS: u64 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of invocations, including the first one.
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(10_000),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            initial_delay,
            max_delay,
        }
    }

    /// Delay without jitter for a 1-indexed attempt: `min(max, initial * 2^attempt)`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.initial_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Backoff plus uniform jitter in `[0, 200ms)`.
    pub fn compute_delay(&self, attempt: u32) -> Duration {
        let jitter = rand::thread_rng().gen_range(0..MAX_JITTER_MS);
        self.backoff(attempt) + Duration::from_millis(jitter)
    }
}

/// Retries every failure until the budget runs out.
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    retry_if(policy, op, |_: &E| true).await
}

/// Retries while `should_retry` accepts the failure. The last error is returned unchanged.
pub async fn retry_if<T, E, F, Fut, P>(policy: &RetryPolicy, mut op: F, should_retry: P) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
    P: Fn(&E) -> bool,
{
    let mut attempts = 0u32;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                attempts += 1;

                if attempts >= policy.max_retries || !should_retry(&err) {
                    return Err(err);
                }

                let delay = policy.compute_delay(attempts);
                info!(
                    "🔁 Retry attempt {} of {} after {}ms: {}",
                    attempts,
                    policy.max_retries,
                    delay.as_millis(),
                    err
                );

                sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_delay_bounds() {
        let policy = RetryPolicy::new(10, Duration::from_millis(100), Duration::from_secs(60));

        for attempt in 1..=6 {
            let floor = Duration::from_millis(100 * 2u64.pow(attempt));
            for _ in 0..50 {
                let delay = policy.compute_delay(attempt);
                assert!(delay >= floor, "attempt {}: {:?} < {:?}", attempt, delay, floor);
                assert!(delay <= floor + Duration::from_millis(MAX_JITTER_MS));
            }
        }
    }

    #[test]
    fn test_delay_is_capped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_millis(2000));
        assert_eq!(policy.backoff(3), Duration::from_millis(8000));
        assert_eq!(policy.backoff(4), Duration::from_millis(10_000));
        assert_eq!(policy.backoff(40), Duration::from_millis(10_000));

        let delay = policy.compute_delay(40);
        assert!(delay >= Duration::from_millis(10_000));
        assert!(delay <= Duration::from_millis(10_000 + MAX_JITTER_MS));
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_k_failures() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(5, Duration::from_millis(10), Duration::from_millis(100));

        let result: Result<&str, String> = retry(&policy, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 3 {
                    Err(format!("failure {}", n))
                } else {
                    Ok("done")
                }
            }
        })
        .await;

        assert_eq!(result, Ok("done"));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_exhaustion_returns_last_error() {
        let calls = AtomicU32::new(0);

        let result: Result<(), String> = retry(&RetryPolicy::default(), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move { Err(format!("failure {}", n)) }
        })
        .await;

        assert_eq!(result, Err("failure 2".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_failure_is_not_retried() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(10, Duration::from_millis(10), Duration::from_millis(100));

        let result: Result<(), String> = retry_if(
            &policy,
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err("transient".to_string())
                    } else {
                        Err("permanent".to_string())
                    }
                }
            },
            |err: &String| err == "transient",
        )
        .await;

        assert_eq!(result, Err("permanent".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_first_success_makes_one_call() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> = retry(&RetryPolicy::default(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(7) }
        })
        .await;

        tokio_test::assert_ok!(&result);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
