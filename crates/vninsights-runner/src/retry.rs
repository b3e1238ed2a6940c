//! Bounded retry with exponential backoff and a per-attempt timeout.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::FetchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero behaves as one.
    pub attempts: u32,
    /// Delay before the second attempt; doubles each time after that.
    pub base_delay: Duration,
    /// Limit for each single attempt.
    pub timeout: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, base_delay: Duration, timeout: Duration) -> Self {
        Self {
            attempts,
            base_delay,
            timeout,
        }
    }

    /// Delay after failed attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    /// Run `op` until it succeeds or the attempts are used up.
    ///
    /// Returns the last error when every attempt failed.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T, FetchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let attempts = self.attempts.max(1);
        let mut attempt = 1;
        loop {
            let result = match tokio::time::timeout(self.timeout, op()).await {
                Ok(result) => result,
                Err(_) => Err(FetchError::Timeout(self.timeout)),
            };
            match result {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= attempts => return Err(e),
                Err(e) => {
                    let delay = self.delay_after(attempt);
                    warn!(
                        what,
                        attempt,
                        attempts,
                        retry_in_ms = delay.as_millis() as u64,
                        error = %e,
                        "attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn quick(attempts: u32) -> RetryPolicy {
        RetryPolicy::new(attempts, Duration::from_millis(1), Duration::from_millis(200))
    }

    #[test]
    fn delay_doubles() {
        let policy = RetryPolicy::new(3, Duration::from_secs(2), Duration::from_secs(60));
        assert_eq!(policy.delay_after(1), Duration::from_secs(2));
        assert_eq!(policy.delay_after(2), Duration::from_secs(4));
        assert_eq!(policy.delay_after(3), Duration::from_secs(8));
    }

    #[test]
    fn huge_attempt_numbers_saturate() {
        let policy = RetryPolicy::new(3, Duration::from_secs(2), Duration::from_secs(60));
        assert!(policy.delay_after(200) >= Duration::from_secs(2));
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = &AtomicU32::new(0);
        let result = quick(3)
            .run("test", move || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(FetchError::Upstream("flaky".into()))
                } else {
                    Ok(42)
                }
            })
            .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_last_attempt() {
        let calls = &AtomicU32::new(0);
        let result: Result<(), _> = quick(3)
            .run("test", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(FetchError::Upstream("down".into()))
            })
            .await;
        assert!(matches!(result, Err(FetchError::Upstream(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn slow_attempt_times_out() {
        let policy = RetryPolicy::new(1, Duration::from_millis(1), Duration::from_millis(20));
        let result: Result<(), _> = policy
            .run("test", || async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(FetchError::Timeout(_))));
    }

    #[tokio::test]
    async fn zero_attempts_still_tries_once() {
        let calls = &AtomicU32::new(0);
        let result = quick(0)
            .run("test", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok("done")
            })
            .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
