//! Retry decorator for fallible async operations.
//!
//! Two flavours: the crawler retries immediately, payload-probing callers
//! wait `base * 2^attempt` between attempts. Either way the operation runs
//! at most `max_retries + 1` times and the last error is returned.

use std::future::Future;
use std::time::Duration;

use log::debug;
use tokio::time::sleep;

const DEFAULT_BACKOFF_BASE: Duration = Duration::from_secs(1);
// 2^16 seconds is already far beyond any sensible wait.
const MAX_BACKOFF_EXPONENT: u32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    None,
    Exponential { base: Duration },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    backoff: Backoff,
}

impl RetryPolicy {
    /// Retries immediately, with no delay between attempts.
    pub fn fixed(max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff: Backoff::None,
        }
    }

    /// Waits `2^attempt` seconds before each retry.
    pub fn exponential(max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff: Backoff::Exponential {
                base: DEFAULT_BACKOFF_BASE,
            },
        }
    }

    /// Replaces the backoff base. No effect on a fixed policy.
    pub fn with_base(mut self, base: Duration) -> Self {
        if let Backoff::Exponential { .. } = self.backoff {
            self.backoff = Backoff::Exponential { base };
        }
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn backoff(&self) -> Backoff {
        self.backoff
    }

    /// Delay applied after failed attempt number `attempt` (0-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::None => Duration::ZERO,
            Backoff::Exponential { base } => {
                base.saturating_mul(1u32 << attempt.min(MAX_BACKOFF_EXPONENT))
            }
        }
    }

    /// Runs `op` until it succeeds or the retry budget is spent.
    pub async fn run<T, E, F, Fut>(&self, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= self.max_retries => return Err(e),
                Err(e) => {
                    let delay = self.delay_for(attempt);
                    debug!(
                        "Attempt {}/{} failed: {}; retrying in {:?}",
                        attempt + 1,
                        self.max_retries + 1,
                        e,
                        delay
                    );
                    if !delay.is_zero() {
                        sleep(delay).await;
                    }
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Instant;

    #[tokio::test]
    async fn test_succeeds_without_retry() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> = RetryPolicy::fixed(3)
            .run(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(7)
            })
            .await;

        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhausts_budget_and_returns_last_error() {
        let calls = AtomicU32::new(0);
        let result: Result<(), String> = RetryPolicy::fixed(3)
            .run(|| async {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                Err(format!("failure {}", n))
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(result, Err("failure 3".to_string()));
    }

    #[tokio::test]
    async fn test_zero_retries_runs_once() {
        let calls = AtomicU32::new(0);
        let result: Result<(), &str> = RetryPolicy::fixed(0)
            .run(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("nope")
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result: Result<&str, &str> = RetryPolicy::fixed(5)
            .run(|| async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err("flaky")
                } else {
                    Ok("page")
                }
            })
            .await;

        assert_eq!(result, Ok("page"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_backoff_delays_double() {
        let policy = RetryPolicy::exponential(4);
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(3), Duration::from_secs(8));
        assert_eq!(RetryPolicy::fixed(4).delay_for(3), Duration::ZERO);
    }

    #[test]
    fn test_with_base_only_changes_exponential() {
        let fixed = RetryPolicy::fixed(2).with_base(Duration::from_millis(5));
        assert_eq!(fixed.backoff(), Backoff::None);

        let expo = RetryPolicy::exponential(2).with_base(Duration::from_millis(5));
        assert_eq!(expo.delay_for(2), Duration::from_millis(20));
    }

    #[tokio::test]
    async fn test_exponential_waits_between_attempts() {
        let policy = RetryPolicy::exponential(2).with_base(Duration::from_millis(10));
        let start = Instant::now();
        let result: Result<(), &str> = policy.run(|| async { Err("down") }).await;

        assert!(result.is_err());
        // 10ms + 20ms of backoff
        assert!(start.elapsed() >= Duration::from_millis(30));
    }
}
