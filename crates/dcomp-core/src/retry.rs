//! Bounded retry of transient coordination-store failures.
use std::{future::Future, time::Duration};

use rand::Rng;
use tracing::{debug, error};

use dcomp_model::{BackoffStrategy, JitterStrategy};

use crate::error::QueueError;

/// How many times a transient error is retried and how long to wait between tries.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    pub backoff: BackoffStrategy,
    /// Total attempts including the first one. Zero is treated as one.
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            backoff: BackoffStrategy::default(),
            max_attempts: 3,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (zero-based) with jitter applied.
    pub fn delay(&self, attempt: u32) -> Duration {
        let base = self.backoff.base_delay(attempt);
        let base_ms = u64::try_from(base.as_millis()).unwrap_or(u64::MAX);
        if base_ms == 0 {
            return base;
        }
        let ms = match self.backoff.jitter {
            JitterStrategy::None => base_ms,
            JitterStrategy::Full => rand::thread_rng().gen_range(0..=base_ms),
            JitterStrategy::Equal => {
                let half = base_ms / 2;
                half + rand::thread_rng().gen_range(0..=base_ms - half)
            }
        };
        Duration::from_millis(ms)
    }
}

/// Run `f` until it succeeds, fails with a non-retryable error, or attempts run out.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    op: &'static str,
    mut f: F,
) -> Result<T, QueueError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, QueueError>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        match f().await {
            Ok(v) => return Ok(v),
            Err(e) if e.is_retryable() && attempt + 1 < attempts => {
                let delay = policy.delay(attempt);
                debug!(op, attempt, delay_ms = delay.as_millis() as u64, error = %e, "retrying store operation");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                if e.is_retryable() {
                    error!(op, attempts, error = %e, "store operation failed after retries");
                }
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use dcomp_model::ModelError;

    use super::*;
    use crate::error::StoreError;

    fn fast(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            backoff: BackoffStrategy {
                jitter: JitterStrategy::None,
                first_ms: 1,
                max_ms: 2,
                factor: 2.0,
            },
            max_attempts,
        }
    }

    #[tokio::test]
    async fn retries_transient_until_success() {
        let calls = AtomicU32::new(0);
        let out = retry_with_backoff(&fast(5), "test", || async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(QueueError::Store(StoreError::Unavailable("down".into())))
            } else {
                Ok(n)
            }
        })
        .await
        .unwrap();
        assert_eq!(out, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let err = retry_with_backoff(&fast(3), "test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(QueueError::Store(StoreError::Timeout {
                op: "get",
                after_ms: 1,
            }))
        })
        .await
        .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_task_errors() {
        let calls = AtomicU32::new(0);
        let err = retry_with_backoff(&fast(5), "test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(QueueError::InvalidTask(ModelError::UnknownQueue("x".into())))
        })
        .await
        .unwrap_err();
        assert!(matches!(err, QueueError::InvalidTask(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn jitter_stays_within_base() {
        let mut p = fast(1);
        p.backoff.first_ms = 100;
        p.backoff.max_ms = 100;
        p.backoff.jitter = JitterStrategy::Equal;
        for _ in 0..100 {
            let d = p.delay(0).as_millis();
            assert!((50..=100).contains(&d), "{d}");
        }
        p.backoff.jitter = JitterStrategy::Full;
        for _ in 0..100 {
            assert!(p.delay(0).as_millis() <= 100);
        }
    }
}
