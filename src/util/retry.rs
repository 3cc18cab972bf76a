//! Retry with exponential backoff and jitter.

use std::future::Future;
use std::time::Duration;

use crate::error::BridgeError;

/// Retry policy for transient catalog failures.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(5),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no backoff.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Execute an async operation, retrying only [`BridgeError::is_retryable`] failures.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T, BridgeError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, BridgeError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut backoff = self.initial_backoff;
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_retryable() || attempt >= max_attempts => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        attempt,
                        max_attempts,
                        error = %e,
                        "Retrying after transient error"
                    );

                    // Jitter: 75%-125% of backoff
                    let jitter_factor = 0.75 + (rand_factor() * 0.5);
                    tokio::time::sleep(Duration::from_secs_f64(
                        backoff.as_secs_f64() * jitter_factor,
                    ))
                    .await;

                    backoff = Duration::from_secs_f64(
                        (backoff.as_secs_f64() * self.multiplier)
                            .min(self.max_backoff.as_secs_f64()),
                    );
                    attempt += 1;
                }
            }
        }
    }
}

/// Pseudo-random factor in [0, 1) without pulling in rand.
fn rand_factor() -> f64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos()
        .hash(&mut hasher);
    std::thread::current().id().hash(&mut hasher);

    (hasher.finish() % 10000) as f64 / 10000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast() -> RetryPolicy {
        RetryPolicy {
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(2),
            ..RetryPolicy::default()
        }
    }

    #[tokio::test]
    async fn retries_transient_errors_up_to_limit() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = fast()
            .execute(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(BridgeError::RemoteUnavailable("reset".into()))
            })
            .await;
        assert!(matches!(result, Err(BridgeError::RemoteUnavailable(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_rejections() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = fast()
            .execute(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(BridgeError::RemoteRejected {
                    status: 500,
                    body: serde_json::Value::Null,
                })
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn recovers_after_transient_failure() {
        let calls = AtomicU32::new(0);
        let result = fast()
            .execute(|| async {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(BridgeError::RemoteUnavailable("timeout".into()))
                } else {
                    Ok(7)
                }
            })
            .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
