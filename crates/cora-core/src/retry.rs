//! Bounded retry for remote provider calls

use std::future::Future;

use tokio::time::{sleep, timeout};
use tracing::warn;

use crate::{Error, Result, RetryConfig};

/// Run `call` until it succeeds, fails with a non-transient error, or the
/// retry budget is spent.
///
/// Each attempt is bounded by `config.attempt_timeout`; a timed-out attempt
/// counts as transient. When the budget is exhausted the last transient error
/// is converted into a final [`Error::Provider`].
pub async fn with_retry<T, F, Fut>(
    config: &RetryConfig,
    provider: &str,
    operation: &str,
    mut call: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;

    loop {
        attempt += 1;

        let outcome = match timeout(config.attempt_timeout, call()).await {
            Ok(result) => result,
            Err(_) => Err(Error::transient(
                provider,
                format!("{} timed out after {:?}", operation, config.attempt_timeout),
            )),
        };

        match outcome {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < config.max_attempts() => {
                warn!(provider, operation, attempt, error = %e, "remote call failed, retrying");
                sleep(config.backoff * attempt).await;
            }
            Err(Error::Transient { provider, message }) => {
                return Err(Error::Provider {
                    provider,
                    message: format!("{} failed after {} attempts: {}", operation, attempt, message),
                });
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn fast_config() -> RetryConfig {
        RetryConfig {
            max_retries: 2,
            attempt_timeout: Duration::from_millis(200),
            backoff: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn test_retries_transient_until_success() {
        let calls = AtomicU32::new(0);
        let result = with_retry(&fast_config(), "fake", "embed", || async {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n < 3 {
                Err(Error::transient("fake", "503"))
            } else {
                Ok(n)
            }
        })
        .await
        .unwrap();

        assert_eq!(result, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_budget_exhaustion_becomes_provider_error() {
        let calls = AtomicU32::new(0);
        let err = with_retry(&fast_config(), "fake", "generate", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(Error::transient("fake", "connection reset"))
        })
        .await
        .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match err {
            Error::Provider { provider, message } => {
                assert_eq!(provider, "fake");
                assert!(message.contains("after 3 attempts"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_transient_is_not_retried() {
        let calls = AtomicU32::new(0);
        let err = with_retry(&fast_config(), "fake", "embed", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(Error::Authentication("401 Unauthorized".to_string()))
        })
        .await
        .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_timeout_counts_as_transient() {
        let config = RetryConfig {
            max_retries: 1,
            attempt_timeout: Duration::from_millis(10),
            backoff: Duration::ZERO,
        };
        let calls = AtomicU32::new(0);
        let err = with_retry(&config, "fake", "generate", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await
        .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(err.to_string().contains("timed out"));
    }
}
