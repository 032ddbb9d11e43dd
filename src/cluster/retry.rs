//! Retry engine (spec §4.6.3): classify, wait, recurse, or surface a
//! `MultipleErrors` summarizing every attempt.

use std::future::Future;
use std::time::Duration;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub retries: u32,
    pub retry_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { retries: 5, retry_delay: Duration::from_millis(300) }
    }
}

/// Runs `attempt` until it succeeds, exhausts `config.retries`, or a
/// non-retriable error is returned. `should_skip_retry` lets a caller opt a
/// normally-retriable error out (e.g. a caller-initiated cancellation).
pub async fn perform_with_retry<T, F, Fut>(
    op_name: &str,
    config: &RetryConfig,
    should_skip_retry: impl Fn(&Error) -> bool,
    mut attempt: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut errors: Vec<Error> = Vec::new();
    loop {
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                let retriable = error.is_retriable() && !should_skip_retry(&error);
                let attempts_so_far = errors.len() as u32;
                errors.push(error);
                if retriable && attempts_so_far < config.retries {
                    tokio::time::sleep(config.retry_delay).await;
                    continue;
                }
                if errors.len() == 1 {
                    return Err(errors.pop().unwrap());
                }
                return Err(Error::multiple(format!("{op_name} failed {} times", errors.len()), errors));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_without_retry() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig { retries: 3, retry_delay: Duration::from_millis(1) };
        let result: Result<i32> = perform_with_retry("op", &config, |_| false, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(42)
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_network_errors_then_succeeds() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig { retries: 3, retry_delay: Duration::from_millis(1) };
        let result: Result<i32> = perform_with_retry("op", &config, |_| false, || async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(Error::network("flaky"))
            } else {
                Ok(7)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retriable_surfaces_single_error() {
        let config = RetryConfig { retries: 3, retry_delay: Duration::from_millis(1) };
        let result: Result<i32> = perform_with_retry("op", &config, |_| false, || async {
            Err(Error::User("bad args".to_string()))
        })
        .await;
        assert!(matches!(result, Err(Error::User(_))));
    }

    #[tokio::test]
    async fn exhausted_retries_surface_multiple() {
        let config = RetryConfig { retries: 2, retry_delay: Duration::from_millis(1) };
        let result: Result<i32> = perform_with_retry("produce", &config, |_| false, || async {
            Err(Error::network("down"))
        })
        .await;
        match result {
            Err(Error::Multiple { message, errors }) => {
                assert_eq!(errors.len(), 3); // initial attempt + 2 retries
                assert!(message.contains("produce failed 3 times"));
            }
            other => panic!("expected Multiple, got {other:?}"),
        }
    }
}
