//! Single-shot retry for rate-limited calls.
//!
//! A 429 carrying `Retry-After` is retried exactly once after waiting the
//! advertised delay. Any other failure, including a 429 without the header,
//! is returned unchanged.

use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::error::Result;

/// Parses a `Retry-After` header value as seconds.
///
/// Only non-negative numeric values are accepted; HTTP dates are ignored.
#[must_use]
pub fn retry_after_wait_seconds(value: &str) -> Option<f64> {
    let seconds: f64 = value.trim().parse().ok()?;
    (seconds.is_finite() && seconds >= 0.0).then_some(seconds)
}

/// Parses a `Retry-After` header value as a [`Duration`].
///
/// Values too large for a [`Duration`] are treated as absent.
#[must_use]
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    retry_after_wait_seconds(value).and_then(|seconds| Duration::try_from_secs_f64(seconds).ok())
}

/// Runs `op`, retrying once when it is rate limited with a `Retry-After`.
///
/// # Errors
///
/// Returns the error of the last attempt.
pub async fn invoke_with_retry_after<T, F, Fut>(op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    invoke_with_retry_after_using(op, tokio::time::sleep).await
}

/// Same as [`invoke_with_retry_after`] with an injectable sleep.
///
/// # Errors
///
/// Returns the error of the last attempt.
pub async fn invoke_with_retry_after_using<T, F, Fut, S, SFut>(mut op: F, sleep: S) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    S: FnOnce(Duration) -> SFut,
    SFut: Future<Output = ()>,
{
    match op().await {
        Err(err) if err.is_retryable() => {
            let delay = err.retry_delay().unwrap_or_default();
            warn!("Rate limited, retrying once in {:.1}s", delay.as_secs_f64());
            sleep(delay).await;
            op().await
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{SpaceOdtError, WebexError};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn rate_limited(retry_after: Option<Duration>) -> SpaceOdtError {
        SpaceOdtError::from(WebexError::RateLimited { retry_after })
    }

    #[test]
    fn test_retry_after_wait_seconds() {
        assert_eq!(retry_after_wait_seconds("5"), Some(5.0));
        assert_eq!(retry_after_wait_seconds(" 1.5 "), Some(1.5));
        assert_eq!(retry_after_wait_seconds("-1"), None);
        assert_eq!(retry_after_wait_seconds("Wed, 21 Oct 2015 07:28:00 GMT"), None);
        assert_eq!(retry_after_wait_seconds(""), None);
    }

    #[test]
    fn test_parse_retry_after_rejects_overflow() {
        assert_eq!(parse_retry_after("2.5"), Some(Duration::from_millis(2500)));
        assert_eq!(parse_retry_after("1e300"), None);
        assert_eq!(parse_retry_after("abc"), None);
    }

    #[tokio::test]
    async fn test_retries_once_after_advertised_delay() {
        let calls = AtomicUsize::new(0);
        let slept = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&slept);

        let result = invoke_with_retry_after_using(
            || {
                let attempt = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt == 0 {
                        Err(rate_limited(Some(Duration::from_secs(2))))
                    } else {
                        Ok("ok")
                    }
                }
            },
            move |delay| {
                recorder.lock().expect("lock").push(delay);
                std::future::ready(())
            },
        )
        .await
        .expect("second attempt succeeds");

        assert_eq!(result, "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(*slept.lock().expect("lock"), vec![Duration::from_secs(2)]);
    }

    #[tokio::test]
    async fn test_second_failure_is_returned() {
        let calls = AtomicUsize::new(0);
        let err = invoke_with_retry_after_using(
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(rate_limited(Some(Duration::from_millis(1)))) }
            },
            |_| std::future::ready(()),
        )
        .await
        .expect_err("still rate limited");

        assert!(err.is_retryable());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_no_retry_without_header() {
        let calls = AtomicUsize::new(0);
        let slept = AtomicUsize::new(0);
        let err = invoke_with_retry_after_using(
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(rate_limited(None)) }
            },
            |_| {
                slept.fetch_add(1, Ordering::SeqCst);
                std::future::ready(())
            },
        )
        .await
        .expect_err("no retry");

        assert_eq!(err.http_status(), Some(429));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(slept.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_other_errors_propagate() {
        let calls = AtomicUsize::new(0);
        let err = invoke_with_retry_after(|| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(SpaceOdtError::from(WebexError::api_error(500, "boom"))) }
        })
        .await
        .expect_err("propagates");

        assert_eq!(err.http_status(), Some(500));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
