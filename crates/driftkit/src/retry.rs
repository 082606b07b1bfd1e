//! Bounded retry for transient provider failures.
//!
//! Only the live fetch goes through here. Parsing the declared sources is
//! deterministic, so retrying it would only repeat the same failure.

use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use crate::logger::Logger;
use crate::types::RetryConfig;
use std::future::Future;

/// Callback trait for retry progress notifications.
pub trait RetryCallback: Send + Sync {
    /// Called when an operation is being retried.
    ///
    /// # Arguments
    /// * `attempt` - Attempt that just failed (1-indexed)
    /// * `max_attempts` - Maximum number of attempts
    /// * `error` - The error that triggered the retry
    /// * `delay_secs` - Seconds until next attempt
    fn on_retry(&self, attempt: u32, max_attempts: u32, error: &Error, delay_secs: u64);
}

/// No-op callback that does nothing.
pub struct NoCallback;

impl RetryCallback for NoCallback {
    fn on_retry(&self, _attempt: u32, _max_attempts: u32, _error: &Error, _delay_secs: u64) {}
}

/// Callback that reports retries through a [`Logger`].
pub struct LogCallback(pub Logger);

impl RetryCallback for LogCallback {
    fn on_retry(&self, attempt: u32, max_attempts: u32, error: &Error, delay_secs: u64) {
        self.0.warn(format_args!(
            "Attempt {attempt}/{max_attempts} failed: {error}. Retrying in {delay_secs}s..."
        ));
    }
}

/// Execute an operation with retry logic.
///
/// Retryable errors are retried up to `config.max_attempts` times in total,
/// sleeping between attempts. The first success returns immediately. A
/// non-retryable error is returned as is. Cancellation during an attempt or
/// a sleep ends the retry with [`Error::Cancelled`].
pub async fn with_retry<T, F, Fut>(
    config: &RetryConfig,
    callback: Option<&dyn RetryCallback>,
    cancel: &CancelToken,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(Error::Cancelled),
            outcome = operation() => outcome,
        };
        let err = match outcome {
            Ok(result) => return Ok(result),
            Err(e) => e,
        };

        if !err.is_retryable() || attempt + 1 >= max_attempts {
            return Err(err);
        }

        let delay = config.delay_for_attempt(attempt);
        if let Some(cb) = callback {
            cb.on_retry(attempt + 1, max_attempts, &err, delay.as_secs());
        }

        tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(Error::Cancelled),
            () = tokio::time::sleep(delay) => {}
        }

        attempt += 1;
    }
}
