//! Retry logic with fixed backoff for the byte transfer step
//!
//! A transfer attempt is retried after any failure except cancellation. The delay between
//! attempts is constant and no delay follows the final attempt. The process-wide
//! [`CancellationToken`] is observed before every attempt and while sleeping.
//!
//! # Example
//!
//! ```no_run
//! use favlist_syncer::config::RetryConfig;
//! use favlist_syncer::error::Error;
//! use favlist_syncer::retry::transfer_with_retry;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Error> {
//! let config = RetryConfig::default();
//! let cancel = CancellationToken::new();
//! let bytes = transfer_with_retry(&config, &cancel, |attempt| async move {
//!     // Perform one transfer here
//!     Ok::<u64, Error>(attempt as u64)
//! })
//! .await?;
//! # Ok(())
//! # }
//! ```

use crate::config::RetryConfig;
use crate::error::{DownloadError, Error, Result};
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Trait for errors that can be classified as retryable or not
pub trait IsRetryable {
    /// Returns true if another attempt may succeed
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        // Any transfer failure gets another attempt; cancellation must stop immediately
        !matches!(self, Error::Cancelled | Error::ShuttingDown)
    }
}

/// Run `operation` up to `config.max_attempts` times with a fixed delay between attempts
///
/// The closure receives the 1-based attempt number. Returns the first success,
/// [`Error::Cancelled`] as soon as cancellation is observed, a non-retryable error unchanged,
/// or [`DownloadError::RetriesExhausted`] carrying the final attempt's error text.
pub async fn transfer_with_retry<F, Fut, T>(
    config: &RetryConfig,
    cancel: &CancellationToken,
    mut operation: F,
) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut last_error = String::new();

    for attempt in 1..=max_attempts {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        match operation(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(attempt, "transfer succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) if !e.is_retryable() => return Err(e),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    attempt,
                    max_attempts,
                    "transfer attempt failed"
                );
                last_error = e.to_string();

                if attempt < max_attempts {
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(Error::Cancelled),
                        _ = tokio::time::sleep(config.backoff) => {}
                    }
                }
            }
        }
    }

    Err(DownloadError::RetriesExhausted {
        attempts: max_attempts,
        last_error,
    }
    .into())
}
