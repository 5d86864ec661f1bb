// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared retry helper with exponential backoff.
//!
//! Only transient failures are retried; the classification lives on the
//! error type via [`Retryable`], never on message text. Waits between
//! attempts race against the caller's cancellation token.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// An error that can say whether retrying might help.
pub trait Retryable {
    /// True for network-level timeouts, temporary failures, and
    /// deadline-exceeded conditions.
    fn is_transient(&self) -> bool;
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt; total attempts = max_retries + 1.
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Error)]
pub enum RetryError<E> {
    #[error("operation cancelled")]
    Cancelled,
    #[error(transparent)]
    Inner(E),
}

/// Run `op` up to `max_retries + 1` times, doubling the backoff between
/// attempts from `initial_backoff` up to `max_backoff`.
///
/// Non-transient errors return immediately. If the token is cancelled
/// while waiting, the helper returns [`RetryError::Cancelled`].
pub async fn with_retry<T, E, F, Fut>(
    cancel: &CancellationToken,
    cfg: &RetryConfig,
    mut op: F,
) -> Result<T, RetryError<E>>
where
    E: Retryable,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut backoff = cfg.initial_backoff;
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !err.is_transient() || attempt >= cfg.max_retries {
                    return Err(RetryError::Inner(err));
                }
                tokio::select! {
                    _ = cancel.cancelled() => return Err(RetryError::Cancelled),
                    _ = tokio::time::sleep(backoff) => {}
                }
                backoff = (backoff * 2).min(cfg.max_backoff);
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
