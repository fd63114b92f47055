//! Cancellable retry with linear backoff.

use crate::config;
use crate::error::{AuctionError, Result};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub attempts: u32,
    /// Delay after the n-th failure is `n * base_delay`.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: config::RETRY_ATTEMPTS,
            base_delay: config::RETRY_BASE_DELAY,
        }
    }
}

/// Shared flag that stops pending and future attempts once set.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Run `op` until it succeeds or the attempt budget is spent.
///
/// The token is checked before every attempt. An
/// [`AuctionError::QuotaExhausted`] result trips the token and returns
/// immediately, so other operations sharing the token stop as well.
pub async fn retry<T, F, Fut>(policy: &RetryPolicy, token: &CancelToken, mut op: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.attempts.max(1);
    let mut attempt = 0;

    loop {
        if token.is_cancelled() {
            return Err(AuctionError::Cancelled);
        }
        attempt += 1;

        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(AuctionError::QuotaExhausted) => {
                token.cancel();
                return Err(AuctionError::QuotaExhausted);
            }
            Err(err) if attempt >= max_attempts => return Err(err),
            Err(err) => {
                warn!(attempt, max_attempts, error = %err, "Request failed, retrying");
                tokio::time::sleep(policy.base_delay * attempt).await;
            }
        }
    }
}
