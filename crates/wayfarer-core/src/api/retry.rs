use std::future::Future;
use std::time::Duration;

use tracing::warn;

use super::ApiError;

/// Additional attempts after the first one fails.
pub const MAX_RETRIES: u32 = 3;

/// Bounded retry loop around one logical call.
///
/// Each attempt fully settles before the next starts. Errors that
/// [`ApiError::is_retryable`] rejects (timeouts, aborts, duplicates)
/// propagate on the spot; anything else is retried until the bound
/// is reached, after which the last error is returned unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            backoff: Duration::ZERO,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// Single attempt, never retried.
    pub fn none() -> Self {
        Self::new(0)
    }

    /// Wait `backoff` before the first retry, doubling for each one after.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Run `attempt` until it succeeds, fails with a non-retryable error, or
    /// has been tried `1 + max_retries` times. The closure receives the
    /// zero-based attempt number.
    pub async fn run<T, F, Fut>(&self, mut attempt: F) -> Result<T, ApiError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let mut retries = 0;
        let mut backoff = self.backoff;

        loop {
            match attempt(retries).await {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_retryable() || retries >= self.max_retries => return Err(err),
                Err(err) => {
                    retries += 1;
                    warn!(retry = retries, error = %err, "Request failed, retrying");
                    if !backoff.is_zero() {
                        tokio::time::sleep(backoff).await;
                        backoff *= 2;
                    }
                }
            }
        }
    }
}
