//! Retry with exponential backoff for idempotent remote calls.
//!
//! The delay after failed attempt `n` (0-based) is `base_delay * 2^n` plus a
//! random jitter in `[0, base_delay)`. Only errors that report themselves as
//! retryable are retried; everything else, rate limits included, surfaces to
//! the caller immediately.

use std::future::Future;
use std::time::Duration;

use log::{debug, warn};
use rand::Rng;

use crate::error::Result;

/// Default number of attempts (including the first).
pub const DEFAULT_ATTEMPTS: u32 = 3;
/// Default base delay between attempts.
pub const DEFAULT_BASE_DELAY_MS: u64 = 500;

/// Maximum exponent, keeps the backoff bounded for misconfigured attempt counts.
const MAX_BACKOFF_EXPONENT: u32 = 10;

/// How many times to try and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    /// Create a policy. At least one attempt is always made.
    pub fn new(attempts: u32, base_delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            base_delay,
        }
    }

    /// Backoff before the next attempt, without jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.pow(attempt.min(MAX_BACKOFF_EXPONENT))
    }

    /// Backoff plus uniform jitter in `[0, base_delay)`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as u64;
        let jitter = if base_ms == 0 {
            0
        } else {
            rand::rng().random_range(0..base_ms)
        };
        self.backoff(attempt) + Duration::from_millis(jitter)
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the policy
/// runs out of attempts. The last error is returned.
pub async fn retry<T, F, Fut>(policy: &RetryPolicy, operation: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => {
                if attempt > 0 {
                    debug!("{} succeeded after {} retries", operation, attempt);
                }
                return Ok(value);
            }
            Err(e) if e.is_retryable() && attempt + 1 < attempts => {
                let delay = policy.delay_for(attempt);
                warn!(
                    "{} failed (attempt {}/{}): {}; retrying in {}ms",
                    operation,
                    attempt + 1,
                    attempts,
                    e,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
