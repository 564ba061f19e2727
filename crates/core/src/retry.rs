//! Retry logic with exponential backoff

use crate::error::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Configuration for retry behavior
///
/// The default is six retries five seconds apart, enough to ride out the
/// delay between creating a fork and the fork accepting ref writes.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Growth factor applied to the delay after each retry
    pub multiplier: u32,
    /// Random extra delay as a fraction of the current delay (0.0 to 1.0)
    pub jitter: f32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 6,
            initial_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(5),
            multiplier: 1,
            jitter: 0.0,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            multiplier: 1,
            jitter: 0.0,
        }
    }

    /// Exponential backoff starting at `initial_delay`, doubling up to `max_delay`.
    #[must_use]
    pub const fn exponential(max_retries: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            initial_delay,
            max_delay,
            multiplier: 2,
            jitter: 0.0,
        }
    }

    /// Sets the jitter fraction.
    #[must_use]
    pub fn with_jitter(mut self, jitter: f32) -> Self {
        self.jitter = jitter.clamp(0.0, 1.0);
        self
    }

    /// Delay to wait before retry number `retry` (0-based), without jitter.
    #[must_use]
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = self.multiplier.max(1).saturating_pow(retry);
        let delay = self.initial_delay.saturating_mul(factor);
        delay.min(self.max_delay.max(self.initial_delay))
    }

    fn jittered(&self, delay: Duration) -> Duration {
        if self.jitter <= 0.0 {
            return delay;
        }
        let extra: f32 = rand::random::<f32>() * self.jitter;
        delay + delay.mul_f32(extra)
    }
}

/// Execute an async operation with retry logic
///
/// The wait between attempts ends early with [`Error::Cancelled`] when
/// `cancel` fires.
///
/// # Errors
///
/// Returns the last error if all retry attempts fail
pub async fn retry<T, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut retries = 0;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if retries >= policy.max_retries => return Err(e),
            Err(e) => {
                let delay = policy.jittered(policy.delay_for(retries));
                retries += 1;
                tracing::warn!(
                    "Operation failed (attempt {}/{}): {}. Retrying in {:?}",
                    retries,
                    policy.max_retries + 1,
                    e,
                    delay
                );

                tokio::select! {
                    () = cancel.cancelled() => return Err(Error::Cancelled),
                    () = tokio::time::sleep(delay) => {}
                }
            }
        }
    }
}
