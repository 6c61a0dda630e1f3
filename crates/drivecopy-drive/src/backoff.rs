//! Exponential backoff around remote calls
//!
//! Every Drive request goes through [`BackoffExecutor::execute`]. Transient
//! failures (see [`DriveError::is_transient`]) are retried after
//! `base * 2^n` plus a random jitter, where `n` is the 0-indexed attempt that
//! just failed. Other errors propagate at once. When the attempt bound is
//! reached the executor fails with [`DriveError::RetriesExhausted`].

use std::future::Future;
use std::time::Duration;

use drivecopy_core::config::BackoffConfig;
use rand::Rng;
use tracing::{debug, warn};

use crate::DriveError;

/// Default number of attempts per call
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Retry policy for transient Drive failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffExecutor {
    max_attempts: u32,
    base_delay: Duration,
    max_jitter: Duration,
}

impl Default for BackoffExecutor {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_secs(1),
            max_jitter: Duration::from_millis(1000),
        }
    }
}

impl BackoffExecutor {
    pub fn new(max_attempts: u32, base_delay: Duration, max_jitter: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_jitter,
        }
    }

    /// Builds the policy from the `backoff` config section
    pub fn from_config(config: &BackoffConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.base_delay_ms),
            Duration::from_millis(config.max_jitter_ms),
        )
    }

    /// Policy without any delay, for tests against local servers
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO, Duration::ZERO)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay after the failed attempt `attempt` (0-indexed), without jitter
    pub fn base_delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(1u32 << attempt.min(16))
    }

    fn jitter(&self) -> Duration {
        let ceiling = self.max_jitter.as_millis() as u64;
        if ceiling == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..ceiling))
    }

    /// Runs `call` until it succeeds, fails permanently, or the bound is hit
    ///
    /// `call` is invoked once per attempt and must build a fresh request each
    /// time.
    pub async fn execute<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, DriveError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DriveError>>,
    {
        let mut attempt = 0;
        loop {
            let error = match call().await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(operation, attempt, "Request succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if e.is_transient() => e,
                Err(e) => return Err(e),
            };

            let delay = self.base_delay_for(attempt) + self.jitter();
            warn!(
                operation,
                attempt = attempt + 1,
                max_attempts = self.max_attempts,
                status = ?error.status(),
                delay_ms = delay.as_millis() as u64,
                "Transient failure, backing off"
            );
            tokio::time::sleep(delay).await;

            attempt += 1;
            if attempt >= self.max_attempts {
                warn!(operation, attempts = attempt, "Retry limit exhausted");
                return Err(DriveError::RetriesExhausted {
                    operation: operation.to_string(),
                    attempts: attempt,
                    last: Box::new(error),
                });
            }
        }
    }
}
