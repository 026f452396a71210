//! Bounded exponential backoff
//!
//! Wraps provider calls (session opening and page fetches). Per-record
//! processing is never retried.

use crate::config::RetryConfig;
use crate::domain::Result;
use crate::log_retry_attempt;
use std::future::Future;
use std::time::Duration;

/// Retry policy with exponential backoff
///
/// The wait before retry `n` (0-based) is `base_delay * multiplier^n`, capped
/// at `max_delay`. An operation runs at most `1 + max_retries` times.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_retries: usize,
    base_delay: Duration,
    multiplier: f64,
    max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: usize, base_delay: Duration, multiplier: f64, max_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            multiplier,
            max_delay,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_retries,
            Duration::from_millis(config.initial_delay_ms),
            config.backoff_multiplier,
            Duration::from_millis(config.max_delay_ms),
        )
    }

    /// Policy that fails on the first error
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO, 1.0, Duration::ZERO)
    }

    pub fn max_retries(&self) -> usize {
        self.max_retries
    }

    /// Delay before the retry following failed attempt `attempt` (0-based)
    pub fn delay_for(&self, attempt: usize) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let factor = self.multiplier.powi(exponent);
        let delay_ms = self.base_delay.as_millis() as f64 * factor;
        let cap_ms = self.max_delay.as_millis() as f64;
        if !delay_ms.is_finite() || delay_ms >= cap_ms {
            self.max_delay
        } else {
            Duration::from_millis(delay_ms as u64)
        }
    }

    /// Runs `operation` until it succeeds, fails with a non-retryable error,
    /// or the retries are exhausted; the last error is returned.
    pub async fn run<F, Fut, T>(&self, operation_name: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if attempt >= self.max_retries || !e.is_retryable() {
                        return Err(e);
                    }

                    let delay = self.delay_for(attempt);
                    log_retry_attempt!(
                        operation_name,
                        attempt + 1,
                        self.max_retries,
                        delay.as_millis() as u64,
                        e
                    );

                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}
