//! Retry with exponential backoff for unreliable upstream calls.
//!
//! Attempt 1 runs immediately. After a failed attempt `n` the caller is
//! suspended for `backoff_factor * 2^(n-1)` before attempt `n + 1`, so three
//! attempts with a 0.5s factor wait 0.5s and then 1.0s. Only errors accepted
//! by the retry predicate are retried; anything else is returned at once.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::TourPlanError;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BACKOFF_FACTOR_MS: u64 = 500;

/// Retry settings as they appear in configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetryConfig {
    /// Total attempts including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base delay in milliseconds, doubled after every failed attempt
    #[serde(default = "default_backoff_factor_ms")]
    pub backoff_factor_ms: u64,
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_backoff_factor_ms() -> u64 {
    DEFAULT_BACKOFF_FACTOR_MS
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_factor_ms: DEFAULT_BACKOFF_FACTOR_MS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff_factor: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_MAX_ATTEMPTS,
            Duration::from_millis(DEFAULT_BACKOFF_FACTOR_MS),
        )
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.backoff_factor_ms),
        )
    }
}

impl RetryPolicy {
    /// `max_attempts` below one is raised to one.
    #[must_use]
    pub fn new(max_attempts: u32, backoff_factor: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_factor,
        }
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay to wait after the given (1-based) failed attempt
    #[must_use]
    pub fn delay_after_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.backoff_factor.saturating_mul(factor)
    }

    /// Run `operation`, retrying errors that [`TourPlanError::is_retryable`]
    /// accepts. When every attempt fails the last error is wrapped in
    /// [`TourPlanError::RetriesExhausted`].
    pub async fn run<T, F, Fut>(&self, operation: F) -> Result<T, TourPlanError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, TourPlanError>>,
    {
        let attempts = self.max_attempts;
        self.run_if(operation, TourPlanError::is_retryable)
            .await
            .map_err(|err| {
                if err.is_retryable() {
                    TourPlanError::retries_exhausted(attempts, err)
                } else {
                    err
                }
            })
    }

    /// Run `operation` with a caller-supplied retry predicate. The error of the
    /// final attempt is returned unchanged.
    pub async fn run_if<T, E, F, Fut, P>(&self, mut operation: F, retryable: P) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: std::fmt::Display,
    {
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::info!(attempt, "Operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) if attempt < self.max_attempts && retryable(&err) => {
                    let delay = self.delay_after_attempt(attempt);
                    tracing::warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Retryable failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    if attempt == self.max_attempts && retryable(&err) {
                        tracing::error!(
                            attempts = attempt,
                            error = %err,
                            "All retry attempts exhausted"
                        );
                    } else {
                        tracing::debug!(attempt, error = %err, "Non-retryable failure");
                    }
                    return Err(err);
                }
            }
        }
    }
}
