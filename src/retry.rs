//! Backoff for translation backend requests.
//!
//! Only transient failures (network errors, 5xx) are retried. A rate limit is
//! returned at once so the caller can hand the work to another backend.

use crate::error::Result;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// How many times a backend request is attempted and how long to wait in between.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Attempts including the first one; 0 behaves like 1
    pub max_attempts: u32,
    /// Wait before the second attempt; doubled for each further attempt
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl RetryConfig {
    pub fn new(max_attempts: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay,
            max_delay,
        }
    }

    /// Cloud API: 3 attempts, waiting 1s then 2s.
    pub fn cloud_api() -> Self {
        Self::new(3, Duration::from_secs(1), Duration::from_secs(5))
    }

    /// Local engine on the same host: a second failure means it is down.
    pub fn local_engine() -> Self {
        Self::new(2, Duration::from_millis(500), Duration::from_secs(1))
    }

    /// No waiting at all.
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO, Duration::ZERO)
    }

    /// Wait before the given retry (1 for the first retry).
    fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.initial_delay.saturating_mul(factor).min(self.max_delay)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::cloud_api()
    }
}

/// Run `request` until it succeeds, fails with a non-transient error, or runs out of attempts.
pub async fn retry_transient<T, F, Fut>(config: &RetryConfig, what: &str, mut request: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = config.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let error = match request().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!("{}: succeeded on attempt {}/{}", what, attempt, attempts);
                }
                return Ok(value);
            }
            Err(e) => e,
        };

        if !error.is_retryable() {
            return Err(error);
        }
        if attempt == attempts {
            warn!("{}: giving up after {} attempts: {}", what, attempts, error);
            return Err(error);
        }

        let delay = config.backoff(attempt);
        warn!(
            "{}: attempt {}/{} failed ({}), retrying in {:?}",
            what, attempt, attempts, error, delay
        );
        if !delay.is_zero() {
            sleep(delay).await;
        }
        attempt += 1;
    }
}
