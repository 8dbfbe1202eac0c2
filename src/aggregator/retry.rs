//! Retry handling for remote reads.
//!
//! Rate limits are waited out for as long as it takes and never use up an
//! attempt. Transient failures get a fixed number of attempts with a fixed
//! delay between them. Not-found and fatal failures go straight back to the
//! caller.

use chrono::{DateTime, Utc};
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::types::RetryConfig;
use crate::github::RemoteError;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    retry_delay: Duration,
    rate_limit_padding: Duration,
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_secs(config.delay_secs),
            Duration::from_secs(config.rate_limit_padding_secs),
        )
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, retry_delay: Duration, rate_limit_padding: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            retry_delay,
            rate_limit_padding,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Runs `operation` until it succeeds or fails in a way that should not be retried.
    pub async fn execute<F, Fut, T>(&self, label: &str, mut operation: F) -> Result<T, RemoteError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RemoteError>>,
    {
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(RemoteError::RateLimited { reset_at }) => {
                    let wait = rate_limit_wait(reset_at, Utc::now(), self.rate_limit_padding);
                    info!(
                        "Rate limited while fetching {}, waiting {}s for reset",
                        label,
                        wait.as_secs()
                    );
                    tokio::time::sleep(wait).await;
                }
                Err(RemoteError::Transient(reason)) => {
                    attempt += 1;
                    if attempt >= self.max_attempts {
                        warn!(
                            "Giving up on {} after {} attempts: {}",
                            label, attempt, reason
                        );
                        return Err(RemoteError::Transient(reason));
                    }
                    warn!(
                        "Retrying {} (attempt {}/{}) after error: {}",
                        label,
                        attempt + 1,
                        self.max_attempts,
                        reason
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Time left until `reset_at` (never negative) plus `padding`.
pub fn rate_limit_wait(reset_at: DateTime<Utc>, now: DateTime<Utc>, padding: Duration) -> Duration {
    let remaining = (reset_at - now).to_std().unwrap_or(Duration::ZERO);
    remaining + padding
}
