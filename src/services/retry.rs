//! Explicit retry policy for fill jobs.

use std::future::Future;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::domain::models::RetryConfig;

/// Retry policy with exponential backoff and jitter.
///
/// Every error from a fill is treated as retryable: the coordinator
/// propagates connectivity and partial-write failures untouched, and a
/// retried fill is a full fresh invocation made safe by conflict-tolerant
/// writes and write-then-mark-ready ordering.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    initial_backoff_ms: u64,
    max_backoff_ms: u64,
    jitter: f64,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_backoff_ms: u64, max_backoff_ms: u64, jitter: f64) -> Self {
        Self {
            max_retries,
            initial_backoff_ms,
            max_backoff_ms,
            jitter: jitter.clamp(0.0, 1.0),
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_retries,
            config.initial_backoff_ms,
            config.max_backoff_ms,
            config.jitter,
        )
    }

    /// Execute an operation, retrying on any error until the retry budget
    /// is exhausted. Returns the last error once it is.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T, anyhow::Error>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, anyhow::Error>>,
    {
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => {
                    if attempt > 0 {
                        debug!("Operation succeeded after {} retries", attempt);
                    }
                    return Ok(result);
                }
                Err(err) => {
                    if attempt >= self.max_retries {
                        warn!("Operation failed after {} attempts: {}", attempt + 1, err);
                        return Err(err);
                    }
                    let backoff = self.backoff_for(attempt);
                    warn!(
                        "Attempt {} failed: {}. Retrying in {:?}",
                        attempt + 1,
                        err,
                        backoff
                    );
                    sleep(backoff).await;
                    attempt += 1;
                }
            }
        }
    }

    /// `min(initial * 2^attempt, max)` plus up to `jitter` of itself.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let base_ms = self
            .initial_backoff_ms
            .saturating_mul(2_u64.saturating_pow(attempt))
            .min(self.max_backoff_ms);

        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let jittered = (base_ms as f64 * (1.0 + self.jitter * jitter_fraction())) as u64;
        Duration::from_millis(jittered.min(self.max_backoff_ms))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

// Enough randomness to spread concurrent retries without a rand dependency.
fn jitter_fraction() -> f64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    f64::from(nanos) / f64::from(u32::MAX)
}
