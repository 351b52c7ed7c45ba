//! Connection retry with exponential backoff

use std::future::Future;
use std::time::Duration;

use tracing::{info, warn};

use super::transport::TransportError;

/// Retry configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first failed attempt
    pub max_retries: u32,

    /// Delay before the first retry in seconds
    pub initial_backoff_secs: u64,

    /// Backoff multiplier for each further retry
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff_secs: 5,
            backoff_multiplier: 1.0,
        }
    }
}

impl RetryConfig {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// Set custom backoff parameters
    pub fn with_backoff(mut self, initial_secs: u64, multiplier: f64) -> Self {
        self.initial_backoff_secs = initial_secs;
        self.backoff_multiplier = multiplier;
        self
    }

    /// Total attempts including the first one
    pub fn attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// Delay before retry number `retry` (1-based):
/// `initial * multiplier^(retry - 1)`
pub fn calculate_backoff(retry: u32, config: &RetryConfig) -> Duration {
    let exponent = retry.saturating_sub(1).min(i32::MAX as u32) as i32;
    let delay_secs = config.initial_backoff_secs as f64 * config.backoff_multiplier.powi(exponent);

    if delay_secs.is_finite() && delay_secs > 0.0 {
        Duration::try_from_secs_f64(delay_secs).unwrap_or(Duration::MAX)
    } else {
        Duration::ZERO
    }
}

/// Run `connect_fn` until it succeeds, fails with a non-retryable error, or
/// the configured retries are used up.
///
/// Returns the last error together with the number of attempts made.
pub async fn connect_with_retry<T, F, Fut>(
    mut connect_fn: F,
    config: &RetryConfig,
    target: &str,
) -> Result<T, (u32, TransportError)>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, TransportError>>,
{
    let mut attempt = 1;

    loop {
        info!(
            "Connection attempt {}/{} to {}",
            attempt,
            config.attempts(),
            target
        );

        let err = match connect_fn().await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        if !err.is_retryable() {
            warn!("Connection to {} failed with non-retryable error: {}", target, err);
            return Err((attempt, err));
        }
        if attempt > config.max_retries {
            warn!(
                "Connection to {} failed after {} attempt(s): {}",
                target, attempt, err
            );
            return Err((attempt, err));
        }

        let delay = calculate_backoff(attempt, config);
        info!(
            "Connection to {} failed, retrying in {:?}: {}",
            target, delay, err
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
