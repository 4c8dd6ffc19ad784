//! Retry logic and backoff calculations for downloads

use super::config::RetryConfig;
use ifw_errors::{Error, UserFacingError};
use std::time::Duration;

/// Calculate exponential backoff delay with jitter
pub(super) fn calculate_backoff_delay(retry_config: &RetryConfig, attempt: u32) -> Duration {
    // Precision loss acceptable for backoff calculations
    #[allow(clippy::cast_precision_loss)]
    let base_delay = retry_config.initial_delay.as_millis().min(u128::from(u64::MAX)) as f64;
    #[allow(clippy::cast_precision_loss)]
    let max_delay = retry_config.max_delay.as_millis().min(u128::from(u64::MAX)) as f64;

    let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
    let delay = (base_delay * retry_config.backoff_multiplier.powi(exponent)).min(max_delay);

    let jitter = delay * retry_config.jitter_factor * (rand::random::<f64>() - 0.5);
    // max(0.0) ensures non-negative, round() handles fractional part
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let final_delay = (delay + jitter).max(0.0).round() as u64;

    Duration::from_millis(final_delay)
}

/// Transient failures worth another attempt: hash mismatch, connection
/// reset or refused, timeouts and 5xx answers
pub(super) fn is_retryable(err: &Error) -> bool {
    !err.is_cancelled() && err.is_retryable()
}
