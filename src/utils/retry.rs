//! Retry utilities: backoff builders and retryable error classification.
//!
//! Uses `backon` for exponential backoff with jitter.

use std::time::Duration;

use backon::ExponentialBuilder;

use crate::interfaces::StoreError;

/// Backoff between webhook processing attempts.
///
/// - Min delay: 500ms
/// - Max delay: 60s
/// - Max attempts: `max_retries`
/// - Jitter enabled
pub fn webhook_backoff(max_retries: u32) -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(500))
        .with_max_delay(Duration::from_secs(60))
        .with_max_times(max_retries as usize)
        .with_jitter()
}

/// Backoff for opening the shared database at startup.
///
/// - Min delay: 100ms
/// - Max delay: 5s
/// - Max attempts: 30
/// - Jitter enabled
pub fn connection_backoff() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(100))
        .with_max_delay(Duration::from_secs(5))
        .with_max_times(30)
        .with_jitter()
}

/// Determines if a storage error may succeed on retry.
///
/// Retryable: database and availability failures (locks, dropped
/// connections). Non-retryable: missing rows, conflicts and corrupt values,
/// which will fail the same way every time.
pub fn is_retryable_store_error(err: &StoreError) -> bool {
    matches!(err, StoreError::Database(_) | StoreError::Unavailable)
}
