// src/error_recovery.rs
//! Bounded retry with exponential backoff.
//!
//! Only failures the caller's predicate accepts are retried. Everything else
//! returns on the first attempt.

use crate::error::AppError;
use std::time::Duration;

/// How many times and how patiently an operation is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Submitting one chunk in the compose box. Delays are settle time for the UI.
    pub const fn ui_submit(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(5),
        }
    }
}

/// Retries an async operation with exponential backoff while `retryable`
/// accepts its error.
pub async fn retry_with_backoff<F, T, Fut>(
    policy: RetryPolicy,
    what: &str,
    retryable: fn(&AppError) -> bool,
    mut operation: F,
) -> Result<T, AppError>
where
    F: FnMut(u32) -> Fut,
    Fut: std::future::Future<Output = Result<T, AppError>>,
{
    let mut delay = policy.initial_delay;
    let mut last_error = None;

    for attempt in 1..=policy.max_attempts.max(1) {
        match operation(attempt).await {
            Ok(result) => return Ok(result),
            Err(e) if !retryable(&e) => return Err(e),
            Err(e) => {
                if attempt < policy.max_attempts {
                    log::warn!(
                        "{} attempt {} failed ({}), retrying after {:?}",
                        what,
                        attempt,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;

                    // Exponential backoff with cap
                    delay = std::cmp::min(delay * 2, policy.max_delay);
                }
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| AppError::InternalError {
        message: format!("{}: retry failed with no error", what),
        source: None,
    }))
}
