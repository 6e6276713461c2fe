//! Reusable retry-with-backoff policy
//!
//! Remote classification calls need different pauses for different failure
//! kinds (cold-start 503 vs. transport errors), so the policy delegates the
//! retry decision to a classifier closure: return the pause to apply, or
//! None to fail immediately. Non-retryable errors never sleep.

use std::time::Duration;

/// Retry an async operation according to a per-error pause schedule.
///
/// # Arguments
/// * `operation_name` - Name for logging (e.g., "classification request")
/// * `max_attempts` - Total attempts including the first
/// * `pause_for` - Maps an error to Some(pause) when retryable, None otherwise
/// * `operation` - Async closure performing the call
///
/// # Returns
/// The first success, or the last error once attempts are exhausted or the
/// error is not retryable.
pub async fn run_with_retries<F, Fut, T, E>(
    operation_name: &str,
    max_attempts: u32,
    pause_for: impl Fn(&E) -> Option<Duration>,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::debug!(
                        operation = operation_name,
                        attempt,
                        "Operation succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(err) => {
                let pause = pause_for(&err);

                let Some(pause) = pause else {
                    // Non-retryable, fail immediately
                    return Err(err);
                };

                if attempt >= max_attempts {
                    tracing::warn!(
                        operation = operation_name,
                        attempt,
                        error = %err,
                        "Retries exhausted"
                    );
                    return Err(err);
                }

                tracing::warn!(
                    operation = operation_name,
                    attempt,
                    pause_ms = pause.as_millis() as u64,
                    error = %err,
                    "Operation failed, will retry after pause"
                );
                tokio::time::sleep(pause).await;
            }
        }
    }
}
