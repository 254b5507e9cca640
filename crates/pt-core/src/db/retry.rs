//! Retry logic for transient failures.
//!
//! Detection processing uses optimistic concurrency, so a lost race on an
//! asset row surfaces as a conflict that is expected to succeed when retried
//! against a fresh read. The same loop also covers pool exhaustion and
//! locked/busy databases.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use super::DbError;

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts.
    pub max_retries: u32,
    /// Initial delay between retries.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,
    /// Whether to add jitter to delays.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(500),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Creates a new retry configuration with no retries (fail immediately).
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Calculates the delay for a given attempt number (0-indexed).
    fn calculate_delay(&self, attempt: u32) -> Duration {
        let base_delay =
            self.initial_delay.as_millis() as f64 * self.backoff_multiplier.powi(attempt as i32);
        let capped_delay = base_delay.min(self.max_delay.as_millis() as f64);

        let final_delay = if self.jitter {
            // Up to 25% on top, so racing writers spread out.
            capped_delay * (1.0 + rand_jitter() * 0.25)
        } else {
            capped_delay
        };

        Duration::from_millis(final_delay as u64)
    }
}

/// Pseudo-random jitter factor in `[0.0, 1.0)`.
fn rand_jitter() -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    (nanos % 1000) as f64 / 1000.0
}

/// Errors that can tell whether repeating the operation may succeed.
pub trait Retryable {
    /// Returns true when the failure is transient and worth retrying.
    fn is_transient(&self) -> bool;
}

impl Retryable for DbError {
    fn is_transient(&self) -> bool {
        is_transient_error(self)
    }
}

/// Determines if a database error is transient and worth retrying.
pub fn is_transient_error(error: &DbError) -> bool {
    match error {
        DbError::PoolExhausted | DbError::Conflict(_) => true,
        DbError::Connection(msg) => {
            let msg_lower = msg.to_lowercase();
            msg_lower.contains("timeout")
                || msg_lower.contains("connection refused")
                || msg_lower.contains("connection reset")
                || msg_lower.contains("broken pipe")
                || msg_lower.contains("temporarily unavailable")
        }
        DbError::Transaction(msg) | DbError::Query(msg) => {
            let msg_lower = msg.to_lowercase();
            msg_lower.contains("deadlock")
                || msg_lower.contains("lock wait")
                || msg_lower.contains("busy")
                || msg_lower.contains("database is locked")
                || msg_lower.contains("could not serialize")
        }
        DbError::Serialization(_)
        | DbError::Constraint(_)
        | DbError::Configuration(_)
        | DbError::NotFound { .. }
        | DbError::Migration(_) => false,
    }
}

/// Executes an async operation, retrying transient failures with exponential
/// backoff.
///
/// The closure is called once per attempt, so every attempt starts from a
/// fresh read of whatever state it depends on.
pub async fn with_retry<F, Fut, T, E>(config: &RetryConfig, operation_name: &str, f: F) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + std::fmt::Display,
{
    let mut attempt = 0;

    loop {
        match f().await {
            Ok(result) => {
                if attempt > 0 {
                    debug!(
                        operation = %operation_name,
                        attempt = attempt + 1,
                        "Operation succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(e) => {
                if !e.is_transient() || attempt >= config.max_retries {
                    if attempt > 0 {
                        warn!(
                            operation = %operation_name,
                            attempts = attempt + 1,
                            error = %e,
                            "Operation failed after retries"
                        );
                    }
                    return Err(e);
                }

                let delay = config.calculate_delay(attempt);
                debug!(
                    operation = %operation_name,
                    attempt = attempt + 1,
                    max_retries = config.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Transient failure, retrying"
                );

                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
