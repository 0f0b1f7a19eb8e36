//! Bounded Retry Invoker
//!
//! Wraps one upstream call with a fixed attempt budget and a
//! non-decreasing backoff schedule. Only rate-limited and transient failures
//! are retried; a permanent failure is returned on the attempt it occurs.

use serde::Serialize;
use std::future::Future;
use std::time::Duration;

use lpi_common::time::millis_to_duration;
use lpi_common::{Error, Result};

/// Classification of one failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// Upstream said slow down (HTTP 429)
    RateLimited,
    /// Upstream or network hiccup that may clear on its own
    Transient,
    /// Retrying cannot help (bad request, forbidden, unparseable body)
    Permanent,
}

impl FailureClass {
    /// The `isRetryable` predicate
    pub fn is_retryable(self) -> bool {
        matches!(self, FailureClass::RateLimited | FailureClass::Transient)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FailureClass::RateLimited => "rate_limited",
            FailureClass::Transient => "transient",
            FailureClass::Permanent => "permanent",
        }
    }
}

/// Errors that know how they should be retried
pub trait Classify {
    fn failure_class(&self) -> FailureClass;
}

/// Database errors: a locked or busy database clears once the other writer
/// commits; everything else is permanent.
impl Classify for Error {
    fn failure_class(&self) -> FailureClass {
        match self {
            Error::Database(e) => {
                let message = e.to_string();
                if message.contains("database is locked") || message.contains("database is busy") {
                    FailureClass::Transient
                } else {
                    FailureClass::Permanent
                }
            }
            _ => FailureClass::Permanent,
        }
    }
}

/// Attempt budget and backoff schedule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Vec<Duration>,
}

impl RetryPolicy {
    /// Build a policy, rejecting a zero budget or a decreasing schedule
    pub fn new(max_attempts: u32, backoff: Vec<Duration>) -> Result<Self> {
        if max_attempts == 0 {
            return Err(Error::Config(
                "retry max_attempts must be at least 1".to_string(),
            ));
        }
        if backoff.windows(2).any(|pair| pair[1] < pair[0]) {
            return Err(Error::Config(format!(
                "retry backoff schedule must be non-decreasing: {:?}",
                backoff
            )));
        }

        Ok(Self {
            max_attempts,
            backoff,
        })
    }

    /// Build a policy from a millisecond schedule (configuration form)
    pub fn from_millis(max_attempts: u32, backoff_ms: &[u64]) -> Result<Self> {
        Self::new(
            max_attempts,
            backoff_ms.iter().copied().map(millis_to_duration).collect(),
        )
    }

    /// Single attempt, no retries
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            backoff: Vec::new(),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay after the failed attempt with index `attempt_index` (0-based)
    ///
    /// A schedule shorter than the budget repeats its last delay.
    pub fn delay_after(&self, attempt_index: u32) -> Duration {
        self.backoff
            .get(attempt_index as usize)
            .or_else(|| self.backoff.last())
            .copied()
            .unwrap_or(Duration::ZERO)
    }
}

impl RetryPolicy {
    /// Short schedule for SQLite write-lock contention
    pub fn lock_contention() -> Self {
        Self {
            max_attempts: 5,
            backoff: [50, 100, 200, 400].into_iter().map(millis_to_duration).collect(),
        }
    }
}

impl Default for RetryPolicy {
    /// 3 total attempts, waiting 2s then 4s
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: vec![Duration::from_secs(2), Duration::from_secs(4)],
        }
    }
}

/// Invoke `operation` under `policy`
///
/// The closure receives the 1-based attempt number. Every attempt is logged
/// with its outcome classification.
///
/// # Returns
/// The first success, or the failure of the last attempt made
pub async fn invoke_with_retry<F, Fut, T, E>(
    operation_name: &str,
    policy: &RetryPolicy,
    mut operation: F,
) -> std::result::Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: Classify + std::fmt::Display,
{
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;

        match operation(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(
                        operation = operation_name,
                        attempt,
                        "Call succeeded after retry"
                    );
                } else {
                    tracing::debug!(operation = operation_name, attempt, "Call succeeded");
                }
                return Ok(value);
            }
            Err(err) => {
                let class = err.failure_class();

                if !class.is_retryable() {
                    tracing::warn!(
                        operation = operation_name,
                        attempt,
                        class = class.as_str(),
                        error = %err,
                        "Call failed permanently, not retrying"
                    );
                    return Err(err);
                }

                if attempt >= policy.max_attempts() {
                    tracing::error!(
                        operation = operation_name,
                        attempt,
                        class = class.as_str(),
                        error = %err,
                        "Call failed: retry budget exhausted"
                    );
                    return Err(err);
                }

                let delay = policy.delay_after(attempt - 1);
                tracing::warn!(
                    operation = operation_name,
                    attempt,
                    class = class.as_str(),
                    backoff_ms = delay.as_millis() as u64,
                    error = %err,
                    "Call failed, will retry after backoff"
                );

                tokio::time::sleep(delay).await;
            }
        }
    }
}
