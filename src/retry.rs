//! Retry logic with linear backoff
//!
//! A logical API call is attempted up to `max_retries + 1` times. Only failures
//! that carry a retryable HTTP status are retried; the delay before retry `n`
//! (0-based) is `min(2s * (n + 1), 6s)`, so the default schedule is 2s, 4s.
//!
//! Sleeping goes through the [`Sleeper`] capability so the loop can be driven
//! without wall-clock delays.

use crate::classifier::RequestFailure;
use crate::logging::{log_debug, log_error, log_warn};

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// HTTP statuses that indicate a transient upstream condition.
pub const RETRYABLE_STATUS_CODES: [u16; 9] = [408, 409, 423, 425, 429, 500, 502, 503, 504];

/// Whether a response with this status should be retried.
pub fn is_retryable_status(status: u16) -> bool {
    RETRYABLE_STATUS_CODES.contains(&status)
}

/// Retry policy configuration for API requests
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay added per attempt
    pub backoff_step: Duration,
    /// Upper bound on any single delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff_step: Duration::from_millis(2000),
            max_delay: Duration::from_millis(6000),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn no_retries() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay to wait after the failed attempt with 0-based index `attempt`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.backoff_step
            .saturating_mul(attempt.saturating_add(1))
            .min(self.max_delay)
    }

    /// Total number of attempts this policy allows.
    pub fn total_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// Suspends the current task between attempts.
#[async_trait]
pub trait Sleeper: Send + Sync + std::fmt::Debug {
    async fn sleep(&self, duration: Duration);
}

/// [`Sleeper`] backed by the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Runs an operation under a [`RetryPolicy`]
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl Default for RetryExecutor {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

impl RetryExecutor {
    /// Create a new retry executor sleeping on the tokio timer
    pub fn new(policy: RetryPolicy) -> Self {
        Self::with_sleeper(policy, Arc::new(TokioSleeper))
    }

    pub fn with_sleeper(policy: RetryPolicy, sleeper: Arc<dyn Sleeper>) -> Self {
        Self { policy, sleeper }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Execute an operation, retrying transient failures.
    ///
    /// `operation` receives the 0-based attempt index. The last failure is
    /// returned unchanged once the policy gives up; classification is left to
    /// the caller.
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T, RequestFailure>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, RequestFailure>>,
    {
        let mut attempt = 0;

        loop {
            log_debug!(
                attempt = attempt + 1,
                total_attempts = self.policy.total_attempts(),
                "Executing request"
            );

            let failure = match operation(attempt).await {
                Ok(response) => return Ok(response),
                Err(failure) => failure,
            };

            if attempt >= self.policy.max_retries {
                log_error!(
                    attempts = attempt + 1,
                    error = %failure,
                    "Request failed after all retry attempts"
                );
                return Err(failure);
            }

            if !failure.is_retryable() {
                log_debug!(
                    attempt = attempt + 1,
                    status = ?failure.http_status(),
                    error = %failure,
                    "Request failed with a non-retryable error"
                );
                return Err(failure);
            }

            let delay = self.policy.backoff_delay(attempt);
            log_warn!(
                attempt = attempt + 1,
                total_attempts = self.policy.total_attempts(),
                delay_ms = delay.as_millis() as u64,
                error = %failure,
                "Request failed, retrying after delay"
            );
            self.sleeper.sleep(delay).await;
            attempt += 1;
        }
    }
}
