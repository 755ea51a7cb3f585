//! Bounded exponential backoff around external calls
//!
//! Every language-model call goes through [`RetryPolicy::execute`]:
//!
//! - each attempt is bounded by the call timeout (elapsed counts as a retryable
//!   [`FailureKind::Timeout`])
//! - retryable failures sleep `min(initial * factor^(k-1), max)` before attempt `k + 1`
//! - non-retryable failures return immediately
//! - cancellation is observed before an attempt starts and while sleeping,
//!   never in the middle of an attempt
//!
//! ```rust,no_run
//! use ads_evidence::retry::{ExternalError, RetryPolicy};
//!
//! # async fn example() {
//! let policy = RetryPolicy::default();
//! let answer: Result<String, _> = policy
//!     .execute(|attempt| async move {
//!         if attempt < 2 {
//!             Err(ExternalError::server("503"))
//!         } else {
//!             Ok("ok".to_string())
//!         }
//!     })
//!     .await;
//! assert_eq!(answer.unwrap(), "ok");
//! # }
//! ```

mod failure;

pub use failure::{ExternalError, FailureKind};

use crate::config::RetryConfig;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Terminal outcome of a retried external call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExternalCallError {
    /// Every attempt failed with a retryable error
    #[error("External call failed after {attempts} attempt(s); last error: {last}")]
    Exhausted {
        /// Attempts made
        attempts: u32,
        /// Error of the final attempt
        last: ExternalError,
    },

    /// A non-retryable error ended the call
    #[error("External call rejected on attempt {attempts}: {source}")]
    Rejected {
        /// Attempts made, including the rejected one
        attempts: u32,
        /// The non-retryable error
        source: ExternalError,
    },

    /// The run was cancelled between attempts
    #[error("External call cancelled after {attempts} attempt(s)")]
    Cancelled {
        /// Attempts completed before cancellation
        attempts: u32,
    },
}

impl ExternalCallError {
    /// Attempts made before giving up.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        match self {
            Self::Exhausted { attempts, .. }
            | Self::Rejected { attempts, .. }
            | Self::Cancelled { attempts } => *attempts,
        }
    }

    /// Error of the final attempt, if one was made.
    #[must_use]
    pub const fn last_error(&self) -> Option<&ExternalError> {
        match self {
            Self::Exhausted { last, .. } => Some(last),
            Self::Rejected { source, .. } => Some(source),
            Self::Cancelled { .. } => None,
        }
    }

    /// Whether the call stopped because of cancellation.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Retry policy for external calls.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_delay: Duration,
    max_delay: Duration,
    backoff_factor: f64,
    call_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    /// Build a policy from configuration. `max_retries` is the total attempt
    /// budget and is raised to 1 if zero.
    #[must_use]
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_retries.max(1),
            initial_delay: config.initial_delay(),
            max_delay: config.max_delay(),
            backoff_factor: config.backoff_factor.max(1.0),
            call_timeout: config.timeout(),
        }
    }

    /// Override the attempt budget (minimum 1).
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Override the per-attempt timeout.
    #[must_use]
    pub const fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Total attempts allowed.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Per-attempt timeout.
    #[must_use]
    pub const fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    /// Delay slept after failed attempt `attempt` (1-based), before the next one.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let secs = self.initial_delay.as_secs_f64() * self.backoff_factor.powi(exponent);
        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            self.max_delay
        } else {
            Duration::from_secs_f64(secs)
        }
    }

    /// Upper bound on time spent sleeping across a whole call.
    #[must_use]
    pub fn max_total_delay(&self) -> Duration {
        (1..self.max_attempts).map(|attempt| self.delay_for_attempt(attempt)).sum()
    }

    /// Run `op` until it succeeds, fails permanently or the budget runs out.
    ///
    /// `op` receives the 1-based attempt number.
    ///
    /// # Errors
    ///
    /// [`ExternalCallError::Rejected`] on a non-retryable failure,
    /// [`ExternalCallError::Exhausted`] once every attempt has failed.
    pub async fn execute<T, F, Fut>(&self, op: F) -> Result<T, ExternalCallError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ExternalError>>,
    {
        self.execute_with_cancel(op, &CancellationToken::new()).await
    }

    /// Like [`execute`](Self::execute), stopping early once `cancel` fires.
    ///
    /// # Errors
    ///
    /// Additionally returns [`ExternalCallError::Cancelled`] if the token is
    /// cancelled before an attempt or during a backoff sleep.
    pub async fn execute_with_cancel<T, F, Fut>(
        &self,
        mut op: F,
        cancel: &CancellationToken,
    ) -> Result<T, ExternalCallError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ExternalError>>,
    {
        let mut attempt = 0;
        loop {
            if cancel.is_cancelled() {
                return Err(ExternalCallError::Cancelled { attempts: attempt });
            }
            attempt += 1;

            let outcome = match tokio::time::timeout(self.call_timeout, op(attempt)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(ExternalError::timeout(format!(
                    "no response within {:?}",
                    self.call_timeout
                ))),
            };

            let error = match outcome {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::info!(attempt = attempt, "external call succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };

            if !error.is_retryable() {
                tracing::warn!(
                    attempt = attempt,
                    kind = %error.kind,
                    error = %error.message,
                    "external call failed with non-retryable error"
                );
                return Err(ExternalCallError::Rejected {
                    attempts: attempt,
                    source: error,
                });
            }

            if attempt >= self.max_attempts {
                tracing::warn!(
                    attempts = attempt,
                    kind = %error.kind,
                    error = %error.message,
                    "external call retries exhausted"
                );
                return Err(ExternalCallError::Exhausted {
                    attempts: attempt,
                    last: error,
                });
            }

            let delay = self.delay_for_attempt(attempt);
            tracing::warn!(
                attempt = attempt,
                max_attempts = self.max_attempts,
                kind = %error.kind,
                error = %error.message,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "external call failed, retrying"
            );

            tokio::select! {
                () = cancel.cancelled() => {
                    tracing::info!(attempts = attempt, "retry cancelled during backoff");
                    return Err(ExternalCallError::Cancelled { attempts: attempt });
                }
                () = tokio::time::sleep(delay) => {}
            }
        }
    }
}
