//! Bounded exponential backoff around fallible remote calls

use bon::Builder;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// Every attempt failed; `last` is the final error as returned by the operation
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: E },

    #[error("cancelled while retrying")]
    Cancelled,
}

/// Retry policy.
///
/// `max_attempts` counts the first call. The delay after failed attempt `n`
/// is `initial_delay * 2^(n-1)`, capped at `max_delay`.
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
pub struct RetryPolicy {
    #[builder(default = 4)]
    max_attempts: u32,
    #[builder(default = Duration::from_millis(500))]
    initial_delay: Duration,
    #[builder(default = Duration::from_secs(60))]
    max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl RetryPolicy {
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay to wait after `failed_attempts` failures, or `None` once the
    /// attempt budget is spent.
    pub fn delay_for(&self, failed_attempts: u32) -> Option<Duration> {
        if failed_attempts == 0 || failed_attempts >= self.max_attempts {
            return None;
        }

        let multiplier = 1u32.checked_shl(failed_attempts - 1).unwrap_or(u32::MAX);
        let delay = self
            .initial_delay
            .checked_mul(multiplier)
            .unwrap_or(self.max_delay);
        Some(delay.min(self.max_delay))
    }

    /// Run `operation` until it succeeds, the budget is spent, or `cancel` fires.
    ///
    /// The closure receives the 1-based attempt number. Backoff sleeps observe
    /// cancellation; an attempt already in flight is allowed to finish.
    pub async fn run<T, E, F, Fut>(
        &self,
        cancel: &CancellationToken,
        operation_name: &str,
        mut operation: F,
    ) -> Result<T, RetryError<E>>
    where
        E: Display,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(RetryError::Cancelled);
            }
            attempt += 1;

            match operation(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(operation = operation_name, attempt, "Succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) => {
                    let Some(delay) = self.delay_for(attempt) else {
                        warn!(operation = operation_name, attempt, error = %err, "Giving up after retries");
                        return Err(RetryError::Exhausted { attempts: attempt, last: err });
                    };

                    warn!(
                        operation = operation_name,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Attempt failed, retrying"
                    );

                    tokio::select! {
                        _ = cancel.cancelled() => return Err(RetryError::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }
}
