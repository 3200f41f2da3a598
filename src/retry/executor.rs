use super::classify::Classify;
use super::types::{RetryAttempt, RetryPolicy, RetryReport, MAX_JITTER_MS};
use crate::error::ResilienceError;
use crate::metrics;
use backoff::{backoff::Backoff, ExponentialBackoff, ExponentialBackoffBuilder};
use rand::Rng;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Retry executor with exponential backoff
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    /// Create a new retry executor
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Execute a function with retries, returning the last error unwrapped
    pub async fn execute<F, Fut, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Classify + Display,
    {
        self.execute_with_report(f).await.result
    }

    /// Execute a function with retries and keep the attempt log
    pub async fn execute_with_report<F, Fut, T, E>(&self, mut f: F) -> RetryReport<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Classify + Display,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut backoff = self.create_backoff();
        let mut attempts = Vec::new();
        let mut delay_before_attempt = Duration::ZERO;
        let mut attempt = 0;

        loop {
            attempt += 1;
            attempts.push(RetryAttempt {
                attempt_number: attempt,
                delay_before_attempt,
            });
            debug!(attempt, max_attempts, "Executing operation");

            match f().await {
                Ok(result) => {
                    metrics::record_retry_attempt("success");
                    if attempt > 1 {
                        debug!(attempt, "Operation succeeded after retries");
                    }
                    return RetryReport {
                        result: Ok(result),
                        attempts,
                    };
                }
                Err(e) => {
                    if !e.is_retryable() {
                        metrics::record_retry_attempt("terminal");
                        debug!(attempt, error = %e, "Error not retryable");
                        return RetryReport {
                            result: Err(e),
                            attempts,
                        };
                    }

                    metrics::record_retry_attempt("retryable");
                    if attempt >= max_attempts {
                        warn!(
                            attempt,
                            max_attempts,
                            error = %e,
                            "Operation failed after max attempts"
                        );
                        return RetryReport {
                            result: Err(e),
                            attempts,
                        };
                    }

                    let Some(wait) = backoff.next_backoff() else {
                        warn!(attempt, error = %e, "Backoff exhausted");
                        return RetryReport {
                            result: Err(e),
                            attempts,
                        };
                    };
                    let wait = wait + self.jitter();

                    debug!(
                        attempt,
                        wait_ms = wait.as_millis() as u64,
                        error = %e,
                        "Operation failed, retrying after backoff"
                    );
                    tokio::time::sleep(wait).await;
                    delay_before_attempt = wait;
                }
            }
        }
    }

    /// Execute with retries, stopping as soon as `token` is cancelled.
    ///
    /// Cancellation interrupts both the backoff sleep and an attempt in flight.
    pub async fn execute_cancellable<F, Fut, T, E>(
        &self,
        f: F,
        token: &CancellationToken,
    ) -> Result<T, ResilienceError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Classify + Display,
    {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                warn!("Retry cancelled by caller");
                Err(ResilienceError::Cancelled)
            }
            result = self.execute(f) => result.map_err(ResilienceError::Operation),
        }
    }

    fn jitter(&self) -> Duration {
        if self.policy.jitter {
            Duration::from_millis(rand::thread_rng().gen_range(0..=MAX_JITTER_MS))
        } else {
            Duration::ZERO
        }
    }

    fn create_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.policy.base_delay().min(self.policy.max_delay()))
            .with_max_interval(self.policy.max_delay())
            .with_multiplier(2.0)
            .with_randomization_factor(0.0) // jitter is added separately
            .with_max_elapsed_time(None) // We handle max attempts manually
            .build()
    }
}
