use super::types::{RetryAttempt, RetryPolicy, RetrySimulation};
use std::time::Duration;

/// Replay the retry schedule without invoking anything or sleeping.
///
/// Succeeds on the first attempt, or on the last allowed attempt when
/// `force_failure_until_last` is set. Uses the default delay cap and no jitter,
/// so the delays match a non-jittered [`RetryExecutor`](super::RetryExecutor)
/// run with the same parameters.
pub fn simulate_retry(
    max_attempts: u32,
    base_delay: Duration,
    force_failure_until_last: bool,
) -> RetrySimulation {
    let policy = RetryPolicy {
        max_attempts: max_attempts.max(1),
        base_delay_ms: base_delay.as_millis() as u64,
        jitter: false,
        ..Default::default()
    };

    let succeeded_on_attempt = if force_failure_until_last {
        policy.max_attempts
    } else {
        1
    };

    let mut attempts = Vec::with_capacity(succeeded_on_attempt as usize);
    let mut delay_before_attempt = Duration::ZERO;
    for attempt_number in 1..=succeeded_on_attempt {
        attempts.push(RetryAttempt {
            attempt_number,
            delay_before_attempt,
        });
        delay_before_attempt = policy.delay_for_attempt(attempt_number - 1);
    }

    let total_delay = attempts.iter().map(|a| a.delay_before_attempt).sum();

    RetrySimulation {
        attempts,
        succeeded_on_attempt,
        total_delay,
    }
}
