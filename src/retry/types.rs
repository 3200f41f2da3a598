use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Upper bound of the random jitter added to each backoff delay
pub const MAX_JITTER_MS: u64 = 100;

/// Retry policy for a single call site
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of invocations of the operation, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry in milliseconds
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Cap on any single backoff delay in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Add up to 100ms of random jitter to each delay
    #[serde(default = "default_jitter")]
    pub jitter: bool,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    10000
}

fn default_jitter() -> bool {
    true
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter: default_jitter(),
        }
    }
}

impl RetryPolicy {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    /// Backoff before retrying after the zero-based `attempt` failed:
    /// `min(base * 2^attempt, max)`, without jitter.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay_ms = 2u64
            .checked_pow(attempt)
            .and_then(|factor| self.base_delay_ms.checked_mul(factor))
            .unwrap_or(u64::MAX);
        Duration::from_millis(delay_ms.min(self.max_delay_ms))
    }
}

/// One invocation of the operation, as observed by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RetryAttempt {
    /// 1-based attempt number
    pub attempt_number: u32,
    /// Time suspended before this attempt started
    #[serde(rename = "delay_before_attempt_ms", serialize_with = "serialize_millis")]
    pub delay_before_attempt: Duration,
}

/// Result of a retried call together with the attempt log
#[derive(Debug)]
pub struct RetryReport<T, E> {
    pub result: Result<T, E>,
    pub attempts: Vec<RetryAttempt>,
}

impl<T, E> RetryReport<T, E> {
    /// Total time spent suspended between attempts
    pub fn total_delay(&self) -> Duration {
        self.attempts.iter().map(|a| a.delay_before_attempt).sum()
    }
}

/// Deterministic replay of the retry schedule, no operation involved
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetrySimulation {
    pub attempts: Vec<RetryAttempt>,
    pub succeeded_on_attempt: u32,
    #[serde(rename = "total_delay_ms", serialize_with = "serialize_millis")]
    pub total_delay: Duration,
}

fn serialize_millis<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_u64(duration.as_millis() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_policy_default() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.base_delay_ms, 1000);
        assert_eq!(policy.max_delay_ms, 10000);
        assert!(policy.jitter);
    }

    #[test]
    fn test_delay_doubles_until_capped() {
        let policy = RetryPolicy {
            base_delay_ms: 1000,
            max_delay_ms: 10000,
            ..Default::default()
        };

        let delays: Vec<u128> = (0..5)
            .map(|attempt| policy.delay_for_attempt(attempt).as_millis())
            .collect();
        assert_eq!(delays, vec![1000, 2000, 4000, 8000, 10000]);
    }

    #[test]
    fn test_delay_does_not_overflow() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for_attempt(200), Duration::from_millis(10000));
    }

    #[test]
    fn test_policy_deserializes_with_defaults() {
        let policy: RetryPolicy = serde_yaml::from_str("max_attempts: 5").unwrap();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.base_delay_ms, 1000);
        assert!(policy.jitter);
    }

    #[test]
    fn test_attempt_serializes_millis() {
        let attempt = RetryAttempt {
            attempt_number: 2,
            delay_before_attempt: Duration::from_millis(250),
        };
        let value = serde_json::to_value(attempt).unwrap();
        assert_eq!(value["attempt_number"], 2);
        assert_eq!(value["delay_before_attempt_ms"], 250);
    }
}
