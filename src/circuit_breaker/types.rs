use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    /// Circuit is closed, calls flow normally
    Closed,
    /// Circuit is open, calls are rejected
    Open,
    /// Circuit is half-open, allowing probe calls
    HalfOpen,
}

impl CircuitState {
    /// Numeric encoding used by the state gauge
    pub fn as_gauge(&self) -> u8 {
        match self {
            CircuitState::Closed => 0,
            CircuitState::Open => 1,
            CircuitState::HalfOpen => 2,
        }
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "Closed"),
            CircuitState::Open => write!(f, "Open"),
            CircuitState::HalfOpen => write!(f, "HalfOpen"),
        }
    }
}

/// Circuit breaker configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Number of consecutive failures before opening the circuit
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// Duration to stay open before the next call may probe, in milliseconds
    #[serde(default = "default_open_timeout_ms")]
    pub open_timeout_ms: u64,

    /// Number of consecutive successes in half-open state before closing
    #[serde(default = "default_success_threshold")]
    pub success_threshold: u32,

    /// Number of probe calls allowed in flight while half-open
    #[serde(default = "default_half_open_max_calls")]
    pub half_open_max_calls: u32,
}

fn default_failure_threshold() -> u32 {
    5
}

fn default_open_timeout_ms() -> u64 {
    60000
}

fn default_success_threshold() -> u32 {
    2
}

fn default_half_open_max_calls() -> u32 {
    1
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            open_timeout_ms: default_open_timeout_ms(),
            success_threshold: default_success_threshold(),
            half_open_max_calls: default_half_open_max_calls(),
        }
    }
}

impl CircuitBreakerConfig {
    pub fn open_timeout(&self) -> Duration {
        Duration::from_millis(self.open_timeout_ms)
    }
}

/// Circuit breaker metrics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CircuitBreakerMetrics {
    /// Number of calls that ran the operation
    pub total_calls: u64,
    /// Number of successful calls
    pub successful_calls: u64,
    /// Number of failed calls
    pub failed_calls: u64,
    /// Number of calls rejected without running the operation
    pub rejected_calls: u64,
    /// Number of times circuit opened
    pub circuit_opened_count: u64,
    /// Number of times circuit half-opened
    pub circuit_half_opened_count: u64,
    /// Number of times circuit closed
    pub circuit_closed_count: u64,
}

/// Read-only view of a breaker
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BreakerSnapshot {
    pub name: String,
    pub state: CircuitState,
    pub failure_count: u32,
    pub success_count: u32,
    pub last_failure_at: Option<DateTime<Utc>>,
}

/// Projected outcome of additional failures on a breaker
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BreakerSimulation {
    pub name: String,
    pub current_state: CircuitState,
    pub current_failures: u32,
    pub projected_failures: u32,
    pub threshold: u32,
    pub projected_state: CircuitState,
}
