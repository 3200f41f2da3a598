use super::types::{BreakerSnapshot, CircuitBreakerConfig, CircuitBreakerMetrics, CircuitState};
use crate::error::ResilienceError;
use crate::metrics;
use chrono::{DateTime, Utc};
use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Circuit breaker for a single upstream service
#[derive(Debug)]
pub struct CircuitBreaker {
    /// Configuration
    config: CircuitBreakerConfig,
    /// Current state
    state: Arc<RwLock<State>>,
    /// Half-open probe slots, see [`ProbeSlots`]
    probes: Arc<ProbeSlots>,
    /// Registry key
    name: String,
}

#[derive(Debug)]
struct State {
    /// Current circuit state
    circuit_state: CircuitState,
    /// Consecutive failures, reset only by a success or an explicit reset
    failure_count: u32,
    /// Successes since the circuit last entered half-open
    success_count: u32,
    /// Monotonic time of the last failure, drives the open timeout
    last_failure_at: Option<Instant>,
    /// Wall-clock time of the last failure, for snapshots
    last_failure_wall: Option<DateTime<Utc>>,
    /// Metrics
    metrics: CircuitBreakerMetrics,
}

impl State {
    fn new() -> Self {
        Self {
            circuit_state: CircuitState::Closed,
            failure_count: 0,
            success_count: 0,
            last_failure_at: None,
            last_failure_wall: None,
            metrics: CircuitBreakerMetrics::default(),
        }
    }
}

/// In-flight probe count for the current half-open period.
///
/// The high 32 bits hold the period's generation and the low 32 bits the
/// count, so a probe from an earlier period can never release a slot in a
/// later one.
#[derive(Debug, Default)]
struct ProbeSlots(AtomicU64);

impl ProbeSlots {
    fn split(packed: u64) -> (u32, u32) {
        ((packed >> 32) as u32, packed as u32)
    }

    fn pack(generation: u32, in_flight: u32) -> u64 {
        ((generation as u64) << 32) | in_flight as u64
    }

    /// Start a new period with no probes in flight
    fn next_generation(&self) {
        let _ = self.0.fetch_update(Ordering::AcqRel, Ordering::Acquire, |packed| {
            let (generation, _) = Self::split(packed);
            Some(Self::pack(generation.wrapping_add(1), 0))
        });
    }

    /// Take a slot in the current period if fewer than `max` are in flight
    fn acquire(&self, max: u32) -> Result<u32, u32> {
        self.0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |packed| {
                let (generation, in_flight) = Self::split(packed);
                (in_flight < max).then(|| Self::pack(generation, in_flight + 1))
            })
            .map(|packed| Self::split(packed).0)
            .map_err(|packed| Self::split(packed).1)
    }

    fn release(&self, generation: u32) {
        let _ = self.0.fetch_update(Ordering::AcqRel, Ordering::Acquire, |packed| {
            let (current, in_flight) = Self::split(packed);
            (current == generation && in_flight > 0)
                .then(|| Self::pack(current, in_flight - 1))
        });
    }

    #[cfg(test)]
    fn in_flight(&self) -> u32 {
        Self::split(self.0.load(Ordering::Acquire)).1
    }
}

/// Admission for one call; frees its half-open probe slot when dropped
struct Permit {
    probe_slot: Option<(Arc<ProbeSlots>, u32)>,
}

impl Drop for Permit {
    fn drop(&mut self) {
        if let Some((slots, generation)) = &self.probe_slot {
            slots.release(*generation);
        }
    }
}

impl CircuitBreaker {
    /// Create a new circuit breaker
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        let name = name.into();
        info!(
            breaker = %name,
            failure_threshold = config.failure_threshold,
            success_threshold = config.success_threshold,
            open_timeout_ms = config.open_timeout_ms,
            "Creating circuit breaker"
        );

        Self {
            config,
            state: Arc::new(RwLock::new(State::new())),
            probes: Arc::new(ProbeSlots::default()),
            name,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Run `f` through the breaker.
    ///
    /// While open and inside the open timeout, `f` is not invoked and
    /// [`ResilienceError::CircuitOpen`] is returned. Operation errors are
    /// passed back as [`ResilienceError::Operation`].
    pub async fn call<F, Fut, T, E>(&self, f: F) -> Result<T, ResilienceError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let Some(_permit) = self.admit().await else {
            return Err(ResilienceError::CircuitOpen {
                name: self.name.clone(),
            });
        };

        match f().await {
            Ok(result) => {
                self.record_success().await;
                Ok(result)
            }
            Err(e) => {
                debug!(breaker = %self.name, error = %e, "Operation failed through breaker");
                self.record_failure().await;
                Err(ResilienceError::Operation(e))
            }
        }
    }

    /// Decide whether a call may run, performing the lazy open to half-open move
    async fn admit(&self) -> Option<Permit> {
        let mut state = self.state.write().await;

        if state.circuit_state == CircuitState::Open {
            let Some(last_failure_at) = state.last_failure_at else {
                warn!(breaker = %self.name, "Circuit open but no failure timestamp");
                self.reject(&mut state);
                return None;
            };

            if last_failure_at.elapsed() < self.config.open_timeout() {
                debug!(
                    breaker = %self.name,
                    time_remaining = ?self
                        .config
                        .open_timeout()
                        .saturating_sub(last_failure_at.elapsed()),
                    "Circuit breaker open, rejecting call"
                );
                self.reject(&mut state);
                return None;
            }

            self.transition_to_half_open(&mut state);
        }

        match state.circuit_state {
            CircuitState::HalfOpen => {
                let max = self.config.half_open_max_calls;
                match self.probes.acquire(max) {
                    Ok(generation) => {
                        state.metrics.total_calls += 1;
                        debug!(breaker = %self.name, "Allowing half-open probe call");
                        Some(Permit {
                            probe_slot: Some((self.probes.clone(), generation)),
                        })
                    }
                    Err(in_flight) => {
                        debug!(
                            breaker = %self.name,
                            in_flight,
                            max,
                            "Half-open probe already in flight, rejecting"
                        );
                        self.reject(&mut state);
                        None
                    }
                }
            }
            _ => {
                state.metrics.total_calls += 1;
                Some(Permit { probe_slot: None })
            }
        }
    }

    fn reject(&self, state: &mut State) {
        state.metrics.rejected_calls += 1;
        metrics::record_circuit_breaker_rejection(&self.name);
    }

    async fn record_success(&self) {
        let mut state = self.state.write().await;
        state.metrics.successful_calls += 1;
        state.failure_count = 0;

        match state.circuit_state {
            CircuitState::HalfOpen => {
                state.success_count += 1;

                debug!(
                    breaker = %self.name,
                    success_count = state.success_count,
                    threshold = self.config.success_threshold,
                    "Half-open probe call succeeded"
                );

                if state.success_count >= self.config.success_threshold {
                    self.transition_to_closed(&mut state);
                }
            }
            CircuitState::Open => {
                // A call admitted before the circuit opened finished successfully
                self.transition_to_closed(&mut state);
            }
            CircuitState::Closed => {}
        }
    }

    async fn record_failure(&self) {
        let mut state = self.state.write().await;
        state.metrics.failed_calls += 1;
        state.failure_count = state.failure_count.saturating_add(1);
        state.last_failure_at = Some(Instant::now());
        state.last_failure_wall = Some(Utc::now());

        debug!(
            breaker = %self.name,
            state = %state.circuit_state,
            failure_count = state.failure_count,
            threshold = self.config.failure_threshold,
            "Call failed"
        );

        if state.failure_count >= self.config.failure_threshold
            && state.circuit_state != CircuitState::Open
        {
            self.transition_to_open(&mut state);
        }
    }

    /// Force the breaker back to a clean closed state
    pub async fn reset(&self) {
        let mut state = self.state.write().await;
        let previous = state.circuit_state;

        state.circuit_state = CircuitState::Closed;
        state.failure_count = 0;
        state.success_count = 0;
        state.last_failure_at = None;
        state.last_failure_wall = None;
        self.probes.next_generation();

        info!(breaker = %self.name, previous = %previous, "Circuit breaker reset");
        if previous != CircuitState::Closed {
            metrics::record_circuit_breaker_transition(
                &self.name,
                &previous.to_string(),
                &CircuitState::Closed.to_string(),
            );
        }
        metrics::record_circuit_breaker_state(&self.name, CircuitState::Closed.as_gauge());
    }

    /// Get current state
    pub async fn state(&self) -> CircuitState {
        self.state.read().await.circuit_state
    }

    /// Get a read-only snapshot
    pub async fn snapshot(&self) -> BreakerSnapshot {
        let state = self.state.read().await;
        BreakerSnapshot {
            name: self.name.clone(),
            state: state.circuit_state,
            failure_count: state.failure_count,
            success_count: state.success_count,
            last_failure_at: state.last_failure_wall,
        }
    }

    /// Get metrics
    pub async fn metrics(&self) -> CircuitBreakerMetrics {
        self.state.read().await.metrics.clone()
    }

    /// Transition to open state
    fn transition_to_open(&self, state: &mut State) {
        info!(
            breaker = %self.name,
            failure_count = state.failure_count,
            "Circuit breaker opening"
        );

        self.record_transition(state.circuit_state, CircuitState::Open);
        state.circuit_state = CircuitState::Open;
        state.metrics.circuit_opened_count += 1;
    }

    /// Transition to half-open state
    fn transition_to_half_open(&self, state: &mut State) {
        info!(
            breaker = %self.name,
            open_timeout = ?self.config.open_timeout(),
            "Circuit breaker transitioning to half-open"
        );

        self.record_transition(state.circuit_state, CircuitState::HalfOpen);
        state.circuit_state = CircuitState::HalfOpen;
        state.success_count = 0;
        self.probes.next_generation();
        state.metrics.circuit_half_opened_count += 1;
    }

    /// Transition to closed state
    fn transition_to_closed(&self, state: &mut State) {
        info!(
            breaker = %self.name,
            success_count = state.success_count,
            "Circuit breaker closing"
        );

        self.record_transition(state.circuit_state, CircuitState::Closed);
        state.circuit_state = CircuitState::Closed;
        state.success_count = 0;
        state.metrics.circuit_closed_count += 1;
    }

    fn record_transition(&self, from: CircuitState, to: CircuitState) {
        metrics::record_circuit_breaker_transition(&self.name, &from.to_string(), &to.to_string());
        metrics::record_circuit_breaker_state(&self.name, to.as_gauge());
    }
}
