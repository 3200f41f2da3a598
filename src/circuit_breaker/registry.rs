use super::breaker::CircuitBreaker;
use super::types::{BreakerSimulation, BreakerSnapshot, CircuitBreakerConfig, CircuitState};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

/// Name-keyed table of circuit breakers, one per upstream service.
///
/// Breakers are created on first reference and live as long as the registry.
#[derive(Debug, Clone)]
pub struct CircuitBreakerRegistry {
    /// Circuit breakers per service name
    breakers: Arc<DashMap<String, Arc<CircuitBreaker>>>,
    /// Configuration for breakers created without an explicit one
    default_config: CircuitBreakerConfig,
}

impl Default for CircuitBreakerRegistry {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

impl CircuitBreakerRegistry {
    /// Create a new registry
    pub fn new(default_config: CircuitBreakerConfig) -> Self {
        Self {
            breakers: Arc::new(DashMap::new()),
            default_config,
        }
    }

    pub fn default_config(&self) -> &CircuitBreakerConfig {
        &self.default_config
    }

    /// Get the breaker for `name`, creating it with `config` (or the default)
    /// if absent. `config` is ignored when the breaker already exists.
    pub fn get_or_create(
        &self,
        name: &str,
        config: Option<CircuitBreakerConfig>,
    ) -> Arc<CircuitBreaker> {
        if let Some(existing) = self.breakers.get(name) {
            return existing.clone();
        }

        self.breakers
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!(breaker = name, "Registering new circuit breaker");
                let config = config.unwrap_or_else(|| self.default_config.clone());
                Arc::new(CircuitBreaker::new(name, config))
            })
            .clone()
    }

    /// Get an existing breaker without creating one
    pub fn get(&self, name: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers.get(name).map(|entry| entry.clone())
    }

    /// Snapshot of a breaker, if registered
    pub async fn snapshot(&self, name: &str) -> Option<BreakerSnapshot> {
        let breaker = self.get(name)?;
        Some(breaker.snapshot().await)
    }

    /// Reset a registered breaker. Returns false for unknown names.
    pub async fn reset(&self, name: &str) -> bool {
        match self.get(name) {
            Some(breaker) => {
                breaker.reset().await;
                true
            }
            None => false,
        }
    }

    /// Get all registered service names
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.breakers.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Snapshots of every breaker, sorted by name
    pub async fn snapshots(&self) -> Vec<BreakerSnapshot> {
        // Collect first so no map shard guard is held across an await
        let breakers: Vec<Arc<CircuitBreaker>> =
            self.breakers.iter().map(|e| e.value().clone()).collect();

        let mut results = Vec::with_capacity(breakers.len());
        for breaker in breakers {
            results.push(breaker.snapshot().await);
        }
        results.sort_by(|a, b| a.name.cmp(&b.name));
        results
    }

    /// Project the state `name` would reach after `count` more failures
    /// against `threshold`, without touching any breaker.
    pub async fn simulate_failures(
        &self,
        name: &str,
        count: u32,
        threshold: u32,
    ) -> BreakerSimulation {
        let (current_state, current_failures) = match self.get(name) {
            Some(breaker) => {
                let snapshot = breaker.snapshot().await;
                (snapshot.state, snapshot.failure_count)
            }
            None => (CircuitState::Closed, 0),
        };

        let projected_failures = current_failures.saturating_add(count);
        let projected_state = if projected_failures >= threshold {
            CircuitState::Open
        } else {
            current_state
        };

        BreakerSimulation {
            name: name.to_string(),
            current_state,
            current_failures,
            projected_failures,
            threshold,
            projected_state,
        }
    }
}
