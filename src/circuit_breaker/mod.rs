pub mod breaker;
pub mod registry;
pub mod types;

pub use breaker::CircuitBreaker;
pub use registry::CircuitBreakerRegistry;
pub use types::{
    BreakerSimulation, BreakerSnapshot, CircuitBreakerConfig, CircuitBreakerMetrics, CircuitState,
};
