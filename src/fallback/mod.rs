pub mod chain;
pub mod simulation;
pub mod types;

pub use chain::{execute_with_fallback, FallbackChain};
pub use simulation::simulate_fallback;
pub use types::{FallbackAttempt, FallbackOption, FallbackOutcome, FallbackSimulation};
