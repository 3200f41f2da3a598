pub mod classify;
pub mod executor;
pub mod simulation;
pub mod types;

pub use classify::Classify;
pub use executor::RetryExecutor;
pub use simulation::simulate_retry;
pub use types::{RetryAttempt, RetryPolicy, RetryReport, RetrySimulation};
