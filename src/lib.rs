pub mod admin;
pub mod circuit_breaker;
pub mod config;
pub mod error;
pub mod fallback;
pub mod metrics;
pub mod observability;
pub mod retry;
pub mod service;

pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerRegistry, CircuitState,
};
pub use error::{ResilienceError, UpstreamError};
pub use fallback::{FallbackChain, FallbackOption};
pub use observability::init_tracing;
pub use retry::{Classify, RetryExecutor, RetryPolicy};
pub use service::ResilienceService;

use crate::admin::AdminState;
use crate::config::ResilienceConfig;
use crate::error::{Error, Result};
use crate::metrics::MetricsService;
use tracing::{info, warn};

/// Start the admin server for the given configuration
pub async fn serve(config: ResilienceConfig) -> Result<()> {
    // Validate configuration
    config.validate()?;

    info!("Starting resilience admin server");

    let service = ResilienceService::from_config(&config);
    info!(
        "Registered {} circuit breakers",
        service.registry().names().len()
    );

    let metrics = if config.server.metrics_enabled {
        match MetricsService::new() {
            Ok(metrics) => Some(metrics),
            Err(e) => {
                warn!(error = %e, "Metrics disabled");
                None
            }
        }
    } else {
        None
    };

    let app = admin::router(AdminState::new(service.registry().clone(), metrics));

    // Bind and serve
    let addr = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Admin server listening on {}", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| Error::Internal(format!("Server error: {}", e)))?;

    Ok(())
}
