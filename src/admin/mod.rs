//! Administrative HTTP surface: breaker inspection and reset, deterministic
//! simulations, and Prometheus metrics.

use crate::circuit_breaker::{
    BreakerSimulation, BreakerSnapshot, CircuitBreakerMetrics, CircuitBreakerRegistry,
};
use crate::error::{Error, Result};
use crate::fallback::{simulate_fallback, FallbackSimulation};
use crate::metrics::{prometheus_response, MetricsService};
use crate::retry::{simulate_retry, RetrySimulation};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Upper bound on simulated retry attempts per request
const MAX_SIMULATED_ATTEMPTS: u32 = 100;

/// Shared state for admin handlers
#[derive(Debug, Clone)]
pub struct AdminState {
    pub registry: CircuitBreakerRegistry,
    pub metrics: Option<MetricsService>,
}

impl AdminState {
    pub fn new(registry: CircuitBreakerRegistry, metrics: Option<MetricsService>) -> Self {
        Self { registry, metrics }
    }
}

/// Build the admin router
pub fn router(state: AdminState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/circuit-breakers", get(list_breakers))
        .route("/circuit-breakers/:name", get(get_breaker))
        .route("/circuit-breakers/:name/reset", post(reset_breaker))
        .route("/simulate/retry", get(simulate_retry_handler))
        .route("/simulate/circuit-breaker/:name", get(simulate_breaker_handler))
        .route("/simulate/fallback", get(simulate_fallback_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Snapshot plus counters for one breaker
#[derive(Debug, Serialize)]
pub struct BreakerDetail {
    #[serde(flatten)]
    pub snapshot: BreakerSnapshot,
    pub metrics: CircuitBreakerMetrics,
}

async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn list_breakers(State(state): State<AdminState>) -> Json<Vec<BreakerSnapshot>> {
    Json(state.registry.snapshots().await)
}

async fn get_breaker(
    State(state): State<AdminState>,
    Path(name): Path<String>,
) -> Result<Json<BreakerDetail>> {
    let breaker = state
        .registry
        .get(&name)
        .ok_or_else(|| Error::BreakerNotFound(name.clone()))?;

    Ok(Json(BreakerDetail {
        snapshot: breaker.snapshot().await,
        metrics: breaker.metrics().await,
    }))
}

async fn reset_breaker(
    State(state): State<AdminState>,
    Path(name): Path<String>,
) -> Result<Json<BreakerSnapshot>> {
    if !state.registry.reset(&name).await {
        return Err(Error::BreakerNotFound(name));
    }

    info!(breaker = %name, "Circuit breaker reset via admin API");
    state
        .registry
        .snapshot(&name)
        .await
        .map(Json)
        .ok_or(Error::BreakerNotFound(name))
}

#[derive(Debug, Deserialize)]
struct RetrySimulationQuery {
    #[serde(default = "default_max_attempts")]
    max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    base_delay_ms: u64,
    #[serde(default)]
    force_failure: bool,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

async fn simulate_retry_handler(
    Query(query): Query<RetrySimulationQuery>,
) -> Result<Json<RetrySimulation>> {
    if query.max_attempts == 0 || query.max_attempts > MAX_SIMULATED_ATTEMPTS {
        return Err(Error::InvalidRequest(format!(
            "max_attempts must be between 1 and {}",
            MAX_SIMULATED_ATTEMPTS
        )));
    }

    Ok(Json(simulate_retry(
        query.max_attempts,
        Duration::from_millis(query.base_delay_ms),
        query.force_failure,
    )))
}

#[derive(Debug, Deserialize)]
struct BreakerSimulationQuery {
    #[serde(default = "default_failure_count")]
    count: u32,
    threshold: Option<u32>,
}

fn default_failure_count() -> u32 {
    1
}

async fn simulate_breaker_handler(
    State(state): State<AdminState>,
    Path(name): Path<String>,
    Query(query): Query<BreakerSimulationQuery>,
) -> Json<BreakerSimulation> {
    let threshold = query.threshold.unwrap_or_else(|| {
        state
            .registry
            .get(&name)
            .map(|b| b.config().failure_threshold)
            .unwrap_or(state.registry.default_config().failure_threshold)
    });

    Json(
        state
            .registry
            .simulate_failures(&name, query.count, threshold)
            .await,
    )
}

#[derive(Debug, Deserialize)]
struct FallbackSimulationQuery {
    #[serde(default)]
    names: String,
    #[serde(default)]
    force_failure: bool,
}

async fn simulate_fallback_handler(
    Query(query): Query<FallbackSimulationQuery>,
) -> Result<Json<FallbackSimulation>> {
    let names: Vec<String> = query
        .names
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect();

    simulate_fallback(&names, query.force_failure)
        .map(Json)
        .map_err(|e| Error::InvalidRequest(e.to_string()))
}

async fn metrics_handler(State(state): State<AdminState>) -> Response {
    match &state.metrics {
        Some(metrics) => prometheus_response(metrics.render()).into_response(),
        None => (StatusCode::NOT_FOUND, "metrics disabled").into_response(),
    }
}
