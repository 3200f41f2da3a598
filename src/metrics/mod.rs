use crate::error::{Error, Result};
use axum::{http::header, response::IntoResponse};
use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;
use tracing::{debug, info};

/// Metrics service for collecting and exposing Prometheus metrics
#[derive(Clone)]
pub struct MetricsService {
    handle: Arc<PrometheusHandle>,
}

impl std::fmt::Debug for MetricsService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsService")
            .field("handle", &"<PrometheusHandle>")
            .finish()
    }
}

impl MetricsService {
    /// Create a new metrics service and install it as the global recorder
    pub fn new() -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| Error::Internal(format!("Failed to install metrics recorder: {}", e)))?;

        Self::register_metrics();

        info!("Metrics service initialized successfully");

        Ok(Self {
            handle: Arc::new(handle),
        })
    }

    /// Register all metrics with descriptions
    fn register_metrics() {
        // Retry metrics
        describe_counter!(
            "resilience_retry_attempts_total",
            "Total number of operation attempts made by the retry executor"
        );

        // Circuit breaker metrics
        describe_gauge!(
            "resilience_circuit_breaker_state",
            "Circuit breaker state (0 = closed, 1 = open, 2 = half-open)"
        );
        describe_counter!(
            "resilience_circuit_breaker_transitions_total",
            "Total number of circuit breaker state transitions"
        );
        describe_counter!(
            "resilience_circuit_breaker_rejections_total",
            "Total number of calls rejected by an open circuit breaker"
        );

        // Fallback metrics
        describe_counter!(
            "resilience_fallback_options_total",
            "Total number of fallback options tried"
        );

        debug!("All metrics registered with descriptions");
    }

    /// Render metrics in Prometheus format
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Prometheus text response for a rendered snapshot
pub fn prometheus_response(body: String) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body)
}

/// Record one retry attempt. Outcome is "success", "retryable" or "terminal".
pub fn record_retry_attempt(outcome: &str) {
    let labels = [("outcome", outcome.to_string())];
    counter!("resilience_retry_attempts_total", &labels).increment(1);
}

/// Record circuit breaker state
/// State: 0 = Closed, 1 = Open, 2 = HalfOpen
pub fn record_circuit_breaker_state(breaker: &str, state: u8) {
    let labels = [("breaker", breaker.to_string())];
    gauge!("resilience_circuit_breaker_state", &labels).set(state as f64);
}

/// Record circuit breaker transition
pub fn record_circuit_breaker_transition(breaker: &str, from_state: &str, to_state: &str) {
    let labels = [
        ("breaker", breaker.to_string()),
        ("from", from_state.to_string()),
        ("to", to_state.to_string()),
    ];
    counter!("resilience_circuit_breaker_transitions_total", &labels).increment(1);
}

/// Record a call rejected while the circuit is open
pub fn record_circuit_breaker_rejection(breaker: &str) {
    let labels = [("breaker", breaker.to_string())];
    counter!("resilience_circuit_breaker_rejections_total", &labels).increment(1);
}

/// Record one fallback option tried
pub fn record_fallback_option(option: &str, succeeded: bool) {
    let labels = [
        ("option", option.to_string()),
        ("outcome", if succeeded { "success" } else { "failure" }.to_string()),
    ];
    counter!("resilience_fallback_options_total", &labels).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_metrics_service_creation() {
        // The global recorder can only be installed once per process
        match MetricsService::new() {
            Ok(service) => {
                record_circuit_breaker_rejection("render-check");
                assert!(service.render().contains("resilience_circuit_breaker_rejections_total"));
            }
            Err(e) => {
                assert!(e.to_string().contains("recorder") || e.to_string().contains("install"));
            }
        }
    }

    #[test]
    fn test_record_functions_dont_panic() {
        // These functions should not panic even if recorder isn't installed
        record_retry_attempt("retryable");
        record_circuit_breaker_state("openai", 0);
        record_circuit_breaker_transition("openai", "Closed", "Open");
        record_circuit_breaker_rejection("openai");
        record_fallback_option("local-model", true);
    }
}
