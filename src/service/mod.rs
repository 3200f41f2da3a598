use crate::circuit_breaker::CircuitBreakerRegistry;
use crate::config::ResilienceConfig;
use crate::error::ResilienceError;
use crate::fallback::{FallbackAttempt, FallbackChain, FallbackOption, FallbackOutcome};
use crate::retry::{Classify, RetryExecutor, RetryPolicy};
use std::fmt::Display;
use std::future::Future;
use tracing::{debug, warn};

/// Facade composing breaker, retry and fallback for named upstream services
#[derive(Debug, Clone)]
pub struct ResilienceService {
    registry: CircuitBreakerRegistry,
    retry: RetryExecutor,
}

impl ResilienceService {
    pub fn new(registry: CircuitBreakerRegistry, retry: RetryPolicy) -> Self {
        Self {
            registry,
            retry: RetryExecutor::new(retry),
        }
    }

    /// Build the service from configuration, registering configured services
    pub fn from_config(config: &ResilienceConfig) -> Self {
        let registry = CircuitBreakerRegistry::new(config.circuit_breaker.clone());
        for (name, breaker_config) in &config.services {
            registry.get_or_create(name, Some(breaker_config.clone()));
        }
        Self::new(registry, config.retry.clone())
    }

    pub fn registry(&self) -> &CircuitBreakerRegistry {
        &self.registry
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        self.retry.policy()
    }

    /// Call `f` with retries, guarded by the breaker for `service`.
    ///
    /// The whole retried call counts as one breaker outcome.
    pub async fn call<F, Fut, T, E>(&self, service: &str, f: F) -> Result<T, ResilienceError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Classify + Display,
    {
        let breaker = self.registry.get_or_create(service, None);
        breaker.call(|| self.retry.execute(f)).await
    }

    /// Like [`call`](Self::call), falling back to `fallbacks` in order when the
    /// protected call fails for any reason, including an open circuit.
    pub async fn call_with_fallback<F, Fut, T, E>(
        &self,
        service: &str,
        f: F,
        fallbacks: Vec<FallbackOption<T, E>>,
    ) -> Result<FallbackOutcome<T>, ResilienceError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Classify + Display,
    {
        match self.call(service, f).await {
            Ok(result) => Ok(FallbackOutcome {
                result,
                source: service.to_string(),
                attempts: vec![FallbackAttempt::succeeded(service)],
            }),
            Err(e) if fallbacks.is_empty() => Err(e),
            Err(e) => {
                warn!(service, error = %e, "Protected call failed, trying fallbacks");
                debug!(service, fallbacks = fallbacks.len(), "Starting fallback chain");
                FallbackChain::new(fallbacks).execute().await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit_breaker::{CircuitBreakerConfig, CircuitState};
    use crate::error::UpstreamError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn service(failure_threshold: u32) -> ResilienceService {
        ResilienceService::new(
            CircuitBreakerRegistry::new(CircuitBreakerConfig {
                failure_threshold,
                ..Default::default()
            }),
            RetryPolicy {
                max_attempts: 3,
                base_delay_ms: 100,
                max_delay_ms: 10000,
                jitter: false,
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_retries_inside_breaker() {
        let svc = service(5);
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result = svc
            .call("openai", || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(UpstreamError::status(500, "flaky"))
                    } else {
                        Ok("answer")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "answer");
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        let snapshot = svc.registry().snapshot("openai").await.unwrap();
        assert_eq!(snapshot.state, CircuitState::Closed);
        assert_eq!(snapshot.failure_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_count_as_one_breaker_failure() {
        let svc = service(2);

        for _ in 0..2 {
            let result = svc
                .call("openai", || async {
                    Err::<(), _>(UpstreamError::status(503, "down"))
                })
                .await;
            assert!(matches!(result, Err(ResilienceError::Operation(_))));
        }

        let result = svc
            .call("openai", || async { Ok::<_, UpstreamError>(()) })
            .await;
        assert!(result.unwrap_err().is_circuit_open());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fallback_after_open_circuit() {
        let svc = service(1);
        let _ = svc
            .call("openai", || async {
                Err::<&str, _>(UpstreamError::status(400, "bad prompt"))
            })
            .await;

        let outcome = svc
            .call_with_fallback(
                "openai",
                || async { Ok::<_, UpstreamError>("primary") },
                vec![FallbackOption::new("anthropic", || async {
                    Ok::<_, UpstreamError>("secondary")
                })],
            )
            .await
            .unwrap();

        assert_eq!(outcome.source, "anthropic");
        assert_eq!(outcome.result, "secondary");
    }

    #[tokio::test]
    async fn test_primary_success_reports_service_as_source() {
        let svc = service(5);
        let outcome = svc
            .call_with_fallback(
                "cohere",
                || async { Ok::<_, UpstreamError>(42) },
                vec![FallbackOption::new("never", || async {
                    Ok::<_, UpstreamError>(0)
                })],
            )
            .await
            .unwrap();

        assert_eq!(outcome.source, "cohere");
        assert_eq!(outcome.result, 42);
    }

    #[tokio::test]
    async fn test_from_config_registers_services() {
        let config = ResilienceConfig::from_yaml(
            "services:\n  groq:\n    failure_threshold: 1\n",
        )
        .unwrap();
        let svc = ResilienceService::from_config(&config);

        let breaker = svc.registry().get("groq").unwrap();
        assert_eq!(breaker.config().failure_threshold, 1);
    }
}
