use super::types::{FallbackAttempt, FallbackOption, FallbackOutcome};
use crate::error::ResilienceError;
use crate::metrics;
use std::fmt::Display;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// Ordered list of alternative operations; the first success wins.
///
/// Options run strictly one after another and nothing after the first
/// success is invoked.
#[derive(Debug)]
pub struct FallbackChain<T, E> {
    options: Vec<FallbackOption<T, E>>,
}

impl<T, E> Default for FallbackChain<T, E> {
    fn default() -> Self {
        Self {
            options: Vec::new(),
        }
    }
}

impl<T, E> FallbackChain<T, E>
where
    E: Display,
{
    pub fn new(options: Vec<FallbackOption<T, E>>) -> Self {
        Self { options }
    }

    /// Append an option at the lowest priority
    pub fn push(mut self, option: FallbackOption<T, E>) -> Self {
        self.options.push(option);
        self
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// Run the options in order until one succeeds
    pub async fn execute(self) -> Result<FallbackOutcome<T>, ResilienceError<E>> {
        if self.options.is_empty() {
            return Err(ResilienceError::NoFallbackOptions);
        }

        let total = self.options.len();
        let mut attempts = Vec::with_capacity(total);

        for (index, option) in self.options.into_iter().enumerate() {
            let (name, operation) = option.into_parts();
            debug!(option = %name, position = index + 1, total, "Trying fallback option");

            match operation.await {
                Ok(result) => {
                    metrics::record_fallback_option(&name, true);
                    if index > 0 {
                        debug!(option = %name, "Fallback option succeeded");
                    }
                    attempts.push(FallbackAttempt::succeeded(name.clone()));
                    return Ok(FallbackOutcome {
                        result,
                        source: name,
                        attempts,
                    });
                }
                Err(e) => {
                    warn!(option = %name, error = %e, "Fallback option failed");
                    metrics::record_fallback_option(&name, false);
                    attempts.push(FallbackAttempt::failed(name, e.to_string()));
                }
            }
        }

        error!(options = total, "All fallback options failed");
        Err(ResilienceError::AllFallbacksFailed { attempts })
    }

    /// Run the chain, abandoning the option in flight if `token` is cancelled
    pub async fn execute_cancellable(
        self,
        token: &CancellationToken,
    ) -> Result<FallbackOutcome<T>, ResilienceError<E>> {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                warn!("Fallback chain cancelled by caller");
                Err(ResilienceError::Cancelled)
            }
            result = self.execute() => result,
        }
    }
}

/// Run `options` in order and return the first success
pub async fn execute_with_fallback<T, E: Display>(
    options: Vec<FallbackOption<T, E>>,
) -> Result<FallbackOutcome<T>, ResilienceError<E>> {
    FallbackChain::new(options).execute().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UpstreamError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn counted(
        name: &str,
        counter: &Arc<AtomicU32>,
        outcome: Result<&'static str, UpstreamError>,
    ) -> FallbackOption<&'static str, UpstreamError> {
        let counter = counter.clone();
        FallbackOption::new(name, move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            outcome
        })
    }

    #[tokio::test]
    async fn test_first_success_short_circuits() {
        let a = Arc::new(AtomicU32::new(0));
        let b = Arc::new(AtomicU32::new(0));
        let c = Arc::new(AtomicU32::new(0));

        let outcome = FallbackChain::new(vec![
            counted("A", &a, Err(UpstreamError::status(503, "A down"))),
            counted("B", &b, Ok("from B")),
            counted("C", &c, Ok("from C")),
        ])
        .execute()
        .await
        .unwrap();

        assert_eq!(outcome.result, "from B");
        assert_eq!(outcome.source, "B");
        assert_eq!(a.load(Ordering::SeqCst), 1);
        assert_eq!(b.load(Ordering::SeqCst), 1);
        assert_eq!(c.load(Ordering::SeqCst), 0);
        assert_eq!(
            outcome.attempts,
            vec![
                FallbackAttempt::failed("A", "A down"),
                FallbackAttempt::succeeded("B"),
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_chain_fails_immediately() {
        let result = FallbackChain::<(), UpstreamError>::default().execute().await;
        assert!(matches!(result, Err(ResilienceError::NoFallbackOptions)));
    }

    #[tokio::test]
    async fn test_all_failing_options_are_recorded() {
        let counter = Arc::new(AtomicU32::new(0));
        let result = execute_with_fallback(vec![
            counted("primary", &counter, Err(UpstreamError::status(500, "primary"))),
            counted("secondary", &counter, Err(UpstreamError::status(400, "secondary"))),
        ])
        .await;

        match result {
            Err(ResilienceError::AllFallbacksFailed { attempts }) => {
                assert_eq!(attempts.len(), 2);
                assert!(attempts.iter().all(|a| !a.succeeded));
                assert_eq!(attempts[1].error_message.as_deref(), Some("secondary"));
            }
            other => panic!("expected AllFallbacksFailed, got {:?}", other),
        }
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_push_builds_in_priority_order() {
        let counter = Arc::new(AtomicU32::new(0));
        let chain = FallbackChain::default()
            .push(counted("cache", &counter, Ok("cached")))
            .push(counted("live", &counter, Ok("live")));
        assert_eq!(chain.len(), 2);

        let outcome = chain.execute().await.unwrap();
        assert_eq!(outcome.source, "cache");
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_stops_option_in_flight() {
        let later = Arc::new(AtomicU32::new(0));
        let token = CancellationToken::new();

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });

        let result = FallbackChain::new(vec![
            FallbackOption::new("slow", || async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok::<_, UpstreamError>("slow")
            }),
            counted("later", &later, Ok("later")),
        ])
        .execute_cancellable(&token)
        .await;

        assert!(matches!(result, Err(ResilienceError::Cancelled)));
        assert_eq!(later.load(Ordering::SeqCst), 0);
    }
}
