use resilience::fallback::{execute_with_fallback, simulate_fallback, FallbackChain, FallbackOption};
use resilience::{ResilienceError, UpstreamError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[tokio::test]
async fn test_fallback_short_circuit() {
    let c_called = Arc::new(AtomicBool::new(false));
    let flag = c_called.clone();

    let outcome = execute_with_fallback(vec![
        FallbackOption::new("A", || async {
            Err::<&str, _>(UpstreamError::status(500, "A failed"))
        }),
        FallbackOption::new("B", || async { Ok("B result") }),
        FallbackOption::new("C", move || async move {
            flag.store(true, Ordering::SeqCst);
            Ok("C result")
        }),
    ])
    .await
    .unwrap();

    assert_eq!(outcome.source, "B");
    assert_eq!(outcome.result, "B result");
    assert!(!c_called.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_fallback_exhaustion() {
    let result = FallbackChain::new(vec![
        FallbackOption::new("primary", || async {
            Err::<(), _>(UpstreamError::status(503, "primary unavailable"))
        }),
        FallbackOption::new("secondary", || async {
            Err::<(), _>(UpstreamError::other("secondary misconfigured"))
        }),
    ])
    .execute()
    .await;

    let err = result.unwrap_err();
    assert_eq!(err.status_code(), http::StatusCode::SERVICE_UNAVAILABLE);
    match err {
        ResilienceError::AllFallbacksFailed { attempts } => {
            let names: Vec<&str> = attempts.iter().map(|a| a.option_name.as_str()).collect();
            assert_eq!(names, vec!["primary", "secondary"]);
            assert_eq!(
                attempts[0].error_message.as_deref(),
                Some("primary unavailable")
            );
        }
        other => panic!("expected AllFallbacksFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_no_options() {
    let result = execute_with_fallback::<(), UpstreamError>(vec![]).await;
    assert!(matches!(result, Err(ResilienceError::NoFallbackOptions)));
}

#[test]
fn test_simulated_chain_always_terminates_successfully() {
    let names: Vec<String> = ["gpt-4o", "claude", "llama"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    let forced = simulate_fallback(&names, true).unwrap();
    assert_eq!(forced.source, "llama");
    assert_eq!(forced.attempts.len(), 3);

    let unforced = simulate_fallback(&names, false).unwrap();
    assert_eq!(unforced.source, "gpt-4o");
    assert_eq!(unforced.attempts.len(), 1);
}
