use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use resilience::core::CancellationSource;
use resilience::engine::{ExecutionMode, ResilienceConfig, ResilienceEngine, Strategy};

#[derive(Debug)]
struct FlakyError(&'static str);

impl std::fmt::Display for FlakyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[tokio::test]
async fn execute_retries_transient_failures_then_succeeds() {
    let config = ResilienceConfig::builder()
        .max_attempts(5)
        .base_delay(Duration::from_millis(1))
        .max_delay(Duration::from_millis(5))
        .build()
        .unwrap();
    let engine = ResilienceEngine::new(config).unwrap();
    let cancel = CancellationSource::new();

    let attempts = AtomicU32::new(0);
    let result = engine
        .execute("flaky_call", None, &cancel.token(), || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(FlakyError("503 Service Unavailable"))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

    assert!(result.is_success());
    assert_eq!(result.value, Some(2));
    assert_eq!(result.attempts, 3);
}

#[tokio::test]
async fn execute_exhausts_retries_and_carries_recommendations() {
    let config = ResilienceConfig::builder()
        .max_attempts(2)
        .base_delay(Duration::from_millis(1))
        .max_delay(Duration::from_millis(2))
        .build()
        .unwrap();
    let engine = ResilienceEngine::new(config).unwrap();
    let cancel = CancellationSource::new();

    let result = engine
        .execute("always_fails", None, &cancel.token(), || async {
            Err::<u32, _>(FlakyError("connection timeout"))
        })
        .await;

    assert!(!result.is_success());
    let analysis = result.analysis.expect("failure must carry an analysis");
    assert!(!analysis.recommendations.is_empty());
}

#[tokio::test]
async fn execute_alternatives_sequential_stops_at_first_success() {
    let config = ResilienceConfig::builder().max_attempts(1).build().unwrap();
    let engine = Arc::new(ResilienceEngine::new(config).unwrap());
    let cancel = CancellationSource::new();

    let attempted: Arc<std::sync::Mutex<Vec<&'static str>>> = Arc::new(std::sync::Mutex::new(Vec::new()));

    let first_attempted = attempted.clone();
    let first = Strategy::new("primary", move || {
        first_attempted.lock().unwrap().push("primary");
        async { Err::<u32, _>(FlakyError("primary down")) }
    })
    .priority(2.0);

    let second_attempted = attempted.clone();
    let second = Strategy::new("fallback", move || {
        second_attempted.lock().unwrap().push("fallback");
        async { Ok::<_, FlakyError>(7) }
    })
    .priority(1.0);

    let result = engine
        .execute_alternatives(vec![first, second], "lookup", ExecutionMode::Sequential, None, &cancel.token())
        .await;

    assert!(result.is_success());
    assert_eq!(result.value, Some(7));
    assert_eq!(result.strategies_tried, vec!["primary".to_string(), "fallback".to_string()]);
    assert_eq!(*attempted.lock().unwrap(), vec!["primary", "fallback"]);
}

#[tokio::test]
async fn execute_alternatives_empty_list_fails_immediately() {
    let config = ResilienceConfig::builder().build().unwrap();
    let engine = Arc::new(ResilienceEngine::new(config).unwrap());
    let cancel = CancellationSource::new();

    let result: resilience::engine::ResilienceResult<u32, FlakyError> = engine
        .execute_alternatives(Vec::new(), "lookup", ExecutionMode::Sequential, None, &cancel.token())
        .await;

    assert!(!result.is_success());
    assert_eq!(result.attempts, 0);
}

#[tokio::test]
async fn reset_clears_breaker_and_failure_history() {
    let config = ResilienceConfig::builder().max_attempts(1).circuit_breaker_threshold(1).build().unwrap();
    let engine = ResilienceEngine::new(config).unwrap();
    let cancel = CancellationSource::new();

    let _ = engine.execute("op", None, &cancel.token(), || async { Err::<u32, _>(FlakyError("boom")) }).await;
    assert!(engine.get_failure_summary().await.total_failures > 0);

    engine.reset().await;
    assert_eq!(engine.get_failure_summary().await.total_failures, 0);
}
