use std::future::Future;
use std::time::{Duration, Instant};

use resilience_circuitbreaker::CircuitBreaker;
use resilience_classifier::{Classifiable, ErrorKind};
use resilience_core::{CancellationToken, EventListeners};

use crate::backoff::RetryConfig;
use crate::events::RetryEvent;

/// Outcome of [`execute_with_retry`]. Distinct from the caller's own
/// `Result<T, E>` so attempts/elapsed/kind bookkeeping doesn't have to be
/// threaded through the caller's error type.
#[derive(Debug)]
pub enum RetryOutcome<T, E> {
    Success {
        value: T,
        attempts: u32,
        elapsed: Duration,
    },
    Failed {
        error: E,
        kind: ErrorKind,
        attempts: u32,
        elapsed: Duration,
    },
    /// The breaker refused the very first attempt: no caller error exists
    /// to report, since `E` carries no sentinel "no error yet" value.
    CircuitOpen {
        attempts: u32,
        elapsed: Duration,
    },
    Cancelled {
        attempts: u32,
        elapsed: Duration,
    },
}

impl<T, E> RetryOutcome<T, E> {
    pub fn is_success(&self) -> bool {
        matches!(self, RetryOutcome::Success { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            RetryOutcome::Success { attempts, .. }
            | RetryOutcome::Failed { attempts, .. }
            | RetryOutcome::CircuitOpen { attempts, .. }
            | RetryOutcome::Cancelled { attempts, .. } => *attempts,
        }
    }

    pub fn elapsed(&self) -> Duration {
        match self {
            RetryOutcome::Success { elapsed, .. }
            | RetryOutcome::Failed { elapsed, .. }
            | RetryOutcome::CircuitOpen { elapsed, .. }
            | RetryOutcome::Cancelled { elapsed, .. } => *elapsed,
        }
    }
}

/// Runs `op` under `config`'s backoff schedule, gated by `breaker`,
/// classifying failures via [`Classifiable`]: breaker gate before every
/// attempt, classify-then-decide on failure, `RateLimit` enforces a 10s
/// delay floor.
pub async fn execute_with_retry<T, E, F, Fut>(
    name: &str,
    config: &RetryConfig,
    breaker: &CircuitBreaker,
    cancel: &CancellationToken,
    listeners: &EventListeners<RetryEvent>,
    mut op: F,
) -> RetryOutcome<T, E>
where
    E: Classifiable,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let start = Instant::now();
    let mut last_error: Option<E> = None;
    let mut last_kind = ErrorKind::Unknown;

    for attempt in 0..config.max_attempts {
        if cancel.is_cancelled() {
            listeners.emit(&RetryEvent::Cancelled {
                name: name.to_string(),
                at: Instant::now(),
                attempts: attempt,
            });
            return RetryOutcome::Cancelled {
                attempts: attempt,
                elapsed: start.elapsed(),
            };
        }

        if !breaker.allow() {
            return match last_error {
                Some(error) => RetryOutcome::Failed {
                    error,
                    kind: last_kind,
                    attempts: attempt,
                    elapsed: start.elapsed(),
                },
                None => RetryOutcome::CircuitOpen {
                    attempts: attempt,
                    elapsed: start.elapsed(),
                },
            };
        }

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                listeners.emit(&RetryEvent::Cancelled {
                    name: name.to_string(),
                    at: Instant::now(),
                    attempts: attempt,
                });
                return RetryOutcome::Cancelled { attempts: attempt, elapsed: start.elapsed() };
            }
            r = op() => r,
        };

        match result {
            Ok(value) => {
                breaker.on_success();
                #[cfg(feature = "tracing")]
                tracing::debug!(retry = name, attempts = attempt + 1, "operation succeeded");
                #[cfg(feature = "metrics")]
                metrics::histogram!("resilience_retry_attempts", "operation" => name.to_string())
                    .record((attempt + 1) as f64);
                listeners.emit(&RetryEvent::Success {
                    name: name.to_string(),
                    at: Instant::now(),
                    attempts: attempt + 1,
                });
                return RetryOutcome::Success {
                    value,
                    attempts: attempt + 1,
                    elapsed: start.elapsed(),
                };
            }
            Err(error) => {
                let kind = error.error_kind();
                breaker.on_failure();
                last_kind = kind;

                if !kind.is_retryable() {
                    listeners.emit(&RetryEvent::NotRetryable {
                        name: name.to_string(),
                        at: Instant::now(),
                    });
                    return RetryOutcome::Failed {
                        error,
                        kind,
                        attempts: attempt + 1,
                        elapsed: start.elapsed(),
                    };
                }

                if attempt + 1 >= config.max_attempts {
                    last_error = Some(error);
                    break;
                }

                let mut delay = config.next_delay(attempt);
                if let Some(floor) = kind.retry_delay_floor() {
                    delay = delay.max(floor);
                }

                #[cfg(feature = "metrics")]
                metrics::counter!("resilience_retry_attempts_total", "operation" => name.to_string())
                    .increment(1);
                listeners.emit(&RetryEvent::Retry {
                    name: name.to_string(),
                    at: Instant::now(),
                    attempt,
                    delay,
                });

                last_error = Some(error);

                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        listeners.emit(&RetryEvent::Cancelled {
                            name: name.to_string(),
                            at: Instant::now(),
                            attempts: attempt + 1,
                        });
                        return RetryOutcome::Cancelled { attempts: attempt + 1, elapsed: start.elapsed() };
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
    }

    listeners.emit(&RetryEvent::Exhausted {
        name: name.to_string(),
        at: Instant::now(),
        attempts: config.max_attempts,
    });
    RetryOutcome::Failed {
        error: last_error.expect("loop always records an error before exhausting attempts"),
        kind: last_kind,
        attempts: config.max_attempts,
        elapsed: start.elapsed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resilience_circuitbreaker::CircuitBreakerConfig;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[derive(Debug, Clone)]
    struct TestError(&'static str);
    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{}", self.0)
        }
    }

    fn never_open_breaker() -> CircuitBreaker {
        CircuitBreaker::new(
            "test",
            CircuitBreakerConfig {
                threshold: 1000,
                cooldown: Duration::from_secs(60),
            },
        )
    }

    #[tokio::test]
    async fn succeeds_without_retry_on_first_try() {
        let breaker = never_open_breaker();
        let cancel = resilience_core::CancellationToken::never();
        let listeners = EventListeners::new();
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);

        let config = RetryConfig::builder().max_attempts(5).jitter(false).build().unwrap();
        let outcome: RetryOutcome<&str, TestError> = execute_with_retry(
            "op",
            &config,
            &breaker,
            &cancel,
            &listeners,
            move || {
                let c = Arc::clone(&c);
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, TestError>("ok")
                }
            },
        )
        .await;

        assert!(outcome.is_success());
        assert_eq!(outcome.attempts(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_transient_failures_then_succeeds() {
        let breaker = never_open_breaker();
        let cancel = resilience_core::CancellationToken::never();
        let listeners = EventListeners::new();
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);

        let config = RetryConfig::builder()
            .max_attempts(5)
            .base_delay(Duration::from_millis(1))
            .jitter(false)
            .build()
            .unwrap();

        let outcome: RetryOutcome<&str, TestError> = execute_with_retry(
            "op",
            &config,
            &breaker,
            &cancel,
            &listeners,
            move || {
                let c = Arc::clone(&c);
                async move {
                    let n = c.fetch_add(1, Ordering::SeqCst);
                    if n < 2 {
                        Err(TestError("Connection timeout"))
                    } else {
                        Ok::<_, TestError>("ok")
                    }
                }
            },
        )
        .await;

        assert!(outcome.is_success());
        assert_eq!(outcome.attempts(), 3);
    }

    #[tokio::test]
    async fn non_retryable_error_stops_immediately() {
        let breaker = never_open_breaker();
        let cancel = resilience_core::CancellationToken::never();
        let listeners = EventListeners::new();
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);

        let config = RetryConfig::builder().max_attempts(5).jitter(false).build().unwrap();
        let outcome: RetryOutcome<&str, TestError> = execute_with_retry(
            "op",
            &config,
            &breaker,
            &cancel,
            &listeners,
            move || {
                let c = Arc::clone(&c);
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err::<&str, _>(TestError("401 Unauthorized"))
                }
            },
        )
        .await;

        match outcome {
            RetryOutcome::Failed { kind, attempts, .. } => {
                assert_eq!(kind, ErrorKind::Authentication);
                assert_eq!(attempts, 1);
            }
            other => panic!("expected Failed, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn max_attempts_one_never_retries() {
        let breaker = never_open_breaker();
        let cancel = resilience_core::CancellationToken::never();
        let listeners = EventListeners::new();
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);

        let config = RetryConfig::builder().max_attempts(1).jitter(false).build().unwrap();
        let outcome: RetryOutcome<&str, TestError> = execute_with_retry(
            "op",
            &config,
            &breaker,
            &cancel,
            &listeners,
            move || {
                let c = Arc::clone(&c);
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err::<&str, _>(TestError("Connection timeout"))
                }
            },
        )
        .await;

        assert_eq!(outcome.attempts(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn circuit_open_before_first_attempt_reports_no_error() {
        let breaker = CircuitBreaker::new(
            "test",
            CircuitBreakerConfig {
                threshold: 1,
                cooldown: Duration::from_secs(60),
            },
        );
        breaker.on_failure(); // opens it
        let cancel = resilience_core::CancellationToken::never();
        let listeners = EventListeners::new();

        let config = RetryConfig::builder().max_attempts(3).jitter(false).build().unwrap();
        let outcome: RetryOutcome<&str, TestError> = execute_with_retry(
            "op",
            &config,
            &breaker,
            &cancel,
            &listeners,
            move || async move { Ok::<_, TestError>("unreachable") },
        )
        .await;

        assert!(matches!(outcome, RetryOutcome::CircuitOpen { attempts: 0, .. }));
    }

    #[tokio::test]
    async fn cancellation_stops_before_next_attempt() {
        let breaker = never_open_breaker();
        let source = resilience_core::CancellationSource::new();
        let cancel = source.token();
        let listeners = EventListeners::new();
        source.cancel();

        let config = RetryConfig::builder().max_attempts(5).jitter(false).build().unwrap();
        let outcome: RetryOutcome<&str, TestError> = execute_with_retry(
            "op",
            &config,
            &breaker,
            &cancel,
            &listeners,
            move || async move { Ok::<_, TestError>("unreachable") },
        )
        .await;

        assert!(matches!(outcome, RetryOutcome::Cancelled { attempts: 0, .. }));
    }

    #[tokio::test]
    async fn rate_limit_enforces_ten_second_floor() {
        tokio::time::pause();
        let breaker = never_open_breaker();
        let cancel = resilience_core::CancellationToken::never();
        let listeners = EventListeners::new();
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);

        let config = RetryConfig::builder()
            .max_attempts(2)
            .base_delay(Duration::from_millis(100))
            .jitter(false)
            .build()
            .unwrap();

        let start = tokio::time::Instant::now();
        let handle = tokio::spawn(async move {
            execute_with_retry::<&str, TestError, _, _>(
                "op",
                &config,
                &breaker,
                &cancel,
                &listeners,
                move || {
                    let c = Arc::clone(&c);
                    async move {
                        let n = c.fetch_add(1, Ordering::SeqCst);
                        if n == 0 {
                            Err(TestError("429 Too Many Requests"))
                        } else {
                            Ok::<_, TestError>("ok")
                        }
                    }
                },
            )
            .await
        });

        tokio::time::advance(Duration::from_secs(11)).await;
        let outcome = handle.await.unwrap();
        assert!(outcome.is_success());
        assert!(start.elapsed() >= Duration::from_secs(10));
    }
}
