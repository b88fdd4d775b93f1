use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use resilience_analyzer::{FailureAnalysis, FailureAnalyzer, FailurePattern};
use resilience_circuitbreaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
use resilience_classifier::{Classifiable, ErrorKind};
use resilience_core::{CancellationSource, CancellationToken, EventListeners};
use resilience_retry::{execute_with_retry, RetryConfig, RetryEvent, RetryOutcome};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::config::ResilienceConfig;
use crate::error::EngineError;
use crate::events::EngineEvent;
use crate::result::{ExecutionAnalysis, ExecutionMode, FailureSummary, ResilienceResult};
use crate::strategy::Strategy;

/// Orchestrates [`resilience_retry`] for single-strategy execution and
/// races alternative [`Strategy`] values through [`Self::execute_alternatives`].
/// Owns one [`CircuitBreaker`] per operation name and a single
/// [`FailureAnalyzer`] shared across every operation this instance serves.
pub struct ResilienceEngine {
    config: ResilienceConfig,
    retry_config: RetryConfig,
    breaker_config: CircuitBreakerConfig,
    breakers: Mutex<HashMap<String, Arc<CircuitBreaker>>>,
    analyzer: Arc<FailureAnalyzer>,
    retry_events: EventListeners<RetryEvent>,
    event_listeners: EventListeners<EngineEvent>,
}

impl ResilienceEngine {
    /// An engine with a fresh, store-less [`FailureAnalyzer`]. Rejects a
    /// config with `persistence_enabled` set — opening the store is async,
    /// so that case must go through [`Self::connect`] instead.
    pub fn new(config: ResilienceConfig) -> Result<Self, EngineError> {
        if config.persistence_enabled {
            return Err(EngineError::PersistenceRequiresConnect);
        }
        let retry_config = config.retry_config()?;
        let breaker_config = CircuitBreakerConfig {
            threshold: config.circuit_breaker_threshold,
            cooldown: config.circuit_breaker_cooldown,
        };
        let analyzer = Arc::new(FailureAnalyzer::new(config.pattern_threshold));
        Ok(Self {
            config,
            retry_config,
            breaker_config,
            breakers: Mutex::new(HashMap::new()),
            analyzer,
            retry_events: EventListeners::new(),
            event_listeners: EventListeners::new(),
        })
    }

    /// An engine whose [`FailureAnalyzer`] is backed by a [`resilience_store::FailureStore`]
    /// when `config.persistence_enabled` is set, opening (or creating) the
    /// SQLite file at `config.store_path`. Falls back to a store-less
    /// analyzer, identical to [`Self::new`], when persistence is disabled.
    pub async fn connect(config: ResilienceConfig) -> Result<Self, EngineError> {
        if !config.persistence_enabled {
            return Self::new(config);
        }
        let retry_config = config.retry_config()?;
        let breaker_config = CircuitBreakerConfig {
            threshold: config.circuit_breaker_threshold,
            cooldown: config.circuit_breaker_cooldown,
        };
        let path = config.store_path.as_deref().ok_or(EngineError::MissingStorePath)?;
        let store = Arc::new(resilience_store::FailureStore::connect(path).await?);
        let analyzer = Arc::new(FailureAnalyzer::with_store(config.pattern_threshold, store).await);
        Ok(Self {
            config,
            retry_config,
            breaker_config,
            breakers: Mutex::new(HashMap::new()),
            analyzer,
            retry_events: EventListeners::new(),
            event_listeners: EventListeners::new(),
        })
    }

    /// An engine sharing a caller-constructed [`FailureAnalyzer`] — the
    /// caller decides whether it is store-backed (persistence/blacklist
    /// stay in [`resilience_analyzer`] and [`resilience_store`], not here).
    pub fn with_analyzer(config: ResilienceConfig, analyzer: Arc<FailureAnalyzer>) -> Result<Self, EngineError> {
        let retry_config = config.retry_config()?;
        let breaker_config = CircuitBreakerConfig {
            threshold: config.circuit_breaker_threshold,
            cooldown: config.circuit_breaker_cooldown,
        };
        Ok(Self {
            config,
            retry_config,
            breaker_config,
            breakers: Mutex::new(HashMap::new()),
            analyzer,
            retry_events: EventListeners::new(),
            event_listeners: EventListeners::new(),
        })
    }

    pub fn event_listeners(&self) -> &EventListeners<EngineEvent> {
        &self.event_listeners
    }

    pub fn retry_event_listeners(&self) -> &EventListeners<RetryEvent> {
        &self.retry_events
    }

    pub fn analyzer(&self) -> &Arc<FailureAnalyzer> {
        &self.analyzer
    }

    pub async fn breaker_state(&self, operation_name: &str) -> Option<CircuitState> {
        let breakers = self.breakers.lock().await;
        breakers.get(operation_name).map(|b| b.state())
    }

    async fn breaker_for(&self, name: &str) -> Arc<CircuitBreaker> {
        let mut breakers = self.breakers.lock().await;
        Arc::clone(
            breakers
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(CircuitBreaker::new(name, self.breaker_config))),
        )
    }

    /// `Execute(op, operation_name, context?)`. Runs `op` under the
    /// per-operation retry policy and circuit breaker; on failure, records
    /// the failure and attaches a pattern analysis plus recommendations.
    pub async fn execute<T, E, F, Fut>(
        &self,
        name: &str,
        context: Option<Value>,
        cancel: &CancellationToken,
        op: F,
    ) -> ResilienceResult<T, E>
    where
        E: Classifiable + std::fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.event_listeners.emit(&EngineEvent::ExecutionStarted {
            name: name.to_string(),
            at: Instant::now(),
        });

        #[cfg(feature = "tracing")]
        if self.analyzer.has_attempted(name).await {
            tracing::warn!(operation = name, "operation has been attempted before");
        }

        let breaker = self.breaker_for(name).await;
        let outcome: RetryOutcome<T, E> =
            execute_with_retry(name, &self.retry_config, &breaker, cancel, &self.retry_events, op).await;

        match outcome {
            RetryOutcome::Success { value, attempts, elapsed } => {
                self.event_listeners.emit(&EngineEvent::ExecutionSucceeded {
                    name: name.to_string(),
                    at: Instant::now(),
                    attempts,
                });
                ResilienceResult::success(value, attempts, vec![name.to_string()], elapsed)
            }
            RetryOutcome::Failed { error, kind, attempts, elapsed } => {
                let message = error.to_string();
                self.analyzer.record_failure(&error, message, name, context).await;
                let analysis = self.analyzer.analyze_pattern(None, None).await;
                let escalation_needed = analysis.failure_count >= self.config.escalate_after_failures;
                if escalation_needed {
                    self.event_listeners.emit(&EngineEvent::EscalationNeeded {
                        name: name.to_string(),
                        at: Instant::now(),
                        failure_count: analysis.failure_count,
                    });
                }
                self.event_listeners.emit(&EngineEvent::ExecutionFailed {
                    name: name.to_string(),
                    at: Instant::now(),
                    attempts,
                });

                let recommendations = self.build_recommendations(kind, &analysis, name);
                let mut analysis: ExecutionAnalysis = analysis.into();
                analysis.recommendations = recommendations;

                ResilienceResult::failure(
                    Some(error),
                    Some(kind),
                    attempts,
                    vec![name.to_string()],
                    elapsed,
                    Some(analysis),
                    escalation_needed,
                )
            }
            RetryOutcome::CircuitOpen { attempts, elapsed } => {
                self.event_listeners.emit(&EngineEvent::ExecutionFailed {
                    name: name.to_string(),
                    at: Instant::now(),
                    attempts,
                });
                ResilienceResult::failure(
                    None,
                    None,
                    attempts,
                    vec![name.to_string()],
                    elapsed,
                    Some(ExecutionAnalysis {
                        pattern: FailurePattern::Permanent,
                        root_cause: None,
                        failure_count: 0,
                        time_span: Duration::ZERO,
                        recommendations: vec![
                            "Circuit breaker open - wait for cooldown before retrying".to_string(),
                        ],
                    }),
                    false,
                )
            }
            RetryOutcome::Cancelled { attempts, elapsed } => ResilienceResult::failure(
                None,
                None,
                attempts,
                vec![name.to_string()],
                elapsed,
                Some(ExecutionAnalysis {
                    pattern: FailurePattern::Permanent,
                    root_cause: None,
                    failure_count: 0,
                    time_span: Duration::ZERO,
                    recommendations: vec!["Execution was cancelled before completion".to_string()],
                }),
                false,
            ),
        }
    }

    /// `ExecuteAlternatives(strategies, operation_name, mode)`. Sorts
    /// descending by priority, then dispatches to sequential or parallel
    /// racing. Empty `strategies` returns immediately with a failed result
    /// and zero attempts.
    pub async fn execute_alternatives<T, E>(
        self: &Arc<Self>,
        strategies: Vec<Strategy<T, E>>,
        name: &str,
        mode: ExecutionMode,
        context: Option<Value>,
        cancel: &CancellationToken,
    ) -> ResilienceResult<T, E>
    where
        T: Send + 'static,
        E: Classifiable + std::fmt::Display + Send + 'static,
    {
        let start = Instant::now();
        if strategies.is_empty() {
            return ResilienceResult::failure(
                None,
                None,
                0,
                Vec::new(),
                start.elapsed(),
                Some(ExecutionAnalysis {
                    pattern: FailurePattern::Permanent,
                    root_cause: None,
                    failure_count: 0,
                    time_span: Duration::ZERO,
                    recommendations: vec!["No alternative strategies were supplied".to_string()],
                }),
                false,
            );
        }

        let mut sorted = strategies;
        sorted.sort_by(|a, b| b.priority.partial_cmp(&a.priority).unwrap_or(std::cmp::Ordering::Equal));

        match mode {
            ExecutionMode::Sequential => self.execute_sequential(sorted, name, context, cancel, start).await,
            ExecutionMode::Parallel => self.execute_parallel(sorted, name, context, cancel, start).await,
        }
    }

    async fn execute_sequential<T, E>(
        &self,
        strategies: Vec<Strategy<T, E>>,
        name: &str,
        context: Option<Value>,
        cancel: &CancellationToken,
        start: Instant,
    ) -> ResilienceResult<T, E>
    where
        E: Classifiable + std::fmt::Display,
    {
        let mut strategies_tried = Vec::with_capacity(strategies.len());
        let mut last_failure: Option<ResilienceResult<T, E>> = None;
        let mut total_cost = 0.0_f64;
        let mut total_attempts = 0_u32;
        let mut budget_exceeded = false;

        for strategy in &strategies {
            if start.elapsed() >= self.config.max_total_wallclock {
                self.event_listeners.emit(&EngineEvent::WallclockExceeded {
                    name: name.to_string(),
                    at: Instant::now(),
                });
                break;
            }

            if total_attempts >= self.config.max_total_attempts {
                self.event_listeners.emit(&EngineEvent::AttemptBudgetExceeded {
                    name: name.to_string(),
                    at: Instant::now(),
                    total_attempts,
                });
                budget_exceeded = true;
                break;
            }

            if total_cost + strategy.cost_estimate > self.config.max_total_cost {
                self.event_listeners.emit(&EngineEvent::CostBudgetExceeded {
                    name: name.to_string(),
                    at: Instant::now(),
                    total_cost,
                });
                budget_exceeded = true;
                break;
            }

            strategies_tried.push(strategy.name.clone());
            self.event_listeners.emit(&EngineEvent::StrategyStarted {
                name: name.to_string(),
                at: Instant::now(),
                strategy: strategy.name.clone(),
            });

            let op_name = format!("{name}::{}", strategy.name);
            let result = tokio::select! {
                biased;
                _ = tokio::time::sleep(self.config.strategy_wallclock) => {
                    self.event_listeners.emit(&EngineEvent::StrategyTimedOut {
                        name: name.to_string(),
                        at: Instant::now(),
                        strategy: strategy.name.clone(),
                    });
                    ResilienceResult::failure(
                        None,
                        None,
                        0,
                        vec![op_name.clone()],
                        start.elapsed(),
                        Some(ExecutionAnalysis {
                            pattern: FailurePattern::Permanent,
                            root_cause: None,
                            failure_count: 0,
                            time_span: Duration::ZERO,
                            recommendations: vec!["Strategy exceeded its wallclock budget".to_string()],
                        }),
                        false,
                    )
                }
                r = self.execute(&op_name, context.clone(), cancel, || strategy.call()) => r,
            };

            total_attempts += result.attempts;
            total_cost += strategy.cost_estimate;

            if result.is_success() {
                self.event_listeners.emit(&EngineEvent::StrategyWon {
                    name: name.to_string(),
                    at: Instant::now(),
                    strategy: strategy.name.clone(),
                });
                let ResilienceResult { value, attempts, .. } = result;
                return ResilienceResult::success(
                    value.expect("is_success implies a value"),
                    attempts,
                    strategies_tried,
                    start.elapsed(),
                );
            }
            last_failure = Some(result);
        }

        self.finish_failed(strategies_tried, last_failure, name, start, budget_exceeded).await
    }

    async fn execute_parallel<T, E>(
        self: &Arc<Self>,
        strategies: Vec<Strategy<T, E>>,
        name: &str,
        context: Option<Value>,
        cancel: &CancellationToken,
        start: Instant,
    ) -> ResilienceResult<T, E>
    where
        T: Send + 'static,
        E: Classifiable + std::fmt::Display + Send + 'static,
    {
        let take = self.config.max_parallel_strategies.min(strategies.len());
        let mut running: Vec<Strategy<T, E>> = Vec::with_capacity(take);
        let mut total_cost = 0.0_f64;
        let mut budget_exceeded = false;
        for strategy in strategies.into_iter().take(take) {
            if total_cost + strategy.cost_estimate > self.config.max_total_cost {
                self.event_listeners.emit(&EngineEvent::CostBudgetExceeded {
                    name: name.to_string(),
                    at: Instant::now(),
                    total_cost,
                });
                budget_exceeded = true;
                break;
            }
            total_cost += strategy.cost_estimate;
            running.push(strategy);
        }

        if running.is_empty() {
            return self.finish_failed(Vec::new(), None, name, start, budget_exceeded).await;
        }

        let sibling_cancel = CancellationSource::new();
        let strategy_wallclock = self.config.strategy_wallclock;

        let (tx, mut rx) = tokio::sync::mpsc::channel::<(String, ResilienceResult<T, E>)>(running.len().max(1));
        let mut handles = Vec::with_capacity(running.len());
        let mut strategies_tried = Vec::with_capacity(running.len());

        for strategy in running {
            let strategy_name = strategy.name.clone();
            strategies_tried.push(strategy_name.clone());
            self.event_listeners.emit(&EngineEvent::StrategyStarted {
                name: name.to_string(),
                at: Instant::now(),
                strategy: strategy_name.clone(),
            });

            let engine = Arc::clone(self);
            let op_name = format!("{name}::{strategy_name}");
            let strategy_context = context.clone();
            let tx = tx.clone();
            let strategy_cancel = sibling_cancel.token();
            let caller_cancel = cancel.clone();
            let timeout_name = name.to_string();
            let timeout_strategy = strategy_name.clone();

            let handle = tokio::spawn(async move {
                let outcome = tokio::select! {
                    biased;
                    _ = caller_cancel.cancelled() => None,
                    _ = tokio::time::sleep(strategy_wallclock) => {
                        engine.event_listeners.emit(&EngineEvent::StrategyTimedOut {
                            name: timeout_name,
                            at: Instant::now(),
                            strategy: timeout_strategy,
                        });
                        None
                    }
                    r = engine.execute(&op_name, strategy_context, &strategy_cancel, || strategy.call()) => Some(r),
                };
                if let Some(result) = outcome {
                    let _ = tx.send((strategy_name, result)).await;
                }
            });
            handles.push(handle);
        }
        drop(tx);

        let deadline = start + self.config.max_total_wallclock;
        let mut winner: Option<ResilienceResult<T, E>> = None;
        let mut last_failure: Option<ResilienceResult<T, E>> = None;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                self.event_listeners.emit(&EngineEvent::WallclockExceeded {
                    name: name.to_string(),
                    at: Instant::now(),
                });
                break;
            }

            match tokio::time::timeout(remaining, rx.recv()).await {
                Ok(Some((strategy_name, result))) => {
                    if result.is_success() {
                        self.event_listeners.emit(&EngineEvent::StrategyWon {
                            name: name.to_string(),
                            at: Instant::now(),
                            strategy: strategy_name,
                        });
                        winner = Some(result);
                        break;
                    }
                    last_failure = Some(result);
                }
                Ok(None) => break,
                Err(_elapsed) => {
                    self.event_listeners.emit(&EngineEvent::WallclockExceeded {
                        name: name.to_string(),
                        at: Instant::now(),
                    });
                    break;
                }
            }
        }

        // Losers receive the cancellation signal and are not awaited for
        // their value.
        sibling_cancel.cancel();
        for handle in handles {
            handle.abort();
        }

        match winner {
            Some(ResilienceResult { value, attempts, .. }) => ResilienceResult::success(
                value.expect("is_success implies a value"),
                attempts,
                strategies_tried,
                start.elapsed(),
            ),
            None => self.finish_failed(strategies_tried, last_failure, name, start, budget_exceeded).await,
        }
    }

    async fn finish_failed<T, E>(
        &self,
        strategies_tried: Vec<String>,
        last_failure: Option<ResilienceResult<T, E>>,
        name: &str,
        start: Instant,
        budget_exceeded: bool,
    ) -> ResilienceResult<T, E>
    where
        E: Classifiable + std::fmt::Display,
    {
        let analysis = self.analyzer.analyze_pattern(None, None).await;
        let escalation_needed = budget_exceeded || analysis.failure_count >= self.config.escalate_after_failures;
        let (error, error_kind) = match last_failure {
            Some(r) => (r.error, r.error_kind),
            None => (None, None),
        };
        let recommendations =
            self.build_recommendations(error_kind.unwrap_or(ErrorKind::Unknown), &analysis, name);
        let mut analysis: ExecutionAnalysis = analysis.into();
        analysis.recommendations = recommendations;

        ResilienceResult::failure(
            error,
            error_kind,
            strategies_tried.len() as u32,
            strategies_tried,
            start.elapsed(),
            Some(analysis),
            escalation_needed,
        )
    }

    /// Union of the analyzer's pattern/root-cause advice and engine-level
    /// kind/pattern hints. Order is stable for testability.
    fn build_recommendations(&self, kind: ErrorKind, analysis: &FailureAnalysis, operation_name: &str) -> Vec<String> {
        let mut recommendations = analysis.recommendations.clone();

        match kind {
            ErrorKind::Authentication => {
                recommendations.push("Authentication error - verify API key configuration".to_string())
            }
            ErrorKind::Network => {
                recommendations.push("Network error - check connectivity and try alternative endpoints".to_string())
            }
            ErrorKind::RateLimit => {
                recommendations.push("Rate limit - consider implementing request throttling".to_string())
            }
            _ => {}
        }

        match analysis.pattern {
            FailurePattern::Repeating => recommendations.push(format!(
                "Operation '{operation_name}' repeatedly failing with same error - consider alternative approach"
            )),
            FailurePattern::UnstableService => {
                recommendations.push("Service appears unstable - implement fallback provider".to_string())
            }
            _ => {}
        }

        if analysis.failure_count >= 3 {
            recommendations.push("Multiple failures detected - manual intervention may be required".to_string());
        }

        if recommendations.is_empty() {
            recommendations.push("No actionable recommendation available - escalate for manual review".to_string());
        }

        recommendations
    }

    /// `GetFailureSummary()`.
    pub async fn get_failure_summary(&self) -> FailureSummary {
        self.analyzer.get_failure_summary().await
    }

    /// `Reset()`: clears in-memory state only; the store (when
    /// attached to the analyzer) is untouched.
    pub async fn reset(&self) {
        self.analyzer.clear_history(None).await;
        self.breakers.lock().await.clear();
    }

    /// Deletes failure rows older than `config.retention_days`, in-memory
    /// and (when attached) in the backing store. Returns the number of
    /// rows removed from the store; a no-op store returns 0.
    pub async fn cleanup_expired(&self) -> u64 {
        let horizon = chrono::Duration::days(self.config.retention_days as i64);
        self.analyzer.cleanup_old_failures(horizon).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug, Clone)]
    struct TestError(&'static str);
    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{}", self.0)
        }
    }

    fn engine(max_attempts: u32) -> Arc<ResilienceEngine> {
        let config = ResilienceConfig::builder()
            .max_attempts(max_attempts)
            .base_delay(Duration::from_millis(1))
            .jitter(false)
            .build()
            .unwrap();
        Arc::new(ResilienceEngine::new(config).unwrap())
    }

    #[tokio::test]
    async fn execute_succeeds_on_first_try() {
        let engine = engine(5);
        let cancel = CancellationToken::never();
        let result: ResilienceResult<&str, TestError> = engine
            .execute("op", None, &cancel, || async { Ok("ok") })
            .await;
        assert!(result.is_success());
        assert_eq!(result.attempts, 1);
        assert_eq!(result.strategies_tried, vec!["op".to_string()]);
    }

    #[tokio::test]
    async fn execute_failure_always_has_recommendations() {
        let engine = engine(1);
        let cancel = CancellationToken::never();
        let result: ResilienceResult<&str, TestError> = engine
            .execute("op", None, &cancel, || async { Err(TestError("401 Unauthorized")) })
            .await;
        assert!(!result.is_success());
        let analysis = result.analysis.unwrap();
        assert!(!analysis.recommendations.is_empty());
        assert!(analysis.recommendations.iter().any(|r| r.contains("credentials") || r.contains("API key")));
    }

    #[tokio::test]
    async fn execute_alternatives_empty_list_returns_empty_failure() {
        let engine = engine(3);
        let cancel = CancellationToken::never();
        let result: ResilienceResult<&str, TestError> = engine
            .execute_alternatives(Vec::new(), "op", ExecutionMode::Sequential, None, &cancel)
            .await;
        assert!(!result.is_success());
        assert_eq!(result.attempts, 0);
        assert!(result.strategies_tried.is_empty());
    }

    #[tokio::test]
    async fn execute_alternatives_sequential_stops_at_first_success() {
        let engine = engine(1);
        let cancel = CancellationToken::never();
        let calls_b = Arc::new(AtomicU32::new(0));
        let calls_b2 = Arc::clone(&calls_b);

        let strategies = vec![
            Strategy::new("a", || async { Err::<&str, _>(TestError("500 Internal Server Error")) })
                .priority(2.0),
            Strategy::new("b", move || {
                let calls_b2 = Arc::clone(&calls_b2);
                async move {
                    calls_b2.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, TestError>("ok")
                }
            })
            .priority(1.0),
        ];

        let result = engine
            .execute_alternatives(strategies, "op", ExecutionMode::Sequential, None, &cancel)
            .await;

        assert!(result.is_success());
        assert_eq!(result.value, Some("ok"));
        assert_eq!(result.strategies_tried, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(calls_b.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn execute_alternatives_parallel_returns_single_winner() {
        let engine = engine(1);
        let cancel = CancellationToken::never();
        let b_ran = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let b_ran2 = Arc::clone(&b_ran);

        let strategies = vec![
            Strategy::new("fast", || async {
                tokio::time::sleep(Duration::from_millis(5)).await;
                Ok::<_, TestError>("fast-value")
            })
            .priority(1.0),
            Strategy::new("slow", move || {
                let b_ran2 = Arc::clone(&b_ran2);
                async move {
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    b_ran2.store(true, Ordering::SeqCst);
                    Ok::<_, TestError>("slow-value")
                }
            })
            .priority(1.0),
        ];

        let start = Instant::now();
        let result = engine
            .execute_alternatives(strategies, "op", ExecutionMode::Parallel, None, &cancel)
            .await;

        assert!(result.is_success());
        assert_eq!(result.value, Some("fast-value"));
        assert!(start.elapsed() < Duration::from_millis(150));
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!b_ran.load(Ordering::SeqCst), "loser should have been aborted before completing");
    }

    #[tokio::test]
    async fn reset_clears_breakers_and_history() {
        let engine = engine(1);
        let cancel = CancellationToken::never();
        let _: ResilienceResult<&str, TestError> = engine
            .execute("op", None, &cancel, || async { Err(TestError("Connection timeout")) })
            .await;
        assert!(engine.breaker_state("op").await.is_some());

        engine.reset().await;
        assert!(engine.breaker_state("op").await.is_none());
        assert_eq!(engine.get_failure_summary().await.total_failures, 0);
    }

    #[test]
    fn new_rejects_persistence_enabled_config() {
        let config = ResilienceConfig::builder().persistence("/tmp/resilience-engine-test.db").build().unwrap();
        let err = ResilienceEngine::new(config).unwrap_err();
        assert!(matches!(err, EngineError::PersistenceRequiresConnect));
    }

    #[tokio::test]
    async fn connect_backs_analyzer_with_a_store() {
        let dir = std::env::temp_dir().join(format!("resilience-engine-test-{}.db", std::process::id()));
        let path = dir.to_str().unwrap().to_string();
        let config = ResilienceConfig::builder()
            .max_attempts(1)
            .persistence(path.clone())
            .build()
            .unwrap();
        let engine = ResilienceEngine::connect(config).await.unwrap();
        let cancel = CancellationToken::never();
        let _: ResilienceResult<&str, TestError> = engine
            .execute("op", None, &cancel, || async { Err(TestError("Connection timeout")) })
            .await;
        assert!(engine.analyzer().analytics().await.is_some());
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn execute_alternatives_stops_when_cost_budget_exceeded() {
        let config = ResilienceConfig::builder()
            .max_attempts(1)
            .base_delay(Duration::from_millis(1))
            .jitter(false)
            .max_total_cost(1.0)
            .build()
            .unwrap();
        let engine = Arc::new(ResilienceEngine::new(config).unwrap());
        let cancel = CancellationToken::never();

        let strategies = vec![
            Strategy::new("a", || async { Err::<&str, _>(TestError("500 Internal Server Error")) })
                .priority(2.0)
                .cost_estimate(0.8),
            Strategy::new("b", || async { Ok::<_, TestError>("ok") })
                .priority(1.0)
                .cost_estimate(0.8),
        ];

        let result = engine
            .execute_alternatives(strategies, "op", ExecutionMode::Sequential, None, &cancel)
            .await;

        assert!(!result.is_success());
        assert_eq!(result.strategies_tried, vec!["a".to_string()]);
        assert!(result.escalation_needed);
    }

    #[tokio::test]
    async fn execute_alternatives_stops_when_attempt_budget_exceeded() {
        let config = ResilienceConfig::builder()
            .max_attempts(1)
            .base_delay(Duration::from_millis(1))
            .jitter(false)
            .max_total_attempts(1)
            .build()
            .unwrap();
        let engine = Arc::new(ResilienceEngine::new(config).unwrap());
        let cancel = CancellationToken::never();

        let strategies = vec![
            Strategy::new("a", || async { Err::<&str, _>(TestError("500 Internal Server Error")) }).priority(2.0),
            Strategy::new("b", || async { Ok::<_, TestError>("ok") }).priority(1.0),
        ];

        let result = engine
            .execute_alternatives(strategies, "op", ExecutionMode::Sequential, None, &cancel)
            .await;

        assert!(!result.is_success());
        assert_eq!(result.strategies_tried, vec!["a".to_string()]);
        assert!(result.escalation_needed);
    }

    #[tokio::test]
    async fn strategy_exceeding_wallclock_is_treated_as_a_failed_attempt() {
        let config = ResilienceConfig::builder()
            .max_attempts(1)
            .base_delay(Duration::from_millis(1))
            .jitter(false)
            .strategy_wallclock(Duration::from_millis(10))
            .build()
            .unwrap();
        let engine = Arc::new(ResilienceEngine::new(config).unwrap());
        let cancel = CancellationToken::never();

        let strategies = vec![
            Strategy::new("slow", || async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok::<_, TestError>("too-late")
            })
            .priority(2.0),
            Strategy::new("fast", || async { Ok::<_, TestError>("ok") }).priority(1.0),
        ];

        let result = engine
            .execute_alternatives(strategies, "op", ExecutionMode::Sequential, None, &cancel)
            .await;

        assert!(result.is_success());
        assert_eq!(result.value, Some("ok"));
        assert_eq!(result.strategies_tried, vec!["slow".to_string(), "fast".to_string()]);
    }

    #[tokio::test]
    async fn cleanup_expired_keeps_failures_within_retention() {
        let engine = engine(1);
        let cancel = CancellationToken::never();
        let _: ResilienceResult<&str, TestError> = engine
            .execute("op", None, &cancel, || async { Err(TestError("Connection timeout")) })
            .await;
        assert_eq!(engine.get_failure_summary().await.total_failures, 1);

        let deleted = engine.cleanup_expired().await;
        assert_eq!(deleted, 0);
        assert_eq!(engine.get_failure_summary().await.total_failures, 1);
    }
}
