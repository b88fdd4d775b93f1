use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use resilience_classifier::{Classifiable, ErrorKind};
use resilience_store::FailureStore;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::failure::{Failure, FailureAnalysis, FailurePattern, RootCause};
use crate::rootcause;

const DEFAULT_PATTERN_THRESHOLD: usize = 3;
const RECENT_WINDOW: usize = 10;

#[derive(Debug, Clone, Default)]
pub struct FailureSummary {
    pub total_failures: usize,
    pub unique_operations: usize,
    pub error_kind_distribution: Vec<(ErrorKind, usize)>,
    pub most_common_error: Option<ErrorKind>,
    pub time_span: Duration,
}

struct State {
    history: VecDeque<Failure>,
    attempted: HashSet<String>,
}

/// Detects failure patterns and avoids repeating failed approaches.
///
/// Works purely in-memory, or (when constructed [`FailureAnalyzer::with_store`])
/// on top of a [`FailureStore`] for cross-restart learning and blacklist
/// durability. Every store-backed method degrades to a warned no-op when
/// persistence was never attached.
pub struct FailureAnalyzer {
    pattern_threshold: usize,
    store: Option<Arc<FailureStore>>,
    state: Mutex<State>,
}

impl FailureAnalyzer {
    pub fn new(pattern_threshold: usize) -> Self {
        Self {
            pattern_threshold,
            store: None,
            state: Mutex::new(State {
                history: VecDeque::new(),
                attempted: HashSet::new(),
            }),
        }
    }

    /// Attaches a store and seeds the in-memory ring with its last ≤1000
    /// failures from the last 7 days.
    pub async fn with_store(pattern_threshold: usize, store: Arc<FailureStore>) -> Self {
        let analyzer = Self {
            pattern_threshold,
            store: Some(store),
            state: Mutex::new(State {
                history: VecDeque::new(),
                attempted: HashSet::new(),
            }),
        };
        analyzer.seed_recent_failures(ChronoDuration::days(7), 1000).await;
        analyzer
    }

    async fn seed_recent_failures(&self, window: ChronoDuration, limit: i64) {
        let Some(store) = &self.store else { return };
        let since = Utc::now() - window;
        match store.get_failures(None, None, Some(since), limit).await {
            Ok(rows) => {
                let mut state = self.state.lock().await;
                for row in rows {
                    let kind = ErrorKind::ALL
                        .iter()
                        .copied()
                        .find(|k| k.as_str() == row.error_kind)
                        .unwrap_or(ErrorKind::Unknown);
                    state.attempted.insert(row.operation.clone());
                    state.history.push_back(Failure {
                        timestamp: row.timestamp,
                        kind,
                        message: row.error_message,
                        operation: row.operation,
                        context: row.context,
                        stack: row.stack,
                    });
                }
                #[cfg(feature = "tracing")]
                tracing::info!(loaded = state.history.len(), "seeded failure history from store");
            }
            Err(_err) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(error = %_err, "failed to load recent failures from store");
            }
        }
    }

    pub async fn record_failure(
        &self,
        err: &impl Classifiable,
        message: impl Into<String>,
        operation: impl Into<String>,
        context: Option<Value>,
    ) -> Failure {
        let operation = operation.into();
        let failure = Failure {
            timestamp: Utc::now(),
            kind: err.error_kind(),
            message: message.into(),
            operation: operation.clone(),
            context: context.clone(),
            stack: None,
        };

        {
            let mut state = self.state.lock().await;
            state.history.push_back(failure.clone());
            state.attempted.insert(operation.clone());
        }

        if let Some(store) = &self.store {
            let result = store
                .save_failure(
                    failure.timestamp,
                    failure.kind,
                    &failure.message,
                    &failure.operation,
                    context.as_ref(),
                    None,
                )
                .await;
            if let Err(_err) = result {
                #[cfg(feature = "tracing")]
                tracing::warn!(error = %_err, "failed to persist failure");
            }
        }

        failure
    }

    /// Analyzes the supplied slice (or the whole in-memory history when
    /// `None`), optionally restricted to the last `time_window`.
    pub async fn analyze_pattern(
        &self,
        failures: Option<&[Failure]>,
        time_window: Option<Duration>,
    ) -> FailureAnalysis {
        let owned_history;
        let mut failures: Vec<Failure> = match failures {
            Some(slice) => slice.to_vec(),
            None => {
                let state = self.state.lock().await;
                owned_history = state.history.iter().cloned().collect::<Vec<_>>();
                owned_history
            }
        };

        if let Some(window) = time_window {
            let cutoff = Utc::now() - ChronoDuration::from_std(window).unwrap_or(ChronoDuration::zero());
            failures.retain(|f| f.timestamp >= cutoff);
        }

        if failures.is_empty() {
            return FailureAnalysis {
                pattern: FailurePattern::Permanent,
                root_cause: None,
                failure_count: 0,
                time_span: Duration::ZERO,
                recommendations: Vec::new(),
            };
        }

        let time_span = (failures.last().unwrap().timestamp - failures.first().unwrap().timestamp)
            .to_std()
            .unwrap_or(Duration::ZERO);

        let pattern = detect_pattern(&failures);
        let root_cause = identify_root_cause(&failures, pattern);
        let recommendations = generate_recommendations(&failures, pattern, root_cause.as_ref());

        FailureAnalysis {
            pattern,
            root_cause,
            failure_count: failures.len(),
            time_span,
            recommendations,
        }
    }

    /// `count(kind, operation)` over the most recent 10 entries ≥ `pattern_threshold`.
    pub async fn is_repeating_error(&self, kind: ErrorKind, operation: &str) -> bool {
        let state = self.state.lock().await;
        let recent_count = state
            .history
            .iter()
            .rev()
            .take(RECENT_WINDOW)
            .filter(|f| f.operation == operation && f.kind == kind)
            .count();
        recent_count >= self.pattern_threshold
    }

    pub async fn has_attempted(&self, operation: &str) -> bool {
        self.state.lock().await.attempted.contains(operation)
    }

    pub async fn get_failure_summary(&self) -> FailureSummary {
        let state = self.state.lock().await;
        if state.history.is_empty() {
            return FailureSummary::default();
        }

        let mut counts: Vec<(ErrorKind, usize)> = Vec::new();
        for f in &state.history {
            match counts.iter_mut().find(|(k, _)| *k == f.kind) {
                Some((_, n)) => *n += 1,
                None => counts.push((f.kind, 1)),
            }
        }
        let most_common_error = counts.iter().max_by_key(|(_, n)| *n).map(|(k, _)| *k);
        let time_span = (state.history.back().unwrap().timestamp - state.history.front().unwrap().timestamp)
            .to_std()
            .unwrap_or(Duration::ZERO);

        FailureSummary {
            total_failures: state.history.len(),
            unique_operations: state.attempted.len(),
            error_kind_distribution: counts,
            most_common_error,
            time_span,
        }
    }

    /// Clears all history, or only entries older than `older_than` when given.
    pub async fn clear_history(&self, older_than: Option<Duration>) {
        let mut state = self.state.lock().await;
        match older_than {
            Some(horizon) => {
                let cutoff = Utc::now() - ChronoDuration::from_std(horizon).unwrap_or(ChronoDuration::zero());
                state.history.retain(|f| f.timestamp >= cutoff);
            }
            None => {
                state.history.clear();
                state.attempted.clear();
            }
        }
    }

    pub async fn is_strategy_blacklisted(&self, strategy_name: &str, operation: &str) -> bool {
        let Some(store) = &self.store else { return false };
        store.is_blacklisted(strategy_name, operation).await.unwrap_or_else(|_err| {
            #[cfg(feature = "tracing")]
            tracing::warn!(error = %_err, "failed to check blacklist");
            false
        })
    }

    pub async fn add_to_blacklist(&self, strategy_name: &str, operation: &str, reason: &str) {
        let Some(store) = &self.store else {
            #[cfg(feature = "tracing")]
            tracing::warn!("blacklisting requires persistence to be enabled");
            return;
        };
        if let Err(_err) = store.add_to_blacklist(strategy_name, operation, reason).await {
            #[cfg(feature = "tracing")]
            tracing::error!(error = %_err, "failed to add to blacklist");
        }
    }

    pub async fn remove_from_blacklist(&self, strategy_name: &str, operation: &str) {
        let Some(store) = &self.store else {
            #[cfg(feature = "tracing")]
            tracing::warn!("blacklist management requires persistence to be enabled");
            return;
        };
        if let Err(_err) = store.remove_from_blacklist(strategy_name, operation).await {
            #[cfg(feature = "tracing")]
            tracing::error!(error = %_err, "failed to remove from blacklist");
        }
    }

    pub async fn get_blacklist(&self) -> Vec<resilience_store::BlacklistEntry> {
        let Some(store) = &self.store else { return Vec::new() };
        store.get_blacklist().await.unwrap_or_default()
    }

    /// `None` when there is no attached store; the in-memory summary is
    /// available separately via [`Self::get_failure_summary`].
    pub async fn analytics(&self) -> Option<resilience_store::FailureAnalytics> {
        let store = self.store.as_ref()?;
        store.analytics().await.ok()
    }

    pub async fn cleanup_old_failures(&self, older_than: ChronoDuration) -> u64 {
        let db_deleted = match &self.store {
            Some(store) => store.cleanup_failures(older_than).await.unwrap_or(0),
            None => 0,
        };

        let mut state = self.state.lock().await;
        let cutoff = Utc::now() - older_than;
        let before = state.history.len();
        state.history.retain(|f| f.timestamp >= cutoff);
        let in_memory_deleted = (before - state.history.len()) as u64;

        db_deleted + in_memory_deleted
    }
}

fn detect_pattern(failures: &[Failure]) -> FailurePattern {
    if failures.len() < 2 {
        return FailurePattern::Permanent;
    }

    let mut kind_counts: Vec<(ErrorKind, usize)> = Vec::new();
    for f in failures {
        match kind_counts.iter_mut().find(|(k, _)| *k == f.kind) {
            Some((_, n)) => *n += 1,
            None => kind_counts.push((f.kind, 1)),
        }
    }
    let (_, modal_count) = *kind_counts.iter().max_by_key(|(_, n)| *n).unwrap();
    if modal_count == failures.len() {
        return FailurePattern::Repeating;
    }

    let distinct_operations: HashSet<&str> = failures.iter().map(|f| f.operation.as_str()).collect();
    if distinct_operations.len() == 1 && kind_counts.len() >= 2 {
        return FailurePattern::UnstableService;
    }

    if distinct_operations.len() > 1 && kind_counts.len() >= distinct_operations.len() {
        return FailurePattern::Cascading;
    }

    FailurePattern::Permanent
}

fn identify_root_cause(failures: &[Failure], pattern: FailurePattern) -> Option<RootCause> {
    let mut kind_counts: Vec<(ErrorKind, usize)> = Vec::new();
    for f in failures {
        match kind_counts.iter_mut().find(|(k, _)| *k == f.kind) {
            Some((_, n)) => *n += 1,
            None => kind_counts.push((f.kind, 1)),
        }
    }
    let modal_kind = kind_counts.iter().max_by_key(|(_, n)| *n)?.0;

    let mut cause = rootcause::lookup(modal_kind)?;
    if pattern == FailurePattern::Repeating {
        cause.confidence = (cause.confidence + 0.1).min(1.0);
    }
    Some(cause)
}

fn generate_recommendations(
    failures: &[Failure],
    pattern: FailurePattern,
    root_cause: Option<&RootCause>,
) -> Vec<String> {
    let mut recommendations = Vec::new();

    match pattern {
        FailurePattern::Repeating => {
            recommendations.push("Same error recurring - consider alternative approach".to_string());
            recommendations.push("Try different tool or method to achieve goal".to_string());
        }
        FailurePattern::UnstableService => {
            recommendations.push("Service appears unstable - implement fallback provider".to_string());
            recommendations.push("Add circuit breaker to fail fast".to_string());
        }
        FailurePattern::Cascading => {
            recommendations.push("Cascading failures detected - check dependencies".to_string());
            recommendations.push("Consider breaking operation into smaller steps".to_string());
        }
        FailurePattern::Permanent => {
            recommendations.push("Consistent failure - fundamental issue with approach".to_string());
            recommendations.push("Rethink strategy or seek user intervention".to_string());
        }
        FailurePattern::Intermittent => {}
    }

    if let Some(cause) = root_cause {
        recommendations.push(cause.suggested_action.to_string());
    }

    let kinds: HashSet<ErrorKind> = failures.iter().map(|f| f.kind).collect();
    if kinds.contains(&ErrorKind::RateLimit) {
        recommendations.push("Implement request throttling or batching".to_string());
    }
    if kinds.contains(&ErrorKind::Network) {
        recommendations.push("Consider caching or offline fallback".to_string());
    }
    if kinds.contains(&ErrorKind::Authentication) {
        recommendations.push("Stop retrying - credentials need update".to_string());
    }

    recommendations
}
