use std::collections::HashMap;
use std::sync::Arc;

use resilience_analyzer::FailureAnalyzer;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::strategy::{
    OptimizationGoal, StrategyCandidate, StrategyStatsEntry, StrategyStatsReport,
};
use crate::templates;

const COST_EPSILON: f64 = 0.001;
const TIME_EPSILON: f64 = 0.1;
const DEFAULT_SUCCESS_RATE: f64 = 0.5;

struct Counters {
    successes: u64,
    failures: u64,
}

/// Enumerates and ranks alternative strategies for a failed operation.
///
/// When constructed with [`StrategyExplorer::with_blacklist_source`],
/// enumeration skips any candidate whose name is blacklisted for the given
/// operation — stricter than the source, which only consults the blacklist
/// on demand.
pub struct StrategyExplorer {
    analyzer: Option<Arc<FailureAnalyzer>>,
    history: Mutex<HashMap<String, Counters>>,
}

impl Default for StrategyExplorer {
    fn default() -> Self {
        Self::new()
    }
}

impl StrategyExplorer {
    pub fn new() -> Self {
        Self {
            analyzer: None,
            history: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_blacklist_source(analyzer: Arc<FailureAnalyzer>) -> Self {
        Self {
            analyzer: Some(analyzer),
            history: Mutex::new(HashMap::new()),
        }
    }

    pub async fn enumerate_strategies(
        &self,
        operation: &str,
        context: &Value,
        primary_strategy: Option<&str>,
    ) -> Vec<StrategyCandidate> {
        let mut strategies = templates::template_variants(operation, context);
        strategies.extend(templates::custom_variants(operation, context));

        if let Some(primary) = primary_strategy {
            strategies.retain(|s| s.name != primary);
        }

        if let Some(analyzer) = &self.analyzer {
            let mut kept = Vec::with_capacity(strategies.len());
            for candidate in strategies {
                if !analyzer.is_strategy_blacklisted(&candidate.name, operation).await {
                    kept.push(candidate);
                }
            }
            strategies = kept;
        }

        #[cfg(feature = "tracing")]
        tracing::info!(operation, count = strategies.len(), "enumerated alternative strategies");

        strategies
    }

    pub async fn rank_strategies(
        &self,
        mut strategies: Vec<StrategyCandidate>,
        goal: OptimizationGoal,
    ) -> Vec<StrategyCandidate> {
        let history = self.history.lock().await;
        for strategy in &mut strategies {
            let success_rate = success_rate_of(&history, &strategy.name);
            strategy.score = Some(score(strategy, success_rate, goal));
        }
        drop(history);

        strategies.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.name.cmp(&b.name))
        });
        strategies
    }

    pub async fn record_success(&self, strategy_name: &str) {
        let mut history = self.history.lock().await;
        history
            .entry(strategy_name.to_string())
            .or_insert(Counters { successes: 0, failures: 0 })
            .successes += 1;
    }

    pub async fn record_failure(&self, strategy_name: &str) {
        let mut history = self.history.lock().await;
        history
            .entry(strategy_name.to_string())
            .or_insert(Counters { successes: 0, failures: 0 })
            .failures += 1;
    }

    pub async fn success_rate(&self, strategy_name: &str) -> f64 {
        let history = self.history.lock().await;
        success_rate_of(&history, strategy_name)
    }

    pub async fn strategy_stats(&self) -> StrategyStatsReport {
        let history = self.history.lock().await;
        let mut strategies: Vec<(String, StrategyStatsEntry)> = history
            .iter()
            .map(|(name, counters)| {
                let total = counters.successes + counters.failures;
                let success_rate = if total > 0 {
                    counters.successes as f64 / total as f64
                } else {
                    0.0
                };
                (
                    name.clone(),
                    StrategyStatsEntry {
                        successes: counters.successes,
                        failures: counters.failures,
                        total_attempts: total,
                        success_rate,
                    },
                )
            })
            .collect();
        strategies.sort_by(|a, b| a.0.cmp(&b.0));

        StrategyStatsReport {
            total_strategies_tried: strategies.len(),
            strategies,
        }
    }

    pub async fn clear_history(&self) {
        self.history.lock().await.clear();
    }
}

fn success_rate_of(history: &HashMap<String, Counters>, name: &str) -> f64 {
    match history.get(name) {
        Some(counters) if counters.successes + counters.failures > 0 => {
            counters.successes as f64 / (counters.successes + counters.failures) as f64
        }
        _ => DEFAULT_SUCCESS_RATE,
    }
}

fn score(strategy: &StrategyCandidate, success_rate: f64, goal: OptimizationGoal) -> f64 {
    let cost_factor = 1.0 / (strategy.cost_estimate + COST_EPSILON);
    let time_factor = 1.0 / (strategy.time_estimate + TIME_EPSILON);

    match goal {
        OptimizationGoal::Cost => cost_factor * 0.7 + success_rate * 0.3,
        OptimizationGoal::Speed => time_factor * 0.7 + success_rate * 0.3,
        OptimizationGoal::SuccessRate => success_rate * 0.8 + strategy.priority * 0.2,
        OptimizationGoal::Balanced => {
            strategy.priority * 0.3 + success_rate * 0.4 + cost_factor * 0.15 + time_factor * 0.15
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn enumerate_filters_out_primary_strategy() {
        let explorer = StrategyExplorer::new();
        let strategies = explorer
            .enumerate_strategies("http_request", &json!({}), Some("http_tool_curl"))
            .await;
        assert!(strategies.iter().all(|s| s.name != "http_tool_curl"));
    }

    #[tokio::test]
    async fn ranking_prefers_higher_success_rate_with_success_rate_goal() {
        let explorer = StrategyExplorer::new();
        explorer.record_success("good").await;
        explorer.record_success("good").await;
        explorer.record_failure("bad").await;
        explorer.record_failure("bad").await;

        let strategies = vec![
            StrategyCandidate::new("good", crate::strategy::StrategyKind::CustomCode, "", 0.5, 0.01, json!({})),
            StrategyCandidate::new("bad", crate::strategy::StrategyKind::CustomCode, "", 0.5, 0.01, json!({})),
        ];
        let ranked = explorer.rank_strategies(strategies, OptimizationGoal::SuccessRate).await;
        assert_eq!(ranked[0].name, "good");
    }

    #[tokio::test]
    async fn unknown_strategy_defaults_to_half_success_rate() {
        let explorer = StrategyExplorer::new();
        assert_eq!(explorer.success_rate("never_seen").await, 0.5);
    }

    #[tokio::test]
    async fn ties_broken_by_name_ascending() {
        let explorer = StrategyExplorer::new();
        let strategies = vec![
            StrategyCandidate::new("zeta", crate::strategy::StrategyKind::CustomCode, "", 0.5, 0.01, json!({})),
            StrategyCandidate::new("alpha", crate::strategy::StrategyKind::CustomCode, "", 0.5, 0.01, json!({})),
        ];
        let ranked = explorer.rank_strategies(strategies, OptimizationGoal::Balanced).await;
        assert_eq!(ranked[0].name, "alpha");
    }

    #[tokio::test]
    async fn strategy_stats_reports_sorted_by_name() {
        let explorer = StrategyExplorer::new();
        explorer.record_success("beta").await;
        explorer.record_failure("alpha").await;
        let report = explorer.strategy_stats().await;
        assert_eq!(report.total_strategies_tried, 2);
        assert_eq!(report.strategies[0].0, "alpha");
    }
}
