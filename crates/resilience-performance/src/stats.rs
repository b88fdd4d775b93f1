use chrono::{DateTime, Duration as ChronoDuration, Utc};

use crate::metric::ExecutionMetric;

/// Derived, computed-on-demand rollup over a subject's recent executions,
/// including a trailing `recent_errors_24h` count.
#[derive(Debug, Clone, Default)]
pub struct AggregateStats {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub success_rate: f64,
    pub avg_latency_ms: f64,
    pub p95_latency_ms: f64,
    pub p99_latency_ms: f64,
    pub total_cost: f64,
    pub avg_cost: f64,
    pub avg_quality: f64,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub roi_score: f64,
    pub value_score: f64,
    pub is_improving: bool,
    pub is_degrading: bool,
    pub recent_success_rate: f64,
    pub first_seen: Option<DateTime<Utc>>,
    pub last_seen: Option<DateTime<Utc>>,
    pub usage_per_day: f64,
    pub recent_errors_24h: u32,
}

const PER_CALL_MAINTENANCE: f64 = 0.01;
const TREND_WINDOW: usize = 10;
const TREND_THRESHOLD: f64 = 0.1;

/// Computes [`AggregateStats`] over `metrics`, which must already be
/// restricted to the subject (and, where relevant, task type) and the
/// rolling window the caller cares about. Empty input yields the
/// all-zero default.
pub fn aggregate(metrics: &[ExecutionMetric]) -> AggregateStats {
    if metrics.is_empty() {
        return AggregateStats::default();
    }

    let total = metrics.len();
    let successful = metrics.iter().filter(|m| m.success).count();
    let failed = total - successful;
    let success_rate = successful as f64 / total as f64;

    let mut latencies: Vec<u64> = metrics.iter().map(|m| m.latency_ms).collect();
    latencies.sort_unstable();
    let avg_latency_ms = latencies.iter().sum::<u64>() as f64 / total as f64;
    let p95_latency_ms = percentile(&latencies, 0.95);
    let p99_latency_ms = percentile(&latencies, 0.99);

    let total_cost: f64 = metrics.iter().filter_map(|m| m.cost_estimate).sum();
    let avg_cost = total_cost / total as f64;

    let quality_scores: Vec<f64> = metrics.iter().filter_map(|m| m.quality_score).collect();
    let avg_quality = if quality_scores.is_empty() {
        0.0
    } else {
        quality_scores.iter().sum::<f64>() / quality_scores.len() as f64
    };

    let total_input_tokens: u64 = metrics.iter().map(|m| m.input_tokens).sum();
    let total_output_tokens: u64 = metrics.iter().map(|m| m.output_tokens).sum();

    let first_seen = metrics.iter().map(|m| m.timestamp).min();
    let last_seen = metrics.iter().map(|m| m.timestamp).max();
    let days_active = match (first_seen, last_seen) {
        (Some(first), Some(last)) => ((last - first).num_days().max(1)) as f64,
        _ => 1.0,
    };
    let usage_per_day = total as f64 / days_active;

    let value_score = (usage_per_day / 5.0).min(1.0) * success_rate;
    let roi_score = if total_cost == 0.0 {
        value_score * 10.0
    } else {
        let maintenance_cost = total as f64 * PER_CALL_MAINTENANCE;
        value_score / (total_cost + maintenance_cost)
    };

    let recent: Vec<&ExecutionMetric> = metrics.iter().rev().take(TREND_WINDOW).collect();
    let (recent_success_rate, is_improving, is_degrading) = if recent.len() < 5 {
        (0.0, false, false)
    } else {
        let recent_successes = recent.iter().filter(|m| m.success).count();
        let recent_rate = recent_successes as f64 / recent.len() as f64;
        let delta = recent_rate - success_rate;
        (recent_rate, delta >= TREND_THRESHOLD, delta <= -TREND_THRESHOLD)
    };

    let cutoff_24h = Utc::now() - ChronoDuration::hours(24);
    let recent_errors_24h = metrics
        .iter()
        .filter(|m| !m.success && m.timestamp >= cutoff_24h)
        .count() as u32;

    AggregateStats {
        total,
        successful,
        failed,
        success_rate,
        avg_latency_ms,
        p95_latency_ms,
        p99_latency_ms,
        total_cost,
        avg_cost,
        avg_quality,
        total_input_tokens,
        total_output_tokens,
        roi_score,
        value_score,
        is_improving,
        is_degrading,
        recent_success_rate,
        first_seen,
        last_seen,
        usage_per_day,
        recent_errors_24h,
    }
}

fn percentile(sorted: &[u64], p: f64) -> f64 {
    let idx = ((sorted.len() as f64) * p) as usize;
    let idx = idx.min(sorted.len() - 1);
    sorted[idx] as f64
}
