use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::Duration as ChronoDuration;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use crate::error::PerformanceError;
use crate::gap::{SkillGap, SkillGapRegistry};
use crate::metric::{ExecutionMetric, SubjectKind};
use crate::pricing::PricingTable;
use crate::stats::{self, AggregateStats};
use crate::store::PerformanceStore;

const DEFAULT_WINDOW_DAYS: i64 = 7;
const MIN_SAMPLES_FOR_RANKING: usize = 5;
const MIN_SUCCESS_RATE_FOR_RANKING: f64 = 0.8;
const DEFAULT_GAP_PRIORITY: f64 = 0.3;
const STATS_CACHE_CAP: usize = 10_000;

/// Which objective a "best for task" query optimizes for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Goal {
    Speed,
    Cost,
    Quality,
    Balanced,
}

/// Records per-execution metrics and answers "best model/skill for task X
/// under goal G" queries. Model and Skill are the same shape; the
/// flavor only changes which secondary dimension a caller typically groups
/// by and whether the pricing table is consulted for cost imputation.
pub struct PerformanceTracker {
    kind: SubjectKind,
    pricing: PricingTable,
    window: ChronoDuration,
    cache: Mutex<HashMap<String, VecDeque<ExecutionMetric>>>,
    gaps: Mutex<SkillGapRegistry>,
    store: Option<Arc<PerformanceStore>>,
}

impl PerformanceTracker {
    pub fn new(kind: SubjectKind) -> Self {
        Self {
            kind,
            pricing: PricingTable::default(),
            window: ChronoDuration::days(DEFAULT_WINDOW_DAYS),
            cache: Mutex::new(HashMap::new()),
            gaps: Mutex::new(SkillGapRegistry::new()),
            store: None,
        }
    }

    pub fn with_pricing(mut self, pricing: PricingTable) -> Self {
        self.pricing = pricing;
        self
    }

    pub fn with_window(mut self, window: ChronoDuration) -> Self {
        self.window = window;
        self
    }

    /// Attaches durable storage and seeds the in-memory cache with the last
    /// window's worth of rows for every subject already on disk.
    pub async fn with_store(mut self, store: Arc<PerformanceStore>) -> Result<Self, PerformanceError> {
        let since = chrono::Utc::now() - self.window;
        let subjects = store.distinct_subjects().await?;
        let mut cache = HashMap::new();
        for subject in subjects {
            let rows = store.get_metrics(Some(&subject), None, Some(since), STATS_CACHE_CAP as i64).await?;
            let metrics: VecDeque<ExecutionMetric> =
                rows.into_iter().map(|row| row.into_metric(self.kind)).collect();
            cache.insert(subject, metrics);
        }
        self.cache = Mutex::new(cache);
        self.store = Some(store);
        Ok(self)
    }

    /// Records one execution: imputes `cost_estimate` from the pricing table
    /// when the caller didn't supply one (model flavor only), updates the
    /// in-memory rolling window, and persists when a store is attached.
    pub async fn record(&self, mut metric: ExecutionMetric) -> Result<(), PerformanceError> {
        if self.kind == SubjectKind::Model && metric.cost_estimate.is_none() {
            let cost = self.pricing.calculate_cost(
                &metric.subject_id,
                metric.input_tokens,
                metric.output_tokens,
                metric.cache_hit_tokens,
            );
            metric = metric.cost_estimate(cost);
        }

        if let Some(store) = &self.store {
            store.save_metric(&metric).await?;
        }

        let mut cache = self.cache.lock().await;
        let entry = cache.entry(metric.subject_id.clone()).or_default();
        entry.push_back(metric);
        while entry.len() > STATS_CACHE_CAP {
            entry.pop_front();
        }

        Ok(())
    }

    async fn windowed_metrics(&self, subject_id: &str, task_type: Option<&str>) -> Vec<ExecutionMetric> {
        let cutoff = chrono::Utc::now() - self.window;
        let cache = self.cache.lock().await;
        cache
            .get(subject_id)
            .map(|entry| {
                entry
                    .iter()
                    .filter(|m| m.timestamp >= cutoff)
                    .filter(|m| task_type.map(|t| m.task_type == t).unwrap_or(true))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub async fn get_aggregate_stats(&self, subject_id: &str, task_type: Option<&str>) -> AggregateStats {
        let metrics = self.windowed_metrics(subject_id, task_type).await;
        stats::aggregate(&metrics)
    }

    /// Every subject currently tracked, each paired with its windowed stats.
    pub async fn get_all_subjects_stats(&self, task_type: Option<&str>) -> Vec<(String, AggregateStats)> {
        let subjects: Vec<String> = self.cache.lock().await.keys().cloned().collect();
        let mut out = Vec::with_capacity(subjects.len());
        for subject in subjects {
            let metrics = self.windowed_metrics(&subject, task_type).await;
            out.push((subject, stats::aggregate(&metrics)));
        }
        out
    }

    /// "Best for task": filters to subjects with ≥5 samples and ≥80%
    /// success rate, then ranks by `goal`. `None` signals insufficient data.
    pub async fn best_for_task(&self, task_type: &str, goal: Goal) -> Option<String> {
        let candidates: Vec<(String, AggregateStats)> = self
            .get_all_subjects_stats(Some(task_type))
            .await
            .into_iter()
            .filter(|(_, s)| s.total >= MIN_SAMPLES_FOR_RANKING && s.success_rate >= MIN_SUCCESS_RATE_FOR_RANKING)
            .collect();

        if candidates.is_empty() {
            return None;
        }

        match goal {
            Goal::Speed => candidates
                .iter()
                .min_by(|a, b| a.1.avg_latency_ms.partial_cmp(&b.1.avg_latency_ms).unwrap())
                .map(|(id, _)| id.clone()),
            Goal::Cost => candidates
                .iter()
                .min_by(|a, b| a.1.avg_cost.partial_cmp(&b.1.avg_cost).unwrap())
                .map(|(id, _)| id.clone()),
            Goal::Quality => candidates
                .iter()
                .max_by(|a, b| quality_of(&a.1).partial_cmp(&quality_of(&b.1)).unwrap())
                .map(|(id, _)| id.clone()),
            Goal::Balanced => {
                let min_latency = candidates.iter().map(|(_, s)| s.avg_latency_ms).fold(f64::INFINITY, f64::min);
                let max_latency = candidates.iter().map(|(_, s)| s.avg_latency_ms).fold(f64::NEG_INFINITY, f64::max);
                let min_cost = candidates.iter().map(|(_, s)| s.avg_cost).fold(f64::INFINITY, f64::min);
                let max_cost = candidates.iter().map(|(_, s)| s.avg_cost).fold(f64::NEG_INFINITY, f64::max);
                let min_quality = candidates.iter().map(|(_, s)| quality_of(s)).fold(f64::INFINITY, f64::min);
                let max_quality = candidates.iter().map(|(_, s)| quality_of(s)).fold(f64::NEG_INFINITY, f64::max);

                candidates
                    .iter()
                    .max_by(|a, b| {
                        balanced_score(&a.1, min_latency, max_latency, min_cost, max_cost, min_quality, max_quality)
                            .partial_cmp(&balanced_score(
                                &b.1, min_latency, max_latency, min_cost, max_cost, min_quality, max_quality,
                            ))
                            .unwrap()
                    })
                    .map(|(id, _)| id.clone())
            }
        }
    }

    /// Top `limit` subjects by ROI, highest first.
    pub async fn top_performers_by_roi(&self, limit: usize) -> Vec<(String, AggregateStats)> {
        let mut all = self.get_all_subjects_stats(None).await;
        all.sort_by(|a, b| b.1.roi_score.partial_cmp(&a.1.roi_score).unwrap_or(std::cmp::Ordering::Equal));
        all.truncate(limit);
        all
    }

    pub async fn degrading_subjects(&self) -> Vec<(String, AggregateStats)> {
        self.get_all_subjects_stats(None).await.into_iter().filter(|(_, s)| s.is_degrading).collect()
    }

    pub async fn improving_subjects(&self) -> Vec<(String, AggregateStats)> {
        self.get_all_subjects_stats(None).await.into_iter().filter(|(_, s)| s.is_improving).collect()
    }

    /// Records that a task failed for lack of `missing_capability`, returning
    /// the (possibly pre-existing) gap id.
    pub async fn record_skill_gap(
        &self,
        task_description: impl Into<String>,
        missing_capability: impl Into<String>,
        suggested_skills: Vec<String>,
    ) -> String {
        self.gaps.lock().await.record(task_description, missing_capability, suggested_skills)
    }

    /// Gaps at or above `min_priority` (default 0.3 when `None`), highest
    /// priority first.
    pub async fn get_skill_gaps(&self, min_priority: Option<f64>) -> Vec<SkillGap> {
        self.gaps.lock().await.above_priority(min_priority.unwrap_or(DEFAULT_GAP_PRIORITY))
    }

    /// Deletes persisted rows older than `older_than` and prunes the
    /// in-memory cache to match.
    pub async fn cleanup_old_data(&self, older_than: ChronoDuration) -> Result<u64, PerformanceError> {
        let deleted = match &self.store {
            Some(store) => store.cleanup(older_than).await?,
            None => 0,
        };

        let cutoff = chrono::Utc::now() - older_than;
        let mut cache = self.cache.lock().await;
        for entry in cache.values_mut() {
            entry.retain(|m| m.timestamp >= cutoff);
        }
        cache.retain(|_, entry| !entry.is_empty());

        Ok(deleted)
    }

    /// JSON snapshot of every tracked subject's aggregate stats, for
    /// external reporting.
    pub async fn export_stats(&self) -> Value {
        let all = self.get_all_subjects_stats(None).await;
        let mut subjects = serde_json::Map::new();
        for (id, s) in all {
            subjects.insert(
                id,
                json!({
                    "total": s.total,
                    "success_rate": s.success_rate,
                    "avg_latency_ms": s.avg_latency_ms,
                    "p95_latency_ms": s.p95_latency_ms,
                    "p99_latency_ms": s.p99_latency_ms,
                    "total_cost": s.total_cost,
                    "avg_cost": s.avg_cost,
                    "avg_quality": s.avg_quality,
                    "roi_score": s.roi_score,
                    "value_score": s.value_score,
                    "is_improving": s.is_improving,
                    "is_degrading": s.is_degrading,
                    "recent_errors_24h": s.recent_errors_24h,
                }),
            );
        }
        json!({
            "subject_kind": self.kind.as_str(),
            "subjects": subjects,
            "skill_gaps": self.gaps.lock().await.len(),
        })
    }
}

fn quality_of(s: &AggregateStats) -> f64 {
    if s.avg_quality > 0.0 {
        s.avg_quality
    } else {
        s.success_rate
    }
}

#[allow(clippy::too_many_arguments)]
fn balanced_score(
    s: &AggregateStats,
    min_latency: f64,
    max_latency: f64,
    min_cost: f64,
    max_cost: f64,
    min_quality: f64,
    max_quality: f64,
) -> f64 {
    let latency_norm = normalize_inverted(s.avg_latency_ms, min_latency, max_latency);
    let cost_norm = normalize_inverted(s.avg_cost, min_cost, max_cost);
    let quality_norm = normalize(quality_of(s), min_quality, max_quality);
    0.3 * latency_norm + 0.2 * cost_norm + 0.5 * quality_norm
}

fn normalize_inverted(value: f64, min: f64, max: f64) -> f64 {
    if (max - min).abs() < f64::EPSILON {
        1.0
    } else {
        1.0 - (value - min) / (max - min)
    }
}

fn normalize(value: f64, min: f64, max: f64) -> f64 {
    if (max - min).abs() < f64::EPSILON {
        1.0
    } else {
        (value - min) / (max - min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metric(subject: &str, task_type: &str, success: bool, latency_ms: u64) -> ExecutionMetric {
        ExecutionMetric::new(subject, SubjectKind::Model, task_type, success, latency_ms).tokens(100, 50)
    }

    #[tokio::test]
    async fn record_imputes_cost_for_model_flavor() {
        let tracker = PerformanceTracker::new(SubjectKind::Model);
        tracker.record(metric("gpt-3.5-turbo", "general", true, 100)).await.unwrap();

        let stats = tracker.get_aggregate_stats("gpt-3.5-turbo", None).await;
        assert_eq!(stats.total, 1);
        assert!(stats.total_cost > 0.0);
    }

    #[tokio::test]
    async fn best_for_task_excludes_low_sample_and_low_success() {
        let tracker = PerformanceTracker::new(SubjectKind::Model);
        for _ in 0..3 {
            tracker.record(metric("gpt-4", "coding", true, 200)).await.unwrap();
        }
        assert_eq!(tracker.best_for_task("coding", Goal::Speed).await, None);

        for _ in 0..6 {
            tracker.record(metric("gpt-4", "coding", true, 200)).await.unwrap();
        }
        assert_eq!(tracker.best_for_task("coding", Goal::Speed).await, Some("gpt-4".to_string()));
    }

    #[tokio::test]
    async fn best_for_task_speed_prefers_lower_latency() {
        let tracker = PerformanceTracker::new(SubjectKind::Model);
        for _ in 0..6 {
            tracker.record(metric("fast-model", "qa", true, 50)).await.unwrap();
            tracker.record(metric("slow-model", "qa", true, 500)).await.unwrap();
        }
        assert_eq!(tracker.best_for_task("qa", Goal::Speed).await, Some("fast-model".to_string()));
    }

    #[tokio::test]
    async fn top_performers_by_roi_sorted_descending() {
        let tracker = PerformanceTracker::new(SubjectKind::Skill);
        for _ in 0..6 {
            tracker.record(metric("web_search", "research", true, 100)).await.unwrap();
        }
        let top = tracker.top_performers_by_roi(5).await;
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].0, "web_search");
    }

    #[tokio::test]
    async fn skill_gap_roundtrip() {
        let tracker = PerformanceTracker::new(SubjectKind::Skill);
        tracker.record_skill_gap("book a flight", "flight_booking", vec!["web_search".to_string()]).await;
        let gaps = tracker.get_skill_gaps(Some(0.0)).await;
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].missing_capability, "flight_booking");
    }

    #[tokio::test]
    async fn cleanup_prunes_cache_to_match_store() {
        let tracker = PerformanceTracker::new(SubjectKind::Model);
        let mut old = metric("gpt-4", "general", true, 100);
        old.timestamp = chrono::Utc::now() - ChronoDuration::days(400);
        tracker.record(old).await.unwrap();
        tracker.record(metric("gpt-4", "general", true, 100)).await.unwrap();

        tracker.cleanup_old_data(ChronoDuration::days(180)).await.unwrap();
        let stats = tracker.get_aggregate_stats("gpt-4", None).await;
        assert_eq!(stats.total, 1);
    }
}
