use chrono::{DateTime, Utc};

/// A detected gap in skill coverage: a task failed for lack of a specific
/// capability.
#[derive(Debug, Clone)]
pub struct SkillGap {
    pub gap_id: String,
    pub detected_at: DateTime<Utc>,
    pub task_description: String,
    pub missing_capability: String,
    pub failure_count: u32,
    pub priority_score: f64,
    pub suggested_skills: Vec<String>,
}

impl SkillGap {
    fn new(gap_id: String, task_description: String, missing_capability: String, suggested_skills: Vec<String>) -> Self {
        let mut gap = Self {
            gap_id,
            detected_at: Utc::now(),
            task_description,
            missing_capability,
            failure_count: 1,
            priority_score: 0.0,
            suggested_skills,
        };
        gap.priority_score = priority(gap.failure_count);
        gap
    }
}

/// `min(1.0, failure_count / 10.0)`.
pub fn priority(failure_count: u32) -> f64 {
    (failure_count as f64 / 10.0).min(1.0)
}

/// In-memory registry, deduped by `missing_capability`.
#[derive(Debug, Default)]
pub struct SkillGapRegistry {
    gaps: Vec<SkillGap>,
    next_id: u64,
}

impl SkillGapRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a gap, or bumps the `failure_count` of an existing one with
    /// the same `missing_capability`.
    pub fn record(
        &mut self,
        task_description: impl Into<String>,
        missing_capability: impl Into<String>,
        suggested_skills: Vec<String>,
    ) -> String {
        let missing_capability = missing_capability.into();
        if let Some(existing) = self.gaps.iter_mut().find(|g| g.missing_capability == missing_capability) {
            existing.failure_count += 1;
            existing.priority_score = priority(existing.failure_count);
            return existing.gap_id.clone();
        }

        self.next_id += 1;
        let gap_id = format!("gap_{}", self.next_id);
        let gap = SkillGap::new(gap_id.clone(), task_description.into(), missing_capability, suggested_skills);
        self.gaps.push(gap);
        gap_id
    }

    /// Gaps at or above `min_priority`, highest priority first.
    pub fn above_priority(&self, min_priority: f64) -> Vec<SkillGap> {
        let mut filtered: Vec<SkillGap> =
            self.gaps.iter().filter(|g| g.priority_score >= min_priority).cloned().collect();
        filtered.sort_by(|a, b| b.priority_score.partial_cmp(&a.priority_score).unwrap_or(std::cmp::Ordering::Equal));
        filtered
    }

    pub fn len(&self) -> usize {
        self.gaps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gaps.is_empty()
    }
}
