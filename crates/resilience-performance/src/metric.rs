use chrono::{DateTime, Utc};
use resilience_classifier::ErrorKind;

/// Which flavor of [`crate::PerformanceTracker`] a metric belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubjectKind {
    Model,
    Skill,
}

impl SubjectKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SubjectKind::Model => "model",
            SubjectKind::Skill => "skill",
        }
    }
}

/// One recorded execution. Built with
/// [`ExecutionMetric::new`] plus optional fluent setters, since most calls
/// only fill in a handful of the optional fields.
#[derive(Debug, Clone)]
pub struct ExecutionMetric {
    pub subject_id: String,
    pub subject_kind: SubjectKind,
    pub task_type: String,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    pub latency_ms: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_hit_tokens: u64,
    pub cost_estimate: Option<f64>,
    pub quality_score: Option<f64>,
    pub error_kind: Option<ErrorKind>,
    pub finish_reason: Option<String>,
    pub retry_required: bool,
}

impl ExecutionMetric {
    pub fn new(
        subject_id: impl Into<String>,
        subject_kind: SubjectKind,
        task_type: impl Into<String>,
        success: bool,
        latency_ms: u64,
    ) -> Self {
        Self {
            subject_id: subject_id.into(),
            subject_kind,
            task_type: task_type.into(),
            timestamp: Utc::now(),
            success,
            latency_ms,
            input_tokens: 0,
            output_tokens: 0,
            cache_hit_tokens: 0,
            cost_estimate: None,
            quality_score: None,
            error_kind: None,
            finish_reason: None,
            retry_required: false,
        }
    }

    pub fn tokens(mut self, input: u64, output: u64) -> Self {
        self.input_tokens = input;
        self.output_tokens = output;
        self
    }

    pub fn cache_hit_tokens(mut self, tokens: u64) -> Self {
        self.cache_hit_tokens = tokens;
        self
    }

    pub fn cost_estimate(mut self, cost: f64) -> Self {
        self.cost_estimate = Some(cost);
        self
    }

    pub fn quality_score(mut self, score: f64) -> Self {
        self.quality_score = Some(score);
        self
    }

    pub fn error_kind(mut self, kind: ErrorKind) -> Self {
        self.error_kind = Some(kind);
        self
    }

    pub fn finish_reason(mut self, reason: impl Into<String>) -> Self {
        self.finish_reason = Some(reason.into());
        self
    }

    pub fn retry_required(mut self, required: bool) -> Self {
        self.retry_required = required;
        self
    }

    pub fn total_tokens(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}
