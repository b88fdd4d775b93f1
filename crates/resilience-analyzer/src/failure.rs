use chrono::{DateTime, Utc};
use resilience_classifier::ErrorKind;
use serde_json::Value;
use std::time::Duration;

/// A single recorded observation. Immutable once built.
#[derive(Debug, Clone)]
pub struct Failure {
    pub timestamp: DateTime<Utc>,
    pub kind: ErrorKind,
    pub message: String,
    pub operation: String,
    pub context: Option<Value>,
    pub stack: Option<String>,
}

/// Shape a failure takes when observed over a window: one error kind
/// dominating, several kinds on one operation, several operations each
/// with their own kind, or nothing conclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePattern {
    Repeating,
    UnstableService,
    Cascading,
    Intermittent,
    Permanent,
}

impl FailurePattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Repeating => "repeating",
            Self::UnstableService => "unstable_service",
            Self::Cascading => "cascading",
            Self::Intermittent => "intermittent",
            Self::Permanent => "permanent",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RootCause {
    pub cause_tag: &'static str,
    pub description: &'static str,
    pub suggested_action: &'static str,
    pub confidence: f64,
}

#[derive(Debug, Clone)]
pub struct FailureAnalysis {
    pub pattern: FailurePattern,
    pub root_cause: Option<RootCause>,
    pub failure_count: usize,
    pub time_span: Duration,
    pub recommendations: Vec<String>,
}
