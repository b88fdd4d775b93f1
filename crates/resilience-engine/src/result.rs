use std::time::Duration;

use resilience_analyzer::{FailureAnalysis, FailurePattern, RootCause};
use resilience_classifier::ErrorKind;

/// Which exploration strategy [`crate::ResilienceEngine::execute_alternatives`]
/// uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Try strategies one at a time, highest priority first, stop at the
    /// first success.
    Sequential,
    /// Race the top `max_parallel_strategies` concurrently; first success
    /// wins, the rest are cancelled.
    Parallel,
}

/// Analysis attached to a failing [`ResilienceResult`]'s `analysis` field.
#[derive(Debug, Clone)]
pub struct ExecutionAnalysis {
    pub pattern: FailurePattern,
    pub root_cause: Option<RootCause>,
    pub failure_count: usize,
    pub time_span: Duration,
    pub recommendations: Vec<String>,
}

impl From<FailureAnalysis> for ExecutionAnalysis {
    fn from(a: FailureAnalysis) -> Self {
        Self {
            pattern: a.pattern,
            root_cause: a.root_cause,
            failure_count: a.failure_count,
            time_span: a.time_span,
            recommendations: a.recommendations,
        }
    }
}

/// Outcome of [`crate::ResilienceEngine::execute`] or
/// `execute_alternatives`. Always returned, never thrown —
/// `recommendations` carries at least one string in every failure case.
#[derive(Debug)]
pub struct ResilienceResult<T, E> {
    pub value: Option<T>,
    pub error: Option<E>,
    pub error_kind: Option<ErrorKind>,
    pub attempts: u32,
    pub strategies_tried: Vec<String>,
    pub elapsed: Duration,
    pub analysis: Option<ExecutionAnalysis>,
    pub escalation_needed: bool,
}

impl<T, E> ResilienceResult<T, E> {
    pub fn is_success(&self) -> bool {
        self.value.is_some()
    }

    pub(crate) fn success(value: T, attempts: u32, strategies_tried: Vec<String>, elapsed: Duration) -> Self {
        Self {
            value: Some(value),
            error: None,
            error_kind: None,
            attempts,
            strategies_tried,
            elapsed,
            analysis: None,
            escalation_needed: false,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn failure(
        error: Option<E>,
        error_kind: Option<ErrorKind>,
        attempts: u32,
        strategies_tried: Vec<String>,
        elapsed: Duration,
        analysis: Option<ExecutionAnalysis>,
        escalation_needed: bool,
    ) -> Self {
        Self {
            value: None,
            error,
            error_kind,
            attempts,
            strategies_tried,
            elapsed,
            analysis,
            escalation_needed,
        }
    }
}

/// `Engine.GetFailureSummary()`.
pub use resilience_analyzer::FailureSummary;
