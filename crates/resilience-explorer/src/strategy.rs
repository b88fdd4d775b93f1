use serde_json::Value;

/// Mirrors the source's `StrategyType` enumeration of alternative kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    ApiProvider,
    ToolAlternative,
    ApproachVariation,
    ParameterVariation,
    CustomCode,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ApiProvider => "api_provider",
            Self::ToolAlternative => "tool",
            Self::ApproachVariation => "approach",
            Self::ParameterVariation => "parameter",
            Self::CustomCode => "custom_code",
        }
    }
}

/// One candidate alternative, with enough metadata to both rank and
/// invoke it.
#[derive(Debug, Clone)]
pub struct StrategyCandidate {
    pub name: String,
    pub kind: StrategyKind,
    pub description: String,
    pub priority: f64,
    pub cost_estimate: f64,
    pub time_estimate: f64,
    pub metadata: Value,
    /// Populated by [`crate::StrategyExplorer::rank_strategies`]; absent
    /// before ranking.
    pub score: Option<f64>,
}

impl StrategyCandidate {
    pub(crate) fn new(
        name: impl Into<String>,
        kind: StrategyKind,
        description: impl Into<String>,
        priority: f64,
        cost_estimate: f64,
        metadata: Value,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            description: description.into(),
            priority,
            cost_estimate,
            time_estimate: 10.0,
            metadata,
            score: None,
        }
    }
}

/// Which factor `rank_strategies` optimizes for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OptimizationGoal {
    #[default]
    Balanced,
    Cost,
    Speed,
    SuccessRate,
}

#[derive(Debug, Clone)]
pub struct StrategyStatsEntry {
    pub successes: u64,
    pub failures: u64,
    pub total_attempts: u64,
    pub success_rate: f64,
}

#[derive(Debug, Clone, Default)]
pub struct StrategyStatsReport {
    pub total_strategies_tried: usize,
    pub strategies: Vec<(String, StrategyStatsEntry)>,
}
