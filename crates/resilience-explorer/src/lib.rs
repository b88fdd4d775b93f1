//! Template-based alternative-strategy enumeration and goal-weighted ranking.

mod explorer;
mod strategy;
mod templates;

pub use explorer::StrategyExplorer;
pub use strategy::{
    OptimizationGoal, StrategyCandidate, StrategyKind, StrategyStatsEntry, StrategyStatsReport,
};
