//! Per-execution performance tracking for both models and skills: ingest
//! via [`ExecutionMetric`], rolling [`AggregateStats`], "best for task"
//! selection, ROI/trend reporting, and skill-gap detection, all driven
//! through [`PerformanceTracker`].

mod error;
mod gap;
mod metric;
mod pricing;
mod stats;
mod store;
mod tracker;

pub use error::PerformanceError;
pub use gap::{SkillGap, SkillGapRegistry};
pub use metric::{ExecutionMetric, SubjectKind};
pub use pricing::{ModelPrice, PricingTable};
pub use stats::AggregateStats;
pub use store::{MetricRow, PerformanceStore};
pub use tracker::{Goal, PerformanceTracker};
