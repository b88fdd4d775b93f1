use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One row of the `failures` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureRow {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub error_kind: String,
    pub error_message: String,
    pub operation: String,
    pub context: Option<Value>,
    pub stack: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One row of the `strategy_blacklist` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlacklistEntry {
    pub id: i64,
    pub strategy_name: String,
    pub operation: String,
    pub failure_count: i64,
    pub first_failed_at: DateTime<Utc>,
    pub last_failed_at: DateTime<Utc>,
    pub reason: Option<String>,
    pub blacklisted_at: DateTime<Utc>,
}

/// A `(label, count)` pair, used for the error/operation breakdowns in
/// [`FailureAnalytics`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabeledCount {
    pub label: String,
    pub count: i64,
}

/// A single day's failure count, for the 7-day trend query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyTrend {
    pub date: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureAnalytics {
    pub total_failures: i64,
    pub blacklisted_strategies: i64,
    pub most_common_errors: Vec<LabeledCount>,
    pub problematic_operations: Vec<LabeledCount>,
    pub daily_trends: Vec<DailyTrend>,
}
