use chrono::{DateTime, Duration as ChronoDuration, Utc};
use resilience_classifier::ErrorKind;
use sqlx::sqlite::{SqlitePoolOptions, SqliteQueryResult};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use crate::error::PerformanceError;
use crate::metric::{ExecutionMetric, SubjectKind};

/// One row of the `performance_metrics` table.
#[derive(Debug, Clone)]
pub struct MetricRow {
    pub id: i64,
    pub subject: String,
    pub task_type: String,
    pub timestamp: DateTime<Utc>,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub total_tokens: i64,
    pub cost_estimate: f64,
    pub latency_ms: i64,
    pub success: bool,
    pub finish_reason: Option<String>,
    pub quality: Option<f64>,
    pub retry_required: bool,
    pub error_kind: Option<String>,
}

/// Durable local relational store for performance metrics, one SQLite file
/// shared by both the Model and Skill flavors of [`crate::PerformanceTracker`].
pub struct PerformanceStore {
    pool: SqlitePool,
}

impl PerformanceStore {
    pub async fn connect(path: &str) -> Result<Self, PerformanceError> {
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                let _ = std::fs::create_dir_all(parent);
            }
        }
        let url = format!("sqlite://{path}?mode=rwc");
        let pool = SqlitePoolOptions::new().max_connections(5).connect(&url).await?;
        let store = Self { pool };
        store.init_schema().await?;
        #[cfg(feature = "tracing")]
        tracing::info!(path, "performance store initialized");
        Ok(store)
    }

    pub async fn connect_in_memory() -> Result<Self, PerformanceError> {
        let pool = SqlitePoolOptions::new().max_connections(1).connect("sqlite::memory:").await?;
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), PerformanceError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS performance_metrics (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                subject TEXT NOT NULL,
                task_type TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                input_tokens INTEGER NOT NULL,
                output_tokens INTEGER NOT NULL,
                total_tokens INTEGER NOT NULL,
                cost_estimate REAL NOT NULL,
                latency_ms INTEGER NOT NULL,
                success INTEGER NOT NULL,
                finish_reason TEXT,
                quality REAL,
                retry_required INTEGER NOT NULL DEFAULT 0,
                error_kind TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_perf_subject_task ON performance_metrics(subject, task_type)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_perf_timestamp ON performance_metrics(timestamp)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_perf_subject_timestamp ON performance_metrics(subject, timestamp)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn save_metric(&self, metric: &ExecutionMetric) -> Result<i64, PerformanceError> {
        let result: SqliteQueryResult = sqlx::query(
            r#"
            INSERT INTO performance_metrics (
                subject, task_type, timestamp,
                input_tokens, output_tokens, total_tokens, cost_estimate,
                latency_ms, success, finish_reason, quality, retry_required, error_kind
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&metric.subject_id)
        .bind(&metric.task_type)
        .bind(metric.timestamp.to_rfc3339())
        .bind(metric.input_tokens as i64)
        .bind(metric.output_tokens as i64)
        .bind(metric.total_tokens() as i64)
        .bind(metric.cost_estimate.unwrap_or(0.0))
        .bind(metric.latency_ms as i64)
        .bind(metric.success as i64)
        .bind(&metric.finish_reason)
        .bind(metric.quality_score)
        .bind(metric.retry_required as i64)
        .bind(metric.error_kind.map(|k| k.as_str().to_string()))
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn get_metrics(
        &self,
        subject: Option<&str>,
        task_type: Option<&str>,
        since: Option<DateTime<Utc>>,
        limit: i64,
    ) -> Result<Vec<MetricRow>, PerformanceError> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM performance_metrics WHERE 1=1");

        if let Some(subject) = subject {
            qb.push(" AND subject = ").push_bind(subject.to_string());
        }
        if let Some(task_type) = task_type {
            qb.push(" AND task_type = ").push_bind(task_type.to_string());
        }
        if let Some(since) = since {
            qb.push(" AND timestamp >= ").push_bind(since.to_rfc3339());
        }
        qb.push(" ORDER BY timestamp ASC LIMIT ").push_bind(limit);

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.into_iter().map(row_to_metric).collect()
    }

    pub async fn distinct_subjects(&self) -> Result<Vec<String>, PerformanceError> {
        let rows = sqlx::query("SELECT DISTINCT subject FROM performance_metrics")
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(|row| Ok(row.try_get::<String, _>("subject")?)).collect()
    }

    pub async fn cleanup(&self, older_than: ChronoDuration) -> Result<u64, PerformanceError> {
        let cutoff = Utc::now() - older_than;
        let result = sqlx::query("DELETE FROM performance_metrics WHERE timestamp < ?")
            .bind(cutoff.to_rfc3339())
            .execute(&self.pool)
            .await?;
        #[cfg(feature = "tracing")]
        tracing::info!(deleted = result.rows_affected(), "cleaned up old performance records");
        Ok(result.rows_affected())
    }
}

fn row_to_metric(row: sqlx::sqlite::SqliteRow) -> Result<MetricRow, PerformanceError> {
    let timestamp: String = row.try_get("timestamp")?;
    Ok(MetricRow {
        id: row.try_get("id")?,
        subject: row.try_get("subject")?,
        task_type: row.try_get("task_type")?,
        timestamp: DateTime::parse_from_rfc3339(&timestamp)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
        input_tokens: row.try_get("input_tokens")?,
        output_tokens: row.try_get("output_tokens")?,
        total_tokens: row.try_get("total_tokens")?,
        cost_estimate: row.try_get("cost_estimate")?,
        latency_ms: row.try_get("latency_ms")?,
        success: row.try_get::<i64, _>("success")? != 0,
        finish_reason: row.try_get("finish_reason")?,
        quality: row.try_get("quality")?,
        retry_required: row.try_get::<i64, _>("retry_required")? != 0,
        error_kind: row.try_get("error_kind")?,
    })
}

impl MetricRow {
    /// Recovers an [`ExecutionMetric`] from a stored row, for seeding the
    /// in-memory window on startup. `subject_kind` must be supplied by the
    /// caller since it isn't persisted per row (one store may back either
    /// flavor, keyed by `subject`/`task_type` alone).
    pub fn into_metric(self, subject_kind: SubjectKind) -> ExecutionMetric {
        let mut metric = ExecutionMetric::new(self.subject, subject_kind, self.task_type, self.success, self.latency_ms as u64)
            .tokens(self.input_tokens as u64, self.output_tokens as u64)
            .cost_estimate(self.cost_estimate)
            .retry_required(self.retry_required);
        metric.timestamp = self.timestamp;
        if let Some(q) = self.quality {
            metric = metric.quality_score(q);
        }
        if let Some(reason) = self.finish_reason {
            metric = metric.finish_reason(reason);
        }
        if let Some(kind) = self.error_kind {
            if let Some(k) = ErrorKind::ALL.iter().copied().find(|k| k.as_str() == kind) {
                metric = metric.error_kind(k);
            }
        }
        metric
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metric() -> ExecutionMetric {
        ExecutionMetric::new("gpt-4", SubjectKind::Model, "general", true, 120)
            .tokens(100, 50)
            .cost_estimate(0.01)
    }

    #[tokio::test]
    async fn save_and_fetch_round_trips() {
        let store = PerformanceStore::connect_in_memory().await.unwrap();
        let id = store.save_metric(&metric()).await.unwrap();
        assert!(id > 0);

        let rows = store.get_metrics(None, None, None, 10).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].subject, "gpt-4");
        assert_eq!(rows[0].total_tokens, 150);
    }

    #[tokio::test]
    async fn cleanup_removes_rows_older_than_horizon() {
        let store = PerformanceStore::connect_in_memory().await.unwrap();
        let mut old = metric();
        old.timestamp = Utc::now() - ChronoDuration::days(200);
        store.save_metric(&old).await.unwrap();
        store.save_metric(&metric()).await.unwrap();

        let deleted = store.cleanup(ChronoDuration::days(180)).await.unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(store.get_metrics(None, None, None, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn distinct_subjects_lists_unique_names() {
        let store = PerformanceStore::connect_in_memory().await.unwrap();
        store.save_metric(&metric()).await.unwrap();
        store.save_metric(&ExecutionMetric::new("claude-3-haiku", SubjectKind::Model, "general", true, 80)).await.unwrap();

        let subjects = store.distinct_subjects().await.unwrap();
        assert_eq!(subjects.len(), 2);
    }
}
