use chrono::{DateTime, Duration as ChronoDuration, Utc};
use resilience_classifier::ErrorKind;
use serde_json::Value;
use sqlx::sqlite::{SqlitePoolOptions, SqliteQueryResult};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use crate::error::StoreError;
use crate::models::{BlacklistEntry, DailyTrend, FailureAnalytics, FailureRow, LabeledCount};

/// Durable local relational store: exactly one SQLite file per instance,
/// holding failure rows and the strategy blacklist.
///
/// Each public method runs in its own transaction; no cross-method
/// atomicity is promised to callers.
pub struct FailureStore {
    pool: SqlitePool,
}

impl FailureStore {
    /// Opens (creating if absent) the SQLite file at `path` and ensures the
    /// schema exists.
    pub async fn connect(path: &str) -> Result<Self, StoreError> {
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                let _ = std::fs::create_dir_all(parent);
            }
        }
        let url = format!("sqlite://{path}?mode=rwc");
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;
        let store = Self { pool };
        store.init_schema().await?;
        #[cfg(feature = "tracing")]
        tracing::info!(path, "failure store initialized");
        Ok(store)
    }

    /// In-memory store, for tests and for callers that want the query
    /// surface without durability.
    pub async fn connect_in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS failures (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                error_kind TEXT NOT NULL,
                error_message TEXT NOT NULL,
                operation TEXT NOT NULL,
                context TEXT,
                stack TEXT,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_failures_timestamp ON failures(timestamp)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_failures_operation ON failures(operation)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_failures_error_kind ON failures(error_kind)")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS strategy_blacklist (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                strategy_name TEXT NOT NULL,
                operation TEXT NOT NULL,
                failure_count INTEGER NOT NULL DEFAULT 1,
                first_failed_at TEXT NOT NULL,
                last_failed_at TEXT NOT NULL,
                reason TEXT,
                blacklisted_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(strategy_name, operation)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_blacklist_strategy_name ON strategy_blacklist(strategy_name)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn save_failure(
        &self,
        timestamp: DateTime<Utc>,
        error_kind: ErrorKind,
        error_message: &str,
        operation: &str,
        context: Option<&Value>,
        stack: Option<&str>,
    ) -> Result<i64, StoreError> {
        let context_json = context.map(serde_json::to_string).transpose()?;

        let result: SqliteQueryResult = sqlx::query(
            r#"
            INSERT INTO failures (timestamp, error_kind, error_message, operation, context, stack)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(timestamp.to_rfc3339())
        .bind(error_kind.as_str())
        .bind(error_message)
        .bind(operation)
        .bind(context_json)
        .bind(stack)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn get_failures(
        &self,
        operation: Option<&str>,
        error_kind: Option<ErrorKind>,
        since: Option<DateTime<Utc>>,
        limit: i64,
    ) -> Result<Vec<FailureRow>, StoreError> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM failures WHERE 1=1");

        if let Some(op) = operation {
            qb.push(" AND operation = ").push_bind(op.to_string());
        }
        if let Some(kind) = error_kind {
            qb.push(" AND error_kind = ").push_bind(kind.as_str());
        }
        if let Some(since) = since {
            qb.push(" AND timestamp >= ").push_bind(since.to_rfc3339());
        }
        qb.push(" ORDER BY timestamp DESC LIMIT ").push_bind(limit);

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.into_iter().map(row_to_failure).collect()
    }

    pub async fn cleanup_failures(&self, older_than: ChronoDuration) -> Result<u64, StoreError> {
        let cutoff = Utc::now() - older_than;
        let result = sqlx::query("DELETE FROM failures WHERE timestamp < ?")
            .bind(cutoff.to_rfc3339())
            .execute(&self.pool)
            .await?;
        #[cfg(feature = "tracing")]
        tracing::info!(deleted = result.rows_affected(), "cleaned up old failure records");
        Ok(result.rows_affected())
    }

    /// Upsert: on conflict with `(strategy_name, operation)`, increments
    /// `failure_count` and refreshes `last_failed_at`/`reason`.
    pub async fn add_to_blacklist(
        &self,
        strategy_name: &str,
        operation: &str,
        reason: &str,
    ) -> Result<(), StoreError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r#"
            INSERT INTO strategy_blacklist
                (strategy_name, operation, failure_count, first_failed_at, last_failed_at, reason)
            VALUES (?, ?, 1, ?, ?, ?)
            ON CONFLICT(strategy_name, operation) DO UPDATE SET
                failure_count = failure_count + 1,
                last_failed_at = excluded.last_failed_at,
                reason = excluded.reason
            "#,
        )
        .bind(strategy_name)
        .bind(operation)
        .bind(&now)
        .bind(&now)
        .bind(reason)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn is_blacklisted(&self, strategy_name: &str, operation: &str) -> Result<bool, StoreError> {
        let row = sqlx::query(
            "SELECT 1 as present FROM strategy_blacklist WHERE strategy_name = ? AND operation = ?",
        )
        .bind(strategy_name)
        .bind(operation)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }

    pub async fn remove_from_blacklist(&self, strategy_name: &str, operation: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM strategy_blacklist WHERE strategy_name = ? AND operation = ?")
            .bind(strategy_name)
            .bind(operation)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn get_blacklist(&self) -> Result<Vec<BlacklistEntry>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM strategy_blacklist ORDER BY failure_count DESC, last_failed_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_blacklist_entry).collect()
    }

    pub async fn analytics(&self) -> Result<FailureAnalytics, StoreError> {
        let most_common_errors = sqlx::query(
            "SELECT error_kind as label, COUNT(*) as count FROM failures GROUP BY error_kind ORDER BY count DESC LIMIT 10",
        )
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(row_to_labeled_count)
        .collect::<Result<Vec<_>, _>>()?;

        let problematic_operations = sqlx::query(
            "SELECT operation as label, COUNT(*) as count FROM failures GROUP BY operation ORDER BY count DESC LIMIT 10",
        )
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(row_to_labeled_count)
        .collect::<Result<Vec<_>, _>>()?;

        let daily_trends = sqlx::query(
            r#"
            SELECT DATE(timestamp) as date, COUNT(*) as count
            FROM failures
            WHERE timestamp >= datetime('now', '-7 days')
            GROUP BY DATE(timestamp)
            ORDER BY date ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|row| -> Result<DailyTrend, StoreError> {
            Ok(DailyTrend {
                date: row.try_get("date")?,
                count: row.try_get("count")?,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

        let total_failures: i64 = sqlx::query("SELECT COUNT(*) as total FROM failures")
            .fetch_one(&self.pool)
            .await?
            .try_get("total")?;

        let blacklisted_strategies: i64 = sqlx::query("SELECT COUNT(*) as total FROM strategy_blacklist")
            .fetch_one(&self.pool)
            .await?
            .try_get("total")?;

        Ok(FailureAnalytics {
            total_failures,
            blacklisted_strategies,
            most_common_errors,
            problematic_operations,
            daily_trends,
        })
    }

    /// Clears all rows. Test helper.
    pub async fn clear_all(&self) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM failures").execute(&self.pool).await?;
        sqlx::query("DELETE FROM strategy_blacklist").execute(&self.pool).await?;
        Ok(())
    }
}

fn row_to_failure(row: sqlx::sqlite::SqliteRow) -> Result<FailureRow, StoreError> {
    let timestamp: String = row.try_get("timestamp")?;
    let created_at: String = row.try_get("created_at")?;
    let context: Option<String> = row.try_get("context")?;
    Ok(FailureRow {
        id: row.try_get("id")?,
        timestamp: DateTime::parse_from_rfc3339(&timestamp)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
        error_kind: row.try_get("error_kind")?,
        error_message: row.try_get("error_message")?,
        operation: row.try_get("operation")?,
        context: context
            .map(|c| serde_json::from_str(&c))
            .transpose()?,
        stack: row.try_get("stack")?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    })
}

fn row_to_blacklist_entry(row: sqlx::sqlite::SqliteRow) -> Result<BlacklistEntry, StoreError> {
    let first_failed_at: String = row.try_get("first_failed_at")?;
    let last_failed_at: String = row.try_get("last_failed_at")?;
    let blacklisted_at: String = row.try_get("blacklisted_at")?;
    Ok(BlacklistEntry {
        id: row.try_get("id")?,
        strategy_name: row.try_get("strategy_name")?,
        operation: row.try_get("operation")?,
        failure_count: row.try_get("failure_count")?,
        first_failed_at: DateTime::parse_from_rfc3339(&first_failed_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
        last_failed_at: DateTime::parse_from_rfc3339(&last_failed_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
        reason: row.try_get("reason")?,
        blacklisted_at: DateTime::parse_from_rfc3339(&blacklisted_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    })
}

fn row_to_labeled_count(row: sqlx::sqlite::SqliteRow) -> Result<LabeledCount, StoreError> {
    Ok(LabeledCount {
        label: row.try_get("label")?,
        count: row.try_get("count")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_and_fetch_round_trips() {
        let store = FailureStore::connect_in_memory().await.unwrap();
        let ctx = serde_json::json!({"retries": 2});
        let id = store
            .save_failure(Utc::now(), ErrorKind::Network, "Connection timeout", "http_request", Some(&ctx), None)
            .await
            .unwrap();
        assert!(id > 0);

        let rows = store.get_failures(None, None, None, 10).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].operation, "http_request");
        assert_eq!(rows[0].context, Some(ctx));
    }

    #[tokio::test]
    async fn get_failures_filters_by_operation_and_kind() {
        let store = FailureStore::connect_in_memory().await.unwrap();
        store
            .save_failure(Utc::now(), ErrorKind::Network, "timeout", "op_a", None, None)
            .await
            .unwrap();
        store
            .save_failure(Utc::now(), ErrorKind::Authentication, "401", "op_b", None, None)
            .await
            .unwrap();

        let rows = store.get_failures(Some("op_a"), None, None, 10).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].operation, "op_a");

        let rows = store
            .get_failures(None, Some(ErrorKind::Authentication), None, 10)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].error_kind, "authentication");
    }

    #[tokio::test]
    async fn cleanup_removes_rows_older_than_horizon() {
        let store = FailureStore::connect_in_memory().await.unwrap();
        let old = Utc::now() - ChronoDuration::days(40);
        store
            .save_failure(old, ErrorKind::Network, "old", "op", None, None)
            .await
            .unwrap();
        store
            .save_failure(Utc::now(), ErrorKind::Network, "new", "op", None, None)
            .await
            .unwrap();

        let deleted = store.cleanup_failures(ChronoDuration::days(30)).await.unwrap();
        assert_eq!(deleted, 1);
        let remaining = store.get_failures(None, None, None, 10).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].error_message, "new");
    }

    #[tokio::test]
    async fn blacklist_is_idempotent_and_increments_failure_count() {
        let store = FailureStore::connect_in_memory().await.unwrap();
        store.add_to_blacklist("strategy_a", "op", "first failure").await.unwrap();
        assert!(store.is_blacklisted("strategy_a", "op").await.unwrap());

        store.add_to_blacklist("strategy_a", "op", "second failure").await.unwrap();
        let list = store.get_blacklist().await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].failure_count, 2);
        assert_eq!(list[0].reason.as_deref(), Some("second failure"));
    }

    #[tokio::test]
    async fn remove_from_blacklist_clears_entry() {
        let store = FailureStore::connect_in_memory().await.unwrap();
        store.add_to_blacklist("strategy_a", "op", "failure").await.unwrap();
        assert!(store.remove_from_blacklist("strategy_a", "op").await.unwrap());
        assert!(!store.is_blacklisted("strategy_a", "op").await.unwrap());
        assert!(!store.remove_from_blacklist("strategy_a", "op").await.unwrap());
    }

    #[tokio::test]
    async fn analytics_reports_totals_and_breakdowns() {
        let store = FailureStore::connect_in_memory().await.unwrap();
        for _ in 0..3 {
            store
                .save_failure(Utc::now(), ErrorKind::Network, "timeout", "op_a", None, None)
                .await
                .unwrap();
        }
        store.add_to_blacklist("strategy_a", "op_a", "bad").await.unwrap();

        let analytics = store.analytics().await.unwrap();
        assert_eq!(analytics.total_failures, 3);
        assert_eq!(analytics.blacklisted_strategies, 1);
        assert_eq!(analytics.most_common_errors[0].label, "network");
        assert_eq!(analytics.most_common_errors[0].count, 3);
    }

    #[tokio::test]
    async fn clear_all_empties_both_tables() {
        let store = FailureStore::connect_in_memory().await.unwrap();
        store
            .save_failure(Utc::now(), ErrorKind::Network, "timeout", "op", None, None)
            .await
            .unwrap();
        store.add_to_blacklist("s", "op", "r").await.unwrap();
        store.clear_all().await.unwrap();

        assert!(store.get_failures(None, None, None, 10).await.unwrap().is_empty());
        assert!(store.get_blacklist().await.unwrap().is_empty());
    }
}
