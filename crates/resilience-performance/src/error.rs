#[derive(Debug, thiserror::Error)]
pub enum PerformanceError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] sqlx::Error),
    #[error("failed to encode stats as JSON: {0}")]
    JsonEncode(#[from] serde_json::Error),
}
