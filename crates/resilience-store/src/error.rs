#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] sqlx::Error),
    #[error("failed to encode context as JSON: {0}")]
    ContextEncode(#[from] serde_json::Error),
}
