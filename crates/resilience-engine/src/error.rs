/// Raised by [`crate::ResilienceConfigBuilder::build`] when the aggregate
/// configuration violates its own invariants. A programmer error, distinct
/// from the runtime `ResilienceResult` vocabulary the engine itself produces.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("retry config invalid: {0}")]
    Retry(#[from] resilience_retry::ConfigError),
    #[error("max_parallel_strategies must be >= 1, got {0}")]
    MaxParallelStrategiesTooSmall(usize),
    #[error("circuit_breaker_threshold must be >= 1, got {0}")]
    CircuitBreakerThresholdTooSmall(u32),
    #[error("persistence_enabled requires a store_path")]
    MissingStorePath,
    #[error("failed to open failure store: {0}")]
    Store(#[from] resilience_store::StoreError),
    #[error("config has persistence_enabled; use ResilienceEngine::connect to open the store")]
    PersistenceRequiresConnect,
}
