use std::time::Duration;

use resilience_retry::RetryConfig;

use crate::error::EngineError;

/// Engine-wide configuration: retry/breaker knobs plus the resource
/// envelope and alternative-exploration limits.
#[derive(Debug, Clone)]
pub struct ResilienceConfig {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff_factor: f64,
    pub jitter_enabled: bool,

    pub circuit_breaker_threshold: u32,
    pub circuit_breaker_cooldown: Duration,

    /// Ceiling on `execute_alternatives`' total elapsed time, across every
    /// strategy it tries.
    pub max_total_wallclock: Duration,
    /// Ceiling on cumulative `cost_estimate` across strategies tried by one
    /// `execute_alternatives` call. Checked before starting each strategy in
    /// sequential mode, and before launching the race in parallel mode;
    /// exceeding it stops further strategies and sets `escalation_needed`.
    pub max_total_cost: f64,
    /// Ceiling on cumulative attempts across strategies tried by one
    /// sequential `execute_alternatives` call. Parallel mode launches its
    /// whole batch up front, so this has no effect there.
    pub max_total_attempts: u32,
    pub max_parallel_strategies: usize,
    /// Per-strategy timeout inside `execute_alternatives`; a strategy that
    /// runs longer is treated as a failed attempt with zero attempts
    /// recorded, and its siblings keep running.
    pub strategy_wallclock: Duration,

    pub pattern_threshold: usize,
    pub escalate_after_failures: usize,

    /// When set, [`crate::ResilienceEngine::connect`] opens `store_path` as
    /// a [`resilience_store::FailureStore`] and backs the analyzer with it.
    /// [`crate::ResilienceEngine::new`] rejects a config with this set,
    /// since opening a store is async.
    pub persistence_enabled: bool,
    pub store_path: Option<String>,
    /// Horizon consumed by [`crate::ResilienceEngine::cleanup_expired`].
    pub retention_days: u32,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs_f64(1.0),
            max_delay: Duration::from_secs_f64(60.0),
            backoff_factor: 2.0,
            jitter_enabled: true,
            circuit_breaker_threshold: 5,
            circuit_breaker_cooldown: Duration::from_secs_f64(60.0),
            max_total_wallclock: Duration::from_secs_f64(300.0),
            max_total_cost: 1.0,
            max_total_attempts: 20,
            max_parallel_strategies: 3,
            strategy_wallclock: Duration::from_secs_f64(30.0),
            pattern_threshold: 3,
            escalate_after_failures: 10,
            persistence_enabled: false,
            store_path: None,
            retention_days: 30,
        }
    }
}

impl ResilienceConfig {
    pub fn builder() -> ResilienceConfigBuilder {
        ResilienceConfigBuilder::new()
    }

    pub(crate) fn retry_config(&self) -> Result<RetryConfig, EngineError> {
        Ok(RetryConfig::builder()
            .max_attempts(self.max_attempts)
            .base_delay(self.base_delay)
            .max_delay(self.max_delay)
            .backoff_factor(self.backoff_factor)
            .jitter(self.jitter_enabled)
            .build()?)
    }

    fn validate(&self) -> Result<(), EngineError> {
        self.retry_config()?;
        if self.max_parallel_strategies < 1 {
            return Err(EngineError::MaxParallelStrategiesTooSmall(self.max_parallel_strategies));
        }
        if self.circuit_breaker_threshold < 1 {
            return Err(EngineError::CircuitBreakerThresholdTooSmall(self.circuit_breaker_threshold));
        }
        if self.persistence_enabled && self.store_path.is_none() {
            return Err(EngineError::MissingStorePath);
        }
        Ok(())
    }
}

/// Fluent builder mirroring [`resilience_retry::RetryConfigBuilder`], one
/// named setter per knob, validated at `.build()`.
#[derive(Debug, Clone, Default)]
pub struct ResilienceConfigBuilder {
    config: ResilienceConfig,
}

impl ResilienceConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ResilienceConfig::default(),
        }
    }

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.config.max_attempts = n;
        self
    }

    pub fn base_delay(mut self, d: Duration) -> Self {
        self.config.base_delay = d;
        self
    }

    pub fn max_delay(mut self, d: Duration) -> Self {
        self.config.max_delay = d;
        self
    }

    pub fn backoff_factor(mut self, f: f64) -> Self {
        self.config.backoff_factor = f;
        self
    }

    pub fn jitter(mut self, enabled: bool) -> Self {
        self.config.jitter_enabled = enabled;
        self
    }

    pub fn circuit_breaker_threshold(mut self, n: u32) -> Self {
        self.config.circuit_breaker_threshold = n;
        self
    }

    pub fn circuit_breaker_cooldown(mut self, d: Duration) -> Self {
        self.config.circuit_breaker_cooldown = d;
        self
    }

    pub fn max_total_wallclock(mut self, d: Duration) -> Self {
        self.config.max_total_wallclock = d;
        self
    }

    pub fn max_total_cost(mut self, cost: f64) -> Self {
        self.config.max_total_cost = cost;
        self
    }

    pub fn max_total_attempts(mut self, n: u32) -> Self {
        self.config.max_total_attempts = n;
        self
    }

    pub fn max_parallel_strategies(mut self, n: usize) -> Self {
        self.config.max_parallel_strategies = n;
        self
    }

    pub fn strategy_wallclock(mut self, d: Duration) -> Self {
        self.config.strategy_wallclock = d;
        self
    }

    pub fn pattern_threshold(mut self, n: usize) -> Self {
        self.config.pattern_threshold = n;
        self
    }

    pub fn escalate_after_failures(mut self, n: usize) -> Self {
        self.config.escalate_after_failures = n;
        self
    }

    pub fn persistence(mut self, store_path: impl Into<String>) -> Self {
        self.config.persistence_enabled = true;
        self.config.store_path = Some(store_path.into());
        self
    }

    pub fn retention_days(mut self, days: u32) -> Self {
        self.config.retention_days = days;
        self
    }

    pub fn build(self) -> Result<ResilienceConfig, EngineError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
