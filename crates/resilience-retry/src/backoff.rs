use std::time::Duration;

/// `{max_attempts ≥ 1, base_delay ≥ 0, max_delay ≥ base_delay, backoff_factor
/// > 1, jitter_enabled}`, validated at construction.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff_factor: f64,
    pub jitter_enabled: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs_f64(1.0),
            max_delay: Duration::from_secs_f64(60.0),
            backoff_factor: 2.0,
            jitter_enabled: true,
        }
    }
}

/// Raised by [`RetryConfigBuilder::build`] when the configuration violates
/// its own invariants. This is a programmer error, distinct from the
/// runtime error vocabulary the policy itself produces.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("max_attempts must be >= 1, got {0}")]
    MaxAttemptsTooSmall(u32),
    #[error("max_delay ({max_delay:?}) must be >= base_delay ({base_delay:?})")]
    MaxDelayBelowBaseDelay {
        max_delay: Duration,
        base_delay: Duration,
    },
    #[error("backoff_factor must be > 1, got {0}")]
    BackoffFactorTooSmall(f64),
}

impl RetryConfig {
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::new()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts < 1 {
            return Err(ConfigError::MaxAttemptsTooSmall(self.max_attempts));
        }
        if self.max_delay < self.base_delay {
            return Err(ConfigError::MaxDelayBelowBaseDelay {
                max_delay: self.max_delay,
                base_delay: self.base_delay,
            });
        }
        if self.backoff_factor <= 1.0 {
            return Err(ConfigError::BackoffFactorTooSmall(self.backoff_factor));
        }
        Ok(())
    }

    /// Delay before attempt `k+1` (0-indexed `k`): `min(base_delay *
    /// factor^k, max_delay)`, optionally perturbed by up to ±25%, clipped
    /// at zero.
    pub fn next_delay(&self, attempt: u32) -> Duration {
        let raw = self.base_delay.as_secs_f64() * self.backoff_factor.powi(attempt as i32);
        let capped = raw.min(self.max_delay.as_secs_f64());

        let with_jitter = if self.jitter_enabled {
            let jitter_range = capped * 0.25;
            let perturbation = rand::random::<f64>() * 2.0 * jitter_range - jitter_range;
            (capped + perturbation).max(0.0)
        } else {
            capped
        };

        Duration::from_secs_f64(with_jitter)
    }

    /// More attempts, shorter base delay.
    pub fn aggressive() -> Self {
        Self {
            max_attempts: 8,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(30),
            backoff_factor: 2.0,
            jitter_enabled: true,
        }
    }

    /// Fewer attempts, longer delays, no jitter.
    pub fn conservative() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(120),
            backoff_factor: 3.0,
            jitter_enabled: false,
        }
    }
}

/// Fluent builder for `RetryConfig`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryConfigBuilder {
    config: RetryConfig,
}

impl RetryConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: RetryConfig::default(),
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

    pub fn build(self) -> Result<RetryConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
