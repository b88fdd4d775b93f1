//! Bounded exponential backoff with jitter, driving [`resilience_classifier`]
//! and [`resilience_circuitbreaker`] around a single callable.

mod backoff;
mod events;
mod executor;

pub use backoff::{ConfigError, RetryConfig, RetryConfigBuilder};
pub use events::RetryEvent;
pub use executor::{execute_with_retry, RetryOutcome};
