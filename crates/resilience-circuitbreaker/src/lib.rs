//! Per-resource three-state circuit breaker: `Closed` → `Open` on a
//! failure-count threshold, `Open` → `HalfOpen` after a cooldown, and back
//! to `Closed`/`Open` on the first probe's outcome.

mod circuit;
mod events;

pub use circuit::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use events::CircuitBreakerEvent;
