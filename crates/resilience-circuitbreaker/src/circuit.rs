use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use resilience_core::EventListeners;

use crate::events::CircuitBreakerEvent;

/// Three-state gate in front of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CircuitState {
    Closed = 0,
    Open = 1,
    HalfOpen = 2,
}

impl CircuitState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => CircuitState::Closed,
            1 => CircuitState::Open,
            _ => CircuitState::HalfOpen,
        }
    }
}

struct Inner {
    state: CircuitState,
    failure_count: u32,
    last_failure_at: Option<Instant>,
    /// Set when a HalfOpen probe has been admitted and not yet resolved;
    /// clears on the next `on_success`/`on_failure`.
    half_open_probe_in_flight: bool,
}

/// Configuration a breaker is constructed with.
#[derive(Debug, Clone, Copy)]
pub struct CircuitBreakerConfig {
    pub threshold: u32,
    pub cooldown: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            threshold: 5,
            cooldown: Duration::from_secs(60),
        }
    }
}

/// Per-resource failure-count/cooldown circuit breaker.
///
/// One breaker per execution scope; callers may key instances by operation
/// name when per-operation isolation is wanted. `allow()` is the only
/// method with a side effect (it may move `Open` to `HalfOpen`); it is
/// safe to call from many concurrent contexts.
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    state_atomic: AtomicU8,
    inner: Mutex<Inner>,
    pub(crate) event_listeners: EventListeners<CircuitBreakerEvent>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            state_atomic: AtomicU8::new(CircuitState::Closed as u8),
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                failure_count: 0,
                last_failure_at: None,
                half_open_probe_in_flight: false,
            }),
            event_listeners: EventListeners::new(),
        }
    }

    pub fn event_listeners(&self) -> &EventListeners<CircuitBreakerEvent> {
        &self.event_listeners
    }

    /// Current state without mutating anything (may be stale relative to a
    /// concurrent `allow()` that would move `Open` to `HalfOpen`).
    pub fn state(&self) -> CircuitState {
        CircuitState::from_u8(self.state_atomic.load(Ordering::Acquire))
    }

    pub fn failure_count(&self) -> u32 {
        self.inner.lock().expect("circuit breaker lock poisoned").failure_count
    }

    /// The only side-effect-bearing read. Returns whether a call may
    /// proceed right now.
    pub fn allow(&self) -> bool {
        let mut inner = self.inner.lock().expect("circuit breaker lock poisoned");
        match inner.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let elapsed = inner
                    .last_failure_at
                    .map(|t| t.elapsed())
                    .unwrap_or(Duration::MAX);
                if elapsed >= self.config.cooldown {
                    self.transition(&mut inner, CircuitState::HalfOpen);
                    inner.half_open_probe_in_flight = true;
                    true
                } else {
                    self.emit_rejected();
                    false
                }
            }
            CircuitState::HalfOpen => {
                if inner.half_open_probe_in_flight {
                    self.emit_rejected();
                    false
                } else {
                    inner.half_open_probe_in_flight = true;
                    true
                }
            }
        }
    }

    pub fn on_success(&self) {
        let mut inner = self.inner.lock().expect("circuit breaker lock poisoned");
        match inner.state {
            CircuitState::Closed => {
                inner.failure_count = 0;
            }
            CircuitState::HalfOpen => {
                inner.failure_count = 0;
                inner.half_open_probe_in_flight = false;
                self.transition(&mut inner, CircuitState::Closed);
            }
            CircuitState::Open => {
                // A success arriving while nominally Open (e.g. a stray
                // late result) has no transition effect of its own.
            }
        }
    }

    pub fn on_failure(&self) {
        let mut inner = self.inner.lock().expect("circuit breaker lock poisoned");
        inner.last_failure_at = Some(Instant::now());
        match inner.state {
            CircuitState::Closed => {
                inner.failure_count += 1;
                if inner.failure_count >= self.config.threshold {
                    self.transition(&mut inner, CircuitState::Open);
                }
            }
            CircuitState::HalfOpen => {
                inner.half_open_probe_in_flight = false;
                self.transition(&mut inner, CircuitState::Open);
            }
            CircuitState::Open => {}
        }
    }

    pub fn reset(&self) {
        let mut inner = self.inner.lock().expect("circuit breaker lock poisoned");
        inner.failure_count = 0;
        inner.last_failure_at = None;
        inner.half_open_probe_in_flight = false;
        self.transition(&mut inner, CircuitState::Closed);
    }

    fn transition(&self, inner: &mut Inner, to: CircuitState) {
        let from = inner.state;
        if from == to {
            return;
        }
        inner.state = to;
        self.state_atomic.store(to as u8, Ordering::Release);

        #[cfg(feature = "tracing")]
        tracing::info!(breaker = %self.name, ?from, ?to, "circuit breaker state transition");
        #[cfg(feature = "metrics")]
        metrics::gauge!("resilience_circuit_state", "breaker" => self.name.clone())
            .set(to as u8 as f64);

        self.event_listeners.emit(&CircuitBreakerEvent::StateTransition {
            name: self.name.clone(),
            at: Instant::now(),
            from,
            to,
        });
    }

    fn emit_rejected(&self) {
        #[cfg(feature = "metrics")]
        metrics::counter!("resilience_circuit_rejections_total", "breaker" => self.name.clone())
            .increment(1);
        self.event_listeners.emit(&CircuitBreakerEvent::CallRejected {
            name: self.name.clone(),
            at: Instant::now(),
        });
    }
}
