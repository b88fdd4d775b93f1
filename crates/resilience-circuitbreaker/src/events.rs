use resilience_core::ResilienceEvent;
use std::time::Instant;

use crate::CircuitState;

/// Events emitted by a [`crate::CircuitBreaker`] as it transitions state.
#[derive(Debug, Clone)]
pub enum CircuitBreakerEvent {
    StateTransition {
        name: String,
        at: Instant,
        from: CircuitState,
        to: CircuitState,
    },
    CallRejected {
        name: String,
        at: Instant,
    },
}

impl ResilienceEvent for CircuitBreakerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CircuitBreakerEvent::StateTransition { .. } => "state_transition",
            CircuitBreakerEvent::CallRejected { .. } => "call_rejected",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            CircuitBreakerEvent::StateTransition { at, .. } => *at,
            CircuitBreakerEvent::CallRejected { at, .. } => *at,
        }
    }

    fn source_name(&self) -> &str {
        match self {
            CircuitBreakerEvent::StateTransition { name, .. } => name,
            CircuitBreakerEvent::CallRejected { name, .. } => name,
        }
    }
}
