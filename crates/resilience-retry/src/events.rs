use resilience_core::ResilienceEvent;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub enum RetryEvent {
    Retry {
        name: String,
        at: Instant,
        attempt: u32,
        delay: Duration,
    },
    Success {
        name: String,
        at: Instant,
        attempts: u32,
    },
    Exhausted {
        name: String,
        at: Instant,
        attempts: u32,
    },
    NotRetryable {
        name: String,
        at: Instant,
    },
    Cancelled {
        name: String,
        at: Instant,
        attempts: u32,
    },
}

impl ResilienceEvent for RetryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RetryEvent::Retry { .. } => "retry",
            RetryEvent::Success { .. } => "success",
            RetryEvent::Exhausted { .. } => "exhausted",
            RetryEvent::NotRetryable { .. } => "not_retryable",
            RetryEvent::Cancelled { .. } => "cancelled",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            RetryEvent::Retry { at, .. }
            | RetryEvent::Success { at, .. }
            | RetryEvent::Exhausted { at, .. }
            | RetryEvent::NotRetryable { at, .. }
            | RetryEvent::Cancelled { at, .. } => *at,
        }
    }

    fn source_name(&self) -> &str {
        match self {
            RetryEvent::Retry { name, .. }
            | RetryEvent::Success { name, .. }
            | RetryEvent::Exhausted { name, .. }
            | RetryEvent::NotRetryable { name, .. }
            | RetryEvent::Cancelled { name, .. } => name,
        }
    }
}
