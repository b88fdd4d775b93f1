use resilience_core::ResilienceEvent;
use std::time::Instant;

/// Events emitted by a [`crate::ResilienceEngine`] as it executes and
/// races strategies.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    ExecutionStarted {
        name: String,
        at: Instant,
    },
    ExecutionSucceeded {
        name: String,
        at: Instant,
        attempts: u32,
    },
    ExecutionFailed {
        name: String,
        at: Instant,
        attempts: u32,
    },
    StrategyStarted {
        name: String,
        at: Instant,
        strategy: String,
    },
    StrategyWon {
        name: String,
        at: Instant,
        strategy: String,
    },
    WallclockExceeded {
        name: String,
        at: Instant,
    },
    EscalationNeeded {
        name: String,
        at: Instant,
        failure_count: usize,
    },
    StrategyTimedOut {
        name: String,
        at: Instant,
        strategy: String,
    },
    CostBudgetExceeded {
        name: String,
        at: Instant,
        total_cost: f64,
    },
    AttemptBudgetExceeded {
        name: String,
        at: Instant,
        total_attempts: u32,
    },
}

impl ResilienceEvent for EngineEvent {
    fn event_type(&self) -> &'static str {
        match self {
            EngineEvent::ExecutionStarted { .. } => "execution_started",
            EngineEvent::ExecutionSucceeded { .. } => "execution_succeeded",
            EngineEvent::ExecutionFailed { .. } => "execution_failed",
            EngineEvent::StrategyStarted { .. } => "strategy_started",
            EngineEvent::StrategyWon { .. } => "strategy_won",
            EngineEvent::WallclockExceeded { .. } => "wallclock_exceeded",
            EngineEvent::EscalationNeeded { .. } => "escalation_needed",
            EngineEvent::StrategyTimedOut { .. } => "strategy_timed_out",
            EngineEvent::CostBudgetExceeded { .. } => "cost_budget_exceeded",
            EngineEvent::AttemptBudgetExceeded { .. } => "attempt_budget_exceeded",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            EngineEvent::ExecutionStarted { at, .. }
            | EngineEvent::ExecutionSucceeded { at, .. }
            | EngineEvent::ExecutionFailed { at, .. }
            | EngineEvent::StrategyStarted { at, .. }
            | EngineEvent::StrategyWon { at, .. }
            | EngineEvent::WallclockExceeded { at, .. }
            | EngineEvent::EscalationNeeded { at, .. }
            | EngineEvent::StrategyTimedOut { at, .. }
            | EngineEvent::CostBudgetExceeded { at, .. }
            | EngineEvent::AttemptBudgetExceeded { at, .. } => *at,
        }
    }

    fn source_name(&self) -> &str {
        match self {
            EngineEvent::ExecutionStarted { name, .. }
            | EngineEvent::ExecutionSucceeded { name, .. }
            | EngineEvent::ExecutionFailed { name, .. }
            | EngineEvent::StrategyStarted { name, .. }
            | EngineEvent::StrategyWon { name, .. }
            | EngineEvent::WallclockExceeded { name, .. }
            | EngineEvent::EscalationNeeded { name, .. }
            | EngineEvent::StrategyTimedOut { name, .. }
            | EngineEvent::CostBudgetExceeded { name, .. }
            | EngineEvent::AttemptBudgetExceeded { name, .. } => name,
        }
    }
}
