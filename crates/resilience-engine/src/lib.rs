//! Top-level orchestration: drives [`resilience_retry`] and
//! [`resilience_circuitbreaker`] around a single callable, records failures
//! into [`resilience_analyzer`], and races [`Strategy`] alternatives when a
//! caller supplies more than one way to accomplish an operation.

mod config;
mod engine;
mod error;
mod events;
mod result;
mod strategy;

pub use config::{ResilienceConfig, ResilienceConfigBuilder};
pub use engine::ResilienceEngine;
pub use error::EngineError;
pub use events::EngineEvent;
pub use result::{ExecutionAnalysis, ExecutionMode, FailureSummary, ResilienceResult};
pub use strategy::{Strategy, StrategyFuture};
