use std::future::Future;
use std::pin::Pin;

use resilience_explorer::StrategyCandidate;

/// A boxed, reusable async callable: invoked once per retry attempt inside
/// the strategy's own `Execute`, so it must be re-callable, not consumed.
pub type StrategyFuture<T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send>>;
type StrategyFn<T, E> = Box<dyn Fn() -> StrategyFuture<T, E> + Send + Sync>;

/// A named, callable candidate for accomplishing a task, with priority and
/// cost/time estimates.
///
/// Created by the caller; [`crate::ResilienceEngine`] holds a read-only view
/// for the duration of a race.
pub struct Strategy<T, E> {
    pub name: String,
    pub priority: f64,
    pub cost_estimate: f64,
    pub time_estimate: f64,
    pub description: String,
    callable: StrategyFn<T, E>,
}

impl<T, E> Strategy<T, E> {
    pub fn new<F, Fut>(name: impl Into<String>, callable: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        Self {
            name: name.into(),
            priority: 1.0,
            cost_estimate: 0.0,
            time_estimate: 0.0,
            description: String::new(),
            callable: Box::new(move || Box::pin(callable())),
        }
    }

    /// Pairs a [`StrategyCandidate`] produced by [`resilience_explorer::StrategyExplorer`]
    /// with the concrete callable it describes; the explorer only ranks
    /// metadata, it never holds executable code.
    pub fn from_candidate<F, Fut>(candidate: &StrategyCandidate, callable: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        Self {
            name: candidate.name.clone(),
            priority: candidate.priority,
            cost_estimate: candidate.cost_estimate,
            time_estimate: candidate.time_estimate,
            description: candidate.description.clone(),
            callable: Box::new(move || Box::pin(callable())),
        }
    }

    pub fn priority(mut self, priority: f64) -> Self {
        self.priority = priority;
        self
    }

    pub fn cost_estimate(mut self, cost: f64) -> Self {
        self.cost_estimate = cost;
        self
    }

    pub fn time_estimate(mut self, time: f64) -> Self {
        self.time_estimate = time;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub(crate) fn call(&self) -> StrategyFuture<T, E> {
        (self.callable)()
    }
}
