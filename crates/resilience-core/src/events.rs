//! Shared observability plumbing: a typed event bus every component in the
//! workspace plugs into, generalized from a single-pattern event system to
//! one bound usable by circuit breakers, retry policies, the engine, and
//! the strategy explorer alike.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// A resilience event emitted by some component.
///
/// Implementors are simple enums (`CircuitBreakerEvent`, `RetryEvent`,
/// `EngineEvent`, `ExplorerEvent`) describing what happened, when, and
/// under which named instance of the component.
pub trait ResilienceEvent: fmt::Debug + Send + Sync + 'static {
    /// Short machine-readable event type, e.g. `"state_transition"`.
    fn event_type(&self) -> &'static str;

    /// When the event occurred.
    fn timestamp(&self) -> Instant;

    /// Name of the component instance that emitted this event.
    fn source_name(&self) -> &str;
}

/// Receives events from a component.
pub trait EventListener<E: ResilienceEvent>: Send + Sync {
    fn on_event(&self, event: &E);
}

/// Type-erased, cheaply cloneable handle to a listener.
pub type BoxedEventListener<E> = Arc<dyn EventListener<E>>;

/// A closure-backed listener, for ad-hoc subscriptions without a named type.
pub struct FnListener<E, F>
where
    F: Fn(&E) + Send + Sync,
{
    f: F,
    _marker: std::marker::PhantomData<fn(&E)>,
}

impl<E, F> FnListener<E, F>
where
    F: Fn(&E) + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self {
            f,
            _marker: std::marker::PhantomData,
        }
    }
}

impl<E, F> EventListener<E> for FnListener<E, F>
where
    E: ResilienceEvent,
    F: Fn(&E) + Send + Sync,
{
    fn on_event(&self, event: &E) {
        (self.f)(event)
    }
}

/// A collection of listeners subscribed to one component instance.
///
/// Cloning is cheap: listeners are reference-counted and shared, not
/// duplicated.
#[derive(Clone)]
pub struct EventListeners<E: ResilienceEvent> {
    listeners: Arc<std::sync::RwLock<Vec<BoxedEventListener<E>>>>,
}

impl<E: ResilienceEvent> Default for EventListeners<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: ResilienceEvent> EventListeners<E> {
    pub fn new() -> Self {
        Self {
            listeners: Arc::new(std::sync::RwLock::new(Vec::new())),
        }
    }

    pub fn add(&self, listener: BoxedEventListener<E>) {
        self.listeners
            .write()
            .expect("event listener lock poisoned")
            .push(listener);
    }

    pub fn add_fn<F>(&self, f: F)
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.add(Arc::new(FnListener::new(f)));
    }

    /// Emit an event to every registered listener. A panicking listener is
    /// caught and logged (where `tracing`/`metrics` are enabled) so that one
    /// broken subscriber cannot take down the emitting component.
    pub fn emit(&self, event: &E) {
        let listeners = self.listeners.read().expect("event listener lock poisoned");
        for listener in listeners.iter() {
            let listener = Arc::clone(listener);
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                listener.on_event(event);
            }));
            if result.is_err() {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    event_type = event.event_type(),
                    source = event.source_name(),
                    "event listener panicked"
                );
                #[cfg(feature = "metrics")]
                metrics::counter!("resilience_event_listener_panics_total").increment(1);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.listeners
            .read()
            .expect("event listener lock poisoned")
            .is_empty()
    }

    pub fn len(&self) -> usize {
        self.listeners
            .read()
            .expect("event listener lock poisoned")
            .len()
    }
}
