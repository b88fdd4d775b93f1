//! Shared infrastructure for the resilient execution core: a typed event
//! bus and a cooperative cancellation signal, used by every other crate in
//! this workspace.

mod cancellation;
mod events;

pub use cancellation::{CancellationSource, CancellationToken};
pub use events::{BoxedEventListener, EventListener, EventListeners, FnListener, ResilienceEvent};
