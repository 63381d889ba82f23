//! Synchronous event fan-out.
//!
//! Subscribers run in registration order, on the caller's thread, inside
//! the same tick that produced the event. A failing or panicking subscriber
//! is logged and skipped; it never stops delivery to the subscribers behind
//! it. No event is dropped once accepted and none is delivered twice.

use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::error;

use crate::event::Event;

/// A registered event subscriber.
pub type Handler = Box<dyn FnMut(&Event) -> anyhow::Result<()> + Send>;

/// Delivers each published event to every subscriber, in order.
#[derive(Default)]
pub struct Dispatcher {
    handlers: Vec<Handler>,
}

impl Dispatcher {
    /// Create an empty dispatcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber. Subscribers are invoked in registration order.
    pub fn subscribe<F>(&mut self, handler: F)
    where
        F: FnMut(&Event) -> anyhow::Result<()> + Send + 'static,
    {
        self.handlers.push(Box::new(handler));
    }

    /// Deliver one event to all subscribers.
    pub fn publish(&mut self, event: &Event) {
        for (i, handler) in self.handlers.iter_mut().enumerate() {
            match catch_unwind(AssertUnwindSafe(|| handler(event))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    error!(subscriber = i, "event handler failed: {err:#}");
                }
                Err(_) => {
                    error!(subscriber = i, kind = ?event.kind, "event handler panicked");
                }
            }
        }
    }

    /// Number of registered subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether no subscribers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
