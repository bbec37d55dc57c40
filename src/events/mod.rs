//! Publish/subscribe bus for session and UI events.
//!
//! Handlers run synchronously inside [`EventBus::emit`], in registration
//! order. A failing or panicking handler is logged and skipped; the
//! remaining handlers for the same emit still run.

mod catalog;

pub use catalog::{CursorTarget, MatchStarted, MatchType, ScoreUpdated, SessionEnded, SessionEvent};

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex};

use serde::Serialize;
use serde_json::Value;

use crate::Result;

/// Error a handler may return; logged, never propagated to the emitter.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

type Handler = Arc<dyn Fn(&Value) -> std::result::Result<(), HandlerError> + Send + Sync>;

/// Handle returned by [`EventBus::on`], used to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Subscription {
    event: SessionEvent,
    id: u64,
}

impl Subscription {
    pub fn event(&self) -> SessionEvent {
        self.event
    }
}

/// Outcome of a single emit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EmitReport {
    pub delivered: usize,
    pub failed: usize,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    handlers: HashMap<SessionEvent, Vec<(u64, Handler)>>,
}

/// Cloneable handle to a shared subscriber table.
#[derive(Clone, Default)]
pub struct EventBus {
    registry: Arc<Mutex<Registry>>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        let total: usize = registry.handlers.values().map(Vec::len).sum();
        f.debug_struct("EventBus")
            .field("subscriptions", &total)
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `event`.
    pub fn on<F>(&self, event: SessionEvent, handler: F) -> Subscription
    where
        F: Fn(&Value) -> std::result::Result<(), HandlerError> + Send + Sync + 'static,
    {
        let mut registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        registry.next_id += 1;
        let id = registry.next_id;
        registry
            .handlers
            .entry(event)
            .or_default()
            .push((id, Arc::new(handler)));
        Subscription { event, id }
    }

    /// Remove a subscription. Returns false if it was already gone.
    pub fn off(&self, subscription: Subscription) -> bool {
        let mut registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        let Some(handlers) = registry.handlers.get_mut(&subscription.event) else {
            return false;
        };
        let before = handlers.len();
        handlers.retain(|(id, _)| *id != subscription.id);
        before != handlers.len()
    }

    /// Invoke every handler registered for `event` at the time of the call.
    ///
    /// The table is snapshotted first, so handlers may subscribe,
    /// unsubscribe or emit without deadlocking; such changes apply to the
    /// next emit.
    pub fn emit(&self, event: SessionEvent, payload: Value) -> EmitReport {
        let handlers: Vec<(u64, Handler)> = {
            let registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
            registry.handlers.get(&event).cloned().unwrap_or_default()
        };

        let mut report = EmitReport::default();
        for (id, handler) in handlers {
            match catch_unwind(AssertUnwindSafe(|| handler(&payload))) {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(e)) => {
                    report.failed += 1;
                    tracing::warn!(
                        event = event.name(),
                        subscription = id,
                        error = %e,
                        "Event handler failed"
                    );
                }
                Err(_) => {
                    report.failed += 1;
                    tracing::warn!(
                        event = event.name(),
                        subscription = id,
                        "Event handler panicked"
                    );
                }
            }
        }

        tracing::trace!(
            event = event.name(),
            delivered = report.delivered,
            failed = report.failed,
            "Event emitted"
        );
        report
    }

    /// Emit with a typed payload.
    pub fn emit_with<T: Serialize>(&self, event: SessionEvent, payload: &T) -> Result<EmitReport> {
        let value = serde_json::to_value(payload)?;
        Ok(self.emit(event, value))
    }

    pub fn subscriber_count(&self, event: SessionEvent) -> usize {
        self.registry
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .handlers
            .get(&event)
            .map(Vec::len)
            .unwrap_or(0)
    }
}
