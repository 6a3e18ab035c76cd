//! Event fan-out.
//!
//! Each [`EventKind`] has one optional primary handler plus any number of
//! additional subscribers. Dispatch goes primary first, then subscribers in
//! registration order. A panicking handler is logged and skipped.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::{
    // ---
    log_debug,
    log_error,
    Event,
    EventHandler,
    EventKind,
};

/// Registry of event handlers, keyed by event kind.
#[derive(Debug, Default)]
pub struct EventEmitter {
    // ---
    primary: HashMap<EventKind, EventHandler>,
    multicast: HashMap<EventKind, Vec<EventHandler>>,
}

impl EventEmitter {
    // ---
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `handler` to the subscribers of `kind`.
    ///
    /// The same handler may be registered more than once; it then runs once
    /// per registration.
    pub fn on(&mut self, kind: EventKind, handler: EventHandler) -> &mut Self {
        // ---
        self.multicast.entry(kind).or_default().push(handler);
        self
    }

    /// Remove subscribers.
    ///
    /// | `kind`  | `handler` | removes                                   |
    /// |---------|-----------|-------------------------------------------|
    /// | `Some`  | `Some`    | every registration of `handler` on `kind` |
    /// | `Some`  | `None`    | all subscribers of `kind`                 |
    /// | `None`  | `Some`    | every registration of `handler`, any kind |
    /// | `None`  | `None`    | all subscribers                           |
    ///
    /// Primary handlers are never touched; use [`set_handler`](Self::set_handler).
    pub fn off(&mut self, kind: Option<EventKind>, handler: Option<&EventHandler>) -> &mut Self {
        // ---
        match (kind, handler) {
            (Some(kind), Some(handler)) => {
                if let Some(list) = self.multicast.get_mut(&kind) {
                    list.retain(|h| h != handler);
                }
            }
            (Some(kind), None) => {
                self.multicast.remove(&kind);
            }
            (None, Some(handler)) => {
                for list in self.multicast.values_mut() {
                    list.retain(|h| h != handler);
                }
            }
            (None, None) => self.multicast.clear(),
        }

        self.multicast.retain(|_, list| !list.is_empty());
        self
    }

    /// Set or clear the primary handler of `kind`, returning the previous one.
    pub fn set_handler(
        &mut self,
        kind: EventKind,
        handler: Option<EventHandler>,
    ) -> Option<EventHandler> {
        // ---
        match handler {
            Some(handler) => self.primary.insert(kind, handler),
            None => self.primary.remove(&kind),
        }
    }

    pub fn handler(&self, kind: EventKind) -> Option<&EventHandler> {
        self.primary.get(&kind)
    }

    /// Number of subscribers of `kind`, not counting the primary handler.
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.multicast.get(&kind).map_or(0, Vec::len)
    }

    /// Snapshot of everything that should see an event of `kind`, in
    /// dispatch order.
    pub fn handlers_for(&self, kind: EventKind) -> Vec<EventHandler> {
        // ---
        self.primary
            .get(&kind)
            .into_iter()
            .chain(self.multicast.get(&kind).into_iter().flatten())
            .cloned()
            .collect()
    }

    /// Deliver `event` to its handlers.
    pub fn emit(&self, event: &Event) {
        dispatch(&self.handlers_for(event.kind()), event);
    }
}

/// Run each handler on `event`, isolating panics.
///
/// Takes a snapshot rather than the registry so callers can release their
/// lock before any handler runs.
pub(crate) fn dispatch(handlers: &[EventHandler], event: &Event) {
    // ---
    if handlers.is_empty() {
        log_debug!("no handlers for {}", event.kind());
        return;
    }

    for handler in handlers {
        if let Err(panic) = catch_unwind(AssertUnwindSafe(|| handler.call(event))) {
            log_error!("{} handler panicked: {}", event.kind(), panic_message(&*panic));
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    // ---
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "<non-string panic>"
    }
}
