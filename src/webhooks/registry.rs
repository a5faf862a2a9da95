//! Event subscription registry and dispatch.
//!
//! Subscribers register against a finite set of event kinds. Registration
//! order is preserved and is the dispatch order within a single event; there
//! is no unsubscribe. Across different events handlers may overlap freely —
//! dispatch is fire-and-forget from the listener's point of view.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;
use tracing::error;

/// The kinds of events subscribers can register for.
///
/// "data" is the only kind the server emits: one event per verified inbound
/// delivery, carrying the parsed JSON body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Data,
}

impl EventKind {
    /// Resolves an event-kind name. Unknown names resolve to `None`, which
    /// the string-based subscription API treats as a silent no-op.
    pub fn parse(name: &str) -> Option<EventKind> {
        match name {
            "data" => Some(EventKind::Data),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Data => "data",
        }
    }
}

/// A subscriber callback: takes the parsed event and returns a future that
/// performs any follow-on work.
pub type EventHandler =
    Arc<dyn Fn(Value) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Wraps an async closure as an [`EventHandler`].
pub fn handler<F, Fut>(f: F) -> EventHandler
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move |event| Box::pin(f(event)))
}

/// Ordered subscriber lists, one per event kind.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    data: Vec<EventHandler>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        HandlerRegistry::default()
    }

    /// Appends a handler for the given kind. Existing handlers are never
    /// disturbed, reordered, or removed.
    pub fn subscribe(&mut self, kind: EventKind, handler: EventHandler) {
        match kind {
            EventKind::Data => self.data.push(handler),
        }
    }

    /// The handlers registered for a kind, in registration order.
    pub fn handlers(&self, kind: EventKind) -> &[EventHandler] {
        match kind {
            EventKind::Data => &self.data,
        }
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("data", &self.data.len())
            .finish()
    }
}

/// Invokes every handler with the event, in registration order.
///
/// Each handler runs as its own task so that a panic in one handler is
/// contained: it is logged and the remaining handlers still run. Handlers
/// for a single event run sequentially; the caller decides whether whole
/// events overlap (the server spawns one dispatch per event).
pub async fn dispatch(handlers: &[EventHandler], event: Value) {
    for (index, handler) in handlers.iter().enumerate() {
        let fut = handler(event.clone());
        if let Err(err) = tokio::spawn(fut).await {
            error!(handler = index, error = %err, "event handler panicked");
        }
    }
}
