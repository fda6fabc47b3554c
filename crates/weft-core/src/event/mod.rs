//! Process-wide named-event bus shared by every wired service.
//!
//! A deliberately small dispatcher: handlers are keyed by event name,
//! invoked in registration order, and identified by a monotonically
//! increasing id so they can be removed again. One bus exists per
//! application; services receive it through their parameter bundle.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// Identifier handed out for each registered handler.
pub type EventId = u64;

/// Owned future returned by event handlers.
pub type EventFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Handler invoked with the event payload.
pub type EventHandler = Arc<dyn Fn(&serde_json::Value) -> EventFuture + Send + Sync>;

/// Named-event dispatcher.
pub struct EventBus {
    handlers: RwLock<HashMap<String, Vec<(EventId, EventHandler)>>>,
    next_id: AtomicU64,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count: usize = self
            .handlers
            .read()
            .map(|h| h.values().map(|v| v.len()).sum())
            .unwrap_or(0);
        f.debug_struct("EventBus")
            .field("handler_count", &count)
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a handler for events with the given name.
    pub fn on<F, Fut>(&self, event: &str, handler: F) -> EventId
    where
        F: Fn(&serde_json::Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let boxed: EventHandler = Arc::new(move |payload| Box::pin(handler(payload)));
        self.handlers
            .write()
            .expect("event handler lock poisoned")
            .entry(event.to_string())
            .or_default()
            .push((id, boxed));
        id
    }

    /// Remove a handler by id. Returns whether anything was removed.
    pub fn off(&self, id: EventId) -> bool {
        let mut handlers = self.handlers.write().expect("event handler lock poisoned");
        let mut found = false;
        for list in handlers.values_mut() {
            let before = list.len();
            list.retain(|(handler_id, _)| *handler_id != id);
            if list.len() < before {
                found = true;
            }
        }
        found
    }

    /// Dispatch an event to every handler registered for its name, in
    /// registration order. Returns the number of handlers invoked.
    pub async fn emit(&self, event: &str, payload: &serde_json::Value) -> usize {
        let snapshot: Vec<EventHandler> = {
            let handlers = self.handlers.read().expect("event handler lock poisoned");
            handlers
                .get(event)
                .map(|list| list.iter().map(|(_, h)| h.clone()).collect())
                .unwrap_or_default()
        };
        for handler in &snapshot {
            handler(payload).await;
        }
        snapshot.len()
    }

    /// Drop every registered handler.
    pub fn clear(&self) {
        self.handlers
            .write()
            .expect("event handler lock poisoned")
            .clear();
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
