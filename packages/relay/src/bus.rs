//! Typed in-process fan-out for scrape events.
//!
//! Many internal consumers need to react to the same relay event without
//! each owning a socket. The bus keeps an observer list per event type:
//! handlers run in registration order, synchronously, on the delivering
//! task. Handlers should enqueue slow work rather than perform it inline;
//! a blocking handler stalls delivery for every other subscriber of that
//! type.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::events::{EventType, ScrapingEvent};

type Handler = Arc<dyn Fn(&ScrapingEvent) + Send + Sync>;

/// Identifier returned by [`EventBus::on`], used to unsubscribe one handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Per-event-type observer registry.
///
/// Thread-safe and cloneable; clones share the same registry.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

#[derive(Default)]
struct BusInner {
    next_id: AtomicU64,
    handlers: Mutex<HashMap<EventType, Vec<(SubscriptionId, Handler)>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for one event type. Handlers for the same type are
    /// invoked in registration order.
    pub fn on<F>(&self, event_type: EventType, handler: F) -> SubscriptionId
    where
        F: Fn(&ScrapingEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let mut handlers = self.inner.handlers.lock().unwrap_or_else(|e| e.into_inner());
        handlers
            .entry(event_type)
            .or_default()
            .push((id, Arc::new(handler)));
        id
    }

    /// Unregister a handler. Returns `false` if the subscription was not
    /// found (already removed, or registered for a different type).
    pub fn off(&self, event_type: EventType, id: SubscriptionId) -> bool {
        let mut handlers = self.inner.handlers.lock().unwrap_or_else(|e| e.into_inner());
        match handlers.get_mut(&event_type) {
            Some(list) => {
                let before = list.len();
                list.retain(|(sub_id, _)| *sub_id != id);
                list.len() != before
            }
            None => false,
        }
    }

    /// Deliver `event` to every handler registered for its type.
    ///
    /// A panicking handler must not stop delivery to the rest; panics are
    /// caught and logged per handler.
    pub fn emit(&self, event: &ScrapingEvent) {
        // Snapshot outside the lock so handlers can subscribe/unsubscribe
        // reentrantly without deadlocking.
        let snapshot: Vec<Handler> = {
            let handlers = self.inner.handlers.lock().unwrap_or_else(|e| e.into_inner());
            handlers
                .get(&event.event_type)
                .map(|list| list.iter().map(|(_, h)| Arc::clone(h)).collect())
                .unwrap_or_default()
        };

        for handler in snapshot {
            if catch_unwind(AssertUnwindSafe(|| handler(event))).is_err() {
                tracing::error!(event_type = ?event.event_type, "event handler panicked");
            }
        }
    }

    /// Drop every registration. Used by the client's full teardown.
    pub fn clear(&self) {
        self.inner
            .handlers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    /// Number of handlers currently registered for `event_type`.
    pub fn subscriber_count(&self, event_type: EventType) -> usize {
        self.inner
            .handlers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&event_type)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handlers = self.inner.handlers.lock().unwrap_or_else(|e| e.into_inner());
        f.debug_struct("EventBus")
            .field("event_types", &handlers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn started() -> ScrapingEvent {
        ScrapingEvent::scraping_started("Thingiverse")
    }

    #[test]
    fn handlers_run_in_registration_order() {
        let bus = EventBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            bus.on(EventType::ScrapingStarted, move |_| {
                order.lock().unwrap().push(tag);
            });
        }

        bus.emit(&started());
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn panicking_handler_does_not_stop_delivery() {
        let bus = EventBus::new();
        let delivered = Arc::new(AtomicUsize::new(0));

        bus.on(EventType::ScrapingStarted, |_| panic!("boom"));
        let counter = Arc::clone(&delivered);
        bus.on(EventType::ScrapingStarted, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        bus.emit(&started());
        assert_eq!(delivered.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn off_removes_only_the_named_subscription() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));

        let keep = Arc::clone(&count);
        bus.on(EventType::ScrapingError, move |_| {
            keep.fetch_add(1, Ordering::SeqCst);
        });
        let drop_count = Arc::clone(&count);
        let id = bus.on(EventType::ScrapingError, move |_| {
            drop_count.fetch_add(10, Ordering::SeqCst);
        });

        assert!(bus.off(EventType::ScrapingError, id));
        assert!(!bus.off(EventType::ScrapingError, id));

        bus.emit(&ScrapingEvent::scraping_error("Thangs", "fetch failed"));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn events_without_subscribers_are_dropped_silently() {
        let bus = EventBus::new();
        bus.emit(&started());
    }

    #[test]
    fn clear_removes_every_registration() {
        let bus = EventBus::new();
        bus.on(EventType::ScrapingStarted, |_| {});
        bus.on(EventType::ModelScraped, |_| {});

        bus.clear();

        assert_eq!(bus.subscriber_count(EventType::ScrapingStarted), 0);
        assert_eq!(bus.subscriber_count(EventType::ModelScraped), 0);
    }
}
