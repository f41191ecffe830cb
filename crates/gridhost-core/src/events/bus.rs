//! Synchronous publish/subscribe bus.
//!
//! [`EventBus::emit`] calls every listener currently subscribed to the event
//! name, in subscription order, before returning. There is no buffering and no
//! replay. Each listener runs inside its own error boundary, so a failing or
//! panicking listener is logged and the remaining listeners still run.
//!
//! The bus performs no payload validation. Listeners that care about shape
//! should subscribe through [`EventBus::subscribe_typed`], which deserializes
//! the payload and skips (with a warning) anything that does not fit.
//!
//! ```rust,ignore
//! let bus = EventBus::new();
//! let unsubscribe = bus.subscribe(names::SELECTION_CHANGED, |payload| {
//!     println!("selection is now {payload}");
//!     Ok(())
//! });
//! bus.emit(names::SELECTION_CHANGED, json!({ "row": 3, "col": 1 }));
//! unsubscribe.run()?;
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error, trace, warn};

use crate::error::{CoreError, CoreResult, HandlerResult};
use crate::foundation::{Cleanup, RegistrationId, call_isolated};

/// Payload carried by an event. `Value::Null` stands for "no payload".
pub type EventPayload = serde_json::Value;

/// Type-erased listener stored by the bus.
pub type ListenerFn = Arc<dyn Fn(&EventPayload) -> HandlerResult<()> + Send + Sync>;

struct Subscription {
    token: RegistrationId,
    listener: ListenerFn,
    active: AtomicBool,
}

#[derive(Default)]
struct BusInner {
    listeners: RwLock<HashMap<String, Vec<Arc<Subscription>>>>,
}

impl BusInner {
    fn unsubscribe(&self, event: &str, token: RegistrationId) {
        let mut listeners = self.listeners.write();
        let Some(subs) = listeners.get_mut(event) else {
            return;
        };
        if let Some(pos) = subs.iter().position(|s| s.token == token) {
            let sub = subs.remove(pos);
            sub.active.store(false, Ordering::Release);
            debug!(event = %event, token = %token, "Listener unsubscribed");
        }
        if subs.is_empty() {
            listeners.remove(event);
        }
    }
}

/// Broadcast dispatcher for cross-cutting notifications.
///
/// Cloning an `EventBus` yields another handle to the same bus.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    /// Creates an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes `listener` to `event`.
    ///
    /// The returned [`Cleanup`] unsubscribes it. A listener unsubscribed while
    /// an emit is in progress is not called for the rest of that emit.
    pub fn subscribe<F>(&self, event: impl Into<String>, listener: F) -> Cleanup
    where
        F: Fn(&EventPayload) -> HandlerResult<()> + Send + Sync + 'static,
    {
        let event = event.into();
        let token = RegistrationId::next();
        let sub = Arc::new(Subscription {
            token,
            listener: Arc::new(listener),
            active: AtomicBool::new(true),
        });

        self.inner
            .listeners
            .write()
            .entry(event.clone())
            .or_default()
            .push(sub);
        debug!(event = %event, token = %token, "Listener subscribed");

        let weak: Weak<BusInner> = Arc::downgrade(&self.inner);
        let label = format!("event listener '{event}'");
        Cleanup::infallible(label, move || {
            if let Some(inner) = weak.upgrade() {
                inner.unsubscribe(&event, token);
            }
        })
    }

    /// Subscribes a listener that receives the payload deserialized as `T`.
    ///
    /// Payloads that do not deserialize are logged and skipped; the listener
    /// is not called for them.
    pub fn subscribe_typed<T, F>(&self, event: impl Into<String>, listener: F) -> Cleanup
    where
        T: DeserializeOwned,
        F: Fn(T) -> HandlerResult<()> + Send + Sync + 'static,
    {
        let event = event.into();
        let name = event.clone();
        self.subscribe(event, move |payload| {
            match serde_json::from_value::<T>(payload.clone()) {
                Ok(value) => listener(value),
                Err(e) => {
                    warn!(
                        event = %name,
                        error = %CoreError::payload_shape(name.as_str(), e),
                        "Skipping listener for malformed payload"
                    );
                    Ok(())
                }
            }
        })
    }

    /// Synchronously delivers `payload` to every listener of `event`.
    ///
    /// Returns the number of listeners that completed without error.
    pub fn emit(&self, event: &str, payload: EventPayload) -> usize {
        let snapshot: Vec<Arc<Subscription>> = match self.inner.listeners.read().get(event) {
            Some(subs) => subs.clone(),
            None => {
                trace!(event = %event, "Emit with no listeners");
                return 0;
            }
        };

        let mut delivered = 0;
        for sub in snapshot {
            if !sub.active.load(Ordering::Acquire) {
                continue;
            }
            match call_isolated(|| (sub.listener)(&payload)) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    error!(
                        event = %event,
                        token = %sub.token,
                        error = %e,
                        "Event listener failed"
                    );
                }
            }
        }
        delivered
    }

    /// Serializes `payload` and emits it.
    pub fn emit_json<T>(&self, event: &str, payload: &T) -> CoreResult<usize>
    where
        T: Serialize + ?Sized,
    {
        let value =
            serde_json::to_value(payload).map_err(|e| CoreError::serialize(event, e))?;
        Ok(self.emit(event, value))
    }

    /// Returns the number of listeners subscribed to `event`.
    pub fn listener_count(&self, event: &str) -> usize {
        self.inner
            .listeners
            .read()
            .get(event)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Returns the total number of subscriptions across all events.
    pub fn total_listeners(&self) -> usize {
        self.inner.listeners.read().values().map(Vec::len).sum()
    }

    /// Returns every event name that currently has listeners.
    pub fn event_names(&self) -> Vec<String> {
        self.inner.listeners.read().keys().cloned().collect()
    }

    /// Drops every subscription.
    pub fn clear(&self) {
        let drained: Vec<Arc<Subscription>> = self
            .inner
            .listeners
            .write()
            .drain()
            .flat_map(|(_, subs)| subs)
            .collect();
        for sub in drained {
            sub.active.store(false, Ordering::Release);
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.total_listeners())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde::Deserialize;
    use serde_json::json;

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&'static str) -> ListenerFn) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let log_for = Arc::clone(&log);
        let make = move |tag: &'static str| -> ListenerFn {
            let log = Arc::clone(&log_for);
            Arc::new(move |_: &EventPayload| {
                log.lock().push(tag.to_string());
                Ok(())
            })
        };
        (log, make)
    }

    #[test]
    fn test_emit_in_subscription_order() {
        let bus = EventBus::new();
        let (log, make) = recorder();
        for tag in ["first", "second", "third"] {
            let l = make(tag);
            bus.subscribe("data:changed", move |p| l(p));
        }

        assert_eq!(bus.emit("data:changed", EventPayload::Null), 3);
        assert_eq!(*log.lock(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_failing_listener_does_not_stop_others() {
        let bus = EventBus::new();
        let (log, make) = recorder();
        let before = make("before");
        let after = make("after");

        bus.subscribe("x", move |p| before(p));
        bus.subscribe("x", |_| Err("listener broke".into()));
        bus.subscribe("x", |_| panic!("listener panicked"));
        bus.subscribe("x", move |p| after(p));

        assert_eq!(bus.emit("x", json!(1)), 2);
        assert_eq!(*log.lock(), vec!["before", "after"]);
    }

    #[test]
    fn test_no_replay_for_late_subscribers() {
        let bus = EventBus::new();
        bus.emit("sheet:changed", json!({ "index": 1 }));

        let (log, make) = recorder();
        let l = make("late");
        bus.subscribe("sheet:changed", move |p| l(p));
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let bus = EventBus::new();
        let cleanup = bus.subscribe("x", |_| Ok(()));
        assert_eq!(bus.listener_count("x"), 1);

        cleanup.run().unwrap();
        cleanup.run().unwrap();
        assert_eq!(bus.listener_count("x"), 0);
        assert_eq!(bus.emit("x", EventPayload::Null), 0);
    }

    #[test]
    fn test_unsubscribe_during_emit_skips_listener() {
        let bus = EventBus::new();
        let (log, make) = recorder();
        let slot: Arc<Mutex<Option<Cleanup>>> = Arc::new(Mutex::new(None));

        let slot_for_first = Arc::clone(&slot);
        bus.subscribe("x", move |_| {
            if let Some(c) = slot_for_first.lock().take() {
                c.run()?;
            }
            Ok(())
        });
        let second = make("second");
        *slot.lock() = Some(bus.subscribe("x", move |p| second(p)));

        assert_eq!(bus.emit("x", EventPayload::Null), 1);
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_subscribe_during_emit_sees_next_emit_only() {
        let bus = EventBus::new();
        let (log, make) = recorder();
        let bus_inner = bus.clone();
        let late = make("late");
        let late = Arc::new(Mutex::new(Some(late)));
        bus.subscribe("x", move |_| {
            if let Some(l) = late.lock().take() {
                bus_inner.subscribe("x", move |p| l(p));
            }
            Ok(())
        });

        bus.emit("x", EventPayload::Null);
        assert!(log.lock().is_empty());
        bus.emit("x", EventPayload::Null);
        assert_eq!(*log.lock(), vec!["late"]);
    }

    #[derive(Debug, Deserialize, Serialize, PartialEq)]
    struct Selection {
        row: u32,
        col: u32,
    }

    #[test]
    fn test_typed_subscription_skips_bad_shapes() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        bus.subscribe_typed("selection:changed", move |sel: Selection| {
            sink.lock().push(sel);
            Ok(())
        });

        bus.emit_json("selection:changed", &Selection { row: 2, col: 4 })
            .unwrap();
        bus.emit("selection:changed", json!("not a selection"));

        assert_eq!(*seen.lock(), vec![Selection { row: 2, col: 4 }]);
    }
}
