//! Dialog contribution points.
//!
//! A dialog is registered once as a [`DialogDefinition`] and then opened and
//! closed any number of times. Open/close only touch the dialog's state
//! (`is_open` and the data payload handed to the UI); unregistering the
//! definition drops the state with it.
//!
//! Opening an id nobody registered is a logged no-op, because dialogs are
//! often opened by code that does not control extension load order.
//! Re-registering an id replaces the definition and keeps the current state,
//! which is how extensions refresh a dialog's title or component while it is
//! showing.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{CoreError, CoreResult, HandlerResult};
use crate::events::EventBus;
use crate::foundation::{Cleanup, RegistrationId};

const CHANGED: &str = "dialogs:changed";

/// Static description of a dialog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogDefinition {
    pub id: String,
    /// Component key the UI layer resolves to an actual view.
    pub component: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl DialogDefinition {
    pub fn new(id: impl Into<String>, component: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            component: component.into(),
            priority: 0,
            title: None,
        }
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Mutable half of a dialog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DialogState {
    pub is_open: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// An open dialog as handed to the UI layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveDialog {
    pub id: String,
    pub component: String,
    pub priority: i32,
    pub title: Option<String>,
    pub data: Option<serde_json::Value>,
}

impl ActiveDialog {
    /// Deserializes the data payload as `T`. A missing payload reads as `null`.
    pub fn data_as<T: DeserializeOwned>(&self) -> CoreResult<T> {
        let value = self.data.clone().unwrap_or(serde_json::Value::Null);
        serde_json::from_value(value).map_err(|e| CoreError::payload_shape(self.id.as_str(), e))
    }
}

/// Notification delivered to [`DialogRegistry::on_change`] listeners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum DialogChange {
    Registered(String),
    Unregistered(String),
    Opened(String),
    Closed(String),
}

struct DialogSlot {
    definition: DialogDefinition,
    token: RegistrationId,
    state: DialogState,
}

#[derive(Default)]
struct DialogInner {
    slots: RwLock<HashMap<String, DialogSlot>>,
    changes: EventBus,
}

impl DialogInner {
    fn notify(&self, change: DialogChange) {
        if let Err(e) = self.changes.emit_json(CHANGED, &change) {
            warn!(error = %e, "Failed to publish dialog change");
        }
    }
}

/// Registry of dialog definitions and their open state.
#[derive(Clone, Default)]
pub struct DialogRegistry {
    inner: Arc<DialogInner>,
}

impl DialogRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `definition`, replacing any definition with the same id.
    pub fn register_dialog(&self, definition: DialogDefinition) -> Cleanup {
        let id = definition.id.clone();
        let token = RegistrationId::next();
        {
            let mut slots = self.inner.slots.write();
            let state = slots.remove(&id).map(|s| s.state).unwrap_or_default();
            slots.insert(
                id.clone(),
                DialogSlot {
                    definition,
                    token,
                    state,
                },
            );
        }
        debug!(dialog = %id, "Dialog registered");
        self.inner.notify(DialogChange::Registered(id.clone()));

        let weak: Weak<DialogInner> = Arc::downgrade(&self.inner);
        Cleanup::infallible(format!("dialog '{id}'"), move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let removed = {
                let mut slots = inner.slots.write();
                match slots.get(&id) {
                    Some(slot) if slot.token == token => slots.remove(&id).is_some(),
                    _ => false,
                }
            };
            if removed {
                debug!(dialog = %id, "Dialog removed");
                inner.notify(DialogChange::Unregistered(id));
            }
        })
    }

    /// Removes the definition and state of `id`.
    pub fn unregister_dialog(&self, id: &str) -> bool {
        let removed = self.inner.slots.write().remove(id).is_some();
        if removed {
            debug!(dialog = %id, "Dialog unregistered");
            self.inner.notify(DialogChange::Unregistered(id.to_string()));
        } else {
            warn!(dialog = %id, "Unregister of unknown dialog ignored");
        }
        removed
    }

    /// Opens `id` with an optional payload. Reopening replaces the payload.
    pub fn open_dialog(&self, id: &str, data: Option<serde_json::Value>) -> bool {
        {
            let mut slots = self.inner.slots.write();
            let Some(slot) = slots.get_mut(id) else {
                warn!(dialog = %id, "Open of unregistered dialog ignored");
                return false;
            };
            slot.state = DialogState {
                is_open: true,
                data,
            };
        }
        debug!(dialog = %id, "Dialog opened");
        self.inner.notify(DialogChange::Opened(id.to_string()));
        true
    }

    /// Serializes `data` and opens `id` with it.
    pub fn open_dialog_with<T: Serialize + ?Sized>(&self, id: &str, data: &T) -> CoreResult<bool> {
        let value = serde_json::to_value(data).map_err(|e| CoreError::serialize(id, e))?;
        Ok(self.open_dialog(id, Some(value)))
    }

    /// Closes `id` and clears its payload.
    pub fn close_dialog(&self, id: &str) -> bool {
        {
            let mut slots = self.inner.slots.write();
            let Some(slot) = slots.get_mut(id) else {
                warn!(dialog = %id, "Close of unregistered dialog ignored");
                return false;
            };
            if !slot.state.is_open {
                return false;
            }
            slot.state = DialogState::default();
        }
        debug!(dialog = %id, "Dialog closed");
        self.inner.notify(DialogChange::Closed(id.to_string()));
        true
    }

    /// Closes every open dialog, returning how many were open.
    pub fn close_all(&self) -> usize {
        let closed: Vec<String> = {
            let mut slots = self.inner.slots.write();
            slots
                .values_mut()
                .filter(|slot| slot.state.is_open)
                .map(|slot| {
                    slot.state = DialogState::default();
                    slot.definition.id.clone()
                })
                .collect()
        };
        for id in &closed {
            self.inner.notify(DialogChange::Closed(id.clone()));
        }
        closed.len()
    }

    pub fn is_open(&self, id: &str) -> bool {
        self.inner
            .slots
            .read()
            .get(id)
            .is_some_and(|slot| slot.state.is_open)
    }

    pub fn is_registered(&self, id: &str) -> bool {
        self.inner.slots.read().contains_key(id)
    }

    pub fn definition(&self, id: &str) -> Option<DialogDefinition> {
        self.inner.slots.read().get(id).map(|s| s.definition.clone())
    }

    /// Open dialogs sorted by ascending priority, then registration order.
    ///
    /// Later entries stack on top of earlier ones.
    pub fn get_active_dialogs(&self) -> Vec<ActiveDialog> {
        let slots = self.inner.slots.read();
        let mut open: Vec<&DialogSlot> = slots.values().filter(|s| s.state.is_open).collect();
        open.sort_by_key(|s| (s.definition.priority, s.token));
        open.into_iter()
            .map(|s| ActiveDialog {
                id: s.definition.id.clone(),
                component: s.definition.component.clone(),
                priority: s.definition.priority,
                title: s.definition.title.clone(),
                data: s.state.data.clone(),
            })
            .collect()
    }

    /// Subscribes to registration and open/close changes.
    pub fn on_change<F>(&self, listener: F) -> Cleanup
    where
        F: Fn(DialogChange) -> HandlerResult<()> + Send + Sync + 'static,
    {
        self.inner.changes.subscribe_typed(CHANGED, listener)
    }

    pub fn len(&self) -> usize {
        self.inner.slots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every definition. Change listeners stay subscribed.
    pub fn clear(&self) {
        self.inner.slots.write().clear();
    }
}

impl std::fmt::Debug for DialogRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slots = self.inner.slots.read();
        f.debug_struct("DialogRegistry")
            .field("registered", &slots.len())
            .field("open", &slots.values().filter(|s| s.state.is_open).count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct FilterData {
        column: u32,
        values: Vec<String>,
    }

    #[test]
    fn test_open_close_cycle() {
        let dialogs = DialogRegistry::new();
        dialogs.register_dialog(DialogDefinition::new("filter", "FilterDialog"));

        assert!(dialogs.open_dialog("filter", Some(json!({ "column": 2, "values": ["a"] }))));
        assert!(dialogs.is_open("filter"));

        let active = dialogs.get_active_dialogs();
        assert_eq!(active.len(), 1);
        assert_eq!(
            active[0].data_as::<FilterData>().unwrap(),
            FilterData {
                column: 2,
                values: vec!["a".into()],
            }
        );

        assert!(dialogs.close_dialog("filter"));
        assert!(!dialogs.close_dialog("filter"));
        assert!(dialogs.get_active_dialogs().is_empty());
        assert!(dialogs.is_registered("filter"));
    }

    #[test]
    fn test_open_unregistered_is_noop() {
        let dialogs = DialogRegistry::new();
        assert!(!dialogs.open_dialog("ghost", None));
        assert!(!dialogs.is_open("ghost"));
        assert!(dialogs.get_active_dialogs().is_empty());
    }

    #[test]
    fn test_active_dialogs_sorted_by_priority_then_registration() {
        let dialogs = DialogRegistry::new();
        dialogs.register_dialog(DialogDefinition::new("modal", "Modal").priority(10));
        dialogs.register_dialog(DialogDefinition::new("a", "A"));
        dialogs.register_dialog(DialogDefinition::new("b", "B"));
        for id in ["modal", "b", "a"] {
            dialogs.open_dialog(id, None);
        }

        let ids: Vec<_> = dialogs
            .get_active_dialogs()
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(ids, vec!["a", "b", "modal"]);
    }

    #[test]
    fn test_reopen_replaces_data_and_reregister_keeps_state() {
        let dialogs = DialogRegistry::new();
        dialogs.register_dialog(DialogDefinition::new("pivot", "PivotDialog"));
        dialogs.open_dialog("pivot", Some(json!(1)));
        dialogs.open_dialog("pivot", Some(json!(2)));

        dialogs.register_dialog(DialogDefinition::new("pivot", "PivotDialog").title("Pivot"));
        let active = dialogs.get_active_dialogs();
        assert_eq!(active[0].data, Some(json!(2)));
        assert_eq!(active[0].title.as_deref(), Some("Pivot"));
    }

    #[test]
    fn test_cleanup_drops_state_and_ignores_replacement() {
        let dialogs = DialogRegistry::new();
        let stale = dialogs.register_dialog(DialogDefinition::new("d", "D"));
        let fresh = dialogs.register_dialog(DialogDefinition::new("d", "D2"));
        dialogs.open_dialog("d", None);

        stale.run().unwrap();
        assert!(dialogs.is_open("d"));

        fresh.run().unwrap();
        fresh.run().unwrap();
        assert!(!dialogs.is_registered("d"));
        assert!(dialogs.is_empty());
    }

    #[test]
    fn test_close_all_and_change_listener() {
        let dialogs = DialogRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        dialogs.on_change(move |change| {
            sink.lock().push(change);
            Ok(())
        });

        dialogs.register_dialog(DialogDefinition::new("x", "X"));
        dialogs.open_dialog("x", None);
        assert_eq!(dialogs.close_all(), 1);
        dialogs.unregister_dialog("x");

        assert_eq!(
            *seen.lock(),
            vec![
                DialogChange::Registered("x".into()),
                DialogChange::Opened("x".into()),
                DialogChange::Closed("x".into()),
                DialogChange::Unregistered("x".into()),
            ]
        );
    }

    #[test]
    fn test_data_as_reports_shape_errors() {
        let dialogs = DialogRegistry::new();
        dialogs.register_dialog(DialogDefinition::new("f", "F"));
        dialogs.open_dialog_with("f", &json!({ "column": "not a number" })).unwrap();
        let err = dialogs.get_active_dialogs()[0]
            .data_as::<FilterData>()
            .unwrap_err();
        assert!(matches!(err, CoreError::PayloadShape { .. }));
    }
}
