//! Composable menu trees.
//!
//! A root menu is created (or fully replaced) with
//! [`MenuRegistry::register_menu`]. Any extension can then append items with
//! [`MenuRegistry::register_menu_item`] or nest them under an existing item
//! with [`MenuRegistry::register_submenu_item`]. Each item registration hands
//! back a cleanup that removes exactly that item, never the menu.
//!
//! # Ordering
//!
//! Items sort by `order` ascending; items without an `order` come after all
//! ordered items; ties fall back to registration order. Re-registering an
//! existing item id at the same level overwrites it in place: the item keeps
//! its original registration position and the item count does not change.
//! This is how extensions refresh dynamic state such as `checked`.

use std::cmp::Ordering as CmpOrdering;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Weak};

use futures::future::BoxFuture;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::error::HandlerResult;
use crate::events::EventBus;
use crate::foundation::{Cleanup, RegistrationId, call_isolated_async};

const CHANGED: &str = "menus:changed";

/// Async callback run when a menu item is chosen.
pub type MenuActionFn = dyn Fn() -> BoxFuture<'static, HandlerResult<()>> + Send + Sync;

// =============================================================================
// Item & Definition
// =============================================================================

/// One entry of a menu tree.
#[derive(Clone, Default)]
pub struct MenuItem {
    pub id: String,
    pub label: String,
    pub order: Option<i32>,
    pub action: Option<Arc<MenuActionFn>>,
    pub children: Vec<MenuItem>,
    pub separator: bool,
    /// Display-only accelerator text, e.g. `Ctrl+Shift+L`.
    pub shortcut: Option<String>,
    pub checked: Option<bool>,
    pub disabled: bool,
}

impl MenuItem {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            ..Self::default()
        }
    }

    /// A visual divider. Separators never carry an action.
    pub fn separator(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            separator: true,
            ..Self::default()
        }
    }

    pub fn order(mut self, order: i32) -> Self {
        self.order = Some(order);
        self
    }

    pub fn action<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<()>> + Send + 'static,
    {
        self.action = Some(Arc::new(move || Box::pin(f())));
        self
    }

    pub fn child(mut self, item: MenuItem) -> Self {
        self.children.push(item);
        self
    }

    pub fn shortcut(mut self, shortcut: impl Into<String>) -> Self {
        self.shortcut = Some(shortcut.into());
        self
    }

    pub fn checked(mut self, checked: bool) -> Self {
        self.checked = Some(checked);
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    /// Number of items in this subtree, including this one.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(MenuItem::count).sum::<usize>()
    }
}

impl fmt::Debug for MenuItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MenuItem")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("order", &self.order)
            .field("has_action", &self.action.is_some())
            .field("separator", &self.separator)
            .field("checked", &self.checked)
            .field("disabled", &self.disabled)
            .field("children", &self.children)
            .finish()
    }
}

/// A root menu.
#[derive(Debug, Clone, Default)]
pub struct MenuDefinition {
    pub id: String,
    pub label: String,
    pub order: Option<i32>,
    pub items: Vec<MenuItem>,
}

impl MenuDefinition {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            ..Self::default()
        }
    }

    pub fn order(mut self, order: i32) -> Self {
        self.order = Some(order);
        self
    }

    pub fn item(mut self, item: MenuItem) -> Self {
        self.items.push(item);
        self
    }

    /// Finds an item anywhere in the tree.
    pub fn find(&self, item_id: &str) -> Option<&MenuItem> {
        find_item(&self.items, item_id)
    }

    /// Total number of items in the tree.
    pub fn item_count(&self) -> usize {
        self.items.iter().map(MenuItem::count).sum()
    }
}

fn find_item<'a>(items: &'a [MenuItem], item_id: &str) -> Option<&'a MenuItem> {
    items.iter().find_map(|item| {
        if item.id == item_id {
            Some(item)
        } else {
            find_item(&item.children, item_id)
        }
    })
}

/// Notification delivered to [`MenuRegistry::on_change`] listeners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "menu", rename_all = "snake_case")]
pub enum MenuChange {
    MenuRegistered(String),
    MenuUnregistered(String),
    ItemsChanged(String),
}

// =============================================================================
// Storage
// =============================================================================

struct ItemNode {
    item: MenuItem,
    /// Position in registration order; survives overwrites.
    seq: RegistrationId,
    /// Identity of the current registration.
    token: RegistrationId,
    children: Vec<ItemNode>,
}

impl ItemNode {
    fn from_item(mut item: MenuItem) -> Self {
        let children = std::mem::take(&mut item.children)
            .into_iter()
            .map(ItemNode::from_item)
            .collect();
        if item.separator && item.action.take().is_some() {
            warn!(item = %item.id, "Separator registered with an action, dropping the action");
        }
        let token = RegistrationId::next();
        Self {
            item,
            seq: token,
            token,
            children,
        }
    }

    fn to_item(&self) -> MenuItem {
        let mut item = self.item.clone();
        item.children = sorted(&self.children);
        item
    }

    fn find_mut<'a>(nodes: &'a mut [ItemNode], item_id: &str) -> Option<&'a mut ItemNode> {
        for node in nodes.iter_mut() {
            if node.item.id == item_id {
                return Some(node);
            }
            if let Some(found) = Self::find_mut(&mut node.children, item_id) {
                return Some(found);
            }
        }
        None
    }

    fn remove_token(nodes: &mut Vec<ItemNode>, token: RegistrationId) -> bool {
        if let Some(pos) = nodes.iter().position(|n| n.token == token) {
            nodes.remove(pos);
            return true;
        }
        nodes
            .iter_mut()
            .any(|n| Self::remove_token(&mut n.children, token))
    }

    fn count(nodes: &[ItemNode]) -> usize {
        nodes.iter().map(|n| 1 + Self::count(&n.children)).sum()
    }
}

/// Inserts `node` into `level`, overwriting an existing item with the same id
/// while keeping its position.
fn upsert(level: &mut Vec<ItemNode>, node: ItemNode) -> RegistrationId {
    let token = node.token;
    match level.iter_mut().find(|n| n.item.id == node.item.id) {
        Some(existing) => {
            let previous = std::mem::replace(existing, node);
            inherit(existing, previous);
        }
        None => level.push(node),
    }
    token
}

/// Carries the position of `previous` over to `node`, along with every child
/// `node` does not redefine.
fn inherit(node: &mut ItemNode, previous: ItemNode) {
    node.seq = previous.seq;
    for child in previous.children {
        match node.children.iter_mut().find(|c| c.item.id == child.item.id) {
            Some(replacement) => inherit(replacement, child),
            None => node.children.push(child),
        }
    }
}

fn compare_order(a: (Option<i32>, RegistrationId), b: (Option<i32>, RegistrationId)) -> CmpOrdering {
    match (a.0, b.0) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => CmpOrdering::Less,
        (None, Some(_)) => CmpOrdering::Greater,
        (None, None) => CmpOrdering::Equal,
    }
    .then(a.1.cmp(&b.1))
}

fn sorted(nodes: &[ItemNode]) -> Vec<MenuItem> {
    let mut refs: Vec<&ItemNode> = nodes.iter().collect();
    refs.sort_by(|a, b| compare_order((a.item.order, a.seq), (b.item.order, b.seq)));
    refs.into_iter().map(ItemNode::to_item).collect()
}

struct MenuSlot {
    label: String,
    order: Option<i32>,
    seq: RegistrationId,
    token: RegistrationId,
    items: Vec<ItemNode>,
}

impl MenuSlot {
    fn to_definition(&self, id: &str) -> MenuDefinition {
        MenuDefinition {
            id: id.to_string(),
            label: self.label.clone(),
            order: self.order,
            items: sorted(&self.items),
        }
    }
}

#[derive(Default)]
struct MenuInner {
    menus: RwLock<HashMap<String, MenuSlot>>,
    changes: EventBus,
}

impl MenuInner {
    fn notify(&self, change: MenuChange) {
        if let Err(e) = self.changes.emit_json(CHANGED, &change) {
            warn!(error = %e, "Failed to publish menu change");
        }
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Registry of root menus and their item trees.
#[derive(Clone, Default)]
pub struct MenuRegistry {
    inner: Arc<MenuInner>,
}

impl MenuRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates or fully replaces the root menu `definition.id`.
    pub fn register_menu(&self, definition: MenuDefinition) -> Cleanup {
        let MenuDefinition {
            id,
            label,
            order,
            items,
        } = definition;
        let token = RegistrationId::next();
        let mut nodes = Vec::with_capacity(items.len());
        for item in items {
            upsert(&mut nodes, ItemNode::from_item(item));
        }
        {
            let mut menus = self.inner.menus.write();
            let seq = menus.get(&id).map_or(token, |m| m.seq);
            menus.insert(
                id.clone(),
                MenuSlot {
                    label,
                    order,
                    seq,
                    token,
                    items: nodes,
                },
            );
        }
        debug!(menu = %id, "Menu registered");
        self.inner.notify(MenuChange::MenuRegistered(id.clone()));

        let weak: Weak<MenuInner> = Arc::downgrade(&self.inner);
        Cleanup::infallible(format!("menu '{id}'"), move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let removed = {
                let mut menus = inner.menus.write();
                match menus.get(&id) {
                    Some(slot) if slot.token == token => menus.remove(&id).is_some(),
                    _ => false,
                }
            };
            if removed {
                debug!(menu = %id, "Menu removed");
                inner.notify(MenuChange::MenuUnregistered(id));
            }
        })
    }

    /// Removes the root menu `id` with all of its items.
    pub fn unregister_menu(&self, id: &str) -> bool {
        let removed = self.inner.menus.write().remove(id).is_some();
        if removed {
            debug!(menu = %id, "Menu unregistered");
            self.inner.notify(MenuChange::MenuUnregistered(id.to_string()));
        } else {
            warn!(menu = %id, "Unregister of unknown menu ignored");
        }
        removed
    }

    /// Appends `item` to the top level of `menu_id`, or overwrites the item
    /// with the same id.
    ///
    /// Adding to a menu that does not exist is a logged no-op.
    pub fn register_menu_item(&self, menu_id: &str, item: MenuItem) -> Cleanup {
        self.insert_item(menu_id, None, item)
    }

    /// Adds `item` as a child of `parent_item_id` anywhere in `menu_id`.
    pub fn register_submenu_item(
        &self,
        menu_id: &str,
        parent_item_id: &str,
        item: MenuItem,
    ) -> Cleanup {
        self.insert_item(menu_id, Some(parent_item_id), item)
    }

    fn insert_item(&self, menu_id: &str, parent: Option<&str>, item: MenuItem) -> Cleanup {
        let item_id = item.id.clone();
        let label = format!("menu item '{menu_id}/{item_id}'");
        let node = ItemNode::from_item(item);

        let token = {
            let mut menus = self.inner.menus.write();
            let Some(slot) = menus.get_mut(menu_id) else {
                warn!(menu = %menu_id, item = %item_id, "Item added to unknown menu ignored");
                return Cleanup::noop(label);
            };
            let level = match parent {
                None => &mut slot.items,
                Some(parent_id) => match ItemNode::find_mut(&mut slot.items, parent_id) {
                    Some(parent_node) => &mut parent_node.children,
                    None => {
                        warn!(
                            menu = %menu_id,
                            parent = %parent_id,
                            item = %item_id,
                            "Submenu item added to unknown parent ignored"
                        );
                        return Cleanup::noop(label);
                    }
                },
            };
            upsert(level, node)
        };
        debug!(menu = %menu_id, item = %item_id, parent = parent.unwrap_or("-"), "Menu item registered");
        self.inner.notify(MenuChange::ItemsChanged(menu_id.to_string()));

        let weak: Weak<MenuInner> = Arc::downgrade(&self.inner);
        let menu_id = menu_id.to_string();
        Cleanup::infallible(label, move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let removed = inner
                .menus
                .write()
                .get_mut(&menu_id)
                .is_some_and(|slot| ItemNode::remove_token(&mut slot.items, token));
            if removed {
                debug!(menu = %menu_id, item = %item_id, "Menu item removed");
                inner.notify(MenuChange::ItemsChanged(menu_id));
            }
        })
    }

    /// Sorted snapshot of one menu.
    pub fn get_menu(&self, id: &str) -> Option<MenuDefinition> {
        self.inner
            .menus
            .read()
            .get(id)
            .map(|slot| slot.to_definition(id))
    }

    /// Sorted snapshot of every menu.
    pub fn get_menus(&self) -> Vec<MenuDefinition> {
        let menus = self.inner.menus.read();
        let mut slots: Vec<(&String, &MenuSlot)> = menus.iter().collect();
        slots.sort_by(|(_, a), (_, b)| compare_order((a.order, a.seq), (b.order, b.seq)));
        slots
            .into_iter()
            .map(|(id, slot)| slot.to_definition(id))
            .collect()
    }

    /// Runs the action of `item_id` in `menu_id`.
    ///
    /// Returns `true` if the action ran and succeeded. Missing, disabled and
    /// action-less items are logged no-ops; failing actions are logged.
    pub async fn execute(&self, menu_id: &str, item_id: &str) -> bool {
        let action = {
            let menus = self.inner.menus.read();
            let Some(slot) = menus.get(menu_id) else {
                warn!(menu = %menu_id, item = %item_id, "Execute on unknown menu ignored");
                return false;
            };
            let mut items = slot.items.iter().collect::<Vec<_>>();
            let mut found = None;
            while let Some(node) = items.pop() {
                if node.item.id == item_id {
                    found = Some(node);
                    break;
                }
                items.extend(node.children.iter());
            }
            match found {
                None => {
                    warn!(menu = %menu_id, item = %item_id, "Execute on unknown menu item ignored");
                    return false;
                }
                Some(node) if node.item.disabled => {
                    debug!(menu = %menu_id, item = %item_id, "Menu item is disabled");
                    return false;
                }
                Some(node) => match &node.item.action {
                    Some(action) => Arc::clone(action),
                    None => {
                        debug!(menu = %menu_id, item = %item_id, "Menu item has no action");
                        return false;
                    }
                },
            }
        };

        match call_isolated_async(async { action().await }).await {
            Ok(()) => true,
            Err(e) => {
                error!(menu = %menu_id, item = %item_id, error = %e, "Menu action failed");
                false
            }
        }
    }

    /// Subscribes to menu and item changes.
    pub fn on_change<F>(&self, listener: F) -> Cleanup
    where
        F: Fn(MenuChange) -> HandlerResult<()> + Send + Sync + 'static,
    {
        self.inner.changes.subscribe_typed(CHANGED, listener)
    }

    /// Number of root menus.
    pub fn len(&self) -> usize {
        self.inner.menus.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of items across every menu.
    pub fn total_items(&self) -> usize {
        self.inner
            .menus
            .read()
            .values()
            .map(|slot| ItemNode::count(&slot.items))
            .sum()
    }

    /// Removes every menu. Change listeners stay subscribed.
    pub fn clear(&self) {
        self.inner.menus.write().clear();
    }
}

impl fmt::Debug for MenuRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MenuRegistry")
            .field("menus", &self.len())
            .field("items", &self.total_items())
            .finish()
    }
}
