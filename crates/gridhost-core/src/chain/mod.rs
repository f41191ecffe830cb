//! Priority-ordered interceptor chains.
//!
//! A [`Chain`] is the storage shared by the three decision points the
//! renderer consults:
//!
//! | Chain | Module | Semantics |
//! |-------|--------|-----------|
//! | Style interceptors | [`style`] | synchronous, **compose** |
//! | Click interceptors | [`click`] | async, **short-circuit** on `true` |
//! | Edit guards | [`edit`] | async, **short-circuit** on `blocked` |
//!
//! # Ordering
//!
//! Entries are kept sorted by `(priority, token)` in an immutable snapshot
//! that is rebuilt on every mutation, so consulting a chain only clones an
//! `Arc`. Lower priorities are consulted first; equal priorities fall back to
//! registration order. Re-registering an id counts as a fresh registration and
//! moves the entry behind existing entries of the same priority.
//!
//! No lock is held while handlers run, so a handler may register or
//! unregister entries (including itself). Such changes take effect on the
//! next consultation.

pub mod click;
pub mod edit;
pub mod style;

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::foundation::{Cleanup, RegistrationId};

pub use click::{ClickChain, ClickDispatch, ClickEvent, Modifiers, MouseButton};
pub use edit::{EditDecision, EditGuardChain, EditGuardResult};
pub use style::StyleChain;

/// One accepted registration in a chain.
pub struct ChainEntry<H: ?Sized> {
    pub id: String,
    pub priority: i32,
    pub token: RegistrationId,
    /// Extension that contributed this entry, when registered through one.
    pub owner: Option<String>,
    pub handler: Arc<H>,
}

type Snapshot<H> = Arc<[Arc<ChainEntry<H>>]>;

struct ChainInner<H: ?Sized> {
    name: &'static str,
    entries: RwLock<Snapshot<H>>,
}

impl<H: ?Sized> ChainInner<H> {
    fn remove_where(&self, pred: impl Fn(&ChainEntry<H>) -> bool) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        let kept: Vec<_> = entries.iter().filter(|e| !pred(e)).cloned().collect();
        let removed = before - kept.len();
        if removed > 0 {
            *entries = Arc::from(kept);
        }
        removed
    }
}

/// Sorted collection of `(handler, priority)` entries keyed by id.
pub struct Chain<H: ?Sized> {
    inner: Arc<ChainInner<H>>,
}

impl<H: ?Sized> Clone for Chain<H> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<H> Chain<H>
where
    H: ?Sized + Send + Sync + 'static,
{
    /// Creates an empty chain. `name` only appears in logs.
    pub fn new(name: &'static str) -> Self {
        Self {
            inner: Arc::new(ChainInner {
                name,
                entries: RwLock::new(Arc::from(Vec::new())),
            }),
        }
    }

    /// Inserts `handler` under `id`, replacing any entry with the same id.
    pub fn register(
        &self,
        owner: Option<&str>,
        id: impl Into<String>,
        priority: i32,
        handler: Arc<H>,
    ) -> Cleanup {
        let id = id.into();
        let (_, mut cleanups) = self.splice(owner, |_| false, vec![(id, priority, handler)]);
        match cleanups.pop() {
            Some(cleanup) => cleanup,
            None => Cleanup::noop(self.inner.name),
        }
    }

    /// Removes every entry matching `remove` and inserts `additions` under a
    /// single write lock, so consumers never observe the intermediate state.
    ///
    /// Additions replace any existing entry with the same id, and among
    /// additions sharing an id the last one wins. Returns the number of
    /// entries `remove` matched and one cleanup per surviving addition.
    pub(crate) fn splice(
        &self,
        owner: Option<&str>,
        remove: impl Fn(&ChainEntry<H>) -> bool,
        mut additions: Vec<(String, i32, Arc<H>)>,
    ) -> (usize, Vec<Cleanup>) {
        let mut seen = HashSet::new();
        additions.reverse();
        additions.retain(|(id, _, _)| {
            let first = seen.insert(id.clone());
            if !first {
                debug!(chain = self.inner.name, id = %id, "Duplicate id in batch, keeping last");
            }
            first
        });
        additions.reverse();

        let added: Vec<Arc<ChainEntry<H>>> = additions
            .into_iter()
            .map(|(id, priority, handler)| {
                Arc::new(ChainEntry {
                    id,
                    priority,
                    token: RegistrationId::next(),
                    owner: owner.map(str::to_owned),
                    handler,
                })
            })
            .collect();

        let removed = {
            let mut entries = self.inner.entries.write();
            let mut removed = 0;
            let mut next = Vec::with_capacity(entries.len() + added.len());
            for entry in entries.iter() {
                if remove(entry) {
                    removed += 1;
                } else if added.iter().any(|a| a.id == entry.id) {
                    debug!(chain = self.inner.name, id = %entry.id, "Replacing registration");
                } else {
                    next.push(Arc::clone(entry));
                }
            }
            next.extend(added.iter().cloned());
            next.sort_by_key(|e| (e.priority, e.token));
            *entries = Arc::from(next);
            removed
        };

        let cleanups = added
            .iter()
            .map(|entry| {
                debug!(
                    chain = self.inner.name,
                    id = %entry.id,
                    priority = entry.priority,
                    owner = entry.owner.as_deref().unwrap_or("-"),
                    "Entry registered"
                );
                self.cleanup_for(entry.id.clone(), entry.token)
            })
            .collect();
        (removed, cleanups)
    }

    fn cleanup_for(&self, id: String, token: RegistrationId) -> Cleanup {
        let weak: Weak<ChainInner<H>> = Arc::downgrade(&self.inner);
        let label = format!("{} '{}'", self.inner.name, id);
        Cleanup::infallible(label, move || {
            if let Some(inner) = weak.upgrade()
                && inner.remove_where(|e| e.token == token) > 0
            {
                debug!(chain = inner.name, id = %id, "Entry removed");
            }
        })
    }

    /// Removes every entry matching `pred`, returning how many were removed.
    pub(crate) fn remove_where(&self, pred: impl Fn(&ChainEntry<H>) -> bool) -> usize {
        self.inner.remove_where(pred)
    }

    /// Removes the entry registered under `id`.
    ///
    /// Unknown ids are a logged no-op.
    pub fn unregister(&self, id: &str) -> bool {
        let removed = self.inner.remove_where(|e| e.id == id) > 0;
        if !removed {
            warn!(chain = self.inner.name, id = %id, "Unregister of unknown id ignored");
        }
        removed
    }

    /// Returns the entries in consultation order.
    pub fn snapshot(&self) -> Snapshot<H> {
        Arc::clone(&self.inner.entries.read())
    }

    /// Returns the ids in consultation order.
    pub fn ids(&self) -> Vec<String> {
        self.snapshot().iter().map(|e| e.id.clone()).collect()
    }

    /// Returns the ids contributed by `owner`.
    pub fn ids_owned_by(&self, owner: &str) -> Vec<String> {
        self.snapshot()
            .iter()
            .filter(|e| e.owner.as_deref() == Some(owner))
            .map(|e| e.id.clone())
            .collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.snapshot().iter().any(|e| e.id == id)
    }

    pub fn len(&self) -> usize {
        self.inner.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every entry.
    pub fn clear(&self) {
        *self.inner.entries.write() = Arc::from(Vec::new());
    }

    pub fn name(&self) -> &'static str {
        self.inner.name
    }
}

impl<H: ?Sized> fmt::Debug for Chain<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.inner.entries.read();
        f.debug_struct("Chain")
            .field("name", &self.inner.name)
            .field(
                "entries",
                &entries
                    .iter()
                    .map(|e| (e.id.as_str(), e.priority))
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Forwards the id-level bookkeeping methods of a wrapped [`Chain`].
macro_rules! delegate_chain {
    ($ty:ty) => {
        impl $ty {
            /// Removes the entry registered under `id`; unknown ids are a logged no-op.
            pub fn unregister(&self, id: &str) -> bool {
                self.chain.unregister(id)
            }

            /// Ids in consultation order.
            pub fn ids(&self) -> Vec<String> {
                self.chain.ids()
            }

            /// Ids contributed by `owner`.
            pub fn ids_owned_by(&self, owner: &str) -> Vec<String> {
                self.chain.ids_owned_by(owner)
            }

            pub fn contains(&self, id: &str) -> bool {
                self.chain.contains(id)
            }

            pub fn len(&self) -> usize {
                self.chain.len()
            }

            pub fn is_empty(&self) -> bool {
                self.chain.is_empty()
            }

            /// Removes every entry contributed by `owner`.
            pub fn remove_owned_by(&self, owner: &str) -> usize {
                self.chain
                    .remove_where(|e| e.owner.as_deref() == Some(owner))
            }

            /// Removes every entry.
            pub fn clear(&self) {
                self.chain.clear()
            }
        }
    };
}

pub(crate) use delegate_chain;

#[cfg(test)]
mod tests {
    use super::*;

    type Label = &'static str;
    type Tag = dyn Fn() -> Label + Send + Sync;

    fn tag(s: &'static str) -> Arc<Tag> {
        Arc::new(move || s)
    }

    #[test]
    fn test_sorted_by_priority_then_insertion() {
        let chain: Chain<Tag> = Chain::new("test");
        chain.register(None, "c", 10, tag("c"));
        chain.register(None, "a", -5, tag("a"));
        chain.register(None, "b1", 10, tag("b1"));
        chain.register(None, "z", 0, tag("z"));

        assert_eq!(chain.ids(), vec!["a", "z", "c", "b1"]);
    }

    #[test]
    fn test_same_id_replaces() {
        let chain: Chain<Tag> = Chain::new("test");
        chain.register(None, "x", 1, tag("old"));
        chain.register(None, "x", 2, tag("new"));

        let snapshot = chain.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!((snapshot[0].handler)(), "new");
        assert_eq!(snapshot[0].priority, 2);
    }

    #[test]
    fn test_stale_cleanup_keeps_replacement() {
        let chain: Chain<Tag> = Chain::new("test");
        let stale = chain.register(None, "x", 1, tag("old"));
        let fresh = chain.register(None, "x", 1, tag("new"));

        stale.run().unwrap();
        assert!(chain.contains("x"));

        fresh.run().unwrap();
        fresh.run().unwrap();
        assert!(chain.is_empty());
    }

    #[test]
    fn test_unregister_unknown_is_noop() {
        let chain: Chain<Tag> = Chain::new("test");
        chain.register(None, "x", 1, tag("x"));
        assert!(!chain.unregister("missing"));
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn test_cleanup_after_chain_dropped() {
        let chain: Chain<Tag> = Chain::new("test");
        let cleanup = chain.register(Some("ext"), "x", 1, tag("x"));
        assert_eq!(chain.ids_owned_by("ext"), vec!["x"]);
        drop(chain);
        assert!(cleanup.run().is_ok());
    }

    #[test]
    fn test_splice_swaps_atomically() {
        let chain: Chain<Tag> = Chain::new("test");
        chain.register(Some("a"), "a1", 1, tag("a1"));
        chain.register(Some("a"), "a2", 2, tag("a2"));
        chain.register(Some("b"), "b1", 3, tag("b1"));

        let (removed, cleanups) = chain.splice(
            Some("a"),
            |e| e.owner.as_deref() == Some("a"),
            vec![("a3".to_string(), 0, tag("a3"))],
        );
        assert_eq!(removed, 2);
        assert_eq!(cleanups.len(), 1);
        assert_eq!(chain.ids(), vec!["a3", "b1"]);

        cleanups[0].run().unwrap();
        assert_eq!(chain.ids(), vec!["b1"]);
    }

    #[test]
    fn test_splice_keeps_last_of_duplicate_additions() {
        let chain: Chain<Tag> = Chain::new("test");
        chain.register(None, "x", 0, tag("existing"));

        let (_, cleanups) = chain.splice(
            None,
            |_| false,
            vec![
                ("x".to_string(), 1, tag("first")),
                ("y".to_string(), 2, tag("y")),
                ("x".to_string(), 3, tag("last")),
            ],
        );
        assert_eq!(cleanups.len(), 2);
        assert_eq!(chain.ids(), vec!["y", "x"]);
        let snapshot = chain.snapshot();
        assert_eq!((snapshot[1].handler)(), "last");
    }
}
