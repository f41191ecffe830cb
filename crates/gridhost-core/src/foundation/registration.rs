//! Registration tokens and cleanup handles.
//!
//! Every registry call that accepts a contribution hands back a [`Cleanup`].
//! The cleanup is the only sanctioned way to withdraw the contribution and is
//! idempotent: the first [`Cleanup::run`] performs the removal, later calls do
//! nothing.
//!
//! Registries stamp each accepted entry with a fresh [`RegistrationId`]. The
//! cleanup remembers that token and only removes the entry if it still carries
//! it, so a stale cleanup for an id that has since been re-registered leaves
//! the replacement alone.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use super::isolate::call_isolated;
use crate::error::HandlerResult;

static NEXT_REGISTRATION: AtomicU64 = AtomicU64::new(1);

/// Process-unique token identifying one accepted registration.
///
/// Tokens are handed out in increasing order, so they double as the
/// insertion-order tiebreak between entries of equal priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RegistrationId(u64);

impl RegistrationId {
    /// Allocates the next token.
    pub fn next() -> Self {
        Self(NEXT_REGISTRATION.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw token value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

type CleanupFn = Box<dyn FnOnce() -> HandlerResult<()> + Send>;

// ─── Cleanup ──────────────────────────────────────────────────────────────────

/// Handle that withdraws a single contribution from a registry.
///
/// `Cleanup` is cheap to clone; all clones share the same underlying action,
/// which runs at most once. Dropping a cleanup does **not** run it: the
/// contribution stays registered until someone calls [`run`](Self::run).
///
/// # Example
///
/// ```rust,ignore
/// let cleanup = bus.subscribe("selection:changed", |_| Ok(()));
/// cleanup.run()?;   // unsubscribes
/// cleanup.run()?;   // no-op
/// ```
#[derive(Clone)]
pub struct Cleanup {
    label: Arc<str>,
    action: Arc<Mutex<Option<CleanupFn>>>,
}

impl Cleanup {
    /// Creates a cleanup from a fallible action.
    pub fn new<F>(label: impl Into<Arc<str>>, action: F) -> Self
    where
        F: FnOnce() -> HandlerResult<()> + Send + 'static,
    {
        Self {
            label: label.into(),
            action: Arc::new(Mutex::new(Some(Box::new(action)))),
        }
    }

    /// Creates a cleanup from an action that cannot fail.
    pub fn infallible<F>(label: impl Into<Arc<str>>, action: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self::new(label, move || {
            action();
            Ok(())
        })
    }

    /// Creates a cleanup that has nothing to undo.
    ///
    /// Returned by registries when a registration was rejected as a no-op
    /// (for example, adding an item to a menu that does not exist).
    pub fn noop(label: impl Into<Arc<str>>) -> Self {
        Self {
            label: label.into(),
            action: Arc::new(Mutex::new(None)),
        }
    }

    /// Human-readable description of what this cleanup removes.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns `true` once the action has run (or if there never was one).
    pub fn is_spent(&self) -> bool {
        self.action.lock().is_none()
    }

    /// Runs the action if it has not run yet.
    ///
    /// Panics raised by the action are caught and reported as errors.
    pub fn run(&self) -> HandlerResult<()> {
        let action = self.action.lock().take();
        match action {
            Some(action) => call_isolated(action),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for Cleanup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cleanup")
            .field("label", &self.label)
            .field("spent", &self.is_spent())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_tokens_are_increasing() {
        let a = RegistrationId::next();
        let b = RegistrationId::next();
        assert!(a < b);
    }

    #[test]
    fn test_cleanup_runs_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let cleanup = Cleanup::infallible("counter", move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        let clone = cleanup.clone();

        cleanup.run().unwrap();
        clone.run().unwrap();
        cleanup.run().unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(clone.is_spent());
    }

    #[test]
    fn test_failing_cleanup_reports_error_once() {
        let cleanup = Cleanup::new("broken", || Err("boom".into()));
        assert!(cleanup.run().is_err());
        assert!(cleanup.run().is_ok());
    }

    #[test]
    fn test_panicking_cleanup_is_caught() {
        let cleanup = Cleanup::infallible("panics", || panic!("cleanup exploded"));
        let err = cleanup.run().unwrap_err();
        assert!(err.to_string().contains("cleanup exploded"));
    }

    #[test]
    fn test_noop_is_spent() {
        let cleanup = Cleanup::noop("nothing");
        assert!(cleanup.is_spent());
        assert!(cleanup.run().is_ok());
    }
}
