//! Edit guards: an async **short-circuit** chain consulted before a cell
//! enters edit mode.
//!
//! Guards run in ascending priority. The first guard that answers
//! [`EditGuardResult::block`] refuses the edit and its message is surfaced to
//! the user. `None` and `blocked: false` both mean "ask the next guard".
//!
//! Guards are **fail-open**: a guard that errors or panics is logged once and
//! treated as if it had no opinion, so a broken extension can never lock the
//! user out of editing.

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::{Chain, delegate_chain};
use crate::error::HandlerResult;
use crate::foundation::{Cleanup, call_isolated_async};

/// Answer of a single edit guard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditGuardResult {
    pub blocked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl EditGuardResult {
    /// Refuses the edit with a user-facing message.
    pub fn block(message: impl Into<String>) -> Self {
        Self {
            blocked: true,
            message: Some(message.into()),
        }
    }

    /// Explicitly allows the edit as far as this guard is concerned.
    pub fn allow() -> Self {
        Self::default()
    }
}

/// Signature of an edit guard.
pub type EditGuardFn =
    dyn Fn(u32, u32) -> BoxFuture<'static, HandlerResult<Option<EditGuardResult>>> + Send + Sync;

/// Combined verdict of the edit-guard chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditDecision {
    Allowed,
    Blocked {
        guard_id: String,
        message: Option<String>,
    },
}

impl EditDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }

    /// Message to show the user when the edit was refused.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Allowed => None,
            Self::Blocked { message, .. } => message.as_deref(),
        }
    }
}

/// Registry of edit guards.
#[derive(Clone, Debug)]
pub struct EditGuardChain {
    chain: Chain<EditGuardFn>,
}

impl Default for EditGuardChain {
    fn default() -> Self {
        Self::new()
    }
}

impl EditGuardChain {
    pub fn new() -> Self {
        Self {
            chain: Chain::new("edit guard"),
        }
    }

    /// Wraps an async closure into an [`EditGuardFn`].
    pub fn guard<F, Fut>(f: F) -> Arc<EditGuardFn>
    where
        F: Fn(u32, u32) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<Option<EditGuardResult>>> + Send + 'static,
    {
        Arc::new(move |row, col| Box::pin(f(row, col)))
    }

    /// Registers an edit guard under `id`.
    pub fn register<F, Fut>(&self, id: impl Into<String>, priority: i32, f: F) -> Cleanup
    where
        F: Fn(u32, u32) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<Option<EditGuardResult>>> + Send + 'static,
    {
        self.chain.register(None, id, priority, Self::guard(f))
    }

    /// Registers a guard on behalf of the extension `owner`.
    pub fn register_owned(
        &self,
        owner: &str,
        id: impl Into<String>,
        priority: i32,
        guard: Arc<EditGuardFn>,
    ) -> Cleanup {
        self.chain.register(Some(owner), id, priority, guard)
    }

    /// Asks every guard, in order, whether `(row, col)` may be edited.
    pub async fn check(&self, row: u32, col: u32) -> EditDecision {
        let entries = self.chain.snapshot();
        for entry in entries.iter() {
            match call_isolated_async(async { (entry.handler)(row, col).await }).await {
                Ok(Some(result)) if result.blocked => {
                    debug!(guard = %entry.id, row, col, "Edit blocked");
                    return EditDecision::Blocked {
                        guard_id: entry.id.clone(),
                        message: result.message,
                    };
                }
                Ok(_) => {}
                Err(e) => {
                    error!(
                        guard = %entry.id,
                        row,
                        col,
                        error = %e,
                        "Edit guard failed, allowing edit"
                    );
                }
            }
        }
        EditDecision::Allowed
    }
}

delegate_chain!(EditGuardChain);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BoxError;
    use parking_lot::Mutex;
    use std::future::Ready;
    use std::io;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Shared in-memory sink for captured log lines.
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl LogBuffer {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock()).into_owned()
        }
    }

    #[tokio::test]
    async fn test_no_guards_allows() {
        let chain = EditGuardChain::new();
        assert_eq!(chain.check(0, 0).await, EditDecision::Allowed);
    }

    #[tokio::test]
    async fn test_first_block_wins() {
        let chain = EditGuardChain::new();
        let later_ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&later_ran);

        chain.register("no-opinion", 0, |_, _| async { Ok(None) });
        chain.register("explicit-allow", 1, |_, _| async {
            Ok(Some(EditGuardResult::allow()))
        });
        chain.register("protected-sheet", 5, |row, _| async move {
            Ok((row < 10).then(|| EditGuardResult::block("Sheet is protected")))
        });
        chain.register("audit", 9, move |_, _| {
            let flag = Arc::clone(&flag);
            async move {
                flag.store(true, Ordering::SeqCst);
                Ok(None)
            }
        });

        let decision = chain.check(3, 0).await;
        assert_eq!(
            decision,
            EditDecision::Blocked {
                guard_id: "protected-sheet".into(),
                message: Some("Sheet is protected".into()),
            }
        );
        assert_eq!(decision.message(), Some("Sheet is protected"));
        assert!(!later_ran.load(Ordering::SeqCst));

        assert!(chain.check(42, 0).await.is_allowed());
        assert!(later_ran.load(Ordering::SeqCst));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_failing_guard_fails_open_and_logs_once() {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let chain = EditGuardChain::new();
        chain.register("validation", 1, |_, _| async {
            Err(BoxError::from("validation backend unreachable"))
        });

        let decision = chain.check(7, 2).await;
        assert!(decision.is_allowed());

        let logs = buffer.contents();
        assert_eq!(logs.matches("validation backend unreachable").count(), 1);
        assert_eq!(logs.matches("Edit guard failed").count(), 1);
    }

    #[tokio::test]
    async fn test_failing_guard_does_not_hide_later_block() {
        let chain = EditGuardChain::new();
        chain.register("panics", 1, |_, _| async {
            let reason = String::from("guard exploded");
            if !reason.is_empty() {
                panic!("{reason}");
            }
            Ok(None)
        });
        chain.register("locked", 2, |_, _| async {
            Ok(Some(EditGuardResult::block("Locked")))
        });

        assert_eq!(chain.check(0, 0).await.message(), Some("Locked"));
    }

    #[tokio::test]
    async fn test_guard_panicking_before_its_future_fails_open() {
        let chain = EditGuardChain::new();
        chain.register("eager", 1, |_, _| -> Ready<HandlerResult<Option<EditGuardResult>>> {
            panic!("guard panicked before returning its future")
        });
        assert_eq!(chain.check(0, 0).await, EditDecision::Allowed);

        chain.register("locked", 2, |_, _| async {
            Ok(Some(EditGuardResult::block("Locked")))
        });
        assert_eq!(chain.check(0, 0).await.message(), Some("Locked"));
    }

    #[test]
    fn test_guard_result_wire_shape() {
        let parsed: EditGuardResult =
            serde_json::from_value(serde_json::json!({ "blocked": true })).unwrap();
        assert!(parsed.blocked);
        assert_eq!(parsed.message, None);
    }
}
