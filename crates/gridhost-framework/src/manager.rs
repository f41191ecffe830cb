//! Extension lifecycle management.
//!
//! [`ExtensionManager`] owns every registered extension and drives it through
//!
//! ```text
//! register() ──► Inactive ──activate()──► Activating ──► Active
//!                    ▲                        │             │
//!                    │        (activate fails, rolled back) │
//!                    ├────────────────────────┘             │
//!                    └──────── Deactivating ◄──deactivate()─┘
//! ```
//!
//! - `activate` runs the extension's `activate` hook with a fresh
//!   [`ExtensionContext`]. On success the recorded cleanups are stored; on
//!   failure (error or panic) they are run immediately and the extension goes
//!   back to `Inactive`.
//! - `deactivate` runs the extension's own `deactivate` hook, then every
//!   recorded cleanup newest first. Failures are logged and never stop the
//!   remaining cleanups. Chain and overlay entries still tagged with the
//!   extension id afterwards are swept.
//! - Activating an `Active` extension and deactivating an `Inactive` one are
//!   no-ops.
//!
//! No manager lock is held while extension code runs, so hooks may call back
//! into the manager (for other extensions) or the registries.
//!
//! # Example
//!
//! ```rust,ignore
//! let manager = ExtensionManager::new(Registries::new());
//! manager.register(Arc::new(TableBanding::default()))?;
//! manager.activate("table-banding").await?;
//! // …later…
//! manager.deactivate_all().await;
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use gridhost_core::{Cleanup, Registries, call_isolated_async, names};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, error, info, warn};

use crate::error::{ExtensionError, ExtensionResult};
use crate::extension::context::run_cleanups;
use crate::extension::{Extension, ExtensionContext, ExtensionManifest};

/// Lifecycle state of a registered extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtensionState {
    Inactive,
    Activating,
    Active,
    Deactivating,
}

impl fmt::Display for ExtensionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Inactive => "inactive",
            Self::Activating => "activating",
            Self::Active => "active",
            Self::Deactivating => "deactivating",
        })
    }
}

/// Snapshot of one registered extension.
#[derive(Debug, Clone, Serialize)]
pub struct ExtensionInfo {
    #[serde(flatten)]
    pub manifest: ExtensionManifest,
    pub state: ExtensionState,
}

// =============================================================================
// ExtensionEntry (internal)
// =============================================================================

struct ExtensionEntry {
    extension: Arc<dyn Extension>,
    manifest: ExtensionManifest,
    state: ExtensionState,
    cleanups: Vec<Cleanup>,
}

// =============================================================================
// ExtensionManager
// =============================================================================

/// Central owner of extension registration and lifecycle.
///
/// # Configuration
///
/// `configs` maps an extension id to its raw config section, taken from
/// `[extensions.settings.<id>]` in `gridhost.toml`. Extensions read it through
/// [`ExtensionContext::config`].
pub struct ExtensionManager {
    registries: Registries,
    configs: HashMap<String, Arc<Value>>,
    entries: Mutex<Vec<ExtensionEntry>>,
}

impl ExtensionManager {
    /// Creates a manager wiring extensions into `registries`.
    pub fn new(registries: Registries) -> Self {
        Self {
            registries,
            configs: HashMap::new(),
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Sets the per-extension config sections.
    pub fn with_configs(mut self, configs: HashMap<String, Value>) -> Self {
        self.configs = configs
            .into_iter()
            .map(|(id, value)| (id, Arc::new(value)))
            .collect();
        self
    }

    pub fn registries(&self) -> &Registries {
        &self.registries
    }

    // ─── Registration ────────────────────────────────────────────────────────

    /// Registers an extension in the `Inactive` state.
    pub fn register(&self, extension: Arc<dyn Extension>) -> ExtensionResult<()> {
        let manifest = extension.manifest();
        manifest.validate()?;

        let mut entries = self.entries.lock();
        if entries.iter().any(|e| e.manifest.id == manifest.id) {
            return Err(ExtensionError::AlreadyRegistered(manifest.id));
        }
        info!(
            extension = %manifest.id,
            version = %manifest.version,
            "Extension registered"
        );
        entries.push(ExtensionEntry {
            extension,
            manifest,
            state: ExtensionState::Inactive,
            cleanups: Vec::new(),
        });
        Ok(())
    }

    /// Deactivates (if needed) and removes an extension.
    pub async fn unregister(&self, id: &str) -> ExtensionResult<()> {
        self.deactivate(id).await?;
        let mut entries = self.entries.lock();
        let pos = entries
            .iter()
            .position(|e| e.manifest.id == id)
            .ok_or_else(|| ExtensionError::NotFound(id.to_string()))?;
        if entries[pos].state != ExtensionState::Inactive {
            return Err(ExtensionError::Busy {
                id: id.to_string(),
                state: entries[pos].state,
            });
        }
        entries.remove(pos);
        info!(extension = %id, "Extension unregistered");
        Ok(())
    }

    // ─── Lifecycle ───────────────────────────────────────────────────────────

    /// Activates `id`. Already-active extensions are left alone.
    pub async fn activate(&self, id: &str) -> ExtensionResult<()> {
        let extension = {
            let mut entries = self.entries.lock();
            let entry = find_mut(&mut entries, id)?;
            match entry.state {
                ExtensionState::Active => {
                    debug!(extension = %id, "Extension already active");
                    return Ok(());
                }
                ExtensionState::Inactive => {}
                state => {
                    return Err(ExtensionError::Busy {
                        id: id.to_string(),
                        state,
                    });
                }
            }
            entry.state = ExtensionState::Activating;
            Arc::clone(&entry.extension)
        };

        let config = self
            .configs
            .get(id)
            .cloned()
            .unwrap_or_else(|| Arc::new(Value::Null));
        let mut ctx = ExtensionContext::new(id, self.registries.clone(), config);
        debug!(extension = %id, "Activating extension");
        let result = call_isolated_async(async { extension.activate(&mut ctx).await }).await;
        let cleanups = ctx.into_cleanups();

        match result {
            Ok(()) => {
                let count = cleanups.len();
                self.set_state(id, ExtensionState::Active, cleanups);
                info!(extension = %id, contributions = count, "Extension activated");
                self.announce(names::EXTENSION_ACTIVATED, json!({ "id": id }));
                Ok(())
            }
            Err(source) => {
                error!(extension = %id, error = %source, "Extension activation failed, rolling back");
                run_cleanups(id, cleanups);
                self.registries.remove_owned_by(id);
                self.set_state(id, ExtensionState::Inactive, Vec::new());
                Err(ExtensionError::ActivationFailed {
                    id: id.to_string(),
                    source,
                })
            }
        }
    }

    /// Deactivates `id`, withdrawing every contribution it made.
    ///
    /// Returns the number of cleanups that failed. Inactive extensions are
    /// left alone.
    pub async fn deactivate(&self, id: &str) -> ExtensionResult<usize> {
        let (extension, cleanups) = {
            let mut entries = self.entries.lock();
            let entry = find_mut(&mut entries, id)?;
            match entry.state {
                ExtensionState::Inactive => {
                    debug!(extension = %id, "Extension already inactive");
                    return Ok(0);
                }
                ExtensionState::Active => {}
                state => {
                    return Err(ExtensionError::Busy {
                        id: id.to_string(),
                        state,
                    });
                }
            }
            entry.state = ExtensionState::Deactivating;
            (
                Arc::clone(&entry.extension),
                std::mem::take(&mut entry.cleanups),
            )
        };

        debug!(extension = %id, "Deactivating extension");
        if let Err(e) = call_isolated_async(async { extension.deactivate().await }).await {
            error!(extension = %id, error = %e, "Extension deactivate hook failed");
        }
        let failures = run_cleanups(id, cleanups);
        let swept = self.registries.remove_owned_by(id);
        if swept > 0 {
            warn!(extension = %id, swept, "Removed untracked contributions");
        }

        self.set_state(id, ExtensionState::Inactive, Vec::new());
        info!(extension = %id, cleanup_failures = failures, "Extension deactivated");
        self.announce(
            names::EXTENSION_DEACTIVATED,
            json!({ "id": id, "cleanup_failures": failures }),
        );
        Ok(failures)
    }

    /// Activates every registered extension in registration order.
    ///
    /// Failures are logged and returned; they do not stop the others.
    pub async fn activate_all(&self) -> Vec<ExtensionError> {
        let mut failures = Vec::new();
        for id in self.ids() {
            if let Err(e) = self.activate(&id).await {
                error!(extension = %id, error = %e, "Extension failed to start");
                failures.push(e);
            }
        }
        failures
    }

    /// Deactivates every extension in reverse registration order.
    ///
    /// Returns the total number of failed cleanups.
    pub async fn deactivate_all(&self) -> usize {
        let mut failures = 0;
        for id in self.ids().into_iter().rev() {
            match self.deactivate(&id).await {
                Ok(n) => failures += n,
                Err(e) => error!(extension = %id, error = %e, "Extension failed to stop"),
            }
        }
        failures
    }

    // ─── Queries ─────────────────────────────────────────────────────────────

    pub fn state(&self, id: &str) -> Option<ExtensionState> {
        self.entries
            .lock()
            .iter()
            .find(|e| e.manifest.id == id)
            .map(|e| e.state)
    }

    /// Manifests and states in registration order.
    pub fn list(&self) -> Vec<ExtensionInfo> {
        self.entries
            .lock()
            .iter()
            .map(|e| ExtensionInfo {
                manifest: e.manifest.clone(),
                state: e.state,
            })
            .collect()
    }

    /// Registered ids in registration order.
    pub fn ids(&self) -> Vec<String> {
        self.entries
            .lock()
            .iter()
            .map(|e| e.manifest.id.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ─── Internals ───────────────────────────────────────────────────────────

    fn set_state(&self, id: &str, state: ExtensionState, cleanups: Vec<Cleanup>) {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.iter_mut().find(|e| e.manifest.id == id) {
            entry.state = state;
            entry.cleanups = cleanups;
        }
    }

    fn announce(&self, event: &str, payload: Value) {
        self.registries.events.emit(event, payload);
    }
}

fn find_mut<'a>(
    entries: &'a mut [ExtensionEntry],
    id: &str,
) -> ExtensionResult<&'a mut ExtensionEntry> {
    entries
        .iter_mut()
        .find(|e| e.manifest.id == id)
        .ok_or_else(|| ExtensionError::NotFound(id.to_string()))
}

impl fmt::Debug for ExtensionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionManager")
            .field("extensions", &self.list())
            .finish_non_exhaustive()
    }
}
