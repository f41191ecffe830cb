//! Link-time collection of built-in extensions.
//!
//! Any crate linked into the host binary can contribute an extension without
//! the host naming it:
//!
//! ```rust,ignore
//! use gridhost_framework::{BUILTIN_EXTENSIONS, Extension, ExtensionFactory};
//! use linkme::distributed_slice;
//!
//! #[distributed_slice(BUILTIN_EXTENSIONS)]
//! static TABLE_BANDING: ExtensionFactory = table_banding;
//!
//! fn table_banding() -> Arc<dyn Extension> {
//!     Arc::new(TableBanding::default())
//! }
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use linkme::distributed_slice;
use tracing::warn;

use super::Extension;

/// Factory producing a fresh extension instance.
pub type ExtensionFactory = fn() -> Arc<dyn Extension>;

/// Registry of built-in extension factories.
#[distributed_slice]
pub static BUILTIN_EXTENSIONS: [ExtensionFactory];

/// Instantiates every built-in extension, ordered by id.
///
/// Link order is unspecified, so the result is sorted to keep activation
/// order stable between builds. Duplicate ids are logged and only the first
/// instance is kept.
pub fn builtin_extensions() -> Vec<Arc<dyn Extension>> {
    let mut extensions: Vec<_> = BUILTIN_EXTENSIONS.iter().map(|factory| factory()).collect();
    extensions.sort_by_key(|ext| ext.manifest().id);

    let mut seen = HashSet::new();
    extensions.retain(|ext| {
        let id = ext.manifest().id;
        let fresh = seen.insert(id.clone());
        if !fresh {
            warn!(extension = %id, "Duplicate built-in extension ignored");
        }
        fresh
    });
    extensions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extension::{ExtensionContext, ExtensionManifest};
    use async_trait::async_trait;
    use gridhost_core::HandlerResult;

    struct Probe;

    #[async_trait]
    impl Extension for Probe {
        fn manifest(&self) -> ExtensionManifest {
            ExtensionManifest::new("builtin-probe", "Probe")
        }

        async fn activate(&self, _ctx: &mut ExtensionContext) -> HandlerResult<()> {
            Ok(())
        }
    }

    #[distributed_slice(BUILTIN_EXTENSIONS)]
    static PROBE: ExtensionFactory = probe;

    fn probe() -> Arc<dyn Extension> {
        Arc::new(Probe)
    }

    #[test]
    fn test_builtin_is_discovered() {
        let ids: Vec<_> = builtin_extensions()
            .iter()
            .map(|ext| ext.manifest().id)
            .collect();
        assert!(ids.iter().any(|id| id == "builtin-probe"));
    }
}
