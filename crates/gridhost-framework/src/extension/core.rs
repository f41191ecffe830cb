use async_trait::async_trait;
use gridhost_core::HandlerResult;
use serde::{Deserialize, Serialize};

use super::context::ExtensionContext;
use crate::error::{ExtensionError, ExtensionResult};

// ─── ExtensionManifest ────────────────────────────────────────────────────────

/// Descriptive metadata of an extension.
///
/// `id` is the key used for lifecycle calls, log fields, the owner tag on
/// chain and overlay entries, and the config section lookup
/// (`[extensions.settings.<id>]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionManifest {
    pub id: String,
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub description: String,
}

fn default_version() -> String {
    "0.0.0".to_string()
}

impl ExtensionManifest {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            version: default_version(),
            description: String::new(),
        }
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Checks that the id is usable as a config key and log field.
    ///
    /// Ids are non-empty and made of ASCII letters, digits, `-`, `_` and `.`.
    pub fn validate(&self) -> ExtensionResult<()> {
        if self.id.is_empty() {
            return Err(ExtensionError::invalid_manifest(&self.id, "id must not be empty"));
        }
        if let Some(bad) = self
            .id
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
        {
            return Err(ExtensionError::invalid_manifest(
                &self.id,
                format!("id contains invalid character {bad:?}"),
            ));
        }
        if self.name.trim().is_empty() {
            return Err(ExtensionError::invalid_manifest(&self.id, "name must not be empty"));
        }
        Ok(())
    }
}

// ─── Extension ────────────────────────────────────────────────────────────────

/// An independently activatable unit of behavior.
///
/// Extensions never touch the registries directly. `activate` receives an
/// [`ExtensionContext`] that records every contribution, and the manager
/// withdraws all of them on deactivation.
///
/// # Example
///
/// ```rust,ignore
/// struct NegativeNumbers;
///
/// #[async_trait]
/// impl Extension for NegativeNumbers {
///     fn manifest(&self) -> ExtensionManifest {
///         ExtensionManifest::new("negative-numbers", "Negative numbers in red")
///     }
///
///     async fn activate(&self, ctx: &mut ExtensionContext) -> HandlerResult<()> {
///         ctx.register_style_interceptor("red", 10, |value, _, _| {
///             let negative = value.as_number().is_some_and(|n| n < 0.0);
///             Ok(negative.then(|| CellStyle::new().text(Color::rgb(200, 0, 0))))
///         });
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Extension: Send + Sync + 'static {
    /// Static description of this extension.
    fn manifest(&self) -> ExtensionManifest;

    /// Wires the extension's contributions through `ctx`.
    ///
    /// Returning `Err` rolls back everything registered so far.
    async fn activate(&self, ctx: &mut ExtensionContext) -> HandlerResult<()>;

    /// Extension-specific teardown, run before the recorded cleanups.
    async fn deactivate(&self) -> HandlerResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_validation() {
        assert!(ExtensionManifest::new("table-banding", "Banding").validate().is_ok());
        assert!(ExtensionManifest::new("org.grid.filter_v2", "Filter").validate().is_ok());
        assert!(ExtensionManifest::new("", "Empty").validate().is_err());
        assert!(ExtensionManifest::new("has space", "Space").validate().is_err());
        assert!(ExtensionManifest::new("ok", "  ").validate().is_err());
    }

    #[test]
    fn test_manifest_defaults_from_json() {
        let manifest: ExtensionManifest =
            serde_json::from_value(serde_json::json!({ "id": "x", "name": "X" })).unwrap();
        assert_eq!(manifest.version, "0.0.0");
        assert!(manifest.description.is_empty());
    }
}
