//! Error types for the extension framework.

use gridhost_core::BoxError;
use thiserror::Error;

use crate::manager::ExtensionState;

/// Errors raised by the extension manager and extension contexts.
#[derive(Debug, Error)]
pub enum ExtensionError {
    /// No extension with this id is registered.
    #[error("extension '{0}' is not registered")]
    NotFound(String),

    /// An extension with this id is already registered.
    #[error("extension '{0}' is already registered")]
    AlreadyRegistered(String),

    /// The manifest failed validation.
    #[error("invalid manifest for '{id}': {reason}")]
    InvalidManifest {
        /// Id as declared by the manifest.
        id: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The extension's `activate` returned an error or panicked.
    ///
    /// Every contribution made before the failure has already been withdrawn.
    #[error("extension '{id}' failed to activate: {source}")]
    ActivationFailed {
        id: String,
        #[source]
        source: BoxError,
    },

    /// The extension is mid-transition and cannot be driven right now.
    #[error("extension '{id}' is {state}")]
    Busy { id: String, state: ExtensionState },

    /// The extension's configuration section has the wrong shape.
    #[error("invalid configuration for extension '{id}': {source}")]
    Config {
        id: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ExtensionError {
    /// Creates an invalid-manifest error.
    pub fn invalid_manifest(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidManifest {
            id: id.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for extension operations.
pub type ExtensionResult<T> = Result<T, ExtensionError>;
