//! Unified error types for the Gridhost core.
//!
//! Registries never surface handler failures to their callers: an interceptor
//! that fails is logged and treated as "no opinion". The types here cover the
//! few operations that do return errors (typed payload conversion) and the
//! boxed error type handlers use to report failures.

use thiserror::Error;

/// Error type returned by extension-supplied handlers, listeners and cleanups.
///
/// Boxed so that extensions can use `?` on any error type.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for extension-supplied handlers.
pub type HandlerResult<T> = Result<T, BoxError>;

// =============================================================================
// Core Errors
// =============================================================================

/// Errors raised by core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A payload could not be serialized into a JSON value.
    #[error("failed to serialize payload for '{target}': {source}")]
    Serialize {
        /// Event name or dialog id the payload was destined for.
        target: String,
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },

    /// A payload did not have the shape the consumer expected.
    #[error("payload for '{target}' has unexpected shape: {source}")]
    PayloadShape {
        /// Event name or dialog id the payload came from.
        target: String,
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },

    /// A handler panicked while being invoked.
    #[error("handler panicked: {0}")]
    Panicked(String),
}

impl CoreError {
    /// Creates a serialization error for the given target.
    pub fn serialize(target: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Serialize {
            target: target.into(),
            source,
        }
    }

    /// Creates a payload-shape error for the given target.
    pub fn payload_shape(target: impl Into<String>, source: serde_json::Error) -> Self {
        Self::PayloadShape {
            target: target.into(),
            source,
        }
    }
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
