//! Runtime error types.

use gridhost_framework::ExtensionError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur during host operations.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration could not be loaded or failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A lifecycle call on an extension failed.
    #[error(transparent)]
    Extension(#[from] ExtensionError),

    /// The shutdown signal handler could not be installed.
    #[error("Failed to listen for shutdown signal: {0}")]
    Signal(#[from] std::io::Error),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
