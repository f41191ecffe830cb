//! # Gridhost Runtime
//!
//! Orchestration layer for the Gridhost extension host.
//!
//! This crate provides:
//! - [`GridHost`], which owns the registries and the extension manager
//! - Figment-based configuration (`gridhost.toml`, `GRIDHOST_*` env vars)
//! - Logging setup driven by the `[logging]` section
//!
//! Built-in extensions contributed through
//! [`BUILTIN_EXTENSIONS`](gridhost_framework::BUILTIN_EXTENSIONS) are
//! registered automatically unless listed in `extensions.disabled`.
//!
//! ```rust,ignore
//! use gridhost_runtime::GridHost;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let host = GridHost::builder().profile("production").build()?;
//!     host.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod host;
pub mod logging;

pub use config::{
    ConfigError, ConfigLoader, ConfigResult, ExtensionsConfig, GridHostConfig, LoggingConfig,
};
pub use error::{RuntimeError, RuntimeResult};
pub use host::{GridHost, HostBuilder, HostStats};
pub use logging::{LoggingBuilder, SpanEvents};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
///
/// Provides the commonly used logging macros and `Level`.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
