//! Configuration module for the Gridhost runtime.
//!
//! Figment-based loading of `gridhost.toml` and `GRIDHOST_*` environment
//! variables, plus validation of the merged result.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    ExtensionsConfig, GridHostConfig, LogFormat, LogLevel, LogOutput, LoggingConfig,
    SpanEventConfig,
};
pub use validation::validate_config;
