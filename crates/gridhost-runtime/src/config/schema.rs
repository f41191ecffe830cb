//! Configuration schema definitions.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Root configuration structure.
///
/// ```toml
/// [logging]
/// level = "debug"
/// format = "pretty"
///
/// [logging.filters]
/// gridhost_core = "trace"
///
/// [extensions]
/// disabled = ["legacy-filter"]
///
/// [extensions.settings.table-banding]
/// stride = 2
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GridHostConfig {
    /// Logging setup.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Extension selection and per-extension settings.
    #[serde(default)]
    pub extensions: ExtensionsConfig,
}

// =============================================================================
// Logging
// =============================================================================

/// Log verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log line layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Requires the `json-log` feature; falls back to compact without it.
    Json,
}

/// Log destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SpanEventConfig {
    pub new: bool,
    pub enter: bool,
    pub exit: bool,
    pub close: bool,
}

/// The `[logging]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Base level, overridden by `RUST_LOG` when set.
    pub level: LogLevel,
    pub format: LogFormat,
    pub output: LogOutput,
    /// Required when `output = "file"`.
    pub file_path: Option<PathBuf>,
    pub span_events: SpanEventConfig,
    pub thread_ids: bool,
    /// Include source file and line in each record.
    pub file_location: bool,
    /// Per-target levels, e.g. `gridhost_core = "trace"`.
    pub filters: HashMap<String, LogLevel>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
            output: LogOutput::Stdout,
            file_path: None,
            span_events: SpanEventConfig::default(),
            thread_ids: false,
            file_location: false,
            filters: HashMap::new(),
        }
    }
}

// =============================================================================
// Extensions
// =============================================================================

/// The `[extensions]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtensionsConfig {
    /// Built-in extension ids that are never registered.
    pub disabled: Vec<String>,

    /// Whether [`GridHost::start`](crate::GridHost::start) activates every
    /// registered extension.
    pub activate_on_start: bool,

    /// Per-extension sections keyed by extension id, handed to
    /// `ExtensionContext::config`.
    pub settings: HashMap<String, Value>,
}

impl Default for ExtensionsConfig {
    fn default() -> Self {
        Self {
            disabled: Vec::new(),
            activate_on_start: true,
            settings: HashMap::new(),
        }
    }
}

impl ExtensionsConfig {
    pub fn is_disabled(&self, id: &str) -> bool {
        self.disabled.iter().any(|d| d == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GridHostConfig::default();
        assert_eq!(config.logging.level, LogLevel::Info);
        assert_eq!(config.logging.output, LogOutput::Stdout);
        assert!(config.extensions.activate_on_start);
        assert!(config.extensions.settings.is_empty());
    }

    #[test]
    fn test_partial_sections_fill_defaults() {
        let config: GridHostConfig = serde_json::from_value(serde_json::json!({
            "logging": { "level": "debug", "filters": { "gridhost_core": "trace" } },
            "extensions": {
                "disabled": ["legacy"],
                "settings": { "table-banding": { "stride": 3 } }
            }
        }))
        .unwrap();

        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.logging.format, LogFormat::Compact);
        assert_eq!(config.logging.filters["gridhost_core"], LogLevel::Trace);
        assert!(config.extensions.activate_on_start);
        assert!(config.extensions.is_disabled("legacy"));
        assert!(!config.extensions.is_disabled("table-banding"));
        assert_eq!(config.extensions.settings["table-banding"]["stride"], 3);
    }
}
