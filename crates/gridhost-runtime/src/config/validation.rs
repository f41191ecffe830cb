//! Configuration validation utilities.

use std::collections::HashSet;

use super::error::{ConfigError, ConfigResult};
use super::schema::{ExtensionsConfig, GridHostConfig, LogOutput, LoggingConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &GridHostConfig) -> ConfigResult<()> {
    validate_logging_config(&config.logging)?;
    validate_extensions_config(&config.extensions)?;
    Ok(())
}

/// Validates logging settings.
///
/// Levels are checked while deserializing, so only cross-field rules and
/// filter targets remain.
fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::validation(
            "logging.file_path is required when logging.output is \"file\"",
        ));
    }

    for target in logging.filters.keys() {
        if target.trim().is_empty() || target.contains(['=', ',', ' ']) {
            return Err(ConfigError::validation(format!(
                "Invalid logging filter target: {target:?}"
            )));
        }
    }

    Ok(())
}

/// Validates extension selection.
fn validate_extensions_config(extensions: &ExtensionsConfig) -> ConfigResult<()> {
    let mut seen_ids = HashSet::new();

    for id in &extensions.disabled {
        if id.trim().is_empty() {
            return Err(ConfigError::validation(
                "extensions.disabled contains an empty id",
            ));
        }
        if !seen_ids.insert(id) {
            return Err(ConfigError::DuplicateExtensionId(id.clone()));
        }
    }

    if extensions.settings.keys().any(|id| id.trim().is_empty()) {
        return Err(ConfigError::validation(
            "extensions.settings contains an empty id",
        ));
    }

    Ok(())
}
