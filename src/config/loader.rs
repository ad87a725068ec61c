//! Configuration loading from disk.

use std::path::Path;
use std::fs;
use std::time::SystemTime;

use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::config::source::ConfigSource;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse and validate a JSON configuration document.
pub fn parse_config(content: &str) -> Result<ProxyConfig, ConfigError> {
    let config: ProxyConfig = serde_json::from_str(content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Load and validate configuration from a JSON file.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Load a configuration together with the modification marker it was read at.
///
/// The marker is taken before the content so a write racing this call is
/// seen as newer by the next reload check.
pub fn load_from_source<S: ConfigSource + ?Sized>(
    source: &S,
) -> Result<(ProxyConfig, SystemTime), ConfigError> {
    let marker = source.modified()?;
    let content = source.read()?;
    let config = parse_config(&content)?;
    Ok((config, marker))
}
