//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::env::{apply_process_env, resolve_servers};
use crate::config::schema::RouterConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid connection url in {field}: {source}")]
    Url {
        field: String,
        #[source]
        source: url::ParseError,
    },

    #[error("connection url in {field} has a {component} that is not valid UTF-8 once decoded")]
    UrlEncoding {
        field: String,
        component: &'static str,
        #[source]
        source: std::str::Utf8Error,
    },

    #[error("unsupported scheme '{scheme}' in {field}, expected postgres")]
    UnsupportedScheme { field: String, scheme: String },

    #[error("validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a TOML configuration file without overrides or validation.
pub fn load_config(path: &Path) -> Result<RouterConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: RouterConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Load the effective configuration.
///
/// File (or defaults) → environment overrides → URL resolution → validation.
pub fn load(path: Option<&Path>) -> Result<RouterConfig, ConfigError> {
    let mut config = match path {
        Some(path) => load_config(path)?,
        None => RouterConfig::default(),
    };

    apply_process_env(&mut config);
    finalize(config)
}

/// Resolve URLs and validate an already-assembled configuration.
pub fn finalize(mut config: RouterConfig) -> Result<RouterConfig, ConfigError> {
    resolve_servers(&mut config)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}
