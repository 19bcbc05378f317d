//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, ports valid)
//! - Check that addresses parse before anything binds
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RouterConfig → Result<(), Vec<ValidationError>>
//! - Runs after environment overrides, before config is accepted

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{RouterConfig, ServerConfig};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

pub fn validate_config(config: &RouterConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    let db = &config.database;
    if db.name.trim().is_empty() {
        errors.push(ValidationError::new("database.name", "must not be empty"));
    }
    check_server(&db.primary, "database.primary", &mut errors);
    check_server(&db.replica, "database.replica", &mut errors);

    if db.pool.max_connections == 0 {
        errors.push(ValidationError::new("database.pool.max_connections", "must be greater than 0"));
    }
    if db.pool.idle_timeout_secs == 0 {
        errors.push(ValidationError::new("database.pool.idle_timeout_secs", "must be greater than 0"));
    }
    if db.pool.connect_timeout_ms == 0 {
        errors.push(ValidationError::new("database.pool.connect_timeout_ms", "must be greater than 0"));
    }
    if db.pool.statement_timeout_ms == 0 {
        errors.push(ValidationError::new("database.pool.statement_timeout_ms", "must be greater than 0"));
    }

    let health = &config.health_check;
    if health.interval_secs == 0 {
        errors.push(ValidationError::new("health_check.interval_secs", "must be greater than 0"));
    }
    if health.timeout_secs == 0 {
        errors.push(ValidationError::new("health_check.timeout_secs", "must be greater than 0"));
    } else if health.timeout_secs >= health.interval_secs {
        errors.push(ValidationError::new(
            "health_check.timeout_secs",
            "must be shorter than health_check.interval_secs",
        ));
    }

    let obs = &config.observability;
    if !matches!(obs.log_format.as_str(), "pretty" | "json") {
        errors.push(ValidationError::new(
            "observability.log_format",
            format!("unknown format '{}', expected pretty or json", obs.log_format),
        ));
    }
    if obs.metrics_enabled && obs.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", obs.metrics_address),
        ));
    }

    if config.shutdown.drain_timeout_secs == 0 {
        errors.push(ValidationError::new("shutdown.drain_timeout_secs", "must be greater than 0"));
    }
    if config.shutdown.request_timeout_secs == 0 {
        errors.push(ValidationError::new("shutdown.request_timeout_secs", "must be greater than 0"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_server(server: &ServerConfig, prefix: &str, errors: &mut Vec<ValidationError>) {
    if server.host.trim().is_empty() {
        errors.push(ValidationError::new(format!("{prefix}.host"), "must not be empty"));
    }
    if server.port == 0 {
        errors.push(ValidationError::new(format!("{prefix}.port"), "must not be 0"));
    }
}
