//! Environment overrides and connection-URL resolution.
//!
//! The deployment scripts hand database coordinates to the process through
//! environment variables, so these win over anything read from the config file.

use percent_encoding::percent_decode_str;
use url::{Host, Url};

use crate::config::loader::ConfigError;
use crate::config::schema::{RouterConfig, ServerConfig};

/// Apply environment overrides using the process environment.
pub fn apply_process_env(config: &mut RouterConfig) {
    apply_env_overrides(config, |key| std::env::var(key).ok());
}

/// Apply environment overrides using the given lookup.
///
/// Unparseable numeric values are ignored with a warning so a typo in the
/// environment never silently zeroes a port.
pub fn apply_env_overrides<F>(config: &mut RouterConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let db = &mut config.database;

    if let Some(v) = lookup("DB_PRIMARY_HOST") {
        db.primary.host = v;
    }
    if let Some(port) = parse_var(&lookup, "DB_PRIMARY_PORT") {
        db.primary.port = port;
    }
    if let Some(v) = lookup("DB_REPLICA_HOST") {
        db.replica.host = v;
    }
    if let Some(port) = parse_var(&lookup, "DB_REPLICA_PORT") {
        db.replica.port = port;
    }
    if let Some(v) = lookup("DB_NAME") {
        db.name = v;
    }
    if let Some(v) = lookup("DB_USER") {
        db.user = v;
    }
    if let Some(v) = lookup("DB_PASSWORD") {
        db.password = v;
    }
    if let Some(max) = parse_var(&lookup, "DB_POOL_MAX") {
        db.pool.max_connections = max;
    }
    if let Some(v) = lookup("DATABASE_URL") {
        db.primary.url = Some(v);
    }
    if let Some(v) = lookup("DATABASE_REPLICA_URL") {
        db.replica.url = Some(v);
    }
    if let Some(v) = lookup("ROUTER_BIND_ADDRESS") {
        config.listener.bind_address = v;
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(variable = key, value = %raw, "Ignoring unparseable environment override");
            None
        }
    }
}

/// Fold connection URLs into the explicit server fields and fill in the
/// replica from the primary when no replica is configured.
pub fn resolve_servers(config: &mut RouterConfig) -> Result<(), ConfigError> {
    let db = &mut config.database;

    fold_url(&mut db.primary, "database.primary.url")?;

    if db.replica.host.trim().is_empty() && db.replica.url.is_none() {
        tracing::info!("No replica configured, replica role will use the primary server");
        db.replica = db.primary.clone();
    } else {
        fold_url(&mut db.replica, "database.replica.url")?;
    }

    Ok(())
}

fn fold_url(server: &mut ServerConfig, field: &str) -> Result<(), ConfigError> {
    let Some(raw) = server.url.take() else {
        return Ok(());
    };

    let url = Url::parse(&raw).map_err(|source| ConfigError::Url {
        field: field.to_string(),
        source,
    })?;

    if !matches!(url.scheme(), "postgres" | "postgresql") {
        return Err(ConfigError::UnsupportedScheme {
            field: field.to_string(),
            scheme: url.scheme().to_string(),
        });
    }

    match url.host() {
        Some(Host::Domain(domain)) => server.host = decode(domain, field, "host")?,
        Some(Host::Ipv4(addr)) => server.host = addr.to_string(),
        // Without the brackets the URL syntax needs.
        Some(Host::Ipv6(addr)) => server.host = addr.to_string(),
        None => {}
    }
    if let Some(port) = url.port() {
        server.port = port;
    }
    if !url.username().is_empty() {
        server.user = Some(decode(url.username(), field, "user")?);
    }
    if let Some(password) = url.password() {
        server.password = Some(decode(password, field, "password")?);
    }
    let database = url.path().trim_start_matches('/');
    if !database.is_empty() {
        server.database = Some(decode(database, field, "database")?);
    }

    Ok(())
}

/// URL components come back percent-encoded; the server wants the raw text.
fn decode(raw: &str, field: &str, component: &'static str) -> Result<String, ConfigError> {
    percent_decode_str(raw)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|source| ConfigError::UrlEncoding {
            field: field.to_string(),
            component,
            source,
        })
}
