//! Server roles and the immutable per-role pool descriptor.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{DatabaseConfig, ServerConfig};

/// Database server role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Accepts reads and writes.
    Primary,
    /// Read-only, asynchronously lagging copy of the primary.
    Replica,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Primary, Role::Replica];

    /// The alternate role, used as the failover target for reads.
    pub fn other(self) -> Role {
        match self {
            Role::Primary => Role::Replica,
            Role::Replica => Role::Primary,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Primary => "primary",
            Role::Replica => "replica",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything needed to open a pool against one server role.
///
/// Built once at startup and never mutated. The password is kept out of
/// `Debug` output and rendered URLs.
#[derive(Clone, PartialEq, Eq)]
pub struct PoolDescriptor {
    pub role: Role,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub max_connections: u32,
    pub idle_timeout: Duration,
    pub connect_timeout: Duration,
    pub statement_timeout: Duration,
}

impl PoolDescriptor {
    /// Build the descriptor for `role` from resolved database configuration.
    pub fn from_config(role: Role, config: &DatabaseConfig) -> Self {
        let server: &ServerConfig = match role {
            Role::Primary => &config.primary,
            Role::Replica => &config.replica,
        };
        let pool = &config.pool;

        Self {
            role,
            host: server.host.clone(),
            port: server.port,
            database: server.database.clone().unwrap_or_else(|| config.name.clone()),
            user: server.user.clone().unwrap_or_else(|| config.user.clone()),
            password: server.password.clone().unwrap_or_else(|| config.password.clone()),
            max_connections: pool.max_connections,
            idle_timeout: Duration::from_secs(pool.idle_timeout_secs),
            connect_timeout: Duration::from_millis(pool.connect_timeout_ms),
            statement_timeout: Duration::from_millis(pool.statement_timeout_ms),
        }
    }

    /// `host:port` of the server.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Upper bound for a single attempt: acquiring a connection plus running
    /// the statement.
    pub fn attempt_deadline(&self) -> Duration {
        self.connect_timeout + self.statement_timeout
    }

    /// Connection URL with the password removed, for logs and diagnostics.
    pub fn redacted_url(&self) -> String {
        format!(
            "postgres://{}@{}:{}/{}",
            self.user, self.host, self.port, self.database
        )
    }
}

impl fmt::Debug for PoolDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolDescriptor")
            .field("role", &self.role)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("max_connections", &self.max_connections)
            .field("idle_timeout", &self.idle_timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("statement_timeout", &self.statement_timeout)
            .finish()
    }
}
