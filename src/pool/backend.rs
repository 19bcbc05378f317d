//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent the connection pool for a single server role
//! - Execute opaque query intents and liveness probes
//! - Report failures already classified as connectivity or query errors
//!
//! The router only sees this trait, so tests can swap in scripted backends.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::pool::descriptor::PoolDescriptor;
use crate::routing::QueryIntent;

/// Failure reported by a backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The server could not be reached or the connection broke.
    #[error("connection failure: {0}")]
    Connectivity(String),

    /// The operation did not finish before its deadline.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The server rejected the statement (syntax, constraint, permission).
    #[error("{message}")]
    Query {
        /// SQLSTATE, when the driver reported one.
        code: Option<String>,
        message: String,
    },
}

impl BackendError {
    /// Connectivity failures and timeouts flip health and allow a read failover.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, BackendError::Connectivity(_) | BackendError::Timeout(_))
    }

    /// SQLSTATE for query failures.
    pub fn code(&self) -> Option<&str> {
        match self {
            BackendError::Query { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}

/// Connection pool for one server role.
#[async_trait]
pub trait RoleBackend: Send + Sync + 'static {
    /// Driver result for a successful query.
    type Output: Send + 'static;

    /// Immutable coordinates of the server behind this pool.
    fn descriptor(&self) -> &PoolDescriptor;

    /// Run the query. SQL and parameters are passed through untouched.
    async fn execute(&self, intent: &QueryIntent) -> Result<Self::Output, BackendError>;

    /// Trivial round trip used by health probes.
    async fn ping(&self) -> Result<(), BackendError>;

    /// Close all pooled connections.
    async fn close(&self);
}
