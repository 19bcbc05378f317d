use thiserror::Error;

use crate::pool::{BackendError, Role};

/// Why a routed query produced no result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// A write was attempted while the primary is down. Never retried.
    #[error("primary database is unavailable for writes{}", cause_suffix(.cause))]
    PrimaryUnavailable { cause: Option<BackendError> },

    /// A read found no healthy role, or its single failover also failed.
    #[error("no healthy database pool available{}", cause_suffix(.cause))]
    NoPoolAvailable { cause: Option<BackendError> },

    /// The server rejected the statement. Health is untouched.
    #[error("query failed on {role}: {source}")]
    QueryFailed {
        role: Role,
        #[source]
        source: BackendError,
    },

    /// The caller gave up before the query finished.
    #[error("query cancelled by caller")]
    Cancelled,
}

fn cause_suffix(cause: &Option<BackendError>) -> String {
    match cause {
        Some(err) => format!(" ({err})"),
        None => String::new(),
    }
}

impl RouteError {
    /// Errors the HTTP layer reports as 503.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            RouteError::PrimaryUnavailable { .. } | RouteError::NoPoolAvailable { .. }
        )
    }
}
