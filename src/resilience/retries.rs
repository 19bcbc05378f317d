//! Failover eligibility.
//!
//! # Design Decisions
//! - Never retry writes on another role (the replica is read-only)
//! - Only connectivity failures and timeouts are retried
//! - At most one retry per routed query, no bounce back to the first role

use crate::pool::BackendError;
use crate::routing::QueryIntent;

/// Attempts allowed for a single routed query, including the first.
pub const MAX_ATTEMPTS: u8 = 2;

/// Whether a failed attempt may be repeated against the other role.
pub fn may_fail_over(intent: &QueryIntent, error: &BackendError, attempt: u8) -> bool {
    !intent.for_write && error.is_connectivity() && attempt < MAX_ATTEMPTS
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_reads_fail_over_once_on_connectivity() {
        let read = QueryIntent::read("SELECT 1");
        let refused = BackendError::Connectivity("refused".into());

        assert!(may_fail_over(&read, &refused, 1));
        assert!(may_fail_over(&read, &BackendError::Timeout(Duration::from_secs(1)), 1));
        assert!(!may_fail_over(&read, &refused, 2));
    }

    #[test]
    fn test_writes_and_query_errors_never_fail_over() {
        let refused = BackendError::Connectivity("refused".into());
        assert!(!may_fail_over(&QueryIntent::write("DELETE FROM carts"), &refused, 1));

        let syntax = BackendError::Query {
            code: Some("42601".into()),
            message: "syntax error".into(),
        };
        assert!(!may_fail_over(&QueryIntent::read("SELEC 1"), &syntax, 1));
    }
}
