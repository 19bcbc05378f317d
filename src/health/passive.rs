//! Passive health checking (failure detection).
//!
//! # Responsibilities
//! - Observe routed query failures
//! - Mark a role unhealthy on the first connectivity failure
//!
//! # Design Decisions
//! - Only connectivity errors and timeouts count as failures
//! - Query errors (syntax, constraints, permissions) are NOT failures
//! - Successful queries are not observed; recovery is left to probes
//! - A caller cancelling its query never reaches this point

use crate::health::state::HealthRegistry;
use crate::pool::{BackendError, Role};

/// Record a failed attempt against `role`.
///
/// Returns true if the failure flipped the role to unhealthy.
pub fn observe_failure(registry: &HealthRegistry, role: Role, error: &BackendError) -> bool {
    if !error.is_connectivity() {
        return false;
    }
    registry.mark_unhealthy(role)
}
