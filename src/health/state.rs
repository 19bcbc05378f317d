//! Per-role health state machine.
//!
//! # States
//! - Healthy: role receives traffic
//! - Unhealthy: role skipped by routing
//!
//! # State Transitions
//! ```text
//! Healthy → Unhealthy: connectivity failure seen by route(), or failed probe
//! Unhealthy → Healthy: successful probe only
//! ```
//!
//! # Design Decisions
//! - Optimistic start: both roles Healthy before the first probe
//! - A lucky query never restores health, only a probe does
//! - Atomics only; no lock is held while a query runs

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::observability::metrics;
use crate::pool::Role;

/// Health flag and last probe time for one role.
#[derive(Debug)]
pub struct RoleHealth {
    healthy: AtomicBool,
    /// Milliseconds since the Unix epoch of the last probe; 0 = never probed.
    last_checked_ms: AtomicU64,
}

impl RoleHealth {
    fn new() -> Self {
        Self {
            healthy: AtomicBool::new(true),
            last_checked_ms: AtomicU64::new(0),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Acquire)
    }

    pub fn last_checked_at(&self) -> Option<SystemTime> {
        match self.last_checked_ms.load(Ordering::Acquire) {
            0 => None,
            ms => Some(UNIX_EPOCH + Duration::from_millis(ms)),
        }
    }
}

/// Point-in-time view of one role, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RoleStatus {
    pub healthy: bool,
    /// Milliseconds since the Unix epoch; `None` before the first probe.
    pub last_checked_at_ms: Option<u64>,
}

/// Point-in-time view of both roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HealthSnapshot {
    pub primary: RoleStatus,
    pub replica: RoleStatus,
}

/// Process-wide health state for both roles.
///
/// Shared through `Arc` between the router and the health monitor.
#[derive(Debug)]
pub struct HealthRegistry {
    primary: RoleHealth,
    replica: RoleHealth,
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self {
            primary: RoleHealth::new(),
            replica: RoleHealth::new(),
        }
    }

    pub fn role(&self, role: Role) -> &RoleHealth {
        match role {
            Role::Primary => &self.primary,
            Role::Replica => &self.replica,
        }
    }

    pub fn is_healthy(&self, role: Role) -> bool {
        self.role(role).is_healthy()
    }

    /// Record a connectivity failure observed outside a probe.
    ///
    /// Returns true if this call performed the Healthy → Unhealthy transition.
    pub fn mark_unhealthy(&self, role: Role) -> bool {
        let was_healthy = self.role(role).healthy.swap(false, Ordering::AcqRel);
        if was_healthy {
            tracing::warn!(role = %role, "Marking database role unhealthy");
            metrics::record_role_health(role, false);
        }
        was_healthy
    }

    /// Record a probe result. The only way back to Healthy.
    pub(crate) fn record_probe(&self, role: Role, healthy: bool) {
        let state = self.role(role);
        state.last_checked_ms.store(now_ms(), Ordering::Release);

        let previous = state.healthy.swap(healthy, Ordering::AcqRel);
        if previous != healthy {
            if healthy {
                tracing::info!(role = %role, "Database role recovered");
            } else {
                tracing::warn!(role = %role, "Health probe failed, marking database role unhealthy");
            }
        }
        metrics::record_role_health(role, healthy);
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        HealthSnapshot {
            primary: status(&self.primary),
            replica: status(&self.replica),
        }
    }
}

fn status(state: &RoleHealth) -> RoleStatus {
    let ms = state.last_checked_ms.load(Ordering::Acquire);
    RoleStatus {
        healthy: state.is_healthy(),
        last_checked_at_ms: (ms != 0).then_some(ms),
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
        .max(1)
}
