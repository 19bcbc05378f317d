//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active health checks (active.rs):
//!     Periodic timer or on-demand check_health()
//!     → SELECT 1 against each role, bounded by probe timeout
//!     → Update state.rs (both directions)
//!
//! Passive health checks (passive.rs):
//!     Connectivity failure observed by route()
//!     → Update state.rs (Healthy → Unhealthy only)
//!
//! State machine (state.rs):
//!     Healthy ←→ Unhealthy, one flag per role
//! ```
//!
//! # Design Decisions
//! - Active and passive checks are complementary
//! - Recovery requires a probe, so one lucky query cannot cause flapping
//! - Health state is per-role, injected into the router

pub mod active;
pub mod passive;
pub mod state;

pub use active::{HealthMonitor, HealthReport};
pub use state::{HealthRegistry, HealthSnapshot, RoleStatus};
