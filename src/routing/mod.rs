//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! QueryIntent (sql, params, for_write)
//!     → router.rs (select role from intent + health)
//!     → RoleBackend::execute under deadline
//!     → on connectivity failure: mark unhealthy, one read failover
//!     → Routed { output, decision } or RouteError
//! ```
//!
//! # Design Decisions
//! - SQL is opaque; the caller's `for_write` hint is trusted
//! - At most two attempts per query
//! - Decisions are returned to the caller and cached for diagnostics

pub mod decision;
pub mod error;
pub mod intent;
pub mod router;

pub use decision::{Routed, RoutingDecision};
pub use error::RouteError;
pub use intent::{QueryIntent, QueryParam};
pub use router::{DatabaseRouter, PgRouter};
