//! Connection pool subsystem.
//!
//! # Data Flow
//! ```text
//! RouterConfig.database
//!     → descriptor.rs (one immutable PoolDescriptor per Role)
//!     → postgres.rs (PgBackend: sqlx pool created on first use)
//!     → backend.rs (RoleBackend trait seen by the router)
//! ```
//!
//! # Design Decisions
//! - Pool internals (queueing, idle eviction) belong to the driver
//! - Driver errors are classified here, once, into connectivity vs query
//! - The router is generic over `RoleBackend` so it can be tested without a server

pub mod backend;
pub mod descriptor;
pub mod postgres;

pub use backend::{BackendError, RoleBackend};
pub use descriptor::{PoolDescriptor, Role};
pub use postgres::{PgBackend, QueryOutput};
