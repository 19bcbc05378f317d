//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Routed query:
//!     → timeouts.rs (connect + statement deadline around each attempt)
//!     → On failure: retries.rs (read + connectivity → one failover attempt)
//!
//! Health monitor:
//!     → backoff.rs (jitter before each scheduled probe)
//!     → timeouts.rs (probe deadline)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every driver call has a deadline
//! - Retries only for reads, and only once
//! - No retry delay: the failover target is a different server

pub mod backoff;
pub mod retries;
pub mod timeouts;
