//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID)
//!     → catalog.rs / orders.rs (build QueryIntent, call the router)
//!     → response.rs (decision headers, error mapping)
//!     → Send to client
//! ```

pub mod catalog;
pub mod orders;
pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use response::{ApiError, WithDecision, X_DB_HOST, X_DB_LATENCY_MS, X_DB_ROLE};
pub use server::{AppState, HttpServer};
