//! Primary/replica PostgreSQL routing with read failover.

pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod pool;
pub mod resilience;
pub mod routing;

pub use config::RouterConfig;
pub use http::HttpServer;
pub use lifecycle::{Application, Shutdown};
pub use pool::Role;
pub use routing::{DatabaseRouter, PgRouter, QueryIntent, RouteError, Routed, RoutingDecision};
