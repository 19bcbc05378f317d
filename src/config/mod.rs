//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → env.rs (DB_* / DATABASE_URL overrides, URL folding, replica fallback)
//!     → validation.rs (semantic checks)
//!     → RouterConfig (validated, immutable)
//!     → PoolDescriptors built once at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; pool descriptors never change at runtime
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod env;
pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load, load_config, ConfigError};
pub use schema::{
    DatabaseConfig, HealthCheckConfig, ListenerConfig, ObservabilityConfig, PoolConfig,
    RouterConfig, ServerConfig, ShutdownConfig,
};
pub use validation::ValidationError;
