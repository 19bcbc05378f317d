//! replica-router
//!
//! Routes queries between a primary and a read replica PostgreSQL server and
//! exposes the storefront data endpoints on top.
//!
//! # Architecture Overview
//!
//! ```text
//!                          ┌──────────────────────────────────────────────────┐
//!                          │                  REPLICA ROUTER                  │
//!                          │                                                  │
//!     Client Request       │  ┌─────────┐    ┌──────────────┐                 │
//!     ─────────────────────┼─▶│  http   │───▶│   routing    │                 │
//!                          │  │ server  │    │   router     │                 │
//!                          │  └─────────┘    └──────┬───────┘                 │
//!                          │                        │ reads: primary first    │
//!                          │                        │ writes: primary only    │
//!                          │                 ┌──────┴───────┐                 │
//!                          │                 ▼              ▼                 │
//!                          │          ┌────────────┐ ┌────────────┐           │
//!                          │          │ pool       │ │ pool       │           │
//!                          │          │ (primary)  │ │ (replica)  │           │
//!                          │          └─────┬──────┘ └─────┬──────┘           │
//!                          │                │              │                  │
//!                          │  ┌─────────────────────────────────────────────┐ │
//!                          │  │ health (probes + passive marks), resilience │ │
//!                          │  │ config, observability, lifecycle            │ │
//!                          │  └─────────────────────────────────────────────┘ │
//!                          └────────────────┼──────────────┼──────────────────┘
//!                                           ▼              ▼
//!                                       PostgreSQL     PostgreSQL
//!                                        primary        replica
//! ```

use std::path::PathBuf;

use clap::Parser;

use replica_router::config;
use replica_router::lifecycle::{Application, Shutdown};
use replica_router::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "replica-router")]
#[command(about = "Primary/replica PostgreSQL router", version)]
struct Args {
    /// Path to a TOML configuration file. Defaults and environment are used without one.
    #[arg(short, long, env = "ROUTER_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = config::load(args.config.as_deref())?;
    logging::init_logging(&config.observability);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "replica-router starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        health_interval_secs = config.health_check.interval_secs,
        pool_max = config.database.pool.max_connections,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let app = Application::build(config).await?;
    tracing::info!(address = %app.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();

    app.run(shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
