//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the router and its (lazy) pools from validated configuration
//! - Start background tasks (health monitor)
//! - Bind the listener and begin accepting traffic
//! - On shutdown, stop the listener first, then drain the pools
//!
//! # Design Decisions
//! - Fail fast: a listener that cannot bind is fatal
//! - No database is contacted at startup; pools connect on first use
//! - Pool drain is bounded by `drain_timeout_secs`

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

use crate::config::RouterConfig;
use crate::health::HealthMonitor;
use crate::http::HttpServer;
use crate::lifecycle::Shutdown;
use crate::routing::PgRouter;

/// A bound, not yet running, service instance.
pub struct Application {
    config: RouterConfig,
    router: Arc<PgRouter>,
    listener: TcpListener,
}

impl Application {
    pub async fn build(config: RouterConfig) -> Result<Self, std::io::Error> {
        let probe_timeout = Duration::from_secs(config.health_check.timeout_secs);
        let router = Arc::new(PgRouter::from_config(&config.database, probe_timeout));

        for role in crate::pool::Role::ALL {
            let d = router.descriptor(role);
            tracing::info!(role = %role, url = %d.redacted_url(), "Database configured");
        }

        let listener = TcpListener::bind(&config.listener.bind_address).await?;

        Ok(Self {
            config,
            router,
            listener,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.listener.local_addr()
    }

    pub fn router(&self) -> &Arc<PgRouter> {
        &self.router
    }

    /// Serve until `shutdown` triggers, then close both pools.
    pub async fn run(self, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let monitor = HealthMonitor::new(self.router.clone(), self.config.health_check.clone());
        let monitor_task = tokio::spawn(monitor.run(shutdown.subscribe()));

        let server = HttpServer::new(self.router.clone(), &self.config.shutdown);
        let served = server.run(self.listener, shutdown.subscribe()).await;

        // The server can also stop on its own (listener error); make sure the
        // monitor follows it down.
        shutdown.trigger();
        if let Err(e) = monitor_task.await {
            tracing::error!(error = %e, "Health monitor task failed");
        }

        let drain = Duration::from_secs(self.config.shutdown.drain_timeout_secs);
        tracing::info!(timeout = ?drain, "Draining database pools");
        self.router.close(drain).await;

        served
    }
}
