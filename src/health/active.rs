//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe both database roles
//! - Update role health state based on results

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::broadcast;
use tokio::time::{self, MissedTickBehavior};

use crate::config::HealthCheckConfig;
use crate::health::state::HealthRegistry;
use crate::observability::metrics;
use crate::pool::RoleBackend;
use crate::resilience::backoff::jitter;
use crate::resilience::timeouts::with_deadline;
use crate::routing::DatabaseRouter;

/// Result of probing both roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub primary: bool,
    pub replica: bool,
}

/// Ping one role under `timeout` and record the outcome.
pub(crate) async fn probe_role<B: RoleBackend>(
    backend: &B,
    registry: &HealthRegistry,
    timeout: Duration,
) -> bool {
    let role = backend.descriptor().role;
    let healthy = match with_deadline(timeout, backend.ping()).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(
                role = %role,
                addr = %backend.descriptor().addr(),
                error = %e,
                "Health probe failed"
            );
            false
        }
    };

    metrics::record_probe(role, healthy);
    registry.record_probe(role, healthy);
    healthy
}

/// Background task probing both roles on a fixed interval.
pub struct HealthMonitor<B: RoleBackend> {
    router: Arc<DatabaseRouter<B>>,
    config: HealthCheckConfig,
}

impl<B: RoleBackend> HealthMonitor<B> {
    pub fn new(router: Arc<DatabaseRouter<B>>, config: HealthCheckConfig) -> Self {
        Self { router, config }
    }

    /// Run until the shutdown signal fires.
    ///
    /// Probes run inline in the loop, so they never overlap; ticks that come
    /// due while a probe is still running are skipped.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.enabled {
            tracing::info!("Active health checks disabled");
            return;
        }

        tracing::info!(
            interval_secs = self.config.interval_secs,
            timeout_secs = self.config.timeout_secs,
            jitter_ms = self.config.jitter_ms,
            "Health monitor starting"
        );

        let mut ticker = time::interval(Duration::from_secs(self.config.interval_secs));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.recv() => break,
            }

            let delay = jitter(self.config.jitter_ms);
            let probe = async {
                time::sleep(delay).await;
                self.router.check_health().await
            };

            tokio::select! {
                report = probe => {
                    tracing::debug!(primary = report.primary, replica = report.replica, "Health check complete");
                }
                _ = shutdown.recv() => break,
            }
        }

        tracing::info!("Health monitor received shutdown signal, exiting loop");
    }
}
