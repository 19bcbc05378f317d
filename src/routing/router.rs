//! Primary/replica query routing.
//!
//! # Responsibilities
//! - Pick a role per query from the read/write hint and health flags
//! - Execute under a deadline and measure latency
//! - Fail a read over to the other role once on connectivity failure
//! - Remember the last routing decision for diagnostics
//!
//! # Design Decisions
//! - Writes only ever touch the primary; a down primary is an error, not a fallback
//! - Reads prefer the primary to keep read-your-writes when possible
//! - Query errors are never retried and never touch health
//! - Health only goes false here; the probe is the only way back

use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwapOption;
use tokio_util::sync::CancellationToken;

use crate::config::DatabaseConfig;
use crate::health::active::{probe_role, HealthReport};
use crate::health::passive::observe_failure;
use crate::health::state::{HealthRegistry, HealthSnapshot};
use crate::observability::metrics;
use crate::pool::{BackendError, PgBackend, PoolDescriptor, RoleBackend, Role};
use crate::resilience::retries::may_fail_over;
use crate::resilience::timeouts::with_deadline;
use crate::routing::decision::{Routed, RoutingDecision};
use crate::routing::error::RouteError;
use crate::routing::intent::QueryIntent;

/// Router over the PostgreSQL backend used by the service.
pub type PgRouter = DatabaseRouter<PgBackend>;

/// Routes queries between one primary and one replica pool.
pub struct DatabaseRouter<B: RoleBackend> {
    primary: B,
    replica: B,
    health: Arc<HealthRegistry>,
    probe_timeout: Duration,
    last_decision: ArcSwapOption<RoutingDecision>,
}

impl<B: RoleBackend> DatabaseRouter<B> {
    /// Create a router over the given backends and shared health state.
    pub fn new(primary: B, replica: B, health: Arc<HealthRegistry>, probe_timeout: Duration) -> Self {
        debug_assert_eq!(primary.descriptor().role, Role::Primary);
        debug_assert_eq!(replica.descriptor().role, Role::Replica);

        Self {
            primary,
            replica,
            health,
            probe_timeout,
            last_decision: ArcSwapOption::empty(),
        }
    }

    pub fn backend(&self, role: Role) -> &B {
        match role {
            Role::Primary => &self.primary,
            Role::Replica => &self.replica,
        }
    }

    pub fn descriptor(&self, role: Role) -> &PoolDescriptor {
        self.backend(role).descriptor()
    }

    pub fn health(&self) -> &Arc<HealthRegistry> {
        &self.health
    }

    pub fn health_snapshot(&self) -> HealthSnapshot {
        self.health.snapshot()
    }

    /// Most recent successful routing decision. Best-effort, for display only.
    pub fn last_decision(&self) -> Option<RoutingDecision> {
        self.last_decision.load_full().map(|d| (*d).clone())
    }

    /// Choose the role for the first attempt without executing anything.
    pub fn select(&self, intent: &QueryIntent) -> Result<Role, RouteError> {
        select_role(intent.for_write, &self.health)
    }

    /// Execute `intent` on the appropriate role, failing over once for reads.
    pub async fn route(&self, intent: &QueryIntent) -> Result<Routed<B::Output>, RouteError> {
        let first = self.select(intent)?;

        let err = match self.attempt(first, intent, 1).await {
            Ok(routed) => return Ok(routed),
            Err(err) if !err.is_connectivity() => {
                return Err(RouteError::QueryFailed {
                    role: first,
                    source: err,
                })
            }
            Err(err) => err,
        };

        let fallback = first.other();
        if !may_fail_over(intent, &err, 1) || !self.health.is_healthy(fallback) {
            return Err(unavailable(intent, err));
        }

        tracing::info!(from = %first, to = %fallback, "Failing over read query");
        metrics::record_failover(first, fallback);

        match self.attempt(fallback, intent, 2).await {
            Ok(routed) => Ok(routed),
            Err(err) if !err.is_connectivity() => Err(RouteError::QueryFailed {
                role: fallback,
                source: err,
            }),
            Err(err) => Err(RouteError::NoPoolAvailable { cause: Some(err) }),
        }
    }

    /// Like [`route`](Self::route), but gives up as soon as `token` is cancelled.
    ///
    /// The in-flight driver call is dropped and health state is left alone.
    pub async fn route_until_cancelled(
        &self,
        intent: &QueryIntent,
        token: &CancellationToken,
    ) -> Result<Routed<B::Output>, RouteError> {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                tracing::debug!("Routed query cancelled by caller");
                Err(RouteError::Cancelled)
            }
            result = self.route(intent) => result,
        }
    }

    /// Probe both roles and update their health flags.
    ///
    /// The only operation that can mark a role healthy again.
    pub async fn check_health(&self) -> HealthReport {
        let (primary, replica) = tokio::join!(
            probe_role(&self.primary, &self.health, self.probe_timeout),
            probe_role(&self.replica, &self.health, self.probe_timeout),
        );
        HealthReport { primary, replica }
    }

    /// Close both pools, giving up after `drain_timeout`.
    pub async fn close(&self, drain_timeout: Duration) {
        let drain = async {
            tokio::join!(self.primary.close(), self.replica.close());
        };
        if tokio::time::timeout(drain_timeout, drain).await.is_err() {
            tracing::warn!(timeout = ?drain_timeout, "Pool drain timed out, abandoning open connections");
        }
    }

    async fn attempt(
        &self,
        role: Role,
        intent: &QueryIntent,
        attempt: u8,
    ) -> Result<Routed<B::Output>, BackendError> {
        let backend = self.backend(role);
        let descriptor = backend.descriptor();

        let started = Instant::now();
        let result = with_deadline(descriptor.attempt_deadline(), backend.execute(intent)).await;
        let latency = started.elapsed();

        match result {
            Ok(output) => {
                let decision = RoutingDecision::new(descriptor, latency, attempt);
                tracing::debug!(
                    role = %role,
                    addr = %descriptor.addr(),
                    latency_ms = decision.latency_ms,
                    attempt,
                    "Query served"
                );
                metrics::record_query(role, "ok", latency);
                self.last_decision.store(Some(Arc::new(decision.clone())));
                Ok(Routed { output, decision })
            }
            Err(err) if err.is_connectivity() => {
                tracing::warn!(
                    role = %role,
                    addr = %descriptor.addr(),
                    attempt,
                    error = %err,
                    "Database connectivity failure"
                );
                metrics::record_query(role, "unavailable", latency);
                observe_failure(&self.health, role, &err);
                Err(err)
            }
            Err(err) => {
                tracing::debug!(role = %role, code = ?err.code(), error = %err, "Query rejected by database");
                metrics::record_query(role, "query_error", latency);
                Err(err)
            }
        }
    }
}

impl DatabaseRouter<PgBackend> {
    /// Build both PostgreSQL pools (lazily) from resolved configuration.
    pub fn from_config(config: &DatabaseConfig, probe_timeout: Duration) -> Self {
        Self::new(
            PgBackend::new(PoolDescriptor::from_config(Role::Primary, config)),
            PgBackend::new(PoolDescriptor::from_config(Role::Replica, config)),
            Arc::new(HealthRegistry::new()),
            probe_timeout,
        )
    }
}

fn select_role(for_write: bool, health: &HealthRegistry) -> Result<Role, RouteError> {
    if for_write {
        return if health.is_healthy(Role::Primary) {
            Ok(Role::Primary)
        } else {
            Err(RouteError::PrimaryUnavailable { cause: None })
        };
    }

    if health.is_healthy(Role::Primary) {
        Ok(Role::Primary)
    } else if health.is_healthy(Role::Replica) {
        Ok(Role::Replica)
    } else {
        Err(RouteError::NoPoolAvailable { cause: None })
    }
}

fn unavailable(intent: &QueryIntent, cause: BackendError) -> RouteError {
    if intent.for_write {
        RouteError::PrimaryUnavailable { cause: Some(cause) }
    } else {
        RouteError::NoPoolAvailable { cause: Some(cause) }
    }
}
