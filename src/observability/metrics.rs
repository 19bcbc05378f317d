//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define router metrics (queries, latency, failovers, health)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `db_router_queries_total` (counter): routed attempts by role, outcome
//! - `db_router_query_duration_seconds` (histogram): attempt latency by role
//! - `db_router_failovers_total` (counter): read failovers by from/to role
//! - `db_router_role_healthy` (gauge): 1=healthy, 0=unhealthy
//! - `db_router_health_probes_total` (counter): probes by role, result
//! - `db_router_http_requests_total` (counter): HTTP requests by route, status
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed, so tests need no setup
//! - Labels are static strings wherever possible

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::pool::Role;

/// Install the Prometheus exporter listening on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one routed attempt.
pub fn record_query(role: Role, outcome: &'static str, latency: Duration) {
    counter!(
        "db_router_queries_total",
        "role" => role.as_str(),
        "outcome" => outcome
    )
    .increment(1);
    histogram!("db_router_query_duration_seconds", "role" => role.as_str())
        .record(latency.as_secs_f64());
}

/// Record a read failing over from one role to the other.
pub fn record_failover(from: Role, to: Role) {
    counter!(
        "db_router_failovers_total",
        "from" => from.as_str(),
        "to" => to.as_str()
    )
    .increment(1);
}

/// Publish the current health flag of a role.
pub fn record_role_health(role: Role, healthy: bool) {
    gauge!("db_router_role_healthy", "role" => role.as_str()).set(if healthy { 1.0 } else { 0.0 });
}

/// Record a health probe result.
pub fn record_probe(role: Role, healthy: bool) {
    counter!(
        "db_router_health_probes_total",
        "role" => role.as_str(),
        "result" => if healthy { "ok" } else { "failed" }
    )
    .increment(1);
}

/// Record an HTTP request served by the API.
pub fn record_request(route: String, status: u16) {
    counter!(
        "db_router_http_requests_total",
        "route" => route,
        "status" => status.to_string()
    )
    .increment(1);
}
