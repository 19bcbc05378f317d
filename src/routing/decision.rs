//! Routing decisions returned alongside query results.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::pool::{PoolDescriptor, Role};

/// Which server answered a query, and how fast.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutingDecision {
    pub role: Role,
    pub host: String,
    pub port: u16,
    /// Wall-clock time of the serving attempt.
    pub latency_ms: f64,
    /// 1 for a direct hit, 2 when the query failed over.
    pub attempts: u8,
    pub failed_over: bool,
    /// Milliseconds since the Unix epoch.
    pub served_at_ms: u64,
}

impl RoutingDecision {
    pub fn new(descriptor: &PoolDescriptor, latency: Duration, attempts: u8) -> Self {
        Self {
            role: descriptor.role,
            host: descriptor.host.clone(),
            port: descriptor.port,
            latency_ms: latency.as_secs_f64() * 1000.0,
            attempts,
            failed_over: attempts > 1,
            served_at_ms: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or_default(),
        }
    }
}

/// A query result and the decision that produced it.
#[derive(Debug)]
pub struct Routed<T> {
    pub output: T,
    pub decision: RoutingDecision,
}
