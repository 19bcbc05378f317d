//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, timeout, request ID, request metrics)
//! - Bind server to listener
//! - Serve health and diagnostic endpoints straight from the router

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{MatchedPath, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::ShutdownConfig;
use crate::health::HealthSnapshot;
use crate::http::catalog::{get_product, list_products};
use crate::http::orders::create_order;
use crate::http::request::{request_id, MakeRequestUuid, X_REQUEST_ID};
use crate::observability::metrics;
use crate::pool::Role;
use crate::routing::{PgRouter, RoutingDecision};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<PgRouter>,
}

/// HTTP front end for the router.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(db: Arc<PgRouter>, config: &ShutdownConfig) -> Self {
        let state = AppState { router: db };
        Self {
            router: Self::build_router(config, state),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ShutdownConfig, state: AppState) -> Router {
        let trace = TraceLayer::new_for_http().make_span_with(|request: &Request| {
            tracing::info_span!(
                "request",
                request_id = %request_id(request),
                method = %request.method(),
                path = %request.uri().path(),
            )
        });

        Router::new()
            .route("/health", get(liveness))
            .route("/api/health", get(api_health))
            .route("/api/db-info", get(db_info))
            .route("/api/products", get(list_products))
            .route("/api/products/{id}", get(get_product))
            .route("/api/orders", post(create_order))
            .route_layer(middleware::from_fn(track_requests))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
                    .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
                    .layer(trace)
                    .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs))),
            )
    }

    /// Consume the server and return the underlying router, for in-process tests.
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Run the server until `shutdown` fires, then stop accepting and let
    /// in-flight requests finish.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn track_requests(request: Request, next: Next) -> Response {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());

    let response = next.run(request).await;
    metrics::record_request(route, response.status().as_u16());
    response
}

#[derive(Serialize)]
struct Liveness {
    status: &'static str,
    version: &'static str,
    databases: HealthSnapshot,
}

/// Process liveness. Reports cached health without probing.
async fn liveness(State(state): State<AppState>) -> Json<Liveness> {
    Json(Liveness {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        databases: state.router.health_snapshot(),
    })
}

#[derive(Serialize)]
struct DatabaseHealth {
    status: &'static str,
    primary: bool,
    replica: bool,
}

/// Probe both roles now and report.
async fn api_health(State(state): State<AppState>) -> impl IntoResponse {
    let report = state.router.check_health().await;

    let (status, label) = match (report.primary, report.replica) {
        (true, _) => (StatusCode::OK, "healthy"),
        (false, true) => (StatusCode::OK, "degraded"),
        (false, false) => (StatusCode::SERVICE_UNAVAILABLE, "unavailable"),
    };

    (
        status,
        Json(DatabaseHealth {
            status: label,
            primary: report.primary,
            replica: report.replica,
        }),
    )
}

#[derive(Serialize)]
struct ServerInfo {
    role: Role,
    host: String,
    port: u16,
    database: String,
    url: String,
    max_connections: u32,
    healthy: bool,
}

#[derive(Serialize)]
struct DbInfo {
    primary: ServerInfo,
    replica: ServerInfo,
    last_decision: Option<RoutingDecision>,
}

async fn db_info(State(state): State<AppState>) -> Json<DbInfo> {
    let router = &state.router;
    let server = |role: Role| {
        let d = router.descriptor(role);
        ServerInfo {
            role,
            host: d.host.clone(),
            port: d.port,
            database: d.database.clone(),
            url: d.redacted_url(),
            max_connections: d.max_connections,
            healthy: router.health().is_healthy(role),
        }
    };

    Json(DbInfo {
        primary: server(Role::Primary),
        replica: server(Role::Replica),
        last_decision: router.last_decision(),
    })
}
