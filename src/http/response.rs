//! Response handling and transformation.
//!
//! # Responsibilities
//! - Attach routing-decision headers to routed responses
//! - Map routing errors to HTTP status codes and JSON error bodies
//!
//! # Design Decisions
//! - Unavailability (either role down) is always 503
//! - Query failures map by SQLSTATE class: 23 (integrity) 409, 22/42 (data, syntax) 400
//! - Driver messages are logged, not echoed for 500s

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::routing::{RouteError, RoutingDecision};

pub const X_DB_ROLE: HeaderName = HeaderName::from_static("x-db-role");
pub const X_DB_HOST: HeaderName = HeaderName::from_static("x-db-host");
pub const X_DB_LATENCY_MS: HeaderName = HeaderName::from_static("x-db-latency-ms");

/// A response annotated with the server that produced its data.
pub struct WithDecision<R> {
    pub decision: RoutingDecision,
    pub inner: R,
}

impl<R> WithDecision<R> {
    pub fn new(decision: RoutingDecision, inner: R) -> Self {
        Self { decision, inner }
    }
}

impl<R: IntoResponse> IntoResponse for WithDecision<R> {
    fn into_response(self) -> Response {
        let mut response = self.inner.into_response();
        let headers = response.headers_mut();

        headers.insert(X_DB_ROLE, HeaderValue::from_static(self.decision.role.as_str()));
        if let Ok(host) = HeaderValue::from_str(&self.decision.host) {
            headers.insert(X_DB_HOST, host);
        }
        if let Ok(latency) = HeaderValue::from_str(&format!("{:.2}", self.decision.latency_ms)) {
            headers.insert(X_DB_LATENCY_MS, latency);
        }

        response
    }
}

/// Errors returned by the data-access handlers.
#[derive(Debug)]
pub enum ApiError {
    Route(RouteError),
    NotFound(&'static str),
    BadRequest(String),
    /// Rows came back in a shape the handler could not decode.
    Decode(sqlx::Error),
}

impl From<RouteError> for ApiError {
    fn from(err: RouteError) -> Self {
        ApiError::Route(err)
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::Decode(err)
    }
}

/// HTTP status for a routing error.
pub fn route_error_status(err: &RouteError) -> StatusCode {
    match err {
        RouteError::PrimaryUnavailable { .. } | RouteError::NoPoolAvailable { .. } => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        RouteError::QueryFailed { source, .. } => match source.code().map(|c| c.get(..2)) {
            Some(Some("23")) => StatusCode::CONFLICT,
            Some(Some("22")) | Some(Some("42")) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        },
        RouteError::Cancelled => StatusCode::REQUEST_TIMEOUT,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::Route(err) => {
                let status = route_error_status(err);
                let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
                    tracing::error!(error = %err, "Query failed");
                    "query failed".to_string()
                } else {
                    tracing::warn!(error = %err, status = %status, "Routed query rejected");
                    err.to_string()
                };
                let code = match err {
                    RouteError::QueryFailed { source, .. } => source.code().map(str::to_string),
                    _ => None,
                };
                (status, json!({ "error": message, "code": code }))
            }
            ApiError::NotFound(what) => (StatusCode::NOT_FOUND, json!({ "error": format!("{what} not found") })),
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, json!({ "error": message })),
            ApiError::Decode(err) => {
                tracing::error!(error = %err, "Failed to decode result rows");
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": "unexpected result shape" }))
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{BackendError, Role};

    fn query_failed(code: &str) -> RouteError {
        RouteError::QueryFailed {
            role: Role::Primary,
            source: BackendError::Query {
                code: Some(code.into()),
                message: "rejected".into(),
            },
        }
    }

    #[test]
    fn test_status_by_sqlstate_class() {
        assert_eq!(route_error_status(&query_failed("23505")), StatusCode::CONFLICT);
        assert_eq!(route_error_status(&query_failed("22P02")), StatusCode::BAD_REQUEST);
        assert_eq!(route_error_status(&query_failed("42601")), StatusCode::BAD_REQUEST);
        assert_eq!(route_error_status(&query_failed("XX000")), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_unavailable_is_503() {
        assert_eq!(
            route_error_status(&RouteError::PrimaryUnavailable { cause: None }),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            route_error_status(&RouteError::NoPoolAvailable { cause: None }),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_decision_headers() {
        let decision = RoutingDecision {
            role: Role::Replica,
            host: "10.0.0.11".into(),
            port: 5432,
            latency_ms: 3.14159,
            attempts: 2,
            failed_over: true,
            served_at_ms: 0,
        };

        let response = WithDecision::new(decision, StatusCode::OK).into_response();

        assert_eq!(response.headers()[X_DB_ROLE], "replica");
        assert_eq!(response.headers()[X_DB_HOST], "10.0.0.11");
        assert_eq!(response.headers()[X_DB_LATENCY_MS], "3.14");
    }
}
