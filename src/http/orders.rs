//! Order placement.
//!
//! Orders are writes and only ever reach the primary. There is no fallback:
//! a down primary answers 503 and the client retries later.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::http::response::{ApiError, WithDecision};
use crate::http::server::AppState;
use crate::routing::QueryIntent;

const INSERT_ORDER: &str = "INSERT INTO orders (product_id, quantity, customer_email) \
     VALUES ($1, $2, $3) \
     RETURNING id, product_id, quantity, customer_email, created_at::text AS created_at";

#[derive(Debug, Clone, Deserialize)]
pub struct NewOrder {
    pub product_id: i64,
    pub quantity: i32,
    pub customer_email: String,
}

impl NewOrder {
    fn validate(&self) -> Result<(), ApiError> {
        if self.quantity <= 0 {
            return Err(ApiError::BadRequest("quantity must be positive".into()));
        }
        if !self.customer_email.contains('@') {
            return Err(ApiError::BadRequest("customer_email is not a valid address".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Order {
    pub id: i64,
    pub product_id: i64,
    pub quantity: i32,
    pub customer_email: String,
    pub created_at: String,
}

pub async fn create_order(
    State(state): State<AppState>,
    Json(order): Json<NewOrder>,
) -> Result<Response, ApiError> {
    order.validate()?;

    let intent = QueryIntent::write(INSERT_ORDER)
        .returning()
        .bind(order.product_id)
        .bind(order.quantity)
        .bind(order.customer_email);

    let routed = state.router.route(&intent).await?;
    let created = routed
        .output
        .decode::<Order>()?
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::Decode(sqlx::Error::RowNotFound))?;

    tracing::info!(order_id = created.id, product_id = created.product_id, "Order placed");

    Ok(WithDecision::new(routed.decision, (StatusCode::CREATED, Json(created))).into_response())
}
