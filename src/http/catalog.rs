//! Product catalogue endpoints.
//!
//! Reads go through the router and may be served by either role. When no
//! database is reachable the listing degrades to a built-in sample catalogue
//! so the storefront keeps rendering.

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::http::response::{ApiError, WithDecision};
use crate::http::server::AppState;
use crate::routing::QueryIntent;

const LIST_PRODUCTS: &str = "SELECT id, name, description, price::float8 AS price, stock \
     FROM products ORDER BY id";
const GET_PRODUCT: &str = "SELECT id, name, description, price::float8 AS price, stock \
     FROM products WHERE id = $1";

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub stock: i32,
}

#[derive(Debug, Serialize)]
pub struct ProductList {
    /// `"database"` or `"sample"`.
    pub source: &'static str,
    pub products: Vec<Product>,
}

/// Catalogue served while every database is down.
pub fn sample_products() -> Vec<Product> {
    let product = |id: i64, name: &str, description: &str, price: f64, stock: i32| Product {
        id,
        name: name.to_string(),
        description: Some(description.to_string()),
        price,
        stock,
    };

    vec![
        product(1, "Laptop", "14-inch ultrabook, 16GB RAM", 999.99, 25),
        product(2, "Smartphone", "6.1-inch display, 128GB storage", 699.99, 50),
        product(3, "Headphones", "Wireless noise-cancelling headphones", 199.99, 100),
        product(4, "Tablet", "10-inch tablet with stylus support", 449.99, 30),
        product(5, "Smartwatch", "Fitness tracking and notifications", 249.99, 75),
    ]
}

pub async fn list_products(State(state): State<AppState>) -> Result<Response, ApiError> {
    match state.router.route(&QueryIntent::read(LIST_PRODUCTS)).await {
        Ok(routed) => {
            let products = routed.output.decode::<Product>()?;
            let body = ProductList {
                source: "database",
                products,
            };
            Ok(WithDecision::new(routed.decision, Json(body)).into_response())
        }
        Err(err) if err.is_unavailable() => {
            tracing::warn!(error = %err, "No database reachable, serving sample catalogue");
            let body = ProductList {
                source: "sample",
                products: sample_products(),
            };
            Ok(Json(body).into_response())
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let routed = state.router.route(&QueryIntent::read(GET_PRODUCT).bind(id)).await?;

    let product = routed
        .output
        .decode::<Product>()?
        .into_iter()
        .next()
        .ok_or(ApiError::NotFound("product"))?;

    Ok(WithDecision::new(routed.decision, Json(product)).into_response())
}
