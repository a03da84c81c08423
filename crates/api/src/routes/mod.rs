//! API route definitions.

use axum::Json;
use axum::http::{Method, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::Router;
use serde_json::json;

use crate::AppState;

pub mod auth;
pub mod balance;
pub mod batch;
pub mod health;
pub mod stats;
pub mod stores;
pub mod transactions;

/// Creates the API router with all routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(auth::routes())
        .merge(balance::routes())
        .merge(transactions::routes())
        .merge(batch::routes())
        .merge(stats::routes())
        .merge(stores::routes())
}

/// Fallback handler for unknown endpoints.
pub async fn unknown_endpoint(method: Method, uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "not_found",
            "message": "Endpoint not found",
            "path": uri.path(),
            "method": method.as_str(),
            "available_endpoints": [
                "GET /health",
                "GET /api/balance/{userId}",
                "GET /api/transactions",
                "POST /api/transactions",
                "POST /api/batch/transactions",
                "GET /api/stats/user/{userId}",
                "GET /api/stats/summary/{userId}",
                "GET /api/stats/trends/{userId}",
                "GET /api/stores",
                "POST /api/auth/login",
            ],
        })),
    )
}
