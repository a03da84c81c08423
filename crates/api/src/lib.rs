//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - REST API routes
//! - The sliding-window rate limiter middleware
//! - Response helpers for the shared error taxonomy

pub mod middleware;
pub mod response;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use sea_orm::DatabaseConnection;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use medalbank_shared::TokenService;
use middleware::rate_limit::{RateLimiter, rate_limit_middleware};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: Arc<DatabaseConnection>,
    /// Token service for the placeholder login flow.
    pub tokens: Arc<dyn TokenService>,
    /// Per-client request limiter.
    pub limiter: Arc<RateLimiter>,
    /// Whether 500 responses carry error details (development mode).
    pub expose_errors: bool,
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::api_routes())
        .fallback(routes::unknown_endpoint)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
