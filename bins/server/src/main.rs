//! MedalBank API Server
//!
//! Main entry point for the MedalBank backend service.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use medalbank_api::middleware::rate_limit::RateLimiter;
use medalbank_api::{AppState, create_router};
use medalbank_shared::{AppConfig, OpaqueTokenService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "medalbank=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = AppConfig::load().expect("Failed to load configuration");

    // Connect to database
    let db = medalbank_db::connect(&config.database).await?;
    info!("Connected to database");

    // Create the placeholder token service
    let tokens = OpaqueTokenService::new(
        config.auth.token_validity_hours,
        config.auth.extended_validity_days,
    );

    // Create the rate limiter
    let limiter = RateLimiter::from_config(&config.rate_limit);
    info!(
        max_requests = limiter.max_requests(),
        window_secs = limiter.window_secs(),
        "Rate limiter configured"
    );

    // Create application state
    let state = AppState {
        db: Arc::new(db),
        tokens: Arc::new(tokens),
        limiter: Arc::new(limiter),
        expose_errors: config.server.is_development(),
    };

    // Create router
    let app = create_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
