//! Sliding-window rate limiting keyed by client IP.
//!
//! The limiter is an explicit component injected through `AppState`, not a
//! module-level singleton. Each client owns a window of request instants;
//! expired instants are pruned on access, and idle clients are swept
//! periodically inline (the server runs no background tasks).

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use axum::Json;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use dashmap::DashMap;
use serde_json::json;
use tracing::warn;

use crate::AppState;
use medalbank_shared::config::RateLimitConfig;

/// Checks between inline sweeps of idle client entries.
const SWEEP_INTERVAL: u64 = 1024;

/// Sliding-window request limiter.
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    clients: DashMap<String, Vec<Instant>>,
    checks: AtomicU64,
}

impl RateLimiter {
    /// Creates a limiter allowing `max_requests` per client per `window`.
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            clients: DashMap::new(),
            checks: AtomicU64::new(0),
        }
    }

    /// Creates a limiter from configuration.
    #[must_use]
    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.max_requests, Duration::from_secs(config.window_secs))
    }

    /// Maximum requests per window.
    #[must_use]
    pub const fn max_requests(&self) -> usize {
        self.max_requests
    }

    /// Window length in seconds.
    #[must_use]
    pub const fn window_secs(&self) -> u64 {
        self.window.as_secs()
    }

    /// Records a request for `client` and decides whether it may proceed.
    ///
    /// # Errors
    ///
    /// Returns the seconds until the oldest recorded request leaves the
    /// window when the client is over its budget.
    pub fn check(&self, client: &str) -> Result<(), u64> {
        if self.checks.fetch_add(1, Ordering::Relaxed) % SWEEP_INTERVAL == SWEEP_INTERVAL - 1 {
            self.sweep();
        }

        let now = Instant::now();
        let mut entry = self.clients.entry(client.to_string()).or_default();
        entry.retain(|instant| now.duration_since(*instant) < self.window);

        if entry.len() >= self.max_requests {
            let oldest = entry[0];
            let retry_after = self
                .window
                .saturating_sub(now.duration_since(oldest))
                .as_secs()
                + 1;
            return Err(retry_after);
        }

        entry.push(now);
        Ok(())
    }

    /// Drops clients whose whole window has expired.
    fn sweep(&self) {
        let now = Instant::now();
        self.clients.retain(|_, instants| {
            instants
                .last()
                .is_some_and(|last| now.duration_since(*last) < self.window)
        });
    }

    /// Number of tracked clients (sweep bookkeeping).
    #[must_use]
    pub fn tracked_clients(&self) -> usize {
        self.clients.len()
    }
}

/// Middleware rejecting clients over their request budget with a 429.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or_else(|| "unknown".to_string(), |info| info.0.ip().to_string());

    match state.limiter.check(&client) {
        Ok(()) => next.run(request).await,
        Err(retry_after) => {
            warn!(client = %client, retry_after, "rate limit exceeded");
            (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({
                    "error": "rate_limited",
                    "message": "Rate limit exceeded",
                    "max_requests": state.limiter.max_requests(),
                    "window_secs": state.limiter.window_secs(),
                    "retry_after": retry_after,
                })),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows_up_to_limit() {
        let limiter = RateLimiter::new(5, Duration::from_secs(60));

        for _ in 0..5 {
            assert!(limiter.check("10.0.0.1").is_ok());
        }
        assert!(limiter.check("10.0.0.1").is_err());
    }

    #[test]
    fn test_clients_are_independent() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));

        assert!(limiter.check("10.0.0.1").is_ok());
        assert!(limiter.check("10.0.0.1").is_err());
        assert!(limiter.check("10.0.0.2").is_ok());
    }

    #[test]
    fn test_window_slides() {
        let limiter = RateLimiter::new(2, Duration::from_millis(50));

        assert!(limiter.check("10.0.0.1").is_ok());
        assert!(limiter.check("10.0.0.1").is_ok());
        assert!(limiter.check("10.0.0.1").is_err());

        std::thread::sleep(Duration::from_millis(60));
        assert!(limiter.check("10.0.0.1").is_ok());
    }

    #[test]
    fn test_retry_after_is_positive() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        limiter.check("10.0.0.1").unwrap();

        let retry_after = limiter.check("10.0.0.1").unwrap_err();
        assert!(retry_after >= 1);
    }

    #[test]
    fn test_sweep_drops_idle_clients() {
        let limiter = RateLimiter::new(5, Duration::from_millis(10));
        limiter.check("10.0.0.1").unwrap();
        assert_eq!(limiter.tracked_clients(), 1);

        std::thread::sleep(Duration::from_millis(20));
        limiter.sweep();
        assert_eq!(limiter.tracked_clients(), 0);
    }

    #[test]
    fn test_from_config() {
        let limiter = RateLimiter::from_config(&RateLimitConfig::default());
        assert_eq!(limiter.max_requests(), 100);
        assert_eq!(limiter.window_secs(), 60);
    }
}
