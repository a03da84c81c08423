//! Authentication routes for the placeholder login flow.
//!
//! Login matches a username against the users table; there is no password
//! and no server-side session state. Tokens come from the injected
//! `TokenService`, so a real scheme can replace the placeholder without
//! touching these handlers. Logout is a client-side no-op.

use axum::extract::{Path, Query, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::AppState;
use crate::response::{error_response_with, storage_error};
use medalbank_db::UserRepository;
use medalbank_db::entities::users;
use medalbank_shared::{AppError, TokenError};

/// Most login-history rows one request may fetch.
const MAX_HISTORY_LIMIT: u64 = 50;

/// Creates the auth router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/me", get(me))
        .route("/api/auth/login-history/{user_id}", get(login_history))
}

// ============================================================================
// Request Types
// ============================================================================

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Username to log in as.
    pub username: Option<String>,
    /// Optional device identifier recorded in the login history.
    pub device_info: Option<String>,
    /// Request the extended validity window.
    #[serde(default)]
    pub remember_me: bool,
}

/// Query parameters for the login-history listing.
#[derive(Debug, Deserialize)]
pub struct LoginHistoryQuery {
    /// Rows to fetch (default 10, capped at 50).
    pub limit: Option<u64>,
}

// ============================================================================
// Route Handlers
// ============================================================================

/// POST `/api/auth/login` - Username-only login with token issuance.
async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> impl IntoResponse {
    let Some(username) = payload
        .username
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
    else {
        return error_response_with(
            &AppError::Validation("username is required".to_string()),
            json!({ "hint": "the seeded \"testuser\" account can log in" }),
        );
    };

    let user_repo = UserRepository::new((*state.db).clone());
    let user = match user_repo.find_by_username(username).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            info!(username, "Login attempt for unknown user");
            return error_response_with(
                &AppError::Unauthorized("user not found".to_string()),
                json!({
                    "username": username,
                    "hint": "the seeded \"testuser\" account can log in"
                }),
            );
        }
        Err(e) => {
            error!(error = %e, "Database error during login");
            return storage_error(state.expose_errors, &e);
        }
    };

    let issued = state.tokens.issue(user.id, payload.remember_me);
    let session_id = format!("session_{}_{}", user.id, Uuid::new_v4().simple());
    let ip_address = client_ip(&headers);

    let (login_count, last_login) = match user_repo.login_stats(user.id).await {
        Ok(stats) => stats,
        Err(e) => {
            warn!(error = %e, user_id = user.id, "Failed to read login stats");
            (0, None)
        }
    };

    // A failed history write must not block the login itself.
    if let Err(e) = user_repo
        .record_login(
            user.id,
            &session_id,
            payload.device_info.clone(),
            ip_address,
        )
        .await
    {
        warn!(error = %e, user_id = user.id, "Failed to record login history");
    }

    info!(user_id = user.id, username = %user.username, "User logged in");

    (
        StatusCode::OK,
        Json(json!({
            "message": "Login successful",
            "user": user_info(&user),
            "token": issued.token,
            "session_id": session_id,
            "expires_at": issued.expires_at.to_rfc3339(),
            "expires_in": issued.expires_in,
            "login_count": login_count + 1,
            "last_login": last_login.map(|t| t.to_rfc3339()),
            "login_time": chrono::Utc::now().to_rfc3339(),
            "device_info": payload.device_info.unwrap_or_else(|| "Unknown Device".to_string()),
        })),
    )
        .into_response()
}

/// POST `/api/auth/logout` - Client-side logout, nothing to revoke.
async fn logout() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "message": "Logout completed",
            "logout_time": chrono::Utc::now().to_rfc3339(),
        })),
    )
}

/// GET `/api/auth/me` - Verify the presented token and return user info.
async fn me(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let token = match bearer_token(&headers) {
        Ok(token) => token,
        Err(response) => return response,
    };

    let verified = match state.tokens.verify(token) {
        Ok(verified) => verified,
        Err(TokenError::Expired) => {
            return error_response_with(
                &AppError::Unauthorized("token has expired".to_string()),
                json!({ "hint": "log in again to get a fresh token" }),
            );
        }
        Err(TokenError::Malformed) => {
            return error_response_with(
                &AppError::Unauthorized("token format is not valid".to_string()),
                json!({}),
            );
        }
    };

    let user_repo = UserRepository::new((*state.db).clone());
    let user = match user_repo.find_by_id(verified.user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            return error_response_with(
                &AppError::Unauthorized("user not found".to_string()),
                json!({}),
            );
        }
        Err(e) => {
            error!(error = %e, "Database error during token check");
            return storage_error(state.expose_errors, &e);
        }
    };

    let (total_logins, last_login) = match user_repo.login_stats(user.id).await {
        Ok(stats) => stats,
        Err(e) => {
            warn!(error = %e, user_id = user.id, "Failed to read login stats");
            (0, None)
        }
    };

    (
        StatusCode::OK,
        Json(json!({
            "message": "Token valid",
            "user": user_info(&user),
            "token_status": "valid",
            "token_age_minutes": verified.age_minutes(),
            "remaining_minutes": verified.remaining_minutes(),
            "login_stats": {
                "total_logins": total_logins,
                "last_login": last_login.map(|t| t.to_rfc3339()),
            },
            "server_time": chrono::Utc::now().to_rfc3339(),
        })),
    )
        .into_response()
}

/// GET `/api/auth/login-history/{user_id}` - Login audit trail, newest first.
async fn login_history(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<LoginHistoryQuery>,
) -> impl IntoResponse {
    let Ok(user_id) = user_id.parse::<i64>() else {
        return error_response_with(
            &AppError::Validation("userId must be a positive integer".to_string()),
            json!({ "received": user_id }),
        );
    };
    if user_id <= 0 {
        return error_response_with(
            &AppError::Validation("userId must be a positive integer".to_string()),
            json!({ "received": user_id }),
        );
    }

    let limit = query.limit.unwrap_or(10).min(MAX_HISTORY_LIMIT);

    let user_repo = UserRepository::new((*state.db).clone());
    match user_repo.login_history(user_id, limit).await {
        Ok(rows) => {
            let history: Vec<serde_json::Value> = rows
                .iter()
                .map(|row| {
                    json!({
                        "id": row.id,
                        "session_id": row.session_id,
                        "device_info": row.device_info,
                        "ip_address": row.ip_address,
                        "created_at": row.created_at.to_rfc3339(),
                    })
                })
                .collect();
            let count = history.len();

            (
                StatusCode::OK,
                Json(json!({
                    "user_id": user_id,
                    "login_history": history,
                    "count": count,
                    "message": "Login history retrieved successfully",
                })),
            )
                .into_response()
        }
        Err(e) => {
            error!(error = %e, user_id, "Failed to fetch login history");
            storage_error(state.expose_errors, &e)
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn user_info(user: &users::Model) -> serde_json::Value {
    json!({
        "id": user.id,
        "username": user.username,
        "email": user.email,
    })
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, Response> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| {
            value
                .strip_prefix("Bearer ")
                .or_else(|| value.strip_prefix("bearer "))
        })
        .ok_or_else(|| {
            error_response_with(
                &AppError::Unauthorized("an authentication token is required".to_string()),
                json!({ "hint": "add an Authorization: Bearer <token> header" }),
            )
        })
}

fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_string())
}
