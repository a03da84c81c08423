//! Balance routes.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use crate::AppState;
use crate::response::{error_response_with, storage_error};
use medalbank_core::ledger::LedgerError;
use medalbank_db::{LedgerRepository, UserRepository};
use medalbank_shared::AppError;

/// Creates the balance routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/api/balance/{user_id}", get(get_balance))
}

/// Query parameters for the balance endpoint.
#[derive(Debug, Deserialize)]
pub struct BalanceQuery {
    /// Restrict the read to one store; omitted means the summed balance.
    #[serde(rename = "storeId")]
    pub store_id: Option<i64>,
}

/// GET `/api/balance/{user_id}` - Current balance for a user.
async fn get_balance(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<BalanceQuery>,
) -> impl IntoResponse {
    let Ok(user_id) = user_id.parse::<i64>() else {
        return invalid_user_id(&user_id);
    };
    if user_id <= 0 {
        return invalid_user_id(&user_id.to_string());
    }

    let user_repo = UserRepository::new((*state.db).clone());
    let user = match user_repo.find_by_id(user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            return error_response_with(
                &AppError::NotFound(format!("user {user_id}")),
                json!({
                    "user_id": user_id,
                    "hint": "only seeded users exist; run the seeder binary first"
                }),
            );
        }
        Err(e) => {
            error!(error = %e, user_id, "Failed to look up user");
            return storage_error(state.expose_errors, &e);
        }
    };

    let ledger = LedgerRepository::new((*state.db).clone());
    match ledger.read_balance(user_id, query.store_id).await {
        Ok(snapshot) => {
            info!(user_id, balance = snapshot.amount, "Balance read");

            let mut body = json!({
                "user_id": user.id,
                "username": user.username,
                "total_balance": snapshot.amount,
                "updated_at": snapshot.updated_at.map(|t| t.to_rfc3339()),
                "message": "Balance retrieved successfully",
            });
            if let Some(store_id) = query.store_id
                && let Some(object) = body.as_object_mut()
            {
                object.insert("store_id".to_string(), json!(store_id));
            }

            (StatusCode::OK, Json(body)).into_response()
        }
        Err(LedgerError::UserNotFound(_)) => error_response_with(
            &AppError::NotFound(format!("no balance record for user {user_id}")),
            json!({ "user_id": user_id }),
        ),
        Err(e) => {
            error!(error = %e, user_id, "Failed to read balance");
            storage_error(state.expose_errors, &e)
        }
    }
}

fn invalid_user_id(received: &str) -> axum::response::Response {
    error_response_with(
        &AppError::Validation("userId must be a positive integer".to_string()),
        json!({
            "userId": received,
            "hint": "specify the user id as a number greater than zero"
        }),
    )
}
