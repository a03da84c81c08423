//! Store routes: CRUD with delete-protection and per-store statistics.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info};

use crate::AppState;
use crate::response::{error_response_with, storage_error};
use medalbank_core::ledger::TransactionKind;
use medalbank_db::StoreRepository;
use medalbank_db::repositories::store::{
    CreateStoreInput, StoreError, StoreWithTotals, UpdateStoreInput,
};
use medalbank_shared::AppError;

/// Creates the store routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/stores", get(list_stores))
        .route("/api/stores", post(create_store))
        .route("/api/stores/{id}", get(get_store))
        .route("/api/stores/{id}", put(update_store))
        .route("/api/stores/{id}", delete(delete_store))
        .route("/api/stores/{id}/stats", get(store_stats))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for creating a store.
#[derive(Debug, Deserialize)]
pub struct CreateStoreRequest {
    /// Store name (unique).
    pub name: Option<String>,
    /// Optional description.
    pub description: Option<String>,
    /// Optional display color.
    pub color: Option<String>,
    /// Whether to fan out zero balance rows for every existing user.
    #[serde(default, rename = "createBalanceForAllUsers")]
    pub create_balance_for_all_users: bool,
}

/// Request body for updating a store.
#[derive(Debug, Deserialize)]
pub struct UpdateStoreRequest {
    /// New store name (unique).
    pub name: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New display color; omitted keeps the current one.
    pub color: Option<String>,
}

/// Query parameters for store deletion.
#[derive(Debug, Deserialize)]
pub struct DeleteStoreQuery {
    /// Cascade deletion to dependent balance/transaction rows.
    #[serde(default, rename = "forceDelete")]
    pub force_delete: bool,
}

/// A store in API responses.
#[derive(Debug, Serialize)]
pub struct StoreView {
    /// Store id.
    pub id: i64,
    /// Store name.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Display color.
    pub color: String,
    /// Creation timestamp.
    pub created_at: String,
    /// Last update timestamp.
    pub updated_at: String,
    /// Distinct users holding a balance row for the store.
    pub user_count: u64,
    /// Sum of the store's balance rows.
    pub total_balance: i64,
}

impl From<StoreWithTotals> for StoreView {
    fn from(value: StoreWithTotals) -> Self {
        Self {
            id: value.store.id,
            name: value.store.name,
            description: value.store.description,
            color: value.store.color,
            created_at: value.store.created_at.to_rfc3339(),
            updated_at: value.store.updated_at.to_rfc3339(),
            user_count: value.user_count,
            total_balance: value.total_balance,
        }
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET `/api/stores` - All stores with usage figures, oldest first.
async fn list_stores(State(state): State<AppState>) -> impl IntoResponse {
    let repo = StoreRepository::new((*state.db).clone());

    match repo.list().await {
        Ok(stores) => {
            let items: Vec<StoreView> = stores.into_iter().map(StoreView::from).collect();
            let count = items.len();

            (
                StatusCode::OK,
                Json(json!({
                    "stores": items,
                    "count": count,
                    "message": "Stores retrieved successfully",
                })),
            )
                .into_response()
        }
        Err(e) => {
            error!(error = %e, "Failed to list stores");
            storage_error(state.expose_errors, &e)
        }
    }
}

/// GET `/api/stores/{id}` - One store with usage figures.
async fn get_store(State(state): State<AppState>, Path(id): Path<i64>) -> impl IntoResponse {
    let repo = StoreRepository::new((*state.db).clone());

    match repo.get(id).await {
        Ok(store) => (
            StatusCode::OK,
            Json(json!({
                "store": StoreView::from(store),
                "message": "Store retrieved successfully",
            })),
        )
            .into_response(),
        Err(e) => store_error_response(&state, id, &e),
    }
}

/// POST `/api/stores` - Create a store.
async fn create_store(
    State(state): State<AppState>,
    Json(payload): Json<CreateStoreRequest>,
) -> impl IntoResponse {
    let Some(name) = normalized_name(payload.name.as_deref()) else {
        return missing_name(&payload.name);
    };

    let repo = StoreRepository::new((*state.db).clone());
    let fan_out = payload.create_balance_for_all_users;

    let input = CreateStoreInput {
        name,
        description: payload.description,
        color: payload.color,
        create_balance_for_all_users: fan_out,
    };

    match repo.create(input).await {
        Ok(store) => {
            info!(store_id = store.store.id, "Store created via API");

            let view = StoreView::from(store);
            let message = if fan_out {
                format!(
                    "Store \"{}\" created (balance rows added for all users)",
                    view.name
                )
            } else {
                format!("Store \"{}\" created", view.name)
            };

            (
                StatusCode::OK,
                Json(json!({
                    "store": view,
                    "created_balance_records": fan_out,
                    "message": message,
                })),
            )
                .into_response()
        }
        Err(e) => store_error_response(&state, 0, &e),
    }
}

/// PUT `/api/stores/{id}` - Update a store.
async fn update_store(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateStoreRequest>,
) -> impl IntoResponse {
    let Some(name) = normalized_name(payload.name.as_deref()) else {
        return missing_name(&payload.name);
    };

    let repo = StoreRepository::new((*state.db).clone());
    let input = UpdateStoreInput {
        name,
        description: payload.description,
        color: payload.color,
    };

    match repo.update(id, input).await {
        Ok(store) => {
            info!(store_id = id, "Store updated");

            let view = StoreView::from(store);
            let message = format!("Store \"{}\" updated", view.name);

            (
                StatusCode::OK,
                Json(json!({ "store": view, "message": message })),
            )
                .into_response()
        }
        Err(e) => store_error_response(&state, id, &e),
    }
}

/// DELETE `/api/stores/{id}` - Delete a store, optionally cascading.
async fn delete_store(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<DeleteStoreQuery>,
) -> impl IntoResponse {
    let repo = StoreRepository::new((*state.db).clone());

    match repo.delete(id, query.force_delete).await {
        Ok(deleted) => {
            info!(store_id = id, force = deleted.force_deleted, "Store deleted via API");

            let deleted_data = if deleted.force_deleted {
                json!({
                    "balance_records": deleted.deleted_balance_records,
                    "transactions": deleted.deleted_transactions,
                })
            } else {
                serde_json::Value::Null
            };
            let message = if deleted.force_deleted {
                format!("Store \"{}\" deleted (related data removed)", deleted.name)
            } else {
                format!("Store \"{}\" deleted", deleted.name)
            };

            (
                StatusCode::OK,
                Json(json!({
                    "deleted_store": { "id": deleted.id, "name": deleted.name },
                    "force_deleted": deleted.force_deleted,
                    "deleted_data": deleted_data,
                    "message": message,
                })),
            )
                .into_response()
        }
        Err(e) => store_error_response(&state, id, &e),
    }
}

/// GET `/api/stores/{id}/stats` - Per-store totals and recent activity.
async fn store_stats(State(state): State<AppState>, Path(id): Path<i64>) -> impl IntoResponse {
    let repo = StoreRepository::new((*state.db).clone());

    match repo.stats(id).await {
        Ok(stats) => {
            let recent: Vec<serde_json::Value> = stats
                .recent_transactions
                .iter()
                .map(|(tx, username)| {
                    let kind = TransactionKind::from(tx.kind.clone());
                    json!({
                        "id": tx.id,
                        "type": kind.as_str(),
                        "amount": tx.amount,
                        "balance_before": tx.balance_before,
                        "balance_after": tx.balance_after,
                        "description": tx.description,
                        "created_at": tx.created_at.to_rfc3339(),
                        "username": username,
                    })
                })
                .collect();

            (
                StatusCode::OK,
                Json(json!({
                    "store_id": id,
                    "user_count": stats.user_count,
                    "total_balance": stats.total_balance,
                    "transaction_count": stats.transaction_count,
                    "total_deposits": stats.total_deposits,
                    "total_withdrawals": stats.total_withdrawals,
                    "recent_transactions": recent,
                    "message": "Store statistics retrieved successfully",
                })),
            )
                .into_response()
        }
        Err(e) => store_error_response(&state, id, &e),
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn normalized_name(raw: Option<&str>) -> Option<String> {
    let name = raw?.trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

fn missing_name(received: &Option<String>) -> Response {
    error_response_with(
        &AppError::Validation("store name is required".to_string()),
        json!({ "required": ["name"], "received": received }),
    )
}

fn store_error_response(state: &AppState, store_id: i64, err: &StoreError) -> Response {
    match err {
        StoreError::NotFound(id) => error_response_with(
            &AppError::NotFound(format!("store {id}")),
            json!({ "store_id": id }),
        ),
        StoreError::DuplicateName(name) => error_response_with(
            &AppError::Conflict("this store name is already in use".to_string()),
            json!({
                "existing_store_name": name,
                "hint": "choose a different store name"
            }),
        ),
        StoreError::HasRelatedData {
            balance_records,
            transactions,
            total_balance,
        } => error_response_with(
            &AppError::Conflict(
                "this store still has related data and cannot be deleted".to_string(),
            ),
            json!({
                "related_data": {
                    "balance_records": balance_records,
                    "transactions": transactions,
                    "total_balance": total_balance,
                },
                "hint": "pass forceDelete=true to delete related data as well",
                "warning": "a forced deletion cannot be undone",
            }),
        ),
        StoreError::Database(e) => {
            error!(error = %e, store_id, "Store operation failed");
            storage_error(state.expose_errors, e)
        }
    }
}
