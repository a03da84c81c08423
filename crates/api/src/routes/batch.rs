//! Batch routes: all-or-nothing transaction groups and projections.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use crate::AppState;
use crate::response::{error_response_with, storage_error};
use medalbank_core::ledger::{BatchError, BatchOperation, LedgerError, MAX_BATCH_OPERATIONS};
use medalbank_db::LedgerRepository;
use medalbank_db::repositories::ledger::ApplyBatchInput;
use medalbank_shared::AppError;

use super::transactions::{parse_optional_number, parse_required_id};

/// Most repetitions a bulk deposit/withdraw request may ask for.
const MAX_BULK_COUNT: i64 = 20;

/// Balance under which the validate endpoint attaches a warning.
const LOW_BALANCE_WARNING: i64 = 100;

/// Creates the batch routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/batch/transactions", post(batch_transactions))
        .route("/api/batch/bulk-deposit", post(bulk_deposit))
        .route("/api/batch/bulk-withdraw", post(bulk_withdraw))
        .route("/api/batch/validate", get(validate_net_change))
}

// ============================================================================
// Request Types
// ============================================================================

/// Request body for a batch of operations.
#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    /// Target user.
    pub user_id: Option<i64>,
    /// Target store; omitted addresses the unscoped balance.
    pub store_id: Option<i64>,
    /// Operations in application order.
    pub transactions: Option<Vec<BatchOperationRequest>>,
    /// When set, only validate and project; nothing is written.
    #[serde(default)]
    pub validate_only: bool,
}

/// One requested batch operation.
#[derive(Debug, Deserialize)]
pub struct BatchOperationRequest {
    /// "deposit" or "withdraw".
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Amount in medals.
    pub amount: Option<i64>,
    /// Optional free-text description.
    pub description: Option<String>,
}

impl From<BatchOperationRequest> for BatchOperation {
    fn from(request: BatchOperationRequest) -> Self {
        // Missing fields become invalid entries so validation can report
        // them by index instead of rejecting the whole body shape.
        Self {
            kind: request.kind.unwrap_or_default(),
            amount: request.amount.unwrap_or(0),
            description: request.description,
        }
    }
}

/// Request body for bulk deposit/withdraw shortcuts.
#[derive(Debug, Deserialize)]
pub struct BulkRequest {
    /// Target user.
    pub user_id: Option<i64>,
    /// Target store; omitted addresses the unscoped balance.
    pub store_id: Option<i64>,
    /// Amount per repetition.
    pub amount: Option<i64>,
    /// Number of repetitions (1-20).
    pub count: Option<i64>,
    /// Optional shared description.
    pub description: Option<String>,
}

/// Query parameters for the net-change projection endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateQuery {
    /// Target user (required).
    pub user_id: Option<String>,
    /// Target store; omitted addresses the unscoped balance.
    pub store_id: Option<i64>,
    /// Net change to project.
    pub net_change: Option<String>,
}

// ============================================================================
// Route Handlers
// ============================================================================

/// POST `/api/batch/transactions` - Apply or validate an ordered batch.
async fn batch_transactions(
    State(state): State<AppState>,
    Json(payload): Json<BatchRequest>,
) -> impl IntoResponse {
    let (Some(user_id), Some(requests)) = (payload.user_id, payload.transactions) else {
        return error_response_with(
            &AppError::Validation("required information is missing".to_string()),
            json!({ "required": ["user_id", "transactions (array)"] }),
        );
    };

    let operations: Vec<BatchOperation> = requests.into_iter().map(Into::into).collect();
    let ledger = LedgerRepository::new((*state.db).clone());

    if payload.validate_only {
        return match ledger
            .validate_batch(user_id, payload.store_id, &operations)
            .await
        {
            Ok(projection) => (
                StatusCode::OK,
                Json(json!({
                    "message": "Batch validation completed",
                    "user_id": user_id,
                    "transaction_count": projection.operation_count,
                    "balance_before": projection.balance_before,
                    "balance_after": projection.balance_after,
                    "total_net_change": projection.net_change,
                    "validation_status": "ok",
                    "note": "no operations were applied",
                })),
            )
                .into_response(),
            Err(e) => batch_error_response(&state, user_id, &e),
        };
    }

    let input = ApplyBatchInput {
        user_id,
        store_id: payload.store_id,
        operations,
    };

    match ledger.apply_batch(&input).await {
        Ok(outcome) => {
            info!(
                user_id,
                processed = outcome.entries.len(),
                net_change = outcome.net_change,
                "Batch applied"
            );

            let transaction_ids: Vec<i64> =
                outcome.entries.iter().map(|e| e.transaction_id).collect();
            let summary: Vec<serde_json::Value> = outcome
                .entries
                .iter()
                .map(|e| {
                    json!({
                        "id": e.transaction_id,
                        "type": e.kind.as_str(),
                        "amount": e.amount,
                        "balance_after": e.balance_after,
                    })
                })
                .collect();

            (
                StatusCode::OK,
                Json(json!({
                    "user_id": user_id,
                    "processed_count": outcome.entries.len(),
                    "balance_before": outcome.balance_before,
                    "balance_after": outcome.balance_after,
                    "total_net_change": outcome.net_change,
                    "transaction_ids": transaction_ids,
                    "transactions_summary": summary,
                    "message": "Batch processing completed",
                })),
            )
                .into_response()
        }
        Err(e) => batch_error_response(&state, user_id, &e),
    }
}

/// POST `/api/batch/bulk-deposit` - Repeat one deposit `count` times.
async fn bulk_deposit(
    State(state): State<AppState>,
    Json(payload): Json<BulkRequest>,
) -> impl IntoResponse {
    bulk_apply(state, payload, "deposit", "Bulk deposit").await
}

/// POST `/api/batch/bulk-withdraw` - Repeat one withdrawal `count` times.
async fn bulk_withdraw(
    State(state): State<AppState>,
    Json(payload): Json<BulkRequest>,
) -> impl IntoResponse {
    bulk_apply(state, payload, "withdraw", "Bulk withdrawal").await
}

async fn bulk_apply(
    state: AppState,
    payload: BulkRequest,
    kind: &str,
    label: &str,
) -> Response {
    let (Some(user_id), Some(amount), Some(count)) =
        (payload.user_id, payload.amount, payload.count)
    else {
        return error_response_with(
            &AppError::Validation("required information is missing".to_string()),
            json!({ "required": ["user_id", "amount (> 0)", format!("count (1-{MAX_BULK_COUNT})")] }),
        );
    };

    if amount <= 0 || count <= 0 || count > MAX_BULK_COUNT {
        return error_response_with(
            &AppError::Validation("amount and count are out of range".to_string()),
            json!({
                "received": { "amount": amount, "count": count },
                "required": ["amount (> 0)", format!("count (1-{MAX_BULK_COUNT})")],
            }),
        );
    }

    #[allow(clippy::cast_sign_loss)]
    let operations: Vec<BatchOperation> = (0..count as usize)
        .map(|index| BatchOperation {
            kind: kind.to_string(),
            amount,
            description: Some(
                payload
                    .description
                    .clone()
                    .unwrap_or_else(|| format!("{label} {}/{count}", index + 1)),
            ),
        })
        .collect();

    let ledger = LedgerRepository::new((*state.db).clone());
    let input = ApplyBatchInput {
        user_id,
        store_id: payload.store_id,
        operations,
    };

    match ledger.apply_batch(&input).await {
        Ok(outcome) => {
            info!(user_id, count, kind, "Bulk operation applied");

            let transaction_ids: Vec<i64> =
                outcome.entries.iter().map(|e| e.transaction_id).collect();

            (
                StatusCode::OK,
                Json(json!({
                    "user_id": user_id,
                    "processed_count": outcome.entries.len(),
                    "balance_before": outcome.balance_before,
                    "balance_after": outcome.balance_after,
                    "total_net_change": outcome.net_change,
                    "transaction_ids": transaction_ids,
                    "message": format!("{label} completed"),
                })),
            )
                .into_response()
        }
        Err(e) => batch_error_response(&state, user_id, &e),
    }
}

/// GET `/api/batch/validate` - Project a net change against a balance.
async fn validate_net_change(
    State(state): State<AppState>,
    Query(query): Query<ValidateQuery>,
) -> impl IntoResponse {
    let user_id = match parse_required_id("userId", query.user_id.as_deref()) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let net_change = match parse_optional_number("netChange", query.net_change.as_deref(), 0) {
        Ok(value) => value,
        Err(response) => return response,
    };

    let ledger = LedgerRepository::new((*state.db).clone());
    let current = match ledger.target_amount(user_id, query.store_id).await {
        Ok(amount) => amount,
        Err(LedgerError::UserNotFound(_)) => {
            return error_response_with(
                &AppError::NotFound(format!("no balance record for user {user_id}")),
                json!({ "user_id": user_id }),
            );
        }
        Err(e) => {
            error!(error = %e, user_id, "Failed to read balance for validation");
            return storage_error(state.expose_errors, &e);
        }
    };

    let projected = current + net_change;
    let is_valid = projected >= 0;

    let mut body = json!({
        "user_id": user_id,
        "current_balance": current,
        "net_change": net_change,
        "projected_balance": projected,
        "is_valid": is_valid,
        "warning": serde_json::Value::Null,
        "message": if is_valid { "Validation passed" } else { "Validation failed" },
    });
    if let Some(object) = body.as_object_mut() {
        if projected < 0 {
            object.insert(
                "warning".to_string(),
                json!("insufficient balance for this change"),
            );
            object.insert("shortage".to_string(), json!(-projected));
        } else if projected < LOW_BALANCE_WARNING {
            object.insert(
                "warning".to_string(),
                json!(format!(
                    "resulting balance would fall below {LOW_BALANCE_WARNING} medals"
                )),
            );
        }
    }

    (StatusCode::OK, Json(body)).into_response()
}

fn batch_error_response(state: &AppState, user_id: i64, err: &BatchError) -> Response {
    match err {
        BatchError::Empty => error_response_with(
            &AppError::Validation("transactions must contain at least one operation".to_string()),
            json!({ "required": ["transactions (array)"] }),
        ),
        BatchError::TooManyOperations { count } => error_response_with(
            &AppError::Validation(format!(
                "at most {MAX_BATCH_OPERATIONS} operations can be processed at once"
            )),
            json!({ "received_count": count, "max_allowed": MAX_BATCH_OPERATIONS }),
        ),
        BatchError::Invalid { errors } => {
            let details: Vec<String> = errors
                .iter()
                .map(|e| format!("operation {}: {}", e.index + 1, e.message))
                .collect();
            error_response_with(
                &AppError::Validation("one or more operations are invalid".to_string()),
                json!({ "validation_errors": details }),
            )
        }
        BatchError::InsufficientBalance {
            current,
            net_change,
        } => error_response_with(
            &AppError::InsufficientBalance {
                current: *current,
                requested: -net_change,
            },
            json!({
                "current_balance": current,
                "total_net_change": net_change,
                "would_result_in": current + net_change,
                "shortage": -(current + net_change),
            }),
        ),
        BatchError::UserNotFound(id) => error_response_with(
            &AppError::NotFound(format!("no balance record for user {id}")),
            json!({ "user_id": id }),
        ),
        BatchError::ConcurrentModification => error_response_with(
            &AppError::Conflict("the balance changed concurrently, please retry".to_string()),
            json!({}),
        ),
        BatchError::Database(e) => {
            error!(error = %e, user_id, "Batch processing failed");
            storage_error(state.expose_errors, e)
        }
    }
}
