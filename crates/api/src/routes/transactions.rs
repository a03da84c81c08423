//! Transaction routes: filtered history and single ledger mutations.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info};

use crate::AppState;
use crate::response::{error_response_with, storage_error};
use medalbank_core::ledger::{
    LedgerError, MAX_TRANSACTION_AMOUNT, TransactionKind,
};
use medalbank_core::stats;
use medalbank_db::entities::transactions;
use medalbank_db::repositories::ledger::ApplyTransactionInput;
use medalbank_db::repositories::{HistoryRepository, LedgerRepository, TransactionFilter};
use medalbank_shared::AppError;
use medalbank_shared::types::{Pagination, pagination::MAX_PAGE_SIZE};

/// Longest accepted free-text description.
const MAX_DESCRIPTION_LENGTH: usize = 255;

/// Creates the transaction routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/transactions", get(list_transactions))
        .route("/api/transactions", post(create_transaction))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query parameters for listing transactions.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTransactionsQuery {
    /// Target user (required).
    pub user_id: Option<String>,
    /// Filter by store.
    pub store_id: Option<i64>,
    /// Filter by transaction type.
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Filter by date range start (YYYY-MM-DD, inclusive).
    pub date_from: Option<String>,
    /// Filter by date range end (YYYY-MM-DD, inclusive).
    pub date_to: Option<String>,
    /// Page size (default 10, max 100).
    pub limit: Option<String>,
    /// Rows to skip.
    pub offset: Option<String>,
    /// Attach totals over the whole filtered set.
    pub include_stats: Option<bool>,
}

/// Request body for applying one ledger mutation.
#[derive(Debug, Deserialize)]
pub struct CreateTransactionRequest {
    /// Target user.
    pub user_id: Option<i64>,
    /// Target store; omitted addresses the unscoped balance.
    pub store_id: Option<i64>,
    /// "deposit" or "withdraw".
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Amount in medals.
    pub amount: Option<i64>,
    /// Optional free-text description.
    pub description: Option<String>,
}

/// One transaction row in API responses.
#[derive(Debug, Serialize)]
pub struct TransactionView {
    /// Transaction id.
    pub id: i64,
    /// Transaction type.
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// Store the transaction was scoped to, if any.
    pub store_id: Option<i64>,
    /// Amount in medals.
    pub amount: i64,
    /// Balance before the mutation.
    pub balance_before: i64,
    /// Balance after the mutation.
    pub balance_after: i64,
    /// Free-text description.
    pub description: Option<String>,
    /// Creation timestamp.
    pub created_at: String,
}

impl From<transactions::Model> for TransactionView {
    fn from(model: transactions::Model) -> Self {
        let kind = TransactionKind::from(model.kind.clone());
        Self {
            id: model.id,
            kind: kind.as_str(),
            store_id: model.store_id,
            amount: model.amount,
            balance_before: model.balance_before,
            balance_after: model.balance_after,
            description: model.description,
            created_at: model.created_at.to_rfc3339(),
        }
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET `/api/transactions` - Filtered transaction history, newest first.
async fn list_transactions(
    State(state): State<AppState>,
    Query(query): Query<ListTransactionsQuery>,
) -> impl IntoResponse {
    let user_id = match parse_required_id("userId", query.user_id.as_deref()) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let limit = match parse_optional_number("limit", query.limit.as_deref(), 10) {
        Ok(value) => value,
        Err(response) => return response,
    };
    if limit < 1 || limit > i64::try_from(MAX_PAGE_SIZE).unwrap_or(100) {
        return error_response_with(
            &AppError::Validation(format!("limit must be between 1 and {MAX_PAGE_SIZE}")),
            json!({ "received": limit }),
        );
    }

    let offset = match parse_optional_number("offset", query.offset.as_deref(), 0) {
        Ok(value) => value,
        Err(response) => return response,
    };
    if offset < 0 {
        return error_response_with(
            &AppError::Validation("offset must not be negative".to_string()),
            json!({ "received": offset }),
        );
    }

    let kind = match query.kind.as_deref() {
        None => None,
        Some(raw) => match TransactionKind::parse(raw) {
            Some(kind) => Some(kind),
            None => {
                return error_response_with(
                    &AppError::Validation("type must be \"deposit\" or \"withdraw\"".to_string()),
                    json!({ "received": raw, "valid_types": ["deposit", "withdraw"] }),
                );
            }
        },
    };

    let date_from = match parse_date("dateFrom", query.date_from.as_deref()) {
        Ok(value) => value,
        Err(response) => return response,
    };
    let date_to = match parse_date("dateTo", query.date_to.as_deref()) {
        Ok(value) => value,
        Err(response) => return response,
    };
    if let (Some(from), Some(to)) = (date_from, date_to)
        && from > to
    {
        return error_response_with(
            &AppError::Validation("dateFrom must not be after dateTo".to_string()),
            json!({ "dateFrom": from.to_string(), "dateTo": to.to_string() }),
        );
    }

    let filter = TransactionFilter {
        store_id: query.store_id,
        kind,
        date_from,
        date_to,
    };

    let history = HistoryRepository::new((*state.db).clone());

    #[allow(clippy::cast_sign_loss)]
    let page = Pagination::new(limit as u64, offset as u64);
    let (rows, total) = match history.list(user_id, &filter, page).await {
        Ok(result) => result,
        Err(e) => {
            error!(error = %e, user_id, "Failed to list transactions");
            return storage_error(state.expose_errors, &e);
        }
    };

    let items: Vec<TransactionView> = rows.into_iter().map(TransactionView::from).collect();
    let count = items.len();

    let mut body = json!({
        "user_id": user_id,
        "transactions": items,
        "count": count,
        "total_count": total,
        "limit": limit,
        "offset": offset,
        "message": "Transaction history retrieved successfully",
    });

    if query.include_stats == Some(true) {
        let all = match history.list_all(user_id, &filter).await {
            Ok(rows) => rows,
            Err(e) => {
                error!(error = %e, user_id, "Failed to compute history stats");
                return storage_error(state.expose_errors, &e);
            }
        };
        let records: Vec<stats::TransactionRecord> = all.iter().map(to_record).collect();
        if let Some(object) = body.as_object_mut() {
            object.insert("stats".to_string(), json!(stats::totals(&records)));
        }
    }

    (StatusCode::OK, Json(body)).into_response()
}

/// POST `/api/transactions` - Apply one deposit or withdrawal.
async fn create_transaction(
    State(state): State<AppState>,
    Json(payload): Json<CreateTransactionRequest>,
) -> impl IntoResponse {
    let (Some(user_id), Some(raw_kind), Some(amount)) =
        (payload.user_id, payload.kind.as_deref(), payload.amount)
    else {
        return error_response_with(
            &AppError::Validation("required information is missing".to_string()),
            json!({ "required": ["user_id", "type", "amount"] }),
        );
    };

    let Some(kind) = TransactionKind::parse(raw_kind) else {
        return error_response_with(
            &AppError::Validation("type must be \"deposit\" or \"withdraw\"".to_string()),
            json!({ "received": raw_kind, "valid_types": ["deposit", "withdraw"] }),
        );
    };

    if amount <= 0 {
        return error_response_with(
            &AppError::Validation("amount must be at least 1".to_string()),
            json!({ "received": amount, "min": 1 }),
        );
    }
    if amount > MAX_TRANSACTION_AMOUNT {
        return error_response_with(
            &AppError::Validation("amount exceeds the per-transaction maximum".to_string()),
            json!({ "received": amount, "max": MAX_TRANSACTION_AMOUNT }),
        );
    }

    if let Some(description) = payload.description.as_deref()
        && description.len() > MAX_DESCRIPTION_LENGTH
    {
        return error_response_with(
            &AppError::Validation("description is too long".to_string()),
            json!({
                "received_length": description.len(),
                "max_length": MAX_DESCRIPTION_LENGTH
            }),
        );
    }

    let ledger = LedgerRepository::new((*state.db).clone());
    let input = ApplyTransactionInput {
        user_id,
        store_id: payload.store_id,
        kind,
        amount,
        description: payload.description.clone(),
    };

    match ledger.apply_transaction(&input).await {
        Ok(applied) => {
            info!(
                user_id,
                transaction_id = applied.transaction_id,
                kind = %kind,
                amount,
                "Transaction applied"
            );

            let message = match kind {
                TransactionKind::Deposit => "Deposit completed",
                TransactionKind::Withdraw => "Withdrawal completed",
            };

            (
                StatusCode::OK,
                Json(json!({
                    "transaction_id": applied.transaction_id,
                    "user_id": user_id,
                    "store_id": payload.store_id,
                    "type": kind.as_str(),
                    "amount": amount,
                    "balance_before": applied.balance_before,
                    "balance_after": applied.balance_after,
                    "description": payload.description.unwrap_or_default(),
                    "message": message,
                })),
            )
                .into_response()
        }
        Err(e) => ledger_error_response(&state, user_id, &e),
    }
}

fn ledger_error_response(state: &AppState, user_id: i64, err: &LedgerError) -> Response {
    match err {
        LedgerError::InvalidAmount { amount } => error_response_with(
            &AppError::Validation("amount must be at least 1".to_string()),
            json!({ "received": amount }),
        ),
        LedgerError::InsufficientBalance { current, requested } => error_response_with(
            &AppError::InsufficientBalance {
                current: *current,
                requested: *requested,
            },
            json!({
                "current_balance": current,
                "requested_amount": requested,
                "shortage": requested - current,
            }),
        ),
        LedgerError::UserNotFound(id) => error_response_with(
            &AppError::NotFound(format!("no balance record for user {id}")),
            json!({
                "user_id": id,
                "hint": "only seeded users exist; run the seeder binary first"
            }),
        ),
        LedgerError::ConcurrentModification => error_response_with(
            &AppError::Conflict("the balance changed concurrently, please retry".to_string()),
            json!({}),
        ),
        LedgerError::Database(e) => {
            error!(error = %e, user_id, "Failed to apply transaction");
            storage_error(state.expose_errors, e)
        }
    }
}

fn to_record(model: &transactions::Model) -> stats::TransactionRecord {
    stats::TransactionRecord {
        kind: model.kind.clone().into(),
        amount: model.amount,
        created_at: model.created_at.with_timezone(&chrono::Utc),
    }
}

// ============================================================================
// Parameter parsing helpers
// ============================================================================

pub(crate) fn parse_required_id(name: &str, raw: Option<&str>) -> Result<i64, Response> {
    let Some(raw) = raw else {
        return Err(error_response_with(
            &AppError::Validation(format!("{name} is required")),
            json!({ "hint": format!("pass {name} as a query parameter, e.g. ?{name}=1") }),
        ));
    };

    match raw.parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(error_response_with(
            &AppError::Validation(format!("{name} must be a positive integer")),
            json!({ "received": raw }),
        )),
    }
}

pub(crate) fn parse_optional_number(
    name: &str,
    raw: Option<&str>,
    default: i64,
) -> Result<i64, Response> {
    match raw {
        None => Ok(default),
        Some(raw) => raw.parse::<i64>().map_err(|_| {
            error_response_with(
                &AppError::Validation(format!("{name} must be a number")),
                json!({ "received": raw }),
            )
        }),
    }
}

pub(crate) fn parse_date(name: &str, raw: Option<&str>) -> Result<Option<NaiveDate>, Response> {
    match raw {
        None => Ok(None),
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| {
                error_response_with(
                    &AppError::Validation(format!("{name} must be a valid YYYY-MM-DD date")),
                    json!({ "received": raw, "example": "2024-01-01" }),
                )
            }),
    }
}
