//! Statistics routes: per-period aggregates, dashboard summary, trends.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use crate::AppState;
use crate::response::{error_response_with, storage_error};
use medalbank_core::ledger::LedgerError;
use medalbank_core::stats::{self, StatsPeriod, TransactionRecord};
use medalbank_db::entities::transactions;
use medalbank_db::{HistoryRepository, LedgerRepository};
use medalbank_shared::AppError;

/// Longest trend window, in days.
const MAX_TREND_DAYS: i64 = 365;

/// Creates the statistics routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/stats/user/{user_id}", get(user_stats))
        .route("/api/stats/summary/{user_id}", get(summary))
        .route("/api/stats/trends/{user_id}", get(trends))
}

/// Query parameters for per-period statistics.
#[derive(Debug, Deserialize)]
pub struct UserStatsQuery {
    /// Aggregation period ("7d", "30d", "90d", "all"); default "30d".
    pub period: Option<String>,
}

/// Query parameters for trend analysis.
#[derive(Debug, Deserialize)]
pub struct TrendsQuery {
    /// Window length in days; default 30, capped at 365.
    pub days: Option<String>,
}

/// GET `/api/stats/user/{user_id}` - Per-period statistics.
async fn user_stats(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<UserStatsQuery>,
) -> impl IntoResponse {
    let user_id = match parse_user_id(&user_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let raw_period = query.period.as_deref().unwrap_or("30d");
    let Some(period) = StatsPeriod::parse(raw_period) else {
        return error_response_with(
            &AppError::Validation("period is not valid".to_string()),
            json!({ "received": raw_period, "valid_periods": ["7d", "30d", "90d", "all"] }),
        );
    };

    let since = period.days().map(|days| Utc::now() - Duration::days(days));

    let history = HistoryRepository::new((*state.db).clone());
    let rows = match history.fetch_since(user_id, since).await {
        Ok(rows) => rows,
        Err(e) => {
            error!(error = %e, user_id, "Failed to fetch statistics window");
            return storage_error(state.expose_errors, &e);
        }
    };

    let records: Vec<TransactionRecord> = rows.iter().map(to_record).collect();
    let report = stats::summarize(&records);

    let period_display = match period {
        StatsPeriod::All => "all time".to_string(),
        other => format!("last {} days", other.days().unwrap_or(0)),
    };

    let mut body = json!({
        "user_id": user_id,
        "period": period.as_str(),
        "period_display": period_display,
        "generated_at": Utc::now().to_rfc3339(),
        "message": "Statistics retrieved successfully",
    });
    if let (Some(object), serde_json::Value::Object(report)) = (body.as_object_mut(), json!(report))
    {
        for (key, value) in report {
            object.insert(key, value);
        }
    }

    (StatusCode::OK, Json(body)).into_response()
}

/// GET `/api/stats/summary/{user_id}` - Dashboard summary figures.
async fn summary(State(state): State<AppState>, Path(user_id): Path<String>) -> impl IntoResponse {
    let user_id = match parse_user_id(&user_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let ledger = LedgerRepository::new((*state.db).clone());
    let current_balance = match ledger.read_balance(user_id, None).await {
        Ok(snapshot) => snapshot.amount,
        Err(LedgerError::UserNotFound(_)) => {
            return error_response_with(
                &AppError::NotFound(format!("user {user_id}")),
                json!({ "user_id": user_id }),
            );
        }
        Err(e) => {
            error!(error = %e, user_id, "Failed to read balance for summary");
            return storage_error(state.expose_errors, &e);
        }
    };

    let history = HistoryRepository::new((*state.db).clone());

    let total_transactions = match history.count_for_user(user_id).await {
        Ok(count) => count,
        Err(e) => {
            error!(error = %e, user_id, "Failed to count transactions");
            return storage_error(state.expose_errors, &e);
        }
    };

    let week_rows = match history
        .fetch_since(user_id, Some(Utc::now() - Duration::days(7)))
        .await
    {
        Ok(rows) => rows,
        Err(e) => {
            error!(error = %e, user_id, "Failed to fetch weekly window");
            return storage_error(state.expose_errors, &e);
        }
    };

    let week_records: Vec<TransactionRecord> = week_rows.iter().map(to_record).collect();
    let week = stats::totals(&week_records);

    let today = Utc::now().date_naive();
    let today_transactions = week_records
        .iter()
        .filter(|r| r.created_at.date_naive() == today)
        .count();

    let last_transaction_time = match history.latest_for_user(user_id).await {
        Ok(latest) => latest.map(|t| t.created_at.to_rfc3339()),
        Err(e) => {
            error!(error = %e, user_id, "Failed to fetch latest transaction");
            return storage_error(state.expose_errors, &e);
        }
    };

    (
        StatusCode::OK,
        Json(json!({
            "user_id": user_id,
            "current_balance": current_balance,
            "total_transactions": total_transactions,
            "today_transactions": today_transactions,
            "week_deposits": week.total_deposits,
            "week_withdraws": week.total_withdraws,
            "week_net_change": week.net_change,
            "last_transaction_time": last_transaction_time,
            "is_active_today": today_transactions > 0,
            "message": "Summary retrieved successfully",
        })),
    )
        .into_response()
}

/// GET `/api/stats/trends/{user_id}` - Daily time-series analysis.
async fn trends(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<TrendsQuery>,
) -> impl IntoResponse {
    let user_id = match parse_user_id(&user_id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let days = query
        .days
        .as_deref()
        .and_then(|raw| raw.parse::<i64>().ok())
        .filter(|days| *days > 0)
        .unwrap_or(30)
        .min(MAX_TREND_DAYS);

    let history = HistoryRepository::new((*state.db).clone());
    let rows = match history
        .fetch_since(user_id, Some(Utc::now() - Duration::days(days)))
        .await
    {
        Ok(rows) => rows,
        Err(e) => {
            error!(error = %e, user_id, "Failed to fetch trend window");
            return storage_error(state.expose_errors, &e);
        }
    };

    let records: Vec<TransactionRecord> = rows.iter().map(to_record).collect();
    let report = stats::analyze_trend(&records);

    (
        StatusCode::OK,
        Json(json!({
            "user_id": user_id,
            "analysis_period": format!("{days} days"),
            "data_points": report.data_points,
            "daily_data": report.daily,
            "trend_analysis": {
                "overall_trend": report.overall_trend.as_str(),
                "avg_daily_net": report.avg_daily_net,
                "most_active_day": report.most_active_day,
            },
            "message": "Trend analysis completed",
        })),
    )
        .into_response()
}

fn parse_user_id(raw: &str) -> Result<i64, Response> {
    match raw.parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(error_response_with(
            &AppError::Validation("userId must be a positive integer".to_string()),
            json!({ "received": raw }),
        )),
    }
}

fn to_record(model: &transactions::Model) -> TransactionRecord {
    TransactionRecord {
        kind: model.kind.clone().into(),
        amount: model.amount,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
