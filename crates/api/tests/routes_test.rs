//! Route-level tests driving the full router against in-memory SQLite.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use rstest::rstest;
use serde_json::{Value, json};
use tower::util::ServiceExt;

use medalbank_api::middleware::rate_limit::RateLimiter;
use medalbank_api::{AppState, create_router};
use medalbank_db::entities::{balances, users};
use medalbank_db::migration::{Migrator, MigratorTrait};
use medalbank_shared::OpaqueTokenService;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};

async fn test_db() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1);

    let db = Database::connect(options)
        .await
        .expect("failed to open in-memory database");
    Migrator::up(&db, None)
        .await
        .expect("failed to run migrations");
    db
}

async fn seed_user(db: &DatabaseConnection, username: &str, balance: i64) -> i64 {
    let now: sea_orm::prelude::DateTimeWithTimeZone = chrono::Utc::now().into();

    let user = users::ActiveModel {
        username: Set(username.to_string()),
        email: Set(format!("{username}@example.com")),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("failed to insert user");

    balances::ActiveModel {
        user_id: Set(user.id),
        store_id: Set(None),
        amount: Set(balance),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("failed to insert balance");

    user.id
}

fn app_with_limiter(db: DatabaseConnection, limiter: RateLimiter) -> Router {
    let state = AppState {
        db: Arc::new(db),
        tokens: Arc::new(OpaqueTokenService::default()),
        limiter: Arc::new(limiter),
        expose_errors: true,
    };
    create_router(state)
}

fn app(db: DatabaseConnection) -> Router {
    app_with_limiter(db, RateLimiter::new(10_000, Duration::from_secs(60)))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = match body {
        Some(value) => Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    (status, value)
}

#[tokio::test]
async fn test_health() {
    let app = app(test_db().await);

    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_unknown_endpoint_is_json_404() {
    let app = app(test_db().await);

    let (status, body) = send(&app, "GET", "/api/bogus", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn test_get_balance() {
    let db = test_db().await;
    let user_id = seed_user(&db, "testuser", 1000).await;
    let app = app(db);

    let (status, body) = send(&app, "GET", &format!("/api/balance/{user_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_balance"], 1000);
    assert_eq!(body["username"], "testuser");

    let (status, body) = send(&app, "GET", "/api/balance/999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, body) = send(&app, "GET", "/api/balance/abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn test_apply_transaction_round_trip() {
    let db = test_db().await;
    let user_id = seed_user(&db, "testuser", 1000).await;
    let app = app(db);

    let (status, body) = send(
        &app,
        "POST",
        "/api/transactions",
        Some(json!({ "user_id": user_id, "type": "deposit", "amount": 500 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["balance_before"], 1000);
    assert_eq!(body["balance_after"], 1500);
    assert_eq!(body["type"], "deposit");

    let (status, body) = send(
        &app,
        "POST",
        "/api/transactions",
        Some(json!({ "user_id": user_id, "type": "withdraw", "amount": 9999 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "insufficient_balance");
    assert_eq!(body["shortage"], 9999 - 1500);

    // The rejected withdrawal left the balance alone.
    let (_, body) = send(&app, "GET", &format!("/api/balance/{user_id}"), None).await;
    assert_eq!(body["total_balance"], 1500);
}

#[tokio::test]
async fn test_apply_transaction_validation() {
    let db = test_db().await;
    let user_id = seed_user(&db, "testuser", 1000).await;
    let app = app(db);

    let (status, body) = send(
        &app,
        "POST",
        "/api/transactions",
        Some(json!({ "user_id": user_id, "type": "transfer", "amount": 10 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["valid_types"], json!(["deposit", "withdraw"]));

    let (status, _) = send(
        &app,
        "POST",
        "/api/transactions",
        Some(json!({ "user_id": user_id, "type": "deposit", "amount": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        "POST",
        "/api/transactions",
        Some(json!({ "user_id": user_id, "type": "deposit", "amount": 999_999 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["max"], 100_000);

    let (status, _) = send(
        &app,
        "POST",
        "/api/transactions",
        Some(json!({ "type": "deposit", "amount": 10 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_transactions_with_filters() {
    let db = test_db().await;
    let user_id = seed_user(&db, "testuser", 1000).await;
    let app = app(db);

    for (kind, amount) in [("deposit", 500), ("withdraw", 200), ("deposit", 300)] {
        let (status, _) = send(
            &app,
            "POST",
            "/api/transactions",
            Some(json!({ "user_id": user_id, "type": kind, "amount": amount })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/transactions?userId={user_id}&limit=2"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    assert_eq!(body["total_count"], 3);
    // Newest first.
    assert_eq!(body["transactions"][0]["amount"], 300);

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/transactions?userId={user_id}&type=deposit&includeStats=true"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_count"], 2);
    assert_eq!(body["stats"]["total_deposits"], 800);

    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/transactions?userId={user_id}&limit=101"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/transactions?userId={user_id}&dateFrom=2024-02-01&dateTo=2024-01-01"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/transactions?userId={user_id}&dateFrom=01-01-2024"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_batch_endpoint() {
    let db = test_db().await;
    let user_id = seed_user(&db, "testuser", 100).await;
    let app = app(db);

    // Net insufficiency fails atomically.
    let (status, body) = send(
        &app,
        "POST",
        "/api/batch/transactions",
        Some(json!({
            "user_id": user_id,
            "transactions": [
                { "type": "deposit", "amount": 500 },
                { "type": "withdraw", "amount": 700 },
            ],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "insufficient_balance");
    assert_eq!(body["would_result_in"], -100);

    let (_, body) = send(&app, "GET", &format!("/api/balance/{user_id}"), None).await;
    assert_eq!(body["total_balance"], 100);

    // A valid batch lands with running balances.
    let (status, body) = send(
        &app,
        "POST",
        "/api/batch/transactions",
        Some(json!({
            "user_id": user_id,
            "transactions": [
                { "type": "deposit", "amount": 500 },
                { "type": "withdraw", "amount": 200 },
            ],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["processed_count"], 2);
    assert_eq!(body["balance_after"], 400);
    assert_eq!(body["transactions_summary"][1]["balance_after"], 400);

    // validate_only projects without writing.
    let (status, body) = send(
        &app,
        "POST",
        "/api/batch/transactions",
        Some(json!({
            "user_id": user_id,
            "transactions": [{ "type": "withdraw", "amount": 150 }],
            "validate_only": true,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["balance_after"], 250);

    let (_, body) = send(&app, "GET", &format!("/api/balance/{user_id}"), None).await;
    assert_eq!(body["total_balance"], 400);

    // Invalid entries are reported per index.
    let (status, body) = send(
        &app,
        "POST",
        "/api/batch/transactions",
        Some(json!({
            "user_id": user_id,
            "transactions": [
                { "type": "deposit", "amount": 10 },
                { "type": "bogus", "amount": 10 },
                { "type": "withdraw", "amount": 0 },
            ],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["validation_errors"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_batch_validate_endpoint() {
    let db = test_db().await;
    let user_id = seed_user(&db, "testuser", 50).await;
    let app = app(db);

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/batch/validate?userId={user_id}&netChange=-200"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_valid"], false);
    assert_eq!(body["shortage"], 150);

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/batch/validate?userId={user_id}&netChange=10"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_valid"], true);
    // 60 medals is under the low-balance warning threshold.
    assert!(body["warning"].is_string());
}

#[tokio::test]
async fn test_stats_endpoints() {
    let db = test_db().await;
    let user_id = seed_user(&db, "testuser", 1000).await;
    let app = app(db);

    for (kind, amount) in [("deposit", 500), ("withdraw", 200)] {
        send(
            &app,
            "POST",
            "/api/transactions",
            Some(json!({ "user_id": user_id, "type": kind, "amount": amount })),
        )
        .await;
    }

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/stats/user/{user_id}?period=7d"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_deposits"], 500);
    assert_eq!(body["total_withdraws"], 200);
    assert_eq!(body["net_change"], 300);
    assert_eq!(body["daily_breakdown"].as_array().unwrap().len(), 1);

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/stats/summary/{user_id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["current_balance"], 1300);
    assert_eq!(body["total_transactions"], 2);
    assert_eq!(body["is_active_today"], true);

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/stats/trends/{user_id}?days=30"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data_points"], 1);
    assert_eq!(body["trend_analysis"]["overall_trend"], "increasing");
}

#[rstest]
#[case("1y")]
#[case("7")]
#[case("weekly")]
#[tokio::test]
async fn test_stats_invalid_period(#[case] period: &str) {
    let db = test_db().await;
    let user_id = seed_user(&db, "testuser", 1000).await;
    let app = app(db);

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/stats/user/{user_id}?period={period}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn test_store_lifecycle() {
    let db = test_db().await;
    let user_id = seed_user(&db, "testuser", 1000).await;
    let app = app(db);

    let (status, body) = send(
        &app,
        "POST",
        "/api/stores",
        Some(json!({ "name": "Arcade Alpha", "createBalanceForAllUsers": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let store_id = body["store"]["id"].as_i64().unwrap();
    assert_eq!(body["store"]["user_count"], 1);

    let (status, body) = send(
        &app,
        "POST",
        "/api/stores",
        Some(json!({ "name": "Arcade Alpha" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");

    // Give the store a balance, then watch the deletion guard kick in.
    send(
        &app,
        "POST",
        "/api/transactions",
        Some(json!({
            "user_id": user_id,
            "store_id": store_id,
            "type": "deposit",
            "amount": 300,
        })),
    )
    .await;

    let (status, body) = send(&app, "DELETE", &format!("/api/stores/{store_id}"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["related_data"]["transactions"], 1);

    let (status, body) = send(
        &app,
        "DELETE",
        &format!("/api/stores/{store_id}?forceDelete=true"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["force_deleted"], true);

    let (status, _) = send(&app, "GET", &format!("/api/stores/{store_id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_auth_flow() {
    let db = test_db().await;
    seed_user(&db, "testuser", 1000).await;
    let app = app(db);

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        Some(json!({ "username": "ghost" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        Some(json!({ "username": "testuser", "remember_me": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["expires_in"], "7d");
    let token = body["token"].as_str().unwrap().to_string();

    let request = Request::builder()
        .method("GET")
        .uri("/api/auth/me")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["user"]["username"], "testuser");
    assert_eq!(body["token_status"], "valid");

    let (status, _) = send(&app, "GET", "/api/auth/me", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&app, "POST", "/api/auth/logout", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Logout completed");

    // The login above landed in the audit trail.
    let (status, body) = send(&app, "GET", "/api/auth/login-history/1?limit=5", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
}

#[tokio::test]
async fn test_rate_limiter_returns_429() {
    let db = test_db().await;
    let app = app_with_limiter(db, RateLimiter::new(2, Duration::from_secs(60)));

    let (status, _) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "rate_limited");
    assert!(body["retry_after"].as_u64().unwrap() >= 1);
}
