//! JSON response helpers for the shared error taxonomy.
//!
//! Error bodies always carry a machine-readable `error` code and a
//! human-readable `message`; callers can attach extra hint fields. Storage
//! errors only expose details in development mode.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};

use medalbank_shared::AppError;

/// Builds an error response from the shared taxonomy.
pub fn error_response(err: &AppError) -> Response {
    error_response_with(err, json!({}))
}

/// Builds an error response with extra body fields merged in.
pub fn error_response_with(err: &AppError, extra: Value) -> Response {
    let mut body = json!({
        "error": err.error_code(),
        "message": err.to_string(),
    });

    if let (Value::Object(target), Value::Object(fields)) = (&mut body, extra) {
        for (key, value) in fields {
            target.insert(key, value);
        }
    }

    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(body)).into_response()
}

/// Builds a 500 response for an unexpected storage failure, attaching the
/// underlying error only when the server runs in development mode.
pub fn storage_error(expose: bool, err: &impl std::fmt::Display) -> Response {
    let details = if expose {
        json!({ "details": err.to_string() })
    } else {
        json!({})
    };

    error_response_with(
        &AppError::Storage("an unexpected database error occurred".to_string()),
        details,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_status() {
        let response = error_response(&AppError::NotFound("user 7".into()));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_storage_error_status() {
        let response = storage_error(false, &"boom");
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
