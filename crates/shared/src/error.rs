//! Application-wide error types.

use thiserror::Error;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed, missing, or out-of-range input.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Authentication failed.
    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    /// Unknown user, store, or transaction.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A withdrawal (or batch) would drive a balance below zero.
    #[error("Insufficient balance: have {current}, requested {requested}")]
    InsufficientBalance {
        /// Balance at the time of the rejected operation.
        current: i64,
        /// Amount (or net withdrawal) the caller asked for.
        requested: i64,
    },

    /// Duplicate store name or protected deletion.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Too many requests from one client within the window.
    #[error("Rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited {
        /// Seconds until the oldest request leaves the window.
        retry_after_secs: u64,
    },

    /// Unexpected datastore failure.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) | Self::InsufficientBalance { .. } => 400,
            Self::Unauthorized(_) => 401,
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::RateLimited { .. } => 429,
            Self::Storage(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::Unauthorized(_) => "unauthorized",
            Self::NotFound(_) => "not_found",
            Self::InsufficientBalance { .. } => "insufficient_balance",
            Self::Conflict(_) => "conflict",
            Self::RateLimited { .. } => "rate_limited",
            Self::Storage(_) => "storage_error",
        }
    }

    /// Shortfall reported with `InsufficientBalance`: requested minus current.
    #[must_use]
    pub const fn shortage(&self) -> Option<i64> {
        match self {
            Self::InsufficientBalance { current, requested } => Some(*requested - *current),
            _ => None,
        }
    }
}
