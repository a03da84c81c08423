//! Ledger error types for validation and state errors.

use thiserror::Error;

/// Errors that can occur during single ledger mutations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Amount must be a positive number of medals.
    #[error("Amount must be at least 1, got {amount}")]
    InvalidAmount {
        /// The rejected amount.
        amount: i64,
    },

    /// A withdrawal would drive the balance below zero.
    #[error("Insufficient balance: have {current}, requested {requested}")]
    InsufficientBalance {
        /// Balance at the time of the rejected withdrawal.
        current: i64,
        /// Amount the caller tried to withdraw.
        requested: i64,
    },

    /// The user has no balance record at all.
    #[error("No balance record found for user {0}")]
    UserNotFound(i64),

    /// Concurrent modification detected; retries exhausted.
    #[error("Concurrent modification detected, please retry")]
    ConcurrentModification,

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl LedgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidAmount { .. } => "INVALID_AMOUNT",
            Self::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            Self::UserNotFound(_) => "USER_NOT_FOUND",
            Self::ConcurrentModification => "CONCURRENT_MODIFICATION",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::InvalidAmount { .. } | Self::InsufficientBalance { .. } => 400,
            Self::UserNotFound(_) => 404,
            Self::ConcurrentModification => 409,
            Self::Database(_) => 500,
        }
    }

    /// Shortfall of a rejected withdrawal: requested minus current.
    #[must_use]
    pub const fn shortage(&self) -> Option<i64> {
        match self {
            Self::InsufficientBalance { current, requested } => Some(*requested - *current),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            LedgerError::InvalidAmount { amount: 0 }.error_code(),
            "INVALID_AMOUNT"
        );
        assert_eq!(
            LedgerError::InsufficientBalance {
                current: 100,
                requested: 500
            }
            .error_code(),
            "INSUFFICIENT_BALANCE"
        );
        assert_eq!(LedgerError::UserNotFound(9).error_code(), "USER_NOT_FOUND");
        assert_eq!(
            LedgerError::ConcurrentModification.error_code(),
            "CONCURRENT_MODIFICATION"
        );
    }

    #[test]
    fn test_http_status_codes() {
        assert_eq!(
            LedgerError::InvalidAmount { amount: -5 }.http_status_code(),
            400
        );
        assert_eq!(LedgerError::UserNotFound(1).http_status_code(), 404);
        assert_eq!(LedgerError::ConcurrentModification.http_status_code(), 409);
        assert_eq!(
            LedgerError::Database("boom".into()).http_status_code(),
            500
        );
    }

    #[test]
    fn test_shortage() {
        let err = LedgerError::InsufficientBalance {
            current: 300,
            requested: 1000,
        };
        assert_eq!(err.shortage(), Some(700));
        assert_eq!(LedgerError::UserNotFound(1).shortage(), None);
    }
}
