//! Batch validation and running-balance planning.
//!
//! A batch is an ordered, all-or-nothing group of deposit/withdraw
//! operations applied to one user's balance. Planning validates every
//! operation independently (reporting all offending indices, not just the
//! first), checks net sufficiency against the current balance, and lays out
//! the running balance each transaction row will record.

use thiserror::Error;

use super::types::TransactionKind;

/// Most operations a single batch may carry.
pub const MAX_BATCH_OPERATIONS: usize = 50;

/// One requested operation, as received from the caller.
///
/// The kind is kept as a raw string so validation can report every invalid
/// entry by index instead of failing at deserialization.
#[derive(Debug, Clone)]
pub struct BatchOperation {
    /// Requested kind ("deposit" or "withdraw").
    pub kind: String,
    /// Requested amount in medals.
    pub amount: i64,
    /// Optional free-text description.
    pub description: Option<String>,
}

/// A single invalid batch entry.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct OperationError {
    /// Zero-based index of the offending operation.
    pub index: usize,
    /// What was wrong with it.
    pub message: String,
}

/// Errors that can occur while validating or planning a batch.
#[derive(Debug, Error)]
pub enum BatchError {
    /// The batch carried no operations.
    #[error("Batch must contain at least one operation")]
    Empty,

    /// The batch carried more operations than allowed.
    #[error("Batch contains {count} operations, maximum is 50")]
    TooManyOperations {
        /// Number of operations received.
        count: usize,
    },

    /// One or more operations were individually invalid.
    #[error("{} operation(s) failed validation", .errors.len())]
    Invalid {
        /// Every offending entry, in index order.
        errors: Vec<OperationError>,
    },

    /// The batch's net effect would drive the balance below zero.
    #[error("Insufficient balance: have {current}, net change {net_change}")]
    InsufficientBalance {
        /// Balance before the batch.
        current: i64,
        /// Net effect of the whole batch.
        net_change: i64,
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

impl BatchError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Empty => "EMPTY_BATCH",
            Self::TooManyOperations { .. } => "BATCH_TOO_LARGE",
            Self::Invalid { .. } => "VALIDATION_ERROR",
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
            Self::Empty
            | Self::TooManyOperations { .. }
            | Self::Invalid { .. }
            | Self::InsufficientBalance { .. } => 400,
            Self::UserNotFound(_) => 404,
            Self::ConcurrentModification => 409,
            Self::Database(_) => 500,
        }
    }
}

/// One operation with its planned running balance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedOperation {
    /// Parsed kind.
    pub kind: TransactionKind,
    /// Amount in medals.
    pub amount: i64,
    /// Optional free-text description.
    pub description: Option<String>,
    /// Running balance before this operation.
    pub balance_before: i64,
    /// Running balance after this operation.
    pub balance_after: i64,
}

/// A fully planned batch, ready to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPlan {
    /// Balance before the batch.
    pub balance_before: i64,
    /// Balance after the whole batch.
    pub balance_after: i64,
    /// Net effect: deposits minus withdrawals.
    pub net_change: i64,
    /// Operations in list order with running balances.
    pub operations: Vec<PlannedOperation>,
}

/// Validates every operation independently and returns the batch's net
/// effect (deposits minus withdrawals).
///
/// # Errors
///
/// Returns `BatchError::Empty`, `BatchError::TooManyOperations`, or
/// `BatchError::Invalid` listing every offending index.
pub fn validate_operations(operations: &[BatchOperation]) -> Result<i64, BatchError> {
    if operations.is_empty() {
        return Err(BatchError::Empty);
    }
    if operations.len() > MAX_BATCH_OPERATIONS {
        return Err(BatchError::TooManyOperations {
            count: operations.len(),
        });
    }

    let mut errors = Vec::new();
    let mut net_change = 0i64;

    for (index, op) in operations.iter().enumerate() {
        let kind = TransactionKind::parse(&op.kind);
        if kind.is_none() {
            errors.push(OperationError {
                index,
                message: format!("invalid type \"{}\"", op.kind),
            });
        }
        if op.amount <= 0 {
            errors.push(OperationError {
                index,
                message: format!("invalid amount \"{}\"", op.amount),
            });
        } else if let Some(kind) = kind {
            net_change += kind.sign() * op.amount;
        }
    }

    if errors.is_empty() {
        Ok(net_change)
    } else {
        Err(BatchError::Invalid { errors })
    }
}

/// Plans a whole batch against the current balance.
///
/// No operation is planned unless every operation validates and the net
/// effect keeps the balance non-negative.
///
/// # Errors
///
/// Everything `validate_operations` returns, plus
/// `BatchError::InsufficientBalance` when `current + net < 0`.
pub fn plan_batch(current: i64, operations: &[BatchOperation]) -> Result<BatchPlan, BatchError> {
    let net_change = validate_operations(operations)?;

    let balance_after = current + net_change;
    if balance_after < 0 {
        return Err(BatchError::InsufficientBalance {
            current,
            net_change,
        });
    }

    let mut running = current;
    let mut planned = Vec::with_capacity(operations.len());
    for (index, op) in operations.iter().enumerate() {
        let Some(kind) = TransactionKind::parse(&op.kind) else {
            return Err(BatchError::Invalid {
                errors: vec![OperationError {
                    index,
                    message: format!("invalid type \"{}\"", op.kind),
                }],
            });
        };
        let balance_before = running;
        running += kind.sign() * op.amount;
        planned.push(PlannedOperation {
            kind,
            amount: op.amount,
            description: op.description.clone(),
            balance_before,
            balance_after: running,
        });
    }

    Ok(BatchPlan {
        balance_before: current,
        balance_after,
        net_change,
        operations: planned,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(kind: &str, amount: i64) -> BatchOperation {
        BatchOperation {
            kind: kind.to_string(),
            amount,
            description: None,
        }
    }

    #[test]
    fn test_empty_batch_rejected() {
        assert!(matches!(plan_batch(1000, &[]), Err(BatchError::Empty)));
    }

    #[test]
    fn test_oversized_batch_rejected() {
        let ops: Vec<_> = (0..51).map(|_| op("deposit", 10)).collect();
        assert!(matches!(
            plan_batch(1000, &ops),
            Err(BatchError::TooManyOperations { count: 51 })
        ));
    }

    #[test]
    fn test_all_invalid_indices_reported() {
        let ops = vec![
            op("deposit", 100),
            op("transfer", 50),
            op("withdraw", 0),
            op("bogus", -5),
        ];

        let err = validate_operations(&ops).unwrap_err();
        match err {
            BatchError::Invalid { errors } => {
                // index 3 is wrong twice: bad kind and bad amount
                let indices: Vec<usize> = errors.iter().map(|e| e.index).collect();
                assert_eq!(indices, vec![1, 2, 3, 3]);
            }
            other => panic!("expected Invalid, got {other:?}"),
        }
    }

    #[test]
    fn test_net_insufficiency_rejected_before_planning() {
        // balance 100, net = 500 - 700 = -200
        let ops = vec![op("deposit", 500), op("withdraw", 700)];

        match plan_batch(100, &ops) {
            Err(BatchError::InsufficientBalance {
                current,
                net_change,
            }) => {
                assert_eq!(current, 100);
                assert_eq!(net_change, -200);
            }
            other => panic!("expected InsufficientBalance, got {other:?}"),
        }
    }

    #[test]
    fn test_successful_plan_running_balances() {
        // balance 1000, [deposit 500, withdraw 200, deposit 300]
        let ops = vec![
            op("deposit", 500),
            op("withdraw", 200),
            op("deposit", 300),
        ];

        let plan = plan_batch(1000, &ops).unwrap();
        assert_eq!(plan.balance_before, 1000);
        assert_eq!(plan.balance_after, 1600);
        assert_eq!(plan.net_change, 600);

        let after: Vec<i64> = plan.operations.iter().map(|o| o.balance_after).collect();
        assert_eq!(after, vec![1500, 1300, 1600]);

        let before: Vec<i64> = plan.operations.iter().map(|o| o.balance_before).collect();
        assert_eq!(before, vec![1000, 1500, 1300]);
    }

    #[test]
    fn test_net_zero_batch() {
        let ops = vec![op("withdraw", 400), op("deposit", 400)];
        let plan = plan_batch(400, &ops).unwrap();
        assert_eq!(plan.net_change, 0);
        assert_eq!(plan.balance_after, 400);
    }

    #[test]
    fn test_net_withdrawal_to_zero_allowed() {
        let ops = vec![op("withdraw", 250), op("withdraw", 250)];
        let plan = plan_batch(500, &ops).unwrap();
        assert_eq!(plan.balance_after, 0);
    }

    #[test]
    fn test_plan_conservation() {
        let ops = vec![
            op("deposit", 10),
            op("withdraw", 3),
            op("deposit", 7),
            op("withdraw", 14),
        ];
        let plan = plan_batch(100, &ops).unwrap();

        // The chained running balances agree with the net.
        assert_eq!(
            plan.balance_after,
            plan.balance_before + plan.net_change
        );
        assert_eq!(
            plan.operations.last().unwrap().balance_after,
            plan.balance_after
        );
        for pair in plan.operations.windows(2) {
            assert_eq!(pair[0].balance_after, pair[1].balance_before);
        }
    }
}
