//! Single-mutation planning.

use super::error::LedgerError;
use super::types::TransactionKind;

/// Outcome of planning one deposit or withdrawal.
///
/// `balance_before` and `balance_after` are the snapshots the paired
/// transaction row must record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutationPlan {
    /// Balance before the mutation.
    pub balance_before: i64,
    /// Balance after the mutation.
    pub balance_after: i64,
}

/// Plans a single deposit or withdrawal against the current balance.
///
/// # Errors
///
/// Returns `LedgerError::InvalidAmount` for non-positive amounts and
/// `LedgerError::InsufficientBalance` (with the shortfall recoverable via
/// [`LedgerError::shortage`]) for withdrawals exceeding the balance.
pub fn plan_mutation(
    current: i64,
    kind: TransactionKind,
    amount: i64,
) -> Result<MutationPlan, LedgerError> {
    if amount <= 0 {
        return Err(LedgerError::InvalidAmount { amount });
    }

    let balance_after = match kind {
        TransactionKind::Deposit => current + amount,
        TransactionKind::Withdraw => {
            if current < amount {
                return Err(LedgerError::InsufficientBalance {
                    current,
                    requested: amount,
                });
            }
            current - amount
        }
    };

    Ok(MutationPlan {
        balance_before: current,
        balance_after,
    })
}
