//! Ledger repository: balance reads and mutations.
//!
//! Every mutation runs inside a database transaction and pairs exactly one
//! balance overwrite with one appended transaction row. The balance write
//! is a compare-and-swap on the previously read amount; a lost race aborts
//! the transaction and the whole read-plan-write cycle retries.

use medalbank_core::ledger::{
    BatchError, BatchOperation, BatchPlan, LedgerError, TransactionKind, plan_batch,
    plan_mutation,
};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    PaginatorTrait, QueryFilter, Set, TransactionTrait,
};
use tracing::debug;

use crate::entities::{balances, transactions};

/// Times a conflicted balance write is retried before giving up.
const MAX_WRITE_RETRIES: u32 = 3;

/// A balance read result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceSnapshot {
    /// Current amount in medals.
    pub amount: i64,
    /// Last update instant; `None` for a store-scoped row that does not
    /// exist yet (read as zero).
    pub updated_at: Option<DateTimeWithTimeZone>,
}

/// Input for a single deposit or withdrawal.
#[derive(Debug, Clone)]
pub struct ApplyTransactionInput {
    /// Target user.
    pub user_id: i64,
    /// Target store; `None` addresses the unscoped balance row.
    pub store_id: Option<i64>,
    /// Deposit or withdraw.
    pub kind: TransactionKind,
    /// Amount in medals.
    pub amount: i64,
    /// Optional free-text description.
    pub description: Option<String>,
}

/// Outcome of a single applied mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppliedTransaction {
    /// Id of the appended transaction row.
    pub transaction_id: i64,
    /// Balance before the mutation.
    pub balance_before: i64,
    /// Balance after the mutation.
    pub balance_after: i64,
}

/// Input for an all-or-nothing batch.
#[derive(Debug, Clone)]
pub struct ApplyBatchInput {
    /// Target user.
    pub user_id: i64,
    /// Target store; `None` addresses the unscoped balance row.
    pub store_id: Option<i64>,
    /// Operations in application order.
    pub operations: Vec<BatchOperation>,
}

/// One applied batch entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchEntryResult {
    /// Id of the appended transaction row.
    pub transaction_id: i64,
    /// Deposit or withdraw.
    pub kind: TransactionKind,
    /// Amount in medals.
    pub amount: i64,
    /// Running balance after this entry.
    pub balance_after: i64,
}

/// Outcome of a fully applied batch.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    /// Balance before the batch.
    pub balance_before: i64,
    /// Balance after the batch.
    pub balance_after: i64,
    /// Net effect: deposits minus withdrawals.
    pub net_change: i64,
    /// Per-operation results in application order.
    pub entries: Vec<BatchEntryResult>,
}

/// Projection returned by validate-only batch requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProjection {
    /// Balance before the batch would run.
    pub balance_before: i64,
    /// Balance after the batch would run.
    pub balance_after: i64,
    /// Net effect of the batch.
    pub net_change: i64,
    /// Number of operations validated.
    pub operation_count: usize,
}

/// Ledger repository for balance reads and mutations.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    db: DatabaseConnection,
}

impl LedgerRepository {
    /// Creates a new ledger repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Reads a user's balance.
    ///
    /// With a store id, returns that row's amount (0 for a known user whose
    /// row does not exist yet). Without one, returns the sum over all of
    /// the user's rows with the newest update instant.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::UserNotFound` if the user has no balance rows
    /// at all, or `LedgerError::Database` on query failure.
    pub async fn read_balance(
        &self,
        user_id: i64,
        store_id: Option<i64>,
    ) -> Result<BalanceSnapshot, LedgerError> {
        let rows = balances::Entity::find()
            .filter(balances::Column::UserId.eq(user_id))
            .all(&self.db)
            .await
            .map_err(ledger_db_err)?;

        if rows.is_empty() {
            return Err(LedgerError::UserNotFound(user_id));
        }

        match store_id {
            Some(sid) => {
                let row = rows.iter().find(|r| r.store_id == Some(sid));
                Ok(BalanceSnapshot {
                    amount: row.map_or(0, |r| r.amount),
                    updated_at: row.map(|r| r.updated_at),
                })
            }
            None => Ok(BalanceSnapshot {
                amount: rows.iter().map(|r| r.amount).sum(),
                updated_at: rows.iter().map(|r| r.updated_at).max(),
            }),
        }
    }

    /// Current amount of the balance row a mutation would target.
    ///
    /// A missing row for a known user reads as 0 (it would be created
    /// lazily by the mutation).
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::UserNotFound` if the user has no balance rows
    /// at all, or `LedgerError::Database` on query failure.
    pub async fn target_amount(
        &self,
        user_id: i64,
        store_id: Option<i64>,
    ) -> Result<i64, LedgerError> {
        let rows = balances::Entity::find()
            .filter(balances::Column::UserId.eq(user_id))
            .all(&self.db)
            .await
            .map_err(ledger_db_err)?;

        if rows.is_empty() {
            return Err(LedgerError::UserNotFound(user_id));
        }

        Ok(rows
            .iter()
            .find(|r| r.store_id == store_id)
            .map_or(0, |r| r.amount))
    }

    /// Applies one deposit or withdrawal.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InvalidAmount`, `LedgerError::UserNotFound`,
    /// `LedgerError::InsufficientBalance`, or, after exhausted retries,
    /// `LedgerError::ConcurrentModification`.
    pub async fn apply_transaction(
        &self,
        input: &ApplyTransactionInput,
    ) -> Result<AppliedTransaction, LedgerError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_apply_transaction(input).await {
                Err(LedgerError::ConcurrentModification) if attempt < MAX_WRITE_RETRIES => {
                    debug!(
                        user_id = input.user_id,
                        attempt, "balance write conflicted, retrying"
                    );
                }
                result => return result,
            }
        }
    }

    async fn try_apply_transaction(
        &self,
        input: &ApplyTransactionInput,
    ) -> Result<AppliedTransaction, LedgerError> {
        let txn = self.db.begin().await.map_err(ledger_db_err)?;

        let row = self
            .target_balance_row(&txn, input.user_id, input.store_id)
            .await?;
        let plan = plan_mutation(row.amount, input.kind, input.amount)?;

        let now: DateTimeWithTimeZone = chrono::Utc::now().into();
        swap_balance(&txn, row.id, plan.balance_before, plan.balance_after, now)
            .await
            .map_err(|e| match e {
                SwapError::Conflict => LedgerError::ConcurrentModification,
                SwapError::Db(err) => ledger_db_err(err),
            })?;

        let record = transactions::ActiveModel {
            user_id: Set(input.user_id),
            store_id: Set(input.store_id),
            kind: Set(input.kind.into()),
            amount: Set(input.amount),
            balance_before: Set(plan.balance_before),
            balance_after: Set(plan.balance_after),
            description: Set(input.description.clone()),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(ledger_db_err)?;

        txn.commit().await.map_err(ledger_db_err)?;

        Ok(AppliedTransaction {
            transaction_id: record.id,
            balance_before: plan.balance_before,
            balance_after: plan.balance_after,
        })
    }

    /// Validates a batch against the current balance without writing.
    ///
    /// # Errors
    ///
    /// Everything batch planning returns; nothing is persisted.
    pub async fn validate_batch(
        &self,
        user_id: i64,
        store_id: Option<i64>,
        operations: &[BatchOperation],
    ) -> Result<BatchProjection, BatchError> {
        let current = self
            .target_amount(user_id, store_id)
            .await
            .map_err(batch_err_from_ledger)?;

        let plan = plan_batch(current, operations)?;
        Ok(projection_of(&plan))
    }

    /// Applies an ordered batch as one all-or-nothing unit.
    ///
    /// # Errors
    ///
    /// Everything batch planning returns, plus
    /// `BatchError::ConcurrentModification` after exhausted retries. On any
    /// error the balance and transaction log are left untouched.
    pub async fn apply_batch(&self, input: &ApplyBatchInput) -> Result<BatchOutcome, BatchError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_apply_batch(input).await {
                Err(BatchError::ConcurrentModification) if attempt < MAX_WRITE_RETRIES => {
                    debug!(
                        user_id = input.user_id,
                        attempt, "batch balance write conflicted, retrying"
                    );
                }
                result => return result,
            }
        }
    }

    async fn try_apply_batch(&self, input: &ApplyBatchInput) -> Result<BatchOutcome, BatchError> {
        let txn = self.db.begin().await.map_err(batch_db_err)?;

        let row = self
            .target_balance_row(&txn, input.user_id, input.store_id)
            .await
            .map_err(batch_err_from_ledger)?;
        let plan = plan_batch(row.amount, &input.operations)?;

        let now: DateTimeWithTimeZone = chrono::Utc::now().into();
        let total = plan.operations.len();
        let mut entries = Vec::with_capacity(total);

        for (index, op) in plan.operations.iter().enumerate() {
            let description = op.description.clone().unwrap_or_else(|| {
                format!("Batch operation {}/{}", index + 1, total)
            });

            let record = transactions::ActiveModel {
                user_id: Set(input.user_id),
                store_id: Set(input.store_id),
                kind: Set(op.kind.into()),
                amount: Set(op.amount),
                balance_before: Set(op.balance_before),
                balance_after: Set(op.balance_after),
                description: Set(Some(description)),
                created_at: Set(now),
                ..Default::default()
            }
            .insert(&txn)
            .await
            .map_err(batch_db_err)?;

            entries.push(BatchEntryResult {
                transaction_id: record.id,
                kind: op.kind,
                amount: op.amount,
                balance_after: op.balance_after,
            });
        }

        swap_balance(&txn, row.id, plan.balance_before, plan.balance_after, now)
            .await
            .map_err(|e| match e {
                SwapError::Conflict => BatchError::ConcurrentModification,
                SwapError::Db(err) => batch_db_err(err),
            })?;

        txn.commit().await.map_err(batch_db_err)?;

        Ok(BatchOutcome {
            balance_before: plan.balance_before,
            balance_after: plan.balance_after,
            net_change: plan.net_change,
            entries,
        })
    }

    /// Fetches the balance row a mutation targets, lazily creating it at 0
    /// for a known user. The caller's transaction owns the new row until
    /// commit.
    async fn target_balance_row(
        &self,
        txn: &DatabaseTransaction,
        user_id: i64,
        store_id: Option<i64>,
    ) -> Result<balances::Model, LedgerError> {
        let mut query = balances::Entity::find().filter(balances::Column::UserId.eq(user_id));
        query = match store_id {
            Some(sid) => query.filter(balances::Column::StoreId.eq(sid)),
            None => query.filter(balances::Column::StoreId.is_null()),
        };

        if let Some(row) = query.one(txn).await.map_err(ledger_db_err)? {
            return Ok(row);
        }

        let known_user = balances::Entity::find()
            .filter(balances::Column::UserId.eq(user_id))
            .count(txn)
            .await
            .map_err(ledger_db_err)?
            > 0;
        if !known_user {
            return Err(LedgerError::UserNotFound(user_id));
        }

        balances::ActiveModel {
            user_id: Set(user_id),
            store_id: Set(store_id),
            amount: Set(0),
            updated_at: Set(chrono::Utc::now().into()),
            ..Default::default()
        }
        .insert(txn)
        .await
        .map_err(ledger_db_err)
    }
}

fn projection_of(plan: &BatchPlan) -> BatchProjection {
    BatchProjection {
        balance_before: plan.balance_before,
        balance_after: plan.balance_after,
        net_change: plan.net_change,
        operation_count: plan.operations.len(),
    }
}

enum SwapError {
    Conflict,
    Db(sea_orm::DbErr),
}

/// Compare-and-swap of a balance row's amount: the update only lands when
/// the stored amount still equals `expected`.
async fn swap_balance(
    txn: &DatabaseTransaction,
    row_id: i64,
    expected: i64,
    new_amount: i64,
    now: DateTimeWithTimeZone,
) -> Result<(), SwapError> {
    let updated = balances::Entity::update_many()
        .col_expr(balances::Column::Amount, Expr::value(new_amount))
        .col_expr(balances::Column::UpdatedAt, Expr::value(now))
        .filter(balances::Column::Id.eq(row_id))
        .filter(balances::Column::Amount.eq(expected))
        .exec(txn)
        .await
        .map_err(SwapError::Db)?;

    if updated.rows_affected == 1 {
        Ok(())
    } else {
        Err(SwapError::Conflict)
    }
}

fn ledger_db_err(err: sea_orm::DbErr) -> LedgerError {
    LedgerError::Database(err.to_string())
}

fn batch_db_err(err: sea_orm::DbErr) -> BatchError {
    BatchError::Database(err.to_string())
}

fn batch_err_from_ledger(err: LedgerError) -> BatchError {
    match err {
        LedgerError::UserNotFound(id) => BatchError::UserNotFound(id),
        LedgerError::ConcurrentModification => BatchError::ConcurrentModification,
        other => BatchError::Database(other.to_string()),
    }
}
