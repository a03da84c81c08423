//! Store repository: CRUD with delete-protection and balance fan-out.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::info;

use crate::entities::{TransactionKind, balances, stores, transactions, users};

/// Display color a store gets when none is supplied.
pub const DEFAULT_STORE_COLOR: &str = "#3B82F6";

/// Error types for store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Store not found.
    #[error("Store not found: {0}")]
    NotFound(i64),

    /// Another store already uses the requested name.
    #[error("Store name already in use: {0}")]
    DuplicateName(String),

    /// The store still owns balance or transaction rows.
    #[error(
        "Store has related data: {balance_records} balance rows, {transactions} transactions"
    )]
    HasRelatedData {
        /// Number of balance rows scoped to the store.
        balance_records: u64,
        /// Number of transactions scoped to the store.
        transactions: u64,
        /// Sum of the store's balance rows.
        total_balance: i64,
    },

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// A store together with its usage figures.
#[derive(Debug, Clone)]
pub struct StoreWithTotals {
    /// The store row.
    pub store: stores::Model,
    /// Distinct users holding a balance row for the store.
    pub user_count: u64,
    /// Sum of the store's balance rows.
    pub total_balance: i64,
}

/// Input for creating a store.
#[derive(Debug, Clone)]
pub struct CreateStoreInput {
    /// Store name (unique).
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Optional display color; defaults to [`DEFAULT_STORE_COLOR`].
    pub color: Option<String>,
    /// Whether to fan out a zero balance row for every existing user.
    pub create_balance_for_all_users: bool,
}

/// Input for updating a store.
#[derive(Debug, Clone)]
pub struct UpdateStoreInput {
    /// New store name (unique).
    pub name: String,
    /// New description; `None` clears it.
    pub description: Option<String>,
    /// New display color; `None` keeps the current one.
    pub color: Option<String>,
}

/// Outcome of a store deletion.
#[derive(Debug, Clone)]
pub struct DeletedStore {
    /// Id of the removed store.
    pub id: i64,
    /// Name of the removed store.
    pub name: String,
    /// Whether dependent rows were cascaded.
    pub force_deleted: bool,
    /// Balance rows removed by the cascade.
    pub deleted_balance_records: u64,
    /// Transactions removed by the cascade.
    pub deleted_transactions: u64,
}

/// Per-store statistics.
#[derive(Debug, Clone)]
pub struct StoreStats {
    /// Distinct users holding a balance row for the store.
    pub user_count: u64,
    /// Sum of the store's balance rows.
    pub total_balance: i64,
    /// Number of transactions scoped to the store.
    pub transaction_count: u64,
    /// Sum of deposits scoped to the store.
    pub total_deposits: i64,
    /// Sum of withdrawals scoped to the store.
    pub total_withdrawals: i64,
    /// The ten most recent transactions with their usernames.
    pub recent_transactions: Vec<(transactions::Model, Option<String>)>,
}

/// Store repository for CRUD operations.
#[derive(Debug, Clone)]
pub struct StoreRepository {
    db: DatabaseConnection,
}

impl StoreRepository {
    /// Creates a new store repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Lists all stores with usage figures, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if a query fails.
    pub async fn list(&self) -> Result<Vec<StoreWithTotals>, StoreError> {
        let stores = stores::Entity::find()
            .order_by_asc(stores::Column::CreatedAt)
            .order_by_asc(stores::Column::Id)
            .all(&self.db)
            .await?;

        let mut result = Vec::with_capacity(stores.len());
        for store in stores {
            let (user_count, total_balance) = self.balance_totals(store.id).await?;
            result.push(StoreWithTotals {
                store,
                user_count,
                total_balance,
            });
        }

        Ok(result)
    }

    /// Fetches one store with usage figures.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` for an unknown id.
    pub async fn get(&self, id: i64) -> Result<StoreWithTotals, StoreError> {
        let store = stores::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(StoreError::NotFound(id))?;

        let (user_count, total_balance) = self.balance_totals(id).await?;
        Ok(StoreWithTotals {
            store,
            user_count,
            total_balance,
        })
    }

    /// Creates a store, optionally fanning out zero balance rows for every
    /// existing user.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::DuplicateName` when the name is taken.
    pub async fn create(&self, input: CreateStoreInput) -> Result<StoreWithTotals, StoreError> {
        if self.name_exists(&input.name, None).await? {
            return Err(StoreError::DuplicateName(input.name));
        }

        let txn = self.db.begin().await?;
        let now: sea_orm::prelude::DateTimeWithTimeZone = chrono::Utc::now().into();

        let store = stores::ActiveModel {
            name: Set(input.name),
            description: Set(input.description),
            color: Set(input
                .color
                .unwrap_or_else(|| DEFAULT_STORE_COLOR.to_string())),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let mut fanned_out = 0u64;
        if input.create_balance_for_all_users {
            let user_ids: Vec<i64> = users::Entity::find()
                .all(&txn)
                .await?
                .into_iter()
                .map(|u| u.id)
                .collect();

            for user_id in user_ids {
                balances::ActiveModel {
                    user_id: Set(user_id),
                    store_id: Set(Some(store.id)),
                    amount: Set(0),
                    updated_at: Set(now),
                    ..Default::default()
                }
                .insert(&txn)
                .await?;
                fanned_out += 1;
            }
        }

        txn.commit().await?;

        info!(store_id = store.id, fanned_out, "Store created");

        Ok(StoreWithTotals {
            store,
            user_count: fanned_out,
            total_balance: 0,
        })
    }

    /// Updates a store's name, description, and color.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` for an unknown id and
    /// `StoreError::DuplicateName` when another store uses the name.
    pub async fn update(
        &self,
        id: i64,
        input: UpdateStoreInput,
    ) -> Result<StoreWithTotals, StoreError> {
        let store = stores::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(StoreError::NotFound(id))?;

        if self.name_exists(&input.name, Some(id)).await? {
            return Err(StoreError::DuplicateName(input.name));
        }

        let current_color = store.color.clone();
        let mut active: stores::ActiveModel = store.into();
        active.name = Set(input.name);
        active.description = Set(input.description);
        active.color = Set(input.color.unwrap_or(current_color));
        active.updated_at = Set(chrono::Utc::now().into());

        let updated = active.update(&self.db).await?;

        let (user_count, total_balance) = self.balance_totals(id).await?;
        Ok(StoreWithTotals {
            store: updated,
            user_count,
            total_balance,
        })
    }

    /// Deletes a store.
    ///
    /// Without `force`, deletion is refused while any balance or
    /// transaction rows reference the store. With it, dependent
    /// transactions and balances are removed first, all inside one
    /// database transaction.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` for an unknown id and
    /// `StoreError::HasRelatedData` for a protected deletion.
    pub async fn delete(&self, id: i64, force: bool) -> Result<DeletedStore, StoreError> {
        let store = stores::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(StoreError::NotFound(id))?;

        let balance_rows = balances::Entity::find()
            .filter(balances::Column::StoreId.eq(id))
            .all(&self.db)
            .await?;
        let balance_records = balance_rows.len() as u64;
        let total_balance: i64 = balance_rows.iter().map(|r| r.amount).sum();

        let transaction_count = transactions::Entity::find()
            .filter(transactions::Column::StoreId.eq(id))
            .count(&self.db)
            .await?;

        let has_data = balance_records > 0 || transaction_count > 0;
        if has_data && !force {
            return Err(StoreError::HasRelatedData {
                balance_records,
                transactions: transaction_count,
                total_balance,
            });
        }

        let txn = self.db.begin().await?;

        if force {
            transactions::Entity::delete_many()
                .filter(transactions::Column::StoreId.eq(id))
                .exec(&txn)
                .await?;
            balances::Entity::delete_many()
                .filter(balances::Column::StoreId.eq(id))
                .exec(&txn)
                .await?;
        }

        stores::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        info!(store_id = id, force, "Store deleted");

        Ok(DeletedStore {
            id,
            name: store.name,
            force_deleted: force,
            deleted_balance_records: if force { balance_records } else { 0 },
            deleted_transactions: if force { transaction_count } else { 0 },
        })
    }

    /// Per-store statistics with the ten most recent transactions.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` for an unknown id.
    pub async fn stats(&self, id: i64) -> Result<StoreStats, StoreError> {
        stores::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(StoreError::NotFound(id))?;

        let (user_count, total_balance) = self.balance_totals(id).await?;

        let rows = transactions::Entity::find()
            .filter(transactions::Column::StoreId.eq(id))
            .all(&self.db)
            .await?;

        let transaction_count = rows.len() as u64;
        let total_deposits: i64 = rows
            .iter()
            .filter(|r| r.kind == TransactionKind::Deposit)
            .map(|r| r.amount)
            .sum();
        let total_withdrawals: i64 = rows
            .iter()
            .filter(|r| r.kind == TransactionKind::Withdraw)
            .map(|r| r.amount)
            .sum();

        let recent = transactions::Entity::find()
            .filter(transactions::Column::StoreId.eq(id))
            .order_by_desc(transactions::Column::CreatedAt)
            .order_by_desc(transactions::Column::Id)
            .limit(10)
            .all(&self.db)
            .await?;

        let user_ids: Vec<i64> = recent.iter().map(|t| t.user_id).collect();
        let usernames: std::collections::HashMap<i64, String> = users::Entity::find()
            .filter(users::Column::Id.is_in(user_ids))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|u| (u.id, u.username))
            .collect();

        let recent_transactions = recent
            .into_iter()
            .map(|t| {
                let username = usernames.get(&t.user_id).cloned();
                (t, username)
            })
            .collect();

        Ok(StoreStats {
            user_count,
            total_balance,
            transaction_count,
            total_deposits,
            total_withdrawals,
            recent_transactions,
        })
    }

    /// Distinct user count and balance sum over a store's balance rows.
    async fn balance_totals(&self, store_id: i64) -> Result<(u64, i64), StoreError> {
        let rows = balances::Entity::find()
            .filter(balances::Column::StoreId.eq(store_id))
            .all(&self.db)
            .await?;

        let users: std::collections::HashSet<i64> = rows.iter().map(|r| r.user_id).collect();
        let total: i64 = rows.iter().map(|r| r.amount).sum();

        Ok((users.len() as u64, total))
    }

    /// Whether a store name is taken, optionally excluding one id.
    async fn name_exists(&self, name: &str, exclude: Option<i64>) -> Result<bool, StoreError> {
        let mut query = stores::Entity::find().filter(stores::Column::Name.eq(name));
        if let Some(id) = exclude {
            query = query.filter(stores::Column::Id.ne(id));
        }

        Ok(query.count(&self.db).await? > 0)
    }
}
