//! Transaction history queries: filtered listings and statistic windows.

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use medalbank_core::ledger::TransactionKind;
use medalbank_shared::types::Pagination;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Select,
};

use crate::entities::transactions;

/// Conjunctive filters for transaction listings.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransactionFilter {
    /// Only transactions scoped to this store.
    pub store_id: Option<i64>,
    /// Only transactions of this kind.
    pub kind: Option<TransactionKind>,
    /// Only transactions on or after this calendar day.
    pub date_from: Option<NaiveDate>,
    /// Only transactions on or before this calendar day.
    pub date_to: Option<NaiveDate>,
}

/// Read-only repository over the transaction log.
#[derive(Debug, Clone)]
pub struct HistoryRepository {
    db: DatabaseConnection,
}

impl HistoryRepository {
    /// Creates a new history repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn base_query(user_id: i64, filter: &TransactionFilter) -> Select<transactions::Entity> {
        let mut query =
            transactions::Entity::find().filter(transactions::Column::UserId.eq(user_id));

        if let Some(store_id) = filter.store_id {
            query = query.filter(transactions::Column::StoreId.eq(store_id));
        }

        if let Some(kind) = filter.kind {
            query = query
                .filter(transactions::Column::Kind.eq(crate::entities::TransactionKind::from(kind)));
        }

        // Date filters are inclusive calendar days: [from 00:00, to+1 00:00).
        if let Some(from) = filter.date_from {
            let start = from.and_time(NaiveTime::MIN).and_utc().fixed_offset();
            query = query.filter(transactions::Column::CreatedAt.gte(start));
        }

        if let Some(to) = filter.date_to
            && let Some(next_day) = to.checked_add_days(Days::new(1))
        {
            let end = next_day.and_time(NaiveTime::MIN).and_utc().fixed_offset();
            query = query.filter(transactions::Column::CreatedAt.lt(end));
        }

        query
    }

    /// Lists matching transactions newest first, plus the total count
    /// ignoring pagination.
    ///
    /// # Errors
    ///
    /// Returns an error if a query fails.
    pub async fn list(
        &self,
        user_id: i64,
        filter: &TransactionFilter,
        page: Pagination,
    ) -> Result<(Vec<transactions::Model>, u64), DbErr> {
        let total = Self::base_query(user_id, filter).count(&self.db).await?;

        let rows = Self::base_query(user_id, filter)
            .order_by_desc(transactions::Column::CreatedAt)
            .order_by_desc(transactions::Column::Id)
            .limit(page.limit)
            .offset(page.offset)
            .all(&self.db)
            .await?;

        Ok((rows, total))
    }

    /// Fetches every matching transaction, unpaginated (statistics input).
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list_all(
        &self,
        user_id: i64,
        filter: &TransactionFilter,
    ) -> Result<Vec<transactions::Model>, DbErr> {
        Self::base_query(user_id, filter)
            .order_by_desc(transactions::Column::CreatedAt)
            .order_by_desc(transactions::Column::Id)
            .all(&self.db)
            .await
    }

    /// Fetches a user's transactions since an instant (or all of them),
    /// oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn fetch_since(
        &self,
        user_id: i64,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<transactions::Model>, DbErr> {
        let mut query =
            transactions::Entity::find().filter(transactions::Column::UserId.eq(user_id));

        if let Some(since) = since {
            query = query.filter(transactions::Column::CreatedAt.gte(since.fixed_offset()));
        }

        query
            .order_by_asc(transactions::Column::CreatedAt)
            .order_by_asc(transactions::Column::Id)
            .all(&self.db)
            .await
    }

    /// Lifetime transaction count for a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn count_for_user(&self, user_id: i64) -> Result<u64, DbErr> {
        transactions::Entity::find()
            .filter(transactions::Column::UserId.eq(user_id))
            .count(&self.db)
            .await
    }

    /// A user's most recent transaction, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn latest_for_user(
        &self,
        user_id: i64,
    ) -> Result<Option<transactions::Model>, DbErr> {
        transactions::Entity::find()
            .filter(transactions::Column::UserId.eq(user_id))
            .order_by_desc(transactions::Column::CreatedAt)
            .order_by_desc(transactions::Column::Id)
            .one(&self.db)
            .await
    }
}
