//! User repository: lookups and login-history access.

use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};

use crate::entities::{login_history, users};

/// User repository for lookups and the login audit trail.
#[derive(Debug, Clone)]
pub struct UserRepository {
    db: DatabaseConnection,
}

impl UserRepository {
    /// Creates a new user repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Finds a user by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id(&self, id: i64) -> Result<Option<users::Model>, DbErr> {
        users::Entity::find_by_id(id).one(&self.db).await
    }

    /// Finds a user by username.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_username(&self, username: &str) -> Result<Option<users::Model>, DbErr> {
        users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.db)
            .await
    }

    /// Appends a login-history row.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub async fn record_login(
        &self,
        user_id: i64,
        session_id: &str,
        device_info: Option<String>,
        ip_address: Option<String>,
    ) -> Result<login_history::Model, DbErr> {
        login_history::ActiveModel {
            user_id: Set(user_id),
            session_id: Set(session_id.to_string()),
            device_info: Set(device_info),
            ip_address: Set(ip_address),
            created_at: Set(chrono::Utc::now().into()),
            ..Default::default()
        }
        .insert(&self.db)
        .await
    }

    /// Login count and most recent login instant for a user.
    ///
    /// # Errors
    ///
    /// Returns an error if a query fails.
    pub async fn login_stats(
        &self,
        user_id: i64,
    ) -> Result<(u64, Option<DateTimeWithTimeZone>), DbErr> {
        let count = login_history::Entity::find()
            .filter(login_history::Column::UserId.eq(user_id))
            .count(&self.db)
            .await?;

        let last = login_history::Entity::find()
            .filter(login_history::Column::UserId.eq(user_id))
            .order_by_desc(login_history::Column::CreatedAt)
            .order_by_desc(login_history::Column::Id)
            .one(&self.db)
            .await?
            .map(|row| row.created_at);

        Ok((count, last))
    }

    /// A user's login history, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn login_history(
        &self,
        user_id: i64,
        limit: u64,
    ) -> Result<Vec<login_history::Model>, DbErr> {
        login_history::Entity::find()
            .filter(login_history::Column::UserId.eq(user_id))
            .order_by_desc(login_history::Column::CreatedAt)
            .order_by_desc(login_history::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await
    }
}
