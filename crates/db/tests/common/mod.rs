//! Shared helpers for database integration tests.
//!
//! Tests run against in-memory SQLite through the real migrations, so they
//! need no external services.

use medalbank_db::entities::{balances, stores, users};
use medalbank_db::migration::{Migrator, MigratorTrait};
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};

/// Connects to a fresh in-memory database with the schema applied.
pub async fn setup() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    // A single connection keeps every query on the same in-memory database.
    options.max_connections(1);

    let db = Database::connect(options)
        .await
        .expect("failed to open in-memory database");
    Migrator::up(&db, None)
        .await
        .expect("failed to run migrations");

    db
}

/// Seeds a user with an unscoped balance row.
pub async fn seed_user(db: &DatabaseConnection, username: &str, initial_balance: i64) -> i64 {
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
        amount: Set(initial_balance),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("failed to insert balance row");

    user.id
}

/// Seeds a store.
#[allow(dead_code)]
pub async fn seed_store(db: &DatabaseConnection, name: &str) -> i64 {
    let now: sea_orm::prelude::DateTimeWithTimeZone = chrono::Utc::now().into();

    let store = stores::ActiveModel {
        name: Set(name.to_string()),
        description: Set(None),
        color: Set("#3B82F6".to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("failed to insert store");

    store.id
}
