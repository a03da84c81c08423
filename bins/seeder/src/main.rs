//! Database seeder for MedalBank development and testing.
//!
//! Seeds the test user with an initial medal balance so the API has
//! something to serve right after a fresh migration.
//!
//! Usage: cargo run --bin seeder

use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use medalbank_db::entities::{balances, users};
use medalbank_shared::config::DatabaseConfig;

/// Username of the development test user.
const TEST_USERNAME: &str = "testuser";
/// Medals the test user starts with.
const INITIAL_BALANCE: i64 = 1000;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set in environment");
    let config = DatabaseConfig {
        url: database_url,
        max_connections: 5,
        min_connections: 1,
    };

    println!("Connecting to database...");
    let db = medalbank_db::connect(&config)
        .await
        .expect("Failed to connect to database");

    println!("Seeding test user...");
    seed_test_user(&db).await;

    println!("Seeding complete!");
}

/// Seeds the test user and their starting balance.
async fn seed_test_user(db: &DatabaseConnection) {
    // Check if the user already exists
    let existing = users::Entity::find()
        .filter(users::Column::Username.eq(TEST_USERNAME))
        .one(db)
        .await
        .expect("Failed to query users");

    if let Some(user) = existing {
        println!("  Test user already exists (id: {}), skipping...", user.id);
        return;
    }

    let now: sea_orm::prelude::DateTimeWithTimeZone = chrono::Utc::now().into();

    let user = users::ActiveModel {
        username: Set(TEST_USERNAME.to_string()),
        email: Set("test@example.com".to_string()),
        created_at: Set(now),
        ..Default::default()
    };

    let user = match user.insert(db).await {
        Ok(user) => {
            println!("  Created test user: {TEST_USERNAME} (id: {})", user.id);
            user
        }
        Err(e) => {
            eprintln!("Failed to insert test user: {e}");
            return;
        }
    };

    let balance = balances::ActiveModel {
        user_id: Set(user.id),
        store_id: Set(None),
        amount: Set(INITIAL_BALANCE),
        updated_at: Set(now),
        ..Default::default()
    };

    if let Err(e) = balance.insert(db).await {
        eprintln!("Failed to insert initial balance: {e}");
    } else {
        println!("  Set initial balance to {INITIAL_BALANCE} medals");
    }
}
