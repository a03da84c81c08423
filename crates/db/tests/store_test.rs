//! Integration tests for the store repository: CRUD, name uniqueness,
//! fan-out, and the delete-protection cascade.

mod common;

use medalbank_core::ledger::TransactionKind;
use medalbank_db::entities::{balances, stores, transactions};
use medalbank_db::repositories::ledger::{ApplyTransactionInput, LedgerRepository};
use medalbank_db::repositories::store::{
    CreateStoreInput, StoreError, StoreRepository, UpdateStoreInput,
};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};

fn create_input(name: &str) -> CreateStoreInput {
    CreateStoreInput {
        name: name.to_string(),
        description: None,
        color: None,
        create_balance_for_all_users: false,
    }
}

#[tokio::test]
async fn test_create_get_and_list() {
    let db = common::setup().await;
    let repo = StoreRepository::new(db);

    let created = repo
        .create(CreateStoreInput {
            name: "Arcade Alpha".to_string(),
            description: Some("downtown branch".to_string()),
            color: Some("#FF0000".to_string()),
            create_balance_for_all_users: false,
        })
        .await
        .unwrap();
    assert_eq!(created.store.name, "Arcade Alpha");
    assert_eq!(created.store.color, "#FF0000");

    let second = repo.create(create_input("Arcade Beta")).await.unwrap();
    // Default display color applies when none was given.
    assert_eq!(second.store.color, "#3B82F6");

    let fetched = repo.get(created.store.id).await.unwrap();
    assert_eq!(fetched.store.id, created.store.id);
    assert_eq!(fetched.user_count, 0);
    assert_eq!(fetched.total_balance, 0);

    let all = repo.list().await.unwrap();
    assert_eq!(all.len(), 2);
    // Oldest first.
    assert_eq!(all[0].store.id, created.store.id);
}

#[tokio::test]
async fn test_duplicate_name_rejected() {
    let db = common::setup().await;
    let repo = StoreRepository::new(db);

    repo.create(create_input("Arcade Alpha")).await.unwrap();
    let result = repo.create(create_input("Arcade Alpha")).await;
    assert!(matches!(result, Err(StoreError::DuplicateName(_))));
}

#[tokio::test]
async fn test_create_with_fanout() {
    let db = common::setup().await;
    let alice = common::seed_user(&db, "alice", 1000).await;
    let bob = common::seed_user(&db, "bob", 500).await;
    let repo = StoreRepository::new(db.clone());

    let created = repo
        .create(CreateStoreInput {
            name: "Arcade Alpha".to_string(),
            description: None,
            color: None,
            create_balance_for_all_users: true,
        })
        .await
        .unwrap();
    assert_eq!(created.user_count, 2);
    assert_eq!(created.total_balance, 0);

    let rows = balances::Entity::find()
        .filter(balances::Column::StoreId.eq(created.store.id))
        .all(&db)
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.amount == 0));
    let users: Vec<i64> = rows.iter().map(|r| r.user_id).collect();
    assert!(users.contains(&alice) && users.contains(&bob));
}

#[tokio::test]
async fn test_update_store() {
    let db = common::setup().await;
    let repo = StoreRepository::new(db);

    let created = repo.create(create_input("Arcade Alpha")).await.unwrap();
    let other = repo.create(create_input("Arcade Beta")).await.unwrap();

    // Renaming onto another store's name conflicts.
    let result = repo
        .update(
            created.store.id,
            UpdateStoreInput {
                name: "Arcade Beta".to_string(),
                description: None,
                color: None,
            },
        )
        .await;
    assert!(matches!(result, Err(StoreError::DuplicateName(_))));

    // Keeping its own name is fine; omitted color is preserved.
    let updated = repo
        .update(
            created.store.id,
            UpdateStoreInput {
                name: "Arcade Alpha".to_string(),
                description: Some("renovated".to_string()),
                color: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.store.description.as_deref(), Some("renovated"));
    assert_eq!(updated.store.color, "#3B82F6");

    let result = repo
        .update(
            other.store.id + 100,
            UpdateStoreInput {
                name: "Ghost".to_string(),
                description: None,
                color: None,
            },
        )
        .await;
    assert!(matches!(result, Err(StoreError::NotFound(_))));
}

#[tokio::test]
async fn test_delete_empty_store_without_force() {
    let db = common::setup().await;
    let repo = StoreRepository::new(db.clone());

    let created = repo.create(create_input("Arcade Alpha")).await.unwrap();
    let deleted = repo.delete(created.store.id, false).await.unwrap();
    assert!(!deleted.force_deleted);
    assert_eq!(deleted.deleted_balance_records, 0);

    assert_eq!(stores::Entity::find().count(&db).await.unwrap(), 0);
}

#[tokio::test]
async fn test_delete_guard_and_force_cascade() {
    let db = common::setup().await;
    let user_id = common::seed_user(&db, "alice", 1000).await;
    let store_repo = StoreRepository::new(db.clone());
    let ledger = LedgerRepository::new(db.clone());

    let created = store_repo.create(create_input("Arcade Alpha")).await.unwrap();
    let store_id = created.store.id;

    // Give the store a balance and a transaction.
    ledger
        .apply_transaction(&ApplyTransactionInput {
            user_id,
            store_id: Some(store_id),
            kind: TransactionKind::Deposit,
            amount: 300,
            description: None,
        })
        .await
        .unwrap();

    // Unforced deletion is refused and deletes nothing.
    let err = store_repo.delete(store_id, false).await.unwrap_err();
    match err {
        StoreError::HasRelatedData {
            balance_records,
            transactions: tx_count,
            total_balance,
        } => {
            assert_eq!(balance_records, 1);
            assert_eq!(tx_count, 1);
            assert_eq!(total_balance, 300);
        }
        other => panic!("expected HasRelatedData, got {other:?}"),
    }
    assert_eq!(stores::Entity::find().count(&db).await.unwrap(), 1);

    // Forced deletion cascades to balances and transactions.
    let deleted = store_repo.delete(store_id, true).await.unwrap();
    assert!(deleted.force_deleted);
    assert_eq!(deleted.deleted_balance_records, 1);
    assert_eq!(deleted.deleted_transactions, 1);

    assert_eq!(stores::Entity::find().count(&db).await.unwrap(), 0);
    assert_eq!(
        balances::Entity::find()
            .filter(balances::Column::StoreId.eq(store_id))
            .count(&db)
            .await
            .unwrap(),
        0
    );
    assert_eq!(
        transactions::Entity::find()
            .filter(transactions::Column::StoreId.eq(store_id))
            .count(&db)
            .await
            .unwrap(),
        0
    );

    // The user's unscoped balance survives the cascade.
    let snapshot = ledger.read_balance(user_id, None).await.unwrap();
    assert_eq!(snapshot.amount, 1000);
}

#[tokio::test]
async fn test_store_stats() {
    let db = common::setup().await;
    let user_id = common::seed_user(&db, "alice", 1000).await;
    let repo = StoreRepository::new(db.clone());
    let ledger = LedgerRepository::new(db);

    let created = repo.create(create_input("Arcade Alpha")).await.unwrap();
    let store_id = created.store.id;

    for (kind, amount) in [
        (TransactionKind::Deposit, 500),
        (TransactionKind::Deposit, 200),
        (TransactionKind::Withdraw, 100),
    ] {
        ledger
            .apply_transaction(&ApplyTransactionInput {
                user_id,
                store_id: Some(store_id),
                kind,
                amount,
                description: None,
            })
            .await
            .unwrap();
    }

    let stats = repo.stats(store_id).await.unwrap();
    assert_eq!(stats.user_count, 1);
    assert_eq!(stats.total_balance, 600);
    assert_eq!(stats.transaction_count, 3);
    assert_eq!(stats.total_deposits, 700);
    assert_eq!(stats.total_withdrawals, 100);

    assert_eq!(stats.recent_transactions.len(), 3);
    // Newest first, with usernames resolved.
    assert_eq!(stats.recent_transactions[0].0.amount, 100);
    assert_eq!(
        stats.recent_transactions[0].1.as_deref(),
        Some("alice")
    );

    let result = repo.stats(store_id + 99).await;
    assert!(matches!(result, Err(StoreError::NotFound(_))));
}
