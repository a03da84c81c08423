//! `SeaORM` Entity for the transactions table.
//!
//! Rows are immutable once written; the only deletion path is the store
//! force-delete cascade.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Transaction kind as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Medals added to a balance.
    #[sea_orm(string_value = "deposit")]
    Deposit,
    /// Medals paid out of a balance.
    #[sea_orm(string_value = "withdraw")]
    Withdraw,
}

impl From<medalbank_core::ledger::TransactionKind> for TransactionKind {
    fn from(kind: medalbank_core::ledger::TransactionKind) -> Self {
        match kind {
            medalbank_core::ledger::TransactionKind::Deposit => Self::Deposit,
            medalbank_core::ledger::TransactionKind::Withdraw => Self::Withdraw,
        }
    }
}

impl From<TransactionKind> for medalbank_core::ledger::TransactionKind {
    fn from(kind: TransactionKind) -> Self {
        match kind {
            TransactionKind::Deposit => Self::Deposit,
            TransactionKind::Withdraw => Self::Withdraw,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: i64,
    pub store_id: Option<i64>,
    pub kind: TransactionKind,
    pub amount: i64,
    pub balance_before: i64,
    pub balance_after: i64,
    pub description: Option<String>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    Users,
    #[sea_orm(
        belongs_to = "super::stores::Entity",
        from = "Column::StoreId",
        to = "super::stores::Column::Id"
    )]
    Stores,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::stores::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Stores.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
