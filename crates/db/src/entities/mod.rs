//! `SeaORM` entity definitions.

pub mod balances;
pub mod login_history;
pub mod stores;
pub mod transactions;
pub mod users;

pub use transactions::TransactionKind;
