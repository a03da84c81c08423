//! Repository abstractions for data access.

pub mod history;
pub mod ledger;
pub mod store;
pub mod user;

pub use history::{HistoryRepository, TransactionFilter};
pub use ledger::LedgerRepository;
pub use store::StoreRepository;
pub use user::UserRepository;
