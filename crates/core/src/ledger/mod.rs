//! Balance mutation and batch planning.
//!
//! This module implements the ledger's core contract:
//! - Single deposit/withdraw planning against a current balance
//! - Batch validation and running-balance planning
//! - Error types for ledger operations
//!
//! Everything here is pure: callers fetch the current balance, plan the
//! mutation, and persist the outcome themselves.

pub mod batch;
pub mod error;
pub mod mutation;
pub mod types;

pub use batch::{
    BatchError, BatchOperation, BatchPlan, MAX_BATCH_OPERATIONS, OperationError,
    PlannedOperation, plan_batch, validate_operations,
};
pub use error::LedgerError;
pub use mutation::{MutationPlan, plan_mutation};
pub use types::{MAX_TRANSACTION_AMOUNT, TransactionKind};
