//! Types module
//!
//! Contains core data structures used throughout the application:
//! - `account`: Account snapshot, id and balance aliases
//! - `transaction`: Transaction requests, operations, records and statuses
//! - `error`: Error types for the engine

pub mod account;
pub mod error;
pub mod transaction;

pub use account::{Account, AccountId, Balance};
pub use error::BankError;
pub use transaction::{
    Operation, TransactionId, TransactionKind, TransactionRecord, TransactionRequest,
    TransactionStatus,
};
