//! Core business logic module
//!
//! This module contains the batch engine components:
//! - `account_store` - The fixed set of accounts, one lock per balance
//! - `lock_manager` - Single and ordered two-account lock acquisition
//! - `transaction_log` - Per-transaction outcome slots
//! - `executor` - Deposit, withdraw and transfer under the locking protocol
//! - `orchestrator` - The concurrent pass, the retry pass and reporting

pub mod account_store;
pub mod executor;
pub mod lock_manager;
pub mod orchestrator;
pub mod transaction_log;

pub use account_store::AccountStore;
pub use executor::TransactionExecutor;
pub use lock_manager::{AccountGuard, LockManager, PairGuard};
pub use orchestrator::{
    BatchReport, BatchStats, Orchestrator, RetryOutcome, TransactionProgress, TransactionState,
};
pub use transaction_log::TransactionLog;
