//! Rust Bank Engine Library
//! # Overview
//!
//! This library runs batches of bank transactions concurrently against a
//! fixed set of accounts. Every transaction gets its own worker; workers
//! share the account store and serialize only on the accounts they touch.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (Account, TransactionRequest, BankError, etc.)
//! - [`cli`] - CLI arguments parsing and run configuration
//! - [`core`] - Business logic components:
//!   - [`core::account_store`] - Fixed account set with one lock per balance
//!   - [`core::lock_manager`] - Ordered two-account locking
//!   - [`core::transaction_log`] - Per-transaction outcome slots
//!   - [`core::executor`] - Deposit, withdraw and transfer
//!   - [`core::orchestrator`] - Concurrent pass, sequential retry pass, report
//! - [`strategy`] - Pluggable worker execution (OS threads or tokio)
//! - [`io`] - Input parsing and report output
//! - [`pipeline`] - Inputs to report in one call
//!
//! # Transaction Types
//!
//! - **Deposit**: Credit funds to an account
//! - **Withdraw**: Debit funds from an account (requires sufficient balance)
//! - **Transfer**: Move funds between two accounts atomically
//!
//! Insufficient funds is an ordinary outcome: the transaction is logged as
//! `Failed` and retried once after the concurrent pass.
//!
//! # Deadlock Freedom
//!
//! A transfer locks its two accounts in ascending id order, and no worker
//! holds one account lock while waiting for another outside that protocol.

// Module declarations
pub mod cli;
pub mod core;
pub mod io;
pub mod pipeline;
pub mod strategy;
pub mod types;

pub use core::{AccountStore, BatchReport, LockManager, Orchestrator, TransactionExecutor, TransactionLog};
pub use io::write_report;
pub use types::{
    Account, AccountId, Balance, BankError, Operation, TransactionId, TransactionKind,
    TransactionRecord, TransactionRequest, TransactionStatus,
};
