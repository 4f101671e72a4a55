//! Error types for the bank batch engine
//!
//! Insufficient funds is deliberately absent: it is a business outcome
//! (`TransactionStatus::Failed`) and never travels as an error. Everything in
//! this module is fatal to the run.
//!
//! # Error Categories
//!
//! - **Input Errors**: missing or unreadable files, malformed lines
//! - **Precondition Violations**: unknown accounts, missing account fields,
//!   duplicate ids, empty batches
//! - **Substrate Errors**: worker spawn failures, panicked workers, poisoned locks

use super::account::AccountId;
use super::transaction::{TransactionId, TransactionKind};
use thiserror::Error;

/// Main error type for the bank batch engine
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BankError {
    /// File not found at the specified path
    #[error("File not found: {path}")]
    FileNotFound {
        /// The path that was not found
        path: String,
    },

    /// I/O error occurred while reading or writing
    #[error("I/O error: {message}")]
    IoError {
        /// Description of the I/O error
        message: String,
    },

    /// A line of an input file could not be parsed
    #[error("Parse error{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    ParseError {
        /// Line number where the error occurred (if available)
        line: Option<u64>,
        /// Description of the parsing error
        message: String,
    },

    /// Transaction kind code outside `0..=2`
    #[error("Invalid transaction kind {code}{}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    InvalidTransactionKind {
        /// The code found in the input
        code: i64,
        /// Line number (if available)
        line: Option<u64>,
    },

    /// The batch contains no transactions
    #[error("No transactions to process")]
    EmptyBatch,

    /// Two transactions share the same id
    #[error("Duplicate transaction id {tx}")]
    DuplicateTransaction {
        /// The repeated transaction id
        tx: TransactionId,
    },

    /// Two account definitions share the same id
    #[error("Duplicate account id {account}")]
    DuplicateAccount {
        /// The repeated account id
        account: AccountId,
    },

    /// A transaction lacks an account field its kind requires
    #[error("{kind} transaction {tx} requires a '{field}' account")]
    MissingAccount {
        /// Transaction id
        tx: TransactionId,
        /// Kind of the transaction
        kind: TransactionKind,
        /// Name of the missing field
        field: String,
    },

    /// A transaction references an account that is not in the store
    #[error("Account {account} referenced by transaction {tx} does not exist")]
    UnknownAccount {
        /// The unknown account id
        account: AccountId,
        /// Transaction id
        tx: TransactionId,
    },

    /// A log write addressed a slot outside the batch
    #[error("Transaction {tx} is outside the log ({capacity} slots)")]
    LogSlotOutOfRange {
        /// Transaction id
        tx: TransactionId,
        /// Number of slots in the log
        capacity: usize,
    },

    /// A credit would overflow the balance type
    #[error("Arithmetic overflow in {operation} for account {account}")]
    ArithmeticOverflow {
        /// Operation that would overflow
        operation: String,
        /// Account id
        account: AccountId,
    },

    /// An account lock was poisoned by a panicking holder
    #[error("Lock for account {account} was poisoned by a panicked worker")]
    PoisonedLock {
        /// Account id
        account: AccountId,
    },

    /// A worker could not be started
    #[error("Failed to spawn worker for transaction {tx}: {message}")]
    WorkerSpawn {
        /// Transaction id
        tx: TransactionId,
        /// Description of the failure
        message: String,
    },

    /// A worker panicked before reporting its outcome
    #[error("Worker panicked: {message}")]
    WorkerPanicked {
        /// Description of the panic
        message: String,
    },

    /// The async runtime could not be created
    #[error("Failed to create runtime: {message}")]
    Runtime {
        /// Description of the failure
        message: String,
    },

    /// The orchestrator attempted a state change the retry policy forbids
    #[error("Transaction {tx} cannot move from {from} to {to}")]
    InvalidStateTransition {
        /// Transaction id
        tx: TransactionId,
        /// Current state
        from: String,
        /// Requested state
        to: String,
    },
}

impl From<std::io::Error> for BankError {
    fn from(error: std::io::Error) -> Self {
        BankError::IoError {
            message: error.to_string(),
        }
    }
}

impl From<csv::Error> for BankError {
    fn from(error: csv::Error) -> Self {
        let line = error.position().map(|pos| pos.line());

        BankError::ParseError {
            line,
            message: error.to_string(),
        }
    }
}

impl BankError {
    /// Create a ParseError
    pub fn parse_error(line: Option<u64>, message: impl Into<String>) -> Self {
        BankError::ParseError {
            line,
            message: message.into(),
        }
    }

    /// Create a MissingAccount error
    pub fn missing_account(tx: TransactionId, kind: TransactionKind, field: &str) -> Self {
        BankError::MissingAccount {
            tx,
            kind,
            field: field.to_string(),
        }
    }

    /// Create an UnknownAccount error
    pub fn unknown_account(account: AccountId, tx: TransactionId) -> Self {
        BankError::UnknownAccount { account, tx }
    }

    /// Create an ArithmeticOverflow error
    pub fn arithmetic_overflow(operation: &str, account: AccountId) -> Self {
        BankError::ArithmeticOverflow {
            operation: operation.to_string(),
            account,
        }
    }

    /// Create a WorkerSpawn error
    pub fn worker_spawn(tx: TransactionId, message: impl Into<String>) -> Self {
        BankError::WorkerSpawn {
            tx,
            message: message.into(),
        }
    }

    /// Create a WorkerPanicked error
    pub fn worker_panicked(message: impl Into<String>) -> Self {
        BankError::WorkerPanicked {
            message: message.into(),
        }
    }

    /// Create an InvalidStateTransition error
    pub fn invalid_transition(
        tx: TransactionId,
        from: impl ToString,
        to: impl ToString,
    ) -> Self {
        BankError::InvalidStateTransition {
            tx,
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::file_not_found(
        BankError::FileNotFound { path: "transactions.txt".to_string() },
        "File not found: transactions.txt"
    )]
    #[case::parse_error_with_line(
        BankError::parse_error(Some(3), "expected 4 fields"),
        "Parse error at line 3: expected 4 fields"
    )]
    #[case::parse_error_without_line(
        BankError::parse_error(None, "expected 4 fields"),
        "Parse error: expected 4 fields"
    )]
    #[case::invalid_kind(
        BankError::InvalidTransactionKind { code: 7, line: Some(2) },
        "Invalid transaction kind 7 at line 2"
    )]
    #[case::empty_batch(BankError::EmptyBatch, "No transactions to process")]
    #[case::missing_account(
        BankError::missing_account(4, TransactionKind::Transfer, "to"),
        "Transfer transaction 4 requires a 'to' account"
    )]
    #[case::unknown_account(
        BankError::unknown_account(42, 0),
        "Account 42 referenced by transaction 0 does not exist"
    )]
    #[case::overflow(
        BankError::arithmetic_overflow("deposit", 1),
        "Arithmetic overflow in deposit for account 1"
    )]
    #[case::poisoned(
        BankError::PoisonedLock { account: 3 },
        "Lock for account 3 was poisoned by a panicked worker"
    )]
    fn test_error_display(#[case] error: BankError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "Permission denied");
        let error: BankError = io_error.into();
        assert!(matches!(error, BankError::IoError { .. }));
        assert_eq!(error.to_string(), "I/O error: Permission denied");
    }
}
