//! Transaction-related types for the bank batch engine
//!
//! This module defines transaction kinds, the immutable request read from
//! input, the validated operation the executor runs, and the outcome record
//! stored in the transaction log.

use super::account::{AccountId, Balance};
use super::error::BankError;
use serde::Serialize;
use std::fmt;

/// Transaction identifier
///
/// Assigned from the position of the transaction in the batch, starting at 0.
/// Each id owns exactly one slot in the transaction log.
pub type TransactionId = u32;

/// Transaction kinds supported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TransactionKind {
    /// Credit funds to an account. Never fails for an existing account.
    Deposit,

    /// Debit funds from an account. Fails when the balance is too low.
    Withdraw,

    /// Move funds between two accounts. Fails when the source balance is too low.
    Transfer,
}

impl TransactionKind {
    /// Map an input kind code (`0`, `1`, `2`) to a kind
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(TransactionKind::Deposit),
            1 => Some(TransactionKind::Withdraw),
            2 => Some(TransactionKind::Transfer),
            _ => None,
        }
    }

    /// The input code of this kind
    pub fn code(self) -> i64 {
        match self {
            TransactionKind::Deposit => 0,
            TransactionKind::Withdraw => 1,
            TransactionKind::Transfer => 2,
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransactionKind::Deposit => "Deposit",
            TransactionKind::Withdraw => "Withdraw",
            TransactionKind::Transfer => "Transfer",
        };
        f.write_str(name)
    }
}

/// Two-valued outcome of one transaction attempt
///
/// This is the only thing a worker reports back to the orchestrator for a
/// transaction that ran to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TransactionStatus {
    Success,
    Failed,
}

impl TransactionStatus {
    pub fn is_success(self) -> bool {
        matches!(self, TransactionStatus::Success)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionStatus::Success => f.write_str("Success"),
            TransactionStatus::Failed => f.write_str("Failed"),
        }
    }
}

/// A transaction as read from input
///
/// `from` and `to` are optional because not every kind uses both accounts;
/// `operation` checks that the fields the kind needs are present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRequest {
    /// Position of the transaction in the batch
    pub id: TransactionId,

    /// What the transaction does
    pub kind: TransactionKind,

    /// Source account (Withdraw, Transfer)
    pub from: Option<AccountId>,

    /// Destination account (Deposit, Transfer)
    pub to: Option<AccountId>,

    /// Amount moved by the transaction
    pub amount: Balance,
}

impl TransactionRequest {
    pub fn deposit(id: TransactionId, to: AccountId, amount: Balance) -> Self {
        TransactionRequest {
            id,
            kind: TransactionKind::Deposit,
            from: None,
            to: Some(to),
            amount,
        }
    }

    pub fn withdraw(id: TransactionId, from: AccountId, amount: Balance) -> Self {
        TransactionRequest {
            id,
            kind: TransactionKind::Withdraw,
            from: Some(from),
            to: None,
            amount,
        }
    }

    pub fn transfer(id: TransactionId, from: AccountId, to: AccountId, amount: Balance) -> Self {
        TransactionRequest {
            id,
            kind: TransactionKind::Transfer,
            from: Some(from),
            to: Some(to),
            amount,
        }
    }

    /// Resolve the request into the operation the executor runs
    ///
    /// # Errors
    ///
    /// Returns `BankError::MissingAccount` when the account field required by
    /// the kind is absent. Fields the kind does not use are ignored.
    pub fn operation(&self) -> Result<Operation, BankError> {
        let require = |field: Option<AccountId>, name: &str| {
            field.ok_or_else(|| BankError::missing_account(self.id, self.kind, name))
        };

        match self.kind {
            TransactionKind::Deposit => Ok(Operation::Deposit {
                account: require(self.to, "to")?,
            }),
            TransactionKind::Withdraw => Ok(Operation::Withdraw {
                account: require(self.from, "from")?,
            }),
            TransactionKind::Transfer => Ok(Operation::Transfer {
                from: require(self.from, "from")?,
                to: require(self.to, "to")?,
            }),
        }
    }
}

/// A validated operation with exactly the accounts its kind touches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Deposit { account: AccountId },
    Withdraw { account: AccountId },
    Transfer { from: AccountId, to: AccountId },
}

impl Operation {
    pub fn kind(&self) -> TransactionKind {
        match self {
            Operation::Deposit { .. } => TransactionKind::Deposit,
            Operation::Withdraw { .. } => TransactionKind::Withdraw,
            Operation::Transfer { .. } => TransactionKind::Transfer,
        }
    }

    /// The `(from, to)` pair as it appears in the log record
    pub fn endpoints(&self) -> (Option<AccountId>, Option<AccountId>) {
        match *self {
            Operation::Deposit { account } => (None, Some(account)),
            Operation::Withdraw { account } => (Some(account), None),
            Operation::Transfer { from, to } => (Some(from), Some(to)),
        }
    }

    /// Every account id the operation needs to lock
    pub fn accounts(&self) -> impl Iterator<Item = AccountId> {
        let (from, to) = self.endpoints();
        from.into_iter().chain(to)
    }
}

/// Log entry describing the outcome of the latest attempt of a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionRecord {
    pub id: TransactionId,
    pub kind: TransactionKind,
    pub from: Option<AccountId>,
    pub to: Option<AccountId>,
    pub amount: Balance,
    pub status: TransactionStatus,
}

impl TransactionRecord {
    /// Build the record for an attempt of `operation`
    pub fn new(
        id: TransactionId,
        operation: Operation,
        amount: Balance,
        status: TransactionStatus,
    ) -> Self {
        let (from, to) = operation.endpoints();
        TransactionRecord {
            id,
            kind: operation.kind(),
            from,
            to,
            amount,
            status,
        }
    }
}
