//! Account-related types for the bank batch engine
//!
//! This module defines the Account snapshot and the identifier and balance
//! aliases shared by the whole crate.

use serde::Serialize;

/// Account identifier
///
/// Account ids come from the accounts input (or the default account set) and
/// are the key used for lock ordering: two-account operations always lock the
/// smaller id first.
pub type AccountId = u32;

/// Balance and amount unit
///
/// Unsigned, so a committed balance can never be negative.
pub type Balance = u64;

/// Account state
///
/// A plain snapshot of one account. The live balance is held inside the
/// `AccountStore` behind that account's lock; this struct is what goes in and
/// comes out of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Account {
    /// The account id
    pub id: AccountId,

    /// Current balance
    pub balance: Balance,
}

impl Account {
    /// Create an account with the given opening balance
    pub fn new(id: AccountId, balance: Balance) -> Self {
        Account { id, balance }
    }

    /// Build the default account set used when no account definitions exist
    ///
    /// Produces `count` accounts with ids `0..count`, each holding `balance`.
    pub fn default_set(count: usize, balance: Balance) -> Vec<Account> {
        (0..count)
            .map(|index| Account::new(index as AccountId, balance))
            .collect()
    }
}
