//! Shared account storage
//!
//! This module provides the `AccountStore`, the fixed set of accounts a batch
//! runs against. Every balance lives behind its own `Mutex`, so there is one
//! exclusive lock per account and no global lock.
//!
//! The set of accounts is fixed when the store is built: accounts are never
//! created or destroyed during a run, which is what lets the map itself be
//! shared immutably across workers while only the balances are mutated.
//!
//! The store hands out raw slots only inside the crate. All balance mutation
//! goes through the `LockManager`, which owns the acquisition protocol.

use crate::types::{Account, AccountId, Balance, BankError};
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Fixed set of accounts shared by all workers of a batch
#[derive(Debug)]
pub struct AccountStore {
    /// Balances keyed by account id, each behind its own lock
    ///
    /// A `BTreeMap` keeps snapshots in ascending id order.
    accounts: BTreeMap<AccountId, Mutex<Balance>>,
}

impl AccountStore {
    /// Build a store from account definitions
    ///
    /// # Errors
    ///
    /// Returns `BankError::DuplicateAccount` if two definitions share an id.
    pub fn new(accounts: impl IntoIterator<Item = Account>) -> Result<Self, BankError> {
        let mut map = BTreeMap::new();

        for account in accounts {
            if map.insert(account.id, Mutex::new(account.balance)).is_some() {
                return Err(BankError::DuplicateAccount {
                    account: account.id,
                });
            }
        }

        Ok(AccountStore { accounts: map })
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Check whether an account exists
    pub fn contains(&self, id: AccountId) -> bool {
        self.accounts.contains_key(&id)
    }

    /// Account ids in ascending order
    pub fn ids(&self) -> impl Iterator<Item = AccountId> + '_ {
        self.accounts.keys().copied()
    }

    /// The lock guarding an account's balance
    pub(crate) fn slot(&self, id: AccountId) -> Option<&Mutex<Balance>> {
        self.accounts.get(&id)
    }

    /// Read every balance
    ///
    /// Each account is locked on its own, briefly, in ascending id order. The
    /// snapshot is only a consistent whole once no worker is running, which
    /// is how the orchestrator uses it.
    ///
    /// # Errors
    ///
    /// Returns `BankError::PoisonedLock` if a worker panicked while holding
    /// an account lock.
    pub fn snapshot(&self) -> Result<Vec<Account>, BankError> {
        self.accounts
            .iter()
            .map(|(&id, slot)| {
                let balance = slot
                    .lock()
                    .map_err(|_| BankError::PoisonedLock { account: id })?;
                Ok(Account::new(id, *balance))
            })
            .collect()
    }

    /// Sum of all balances
    ///
    /// Widened to `u128` so the sum itself cannot overflow.
    pub fn total_balance(&self) -> Result<u128, BankError> {
        Ok(self
            .snapshot()?
            .iter()
            .map(|account| u128::from(account.balance))
            .sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_store_holds_every_account() {
        let store = AccountStore::new(vec![Account::new(2, 20), Account::new(0, 5)]).unwrap();

        assert_eq!(store.len(), 2);
        assert!(store.contains(0));
        assert!(store.contains(2));
        assert!(!store.contains(1));
    }

    #[test]
    fn test_new_store_rejects_duplicate_ids() {
        let result = AccountStore::new(vec![Account::new(1, 10), Account::new(1, 20)]);

        assert_eq!(result.unwrap_err(), BankError::DuplicateAccount { account: 1 });
    }

    #[test]
    fn test_empty_store() {
        let store = AccountStore::new(Vec::new()).unwrap();

        assert!(store.is_empty());
        assert!(store.snapshot().unwrap().is_empty());
        assert_eq!(store.total_balance().unwrap(), 0);
    }

    #[test]
    fn test_snapshot_is_sorted_by_id() {
        let store = AccountStore::new(vec![
            Account::new(3, 30),
            Account::new(1, 10),
            Account::new(2, 20),
        ])
        .unwrap();

        let snapshot = store.snapshot().unwrap();

        assert_eq!(
            snapshot,
            vec![Account::new(1, 10), Account::new(2, 20), Account::new(3, 30)]
        );
        assert_eq!(store.ids().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_total_balance_does_not_overflow() {
        let store =
            AccountStore::new(vec![Account::new(0, Balance::MAX), Account::new(1, Balance::MAX)])
                .unwrap();

        assert_eq!(store.total_balance().unwrap(), 2 * u128::from(Balance::MAX));
    }

    #[test]
    fn test_snapshot_reports_poisoned_lock() {
        use std::sync::Arc;
        use std::thread;

        let store = Arc::new(AccountStore::new(vec![Account::new(0, 1)]).unwrap());

        let poisoner = Arc::clone(&store);
        let _ = thread::spawn(move || {
            let _guard = poisoner.slot(0).unwrap().lock().unwrap();
            panic!("poison the lock");
        })
        .join();

        assert_eq!(
            store.snapshot().unwrap_err(),
            BankError::PoisonedLock { account: 0 }
        );
    }
}
