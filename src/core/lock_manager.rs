//! Per-account locking protocol
//!
//! The `LockManager` is the only way to reach a balance for mutation. It
//! grants exclusive access to one account (`acquire`) or to the two accounts
//! of a transfer (`acquire_ordered`), and access ends when the returned guard
//! is dropped.
//!
//! # Deadlock Avoidance
//!
//! `acquire_ordered` always locks the smaller account id first. Any two
//! workers contending for overlapping accounts therefore request them in the
//! same relative order, so no cycle of waiting workers can form. A transfer
//! from an account to itself takes its single lock once.
//!
//! Workers never hold one guard while calling `acquire` for another account;
//! the only way to hold two locks at once is through `acquire_ordered`.

use super::account_store::AccountStore;
use crate::types::{AccountId, Balance, BankError, TransactionId};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};

/// Exclusive access to one account's balance
///
/// The lock is released when the guard is dropped.
#[derive(Debug)]
pub struct AccountGuard<'a> {
    account: AccountId,
    balance: MutexGuard<'a, Balance>,
}

impl AccountGuard<'_> {
    pub fn id(&self) -> AccountId {
        self.account
    }

    pub fn balance(&self) -> Balance {
        *self.balance
    }

    /// Whether the balance covers `amount`
    pub fn covers(&self, amount: Balance) -> bool {
        *self.balance >= amount
    }

    /// Add `amount` to the balance
    ///
    /// # Errors
    ///
    /// Returns `BankError::ArithmeticOverflow` and leaves the balance
    /// unchanged if the sum does not fit.
    pub fn credit(&mut self, amount: Balance, operation: &str) -> Result<(), BankError> {
        *self.balance = self
            .balance
            .checked_add(amount)
            .ok_or_else(|| BankError::arithmetic_overflow(operation, self.account))?;
        Ok(())
    }

    /// Subtract `amount` from the balance if it is covered
    ///
    /// Returns `false` and leaves the balance unchanged otherwise.
    pub fn debit(&mut self, amount: Balance) -> bool {
        match self.balance.checked_sub(amount) {
            Some(remaining) => {
                *self.balance = remaining;
                true
            }
            None => false,
        }
    }
}

/// Exclusive access to both accounts of a transfer
#[derive(Debug)]
pub enum PairGuard<'a> {
    /// Both sides name the same account, locked once
    Single(AccountGuard<'a>),

    /// Two distinct accounts, `low` locked before `high`
    ///
    /// Fields drop in declaration order, so `high` is released first.
    Ordered {
        high: AccountGuard<'a>,
        low: AccountGuard<'a>,
    },
}

/// Grants per-account locks over a shared `AccountStore`
#[derive(Debug)]
pub struct LockManager {
    store: Arc<AccountStore>,

    /// Acquisitions that found the lock held and had to wait
    contended: AtomicU64,
}

impl LockManager {
    pub fn new(store: Arc<AccountStore>) -> Self {
        Self {
            store,
            contended: AtomicU64::new(0),
        }
    }

    /// The store this manager guards
    pub fn store(&self) -> &Arc<AccountStore> {
        &self.store
    }

    /// Number of acquisitions so far that had to wait for another holder
    pub fn contended_acquisitions(&self) -> u64 {
        self.contended.load(Ordering::Relaxed)
    }

    /// Lock a single account, blocking until it is free
    ///
    /// `tx` is the transaction asking, used for error context only.
    ///
    /// # Errors
    ///
    /// - `BankError::UnknownAccount` if the account is not in the store
    /// - `BankError::PoisonedLock` if a previous holder panicked
    pub fn acquire(&self, account: AccountId, tx: TransactionId) -> Result<AccountGuard<'_>, BankError> {
        let slot = self
            .store
            .slot(account)
            .ok_or_else(|| BankError::unknown_account(account, tx))?;

        let balance = self.lock_slot(account, slot)?;

        Ok(AccountGuard { account, balance })
    }

    /// Lock the two accounts of a transfer in ascending id order
    ///
    /// Both accounts are checked for existence before anything is locked, so
    /// a precondition failure never leaves a lock held.
    ///
    /// # Errors
    ///
    /// Same as [`LockManager::acquire`].
    pub fn acquire_ordered(
        &self,
        a: AccountId,
        b: AccountId,
        tx: TransactionId,
    ) -> Result<PairGuard<'_>, BankError> {
        for account in [a, b] {
            if !self.store.contains(account) {
                return Err(BankError::unknown_account(account, tx));
            }
        }

        if a == b {
            return Ok(PairGuard::Single(self.acquire(a, tx)?));
        }

        let (first, second) = if a < b { (a, b) } else { (b, a) };
        let low = self.acquire(first, tx)?;
        let high = self.acquire(second, tx)?;

        Ok(PairGuard::Ordered { high, low })
    }

    fn lock_slot<'a>(
        &self,
        account: AccountId,
        slot: &'a Mutex<Balance>,
    ) -> Result<MutexGuard<'a, Balance>, BankError> {
        match slot.try_lock() {
            Ok(guard) => Ok(guard),
            Err(TryLockError::WouldBlock) => {
                self.contended.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(account, "waiting for account lock");
                slot.lock()
                    .map_err(|_| BankError::PoisonedLock { account })
            }
            Err(TryLockError::Poisoned(_)) => Err(BankError::PoisonedLock { account }),
        }
    }
}
