//! Transaction execution
//!
//! The `TransactionExecutor` runs one attempt of one transaction: it takes the
//! lock(s) the operation needs, applies the effect or decides the attempt
//! failed, writes the outcome into the transaction's log slot and only then
//! releases the locks.
//!
//! # Outcomes
//!
//! - Insufficient funds is a business outcome: the attempt is logged as
//!   `Failed` and `Ok(TransactionStatus::Failed)` is returned.
//! - Unknown accounts, missing account fields, overflow and poisoned locks are
//!   fatal and returned as `Err(BankError)`. Nothing is logged for them and no
//!   balance is changed.
//!
//! The executor keeps no state between calls beyond the shared lock manager
//! and log it was built with, so one instance is shared by every worker.

use super::lock_manager::{LockManager, PairGuard};
use super::transaction_log::TransactionLog;
use crate::types::{
    AccountId, Balance, BankError, Operation, TransactionId, TransactionRecord,
    TransactionRequest, TransactionStatus,
};
use std::sync::Arc;
use tracing::debug;

/// Applies transactions against shared accounts and records their outcomes
#[derive(Debug)]
pub struct TransactionExecutor {
    locks: Arc<LockManager>,
    log: Arc<TransactionLog>,
}

impl TransactionExecutor {
    pub fn new(locks: Arc<LockManager>, log: Arc<TransactionLog>) -> Self {
        Self { locks, log }
    }

    pub fn locks(&self) -> &Arc<LockManager> {
        &self.locks
    }

    pub fn log(&self) -> &Arc<TransactionLog> {
        &self.log
    }

    /// Run one attempt of a transaction request
    ///
    /// Dispatches to [`deposit`](Self::deposit), [`withdraw`](Self::withdraw)
    /// or [`transfer`](Self::transfer) based on the request kind.
    ///
    /// # Errors
    ///
    /// Returns `BankError::MissingAccount` if the request lacks an account its
    /// kind needs, plus any error of the dispatched operation.
    pub fn execute(&self, request: &TransactionRequest) -> Result<TransactionStatus, BankError> {
        match request.operation()? {
            Operation::Deposit { account } => self.deposit(account, request.amount, request.id),
            Operation::Withdraw { account } => self.withdraw(account, request.amount, request.id),
            Operation::Transfer { from, to } => {
                self.transfer(from, to, request.amount, request.id)
            }
        }
    }

    /// Credit `amount` to `account`
    ///
    /// Always succeeds for an existing account.
    ///
    /// # Errors
    ///
    /// - `BankError::UnknownAccount` if the account does not exist
    /// - `BankError::ArithmeticOverflow` if the balance would overflow
    /// - `BankError::LogSlotOutOfRange` if `tx` is not a slot of the log
    pub fn deposit(
        &self,
        account: AccountId,
        amount: Balance,
        tx: TransactionId,
    ) -> Result<TransactionStatus, BankError> {
        let operation = Operation::Deposit { account };
        self.log.check_slot(tx)?;

        let mut guard = self.locks.acquire(account, tx)?;
        guard.credit(amount, "deposit")?;
        self.record(tx, operation, amount, TransactionStatus::Success)?;
        drop(guard);

        Ok(TransactionStatus::Success)
    }

    /// Debit `amount` from `account` if the balance covers it
    ///
    /// # Errors
    ///
    /// - `BankError::UnknownAccount` if the account does not exist
    /// - `BankError::LogSlotOutOfRange` if `tx` is not a slot of the log
    pub fn withdraw(
        &self,
        account: AccountId,
        amount: Balance,
        tx: TransactionId,
    ) -> Result<TransactionStatus, BankError> {
        let operation = Operation::Withdraw { account };
        self.log.check_slot(tx)?;

        let mut guard = self.locks.acquire(account, tx)?;
        let status = if guard.debit(amount) {
            TransactionStatus::Success
        } else {
            debug!(tx, account, amount, balance = guard.balance(), "insufficient funds for withdraw");
            TransactionStatus::Failed
        };
        self.record(tx, operation, amount, status)?;
        drop(guard);

        Ok(status)
    }

    /// Move `amount` from `from` to `to` if the source balance covers it
    ///
    /// Both accounts stay locked from the balance check until after the log
    /// write, so no other worker can observe the debit without the credit.
    ///
    /// # Errors
    ///
    /// - `BankError::UnknownAccount` if either account does not exist
    /// - `BankError::ArithmeticOverflow` if the destination would overflow
    /// - `BankError::LogSlotOutOfRange` if `tx` is not a slot of the log
    pub fn transfer(
        &self,
        from: AccountId,
        to: AccountId,
        amount: Balance,
        tx: TransactionId,
    ) -> Result<TransactionStatus, BankError> {
        let operation = Operation::Transfer { from, to };
        self.log.check_slot(tx)?;

        let mut guards = self.locks.acquire_ordered(from, to, tx)?;
        let status = match &mut guards {
            // Moving funds within one account leaves the balance as it is
            PairGuard::Single(guard) => {
                if guard.covers(amount) {
                    TransactionStatus::Success
                } else {
                    TransactionStatus::Failed
                }
            }
            PairGuard::Ordered { high, low } => {
                let (source, destination) = if low.id() == from {
                    (low, high)
                } else {
                    (high, low)
                };

                if source.covers(amount) {
                    destination.credit(amount, "transfer")?;
                    let debited = source.debit(amount);
                    debug_assert!(debited);
                    TransactionStatus::Success
                } else {
                    TransactionStatus::Failed
                }
            }
        };

        if !status.is_success() {
            debug!(tx, from, to, amount, "insufficient funds for transfer");
        }
        self.record(tx, operation, amount, status)?;
        drop(guards);

        Ok(status)
    }

    fn record(
        &self,
        tx: TransactionId,
        operation: Operation,
        amount: Balance,
        status: TransactionStatus,
    ) -> Result<(), BankError> {
        self.log
            .write(TransactionRecord::new(tx, operation, amount, status))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::account_store::AccountStore;
    use crate::types::{Account, TransactionKind};
    use rstest::rstest;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    fn executor(accounts: Vec<Account>, slots: usize) -> TransactionExecutor {
        let store = Arc::new(AccountStore::new(accounts).unwrap());
        TransactionExecutor::new(
            Arc::new(LockManager::new(store)),
            Arc::new(TransactionLog::with_slots(slots)),
        )
    }

    fn balances(executor: &TransactionExecutor) -> Vec<Account> {
        executor.locks().store().snapshot().unwrap()
    }

    #[test]
    fn test_transfer_moves_funds() {
        let executor = executor(vec![Account::new(0, 500), Account::new(1, 500)], 1);

        let status = executor.transfer(0, 1, 200, 0).unwrap();

        assert_eq!(status, TransactionStatus::Success);
        assert_eq!(
            balances(&executor),
            vec![Account::new(0, 300), Account::new(1, 700)]
        );
        assert_eq!(
            executor.log().get(0).unwrap(),
            TransactionRecord {
                id: 0,
                kind: TransactionKind::Transfer,
                from: Some(0),
                to: Some(1),
                amount: 200,
                status: TransactionStatus::Success,
            }
        );
    }

    #[test]
    fn test_withdraw_insufficient_funds_is_logged_as_failed() {
        let executor = executor(vec![Account::new(0, 100)], 1);

        let status = executor.withdraw(0, 150, 0).unwrap();

        assert_eq!(status, TransactionStatus::Failed);
        assert_eq!(balances(&executor), vec![Account::new(0, 100)]);
        assert_eq!(
            executor.log().get(0).unwrap(),
            TransactionRecord {
                id: 0,
                kind: TransactionKind::Withdraw,
                from: Some(0),
                to: None,
                amount: 150,
                status: TransactionStatus::Failed,
            }
        );
    }

    #[test]
    fn test_deposit_credits_account() {
        let executor = executor(vec![Account::new(0, 0)], 1);

        let status = executor.deposit(0, 50, 0).unwrap();

        assert_eq!(status, TransactionStatus::Success);
        assert_eq!(balances(&executor), vec![Account::new(0, 50)]);
        let record = executor.log().get(0).unwrap();
        assert_eq!(record.from, None);
        assert_eq!(record.to, Some(0));
    }

    #[test]
    fn test_withdraw_exact_balance_succeeds() {
        let executor = executor(vec![Account::new(0, 100)], 1);

        assert_eq!(executor.withdraw(0, 100, 0).unwrap(), TransactionStatus::Success);
        assert_eq!(balances(&executor), vec![Account::new(0, 0)]);
    }

    #[test]
    fn test_transfer_insufficient_funds_changes_nothing() {
        let executor = executor(vec![Account::new(0, 10), Account::new(1, 0)], 1);

        assert_eq!(executor.transfer(0, 1, 11, 0).unwrap(), TransactionStatus::Failed);
        assert_eq!(
            balances(&executor),
            vec![Account::new(0, 10), Account::new(1, 0)]
        );
        assert_eq!(executor.log().get(0).unwrap().status, TransactionStatus::Failed);
    }

    #[rstest]
    #[case::deposit(TransactionRequest::deposit(0, 0, 0))]
    #[case::withdraw(TransactionRequest::withdraw(0, 0, 0))]
    #[case::transfer(TransactionRequest::transfer(0, 0, 1, 0))]
    fn test_zero_amount_succeeds_without_effect(#[case] request: TransactionRequest) {
        let executor = executor(vec![Account::new(0, 0), Account::new(1, 0)], 1);

        assert_eq!(executor.execute(&request).unwrap(), TransactionStatus::Success);
        assert_eq!(
            balances(&executor),
            vec![Account::new(0, 0), Account::new(1, 0)]
        );
        assert_eq!(executor.log().get(0).unwrap().status, TransactionStatus::Success);
    }

    #[rstest]
    #[case::covered(40, TransactionStatus::Success)]
    #[case::not_covered(41, TransactionStatus::Failed)]
    fn test_self_transfer_keeps_balance(#[case] amount: Balance, #[case] expected: TransactionStatus) {
        let executor = executor(vec![Account::new(0, 40)], 1);

        assert_eq!(executor.transfer(0, 0, amount, 0).unwrap(), expected);
        assert_eq!(balances(&executor), vec![Account::new(0, 40)]);
    }

    #[rstest]
    #[case::deposit(TransactionRequest::deposit(0, 9, 1))]
    #[case::withdraw(TransactionRequest::withdraw(0, 9, 1))]
    #[case::transfer_from(TransactionRequest::transfer(0, 9, 0, 1))]
    #[case::transfer_to(TransactionRequest::transfer(0, 0, 9, 1))]
    fn test_unknown_account_is_fatal_and_not_logged(#[case] request: TransactionRequest) {
        let executor = executor(vec![Account::new(0, 100)], 1);

        assert_eq!(
            executor.execute(&request).unwrap_err(),
            BankError::unknown_account(9, 0)
        );
        assert!(executor.log().is_empty());
        assert_eq!(balances(&executor), vec![Account::new(0, 100)]);
    }

    #[test]
    fn test_transfer_overflow_is_fatal_and_changes_nothing() {
        let executor = executor(vec![Account::new(0, 10), Account::new(1, Balance::MAX)], 1);

        assert_eq!(
            executor.transfer(0, 1, 1, 0).unwrap_err(),
            BankError::arithmetic_overflow("transfer", 1)
        );
        assert_eq!(
            balances(&executor),
            vec![Account::new(0, 10), Account::new(1, Balance::MAX)]
        );
        assert!(executor.log().is_empty());
    }

    #[test]
    fn test_slot_outside_log_is_rejected_before_any_effect() {
        let executor = executor(vec![Account::new(0, 10)], 1);

        assert_eq!(
            executor.deposit(0, 5, 3).unwrap_err(),
            BankError::LogSlotOutOfRange { tx: 3, capacity: 1 }
        );
        assert_eq!(balances(&executor), vec![Account::new(0, 10)]);
    }

    #[test]
    fn test_observer_never_sees_half_applied_transfer() {
        let executor = Arc::new(executor(vec![Account::new(0, 1_000), Account::new(1, 1_000)], 2_000));
        let done = Arc::new(AtomicBool::new(false));

        let observer = {
            let executor = Arc::clone(&executor);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                while !done.load(Ordering::Relaxed) {
                    let guards = executor.locks().acquire_ordered(0, 1, 0).unwrap();
                    if let PairGuard::Ordered { high, low } = &guards {
                        assert_eq!(high.balance() + low.balance(), 2_000);
                    }
                }
            })
        };

        let workers: Vec<_> = (0..4u32)
            .map(|worker| {
                let executor = Arc::clone(&executor);
                thread::spawn(move || {
                    for round in 0..500u32 {
                        let tx = worker * 500 + round;
                        let (from, to) = if tx % 2 == 0 { (0, 1) } else { (1, 0) };
                        executor.transfer(from, to, 7, tx).unwrap();
                    }
                })
            })
            .collect();

        for worker in workers {
            worker.join().unwrap();
        }
        done.store(true, Ordering::Relaxed);
        observer.join().unwrap();

        assert_eq!(executor.locks().store().total_balance().unwrap(), 2_000);
    }
}
