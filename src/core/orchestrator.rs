//! Batch orchestration
//!
//! The `Orchestrator` drives a whole batch through three phases:
//!
//! 1. **Initial pass**: one concurrent worker per transaction, all started
//!    before any is awaited; completions are collected in the order workers
//!    finish.
//! 2. **Retry pass**: every transaction that reported `Failed` in phase 1 is
//!    run once more, in the order its failure was collected, one at a time.
//!    The retry's outcome overwrites the transaction's log slot.
//! 3. **Reporting**: the log and a balance snapshot are returned as a
//!    `BatchReport`.
//!
//! # State Machine
//!
//! ```text
//! Pending → Running → Succeeded
//!                   → Failed → Retrying → Succeeded
//!                                       → Failed
//! ```
//!
//! A transaction is retried at most once; any other transition is rejected.
//!
//! # Validation
//!
//! The batch is checked before any worker starts. An empty batch, duplicate
//! or out-of-range ids, missing account fields and unknown accounts abort the
//! run without touching a balance or writing a log entry.

use super::account_store::AccountStore;
use super::executor::TransactionExecutor;
use super::lock_manager::LockManager;
use super::transaction_log::TransactionLog;
use crate::strategy::ExecutionStrategy;
use crate::types::{
    Account, BankError, TransactionId, TransactionRecord, TransactionRequest, TransactionStatus,
};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Lifecycle state of one transaction within a batch run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Pending,
    Running,
    Succeeded,
    Failed,
    Retrying,
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl From<TransactionStatus> for TransactionState {
    fn from(status: TransactionStatus) -> Self {
        match status {
            TransactionStatus::Success => TransactionState::Succeeded,
            TransactionStatus::Failed => TransactionState::Failed,
        }
    }
}

/// State and attempt count of one transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionProgress {
    pub state: TransactionState,
    pub attempts: u8,
}

impl TransactionProgress {
    pub fn new() -> Self {
        Self {
            state: TransactionState::Pending,
            attempts: 0,
        }
    }

    /// Move to `next` if the retry policy allows it
    ///
    /// # Errors
    ///
    /// Returns `BankError::InvalidStateTransition` for any transition outside
    /// the state machine, including a second retry.
    pub fn advance(&mut self, tx: TransactionId, next: TransactionState) -> Result<(), BankError> {
        use TransactionState::{Failed, Pending, Retrying, Running, Succeeded};

        let allowed = match (self.state, next) {
            (Pending, Running) => true,
            (Running | Retrying, Succeeded | Failed) => true,
            (Failed, Retrying) => self.attempts == 1,
            _ => false,
        };

        if !allowed {
            return Err(BankError::invalid_transition(tx, self.state, next));
        }

        if matches!(next, Running | Retrying) {
            self.attempts += 1;
        }
        self.state = next;

        Ok(())
    }
}

impl Default for TransactionProgress {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of one retry attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryOutcome {
    pub tx: TransactionId,
    pub status: TransactionStatus,
}

/// Counters describing a finished batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub transactions: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub retried: usize,
    /// Retries that succeeded
    pub recovered: usize,
    /// Lock acquisitions that had to wait for another worker
    pub contended_locks: u64,
}

/// Everything the caller gets back from a batch run
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    /// Log as it stood after the initial pass, in ascending id order
    pub initial_records: Vec<TransactionRecord>,

    /// Final log, one record per transaction in ascending id order
    pub records: Vec<TransactionRecord>,

    /// Final balances in ascending account id order
    pub balances: Vec<Account>,

    /// Retries in the order they ran
    pub retries: Vec<RetryOutcome>,

    pub stats: BatchStats,
}

impl BatchReport {
    /// The final record of a transaction
    pub fn record(&self, tx: TransactionId) -> Option<&TransactionRecord> {
        self.records.iter().find(|record| record.id == tx)
    }

    /// Final status of a transaction
    pub fn status(&self, tx: TransactionId) -> Option<TransactionStatus> {
        self.record(tx).map(|record| record.status)
    }
}

/// Runs batches of transactions against a shared account store
pub struct Orchestrator {
    store: Arc<AccountStore>,
    strategy: Box<dyn ExecutionStrategy>,
}

impl Orchestrator {
    pub fn new(store: Arc<AccountStore>, strategy: Box<dyn ExecutionStrategy>) -> Self {
        Self { store, strategy }
    }

    pub fn store(&self) -> &Arc<AccountStore> {
        &self.store
    }

    /// Run a batch through the initial pass, the retry pass and reporting
    ///
    /// Transaction ids must be exactly `0..batch.len()` in any order; the
    /// order of the batch itself carries no meaning.
    ///
    /// # Errors
    ///
    /// - Validation errors (see module docs), before anything runs
    /// - The first fatal error reported by a worker, after every worker of
    ///   the pass has finished
    /// - Substrate errors from the execution strategy
    pub fn run(&self, batch: &[TransactionRequest]) -> Result<BatchReport, BankError> {
        let requests = self.validate(batch)?;

        let log = Arc::new(TransactionLog::with_slots(batch.len()));
        let locks = Arc::new(LockManager::new(Arc::clone(&self.store)));
        let executor = Arc::new(TransactionExecutor::new(Arc::clone(&locks), Arc::clone(&log)));

        let mut progress: HashMap<TransactionId, TransactionProgress> = batch
            .iter()
            .map(|request| (request.id, TransactionProgress::new()))
            .collect();

        let failed = self.initial_pass(&executor, batch, &mut progress)?;
        let initial_records = log.records();
        let retries = self.retry_pass(&executor, &requests, failed, &mut progress)?;

        let records = log.records();
        let balances = self.store.snapshot()?;

        let succeeded = records
            .iter()
            .filter(|record| record.status.is_success())
            .count();
        let stats = BatchStats {
            transactions: batch.len(),
            succeeded,
            failed: records.len() - succeeded,
            retried: retries.len(),
            recovered: retries
                .iter()
                .filter(|retry| retry.status.is_success())
                .count(),
            contended_locks: locks.contended_acquisitions(),
        };

        info!(
            transactions = stats.transactions,
            succeeded = stats.succeeded,
            failed = stats.failed,
            retried = stats.retried,
            recovered = stats.recovered,
            contended_locks = stats.contended_locks,
            "batch complete"
        );

        Ok(BatchReport {
            initial_records,
            records,
            balances,
            retries,
            stats,
        })
    }

    /// Check the batch and index it by transaction id
    fn validate<'a>(
        &self,
        batch: &'a [TransactionRequest],
    ) -> Result<HashMap<TransactionId, &'a TransactionRequest>, BankError> {
        if batch.is_empty() {
            return Err(BankError::EmptyBatch);
        }

        let mut requests = HashMap::with_capacity(batch.len());

        for request in batch {
            if request.id as usize >= batch.len() {
                return Err(BankError::LogSlotOutOfRange {
                    tx: request.id,
                    capacity: batch.len(),
                });
            }
            if requests.contains_key(&request.id) {
                return Err(BankError::DuplicateTransaction { tx: request.id });
            }

            let operation = request.operation()?;
            if let Some(account) = operation
                .accounts()
                .find(|&account| !self.store.contains(account))
            {
                return Err(BankError::unknown_account(account, request.id));
            }

            requests.insert(request.id, request);
        }

        Ok(requests)
    }

    /// Phase 1: full fan-out, returns failed ids in completion order
    fn initial_pass(
        &self,
        executor: &Arc<TransactionExecutor>,
        batch: &[TransactionRequest],
        progress: &mut HashMap<TransactionId, TransactionProgress>,
    ) -> Result<Vec<TransactionId>, BankError> {
        info!(
            transactions = batch.len(),
            strategy = self.strategy.name(),
            "starting initial pass"
        );

        for request in batch {
            progress_of(progress, request.id)?.advance(request.id, TransactionState::Running)?;
        }

        let completions = self.strategy.run_all(executor, batch)?;

        let mut failed = Vec::new();
        let mut fatal = None;

        for completion in completions {
            match completion.result {
                Ok(status) => {
                    progress_of(progress, completion.tx)?.advance(completion.tx, status.into())?;
                    if !status.is_success() {
                        debug!(tx = completion.tx, "transaction failed");
                        failed.push(completion.tx);
                    }
                }
                Err(err) => {
                    error!(tx = completion.tx, error = %err, "transaction aborted");
                    fatal.get_or_insert(err);
                }
            }
        }

        if let Some(err) = fatal {
            return Err(err);
        }

        Ok(failed)
    }

    /// Phase 2: retry each failed transaction once, sequentially
    fn retry_pass(
        &self,
        executor: &Arc<TransactionExecutor>,
        requests: &HashMap<TransactionId, &TransactionRequest>,
        failed: Vec<TransactionId>,
        progress: &mut HashMap<TransactionId, TransactionProgress>,
    ) -> Result<Vec<RetryOutcome>, BankError> {
        if failed.is_empty() {
            return Ok(Vec::new());
        }

        info!(count = failed.len(), "retrying failed transactions");

        let mut retries = Vec::with_capacity(failed.len());

        for tx in failed {
            let request = requests
                .get(&tx)
                .copied()
                .ok_or_else(|| BankError::invalid_transition(tx, "unknown", TransactionState::Retrying))?;

            progress_of(progress, tx)?.advance(tx, TransactionState::Retrying)?;

            let completion = self.strategy.run_one(executor, request)?;
            let status = completion.result?;

            progress_of(progress, tx)?.advance(tx, status.into())?;

            if status.is_success() {
                info!(tx, "retry succeeded");
            } else {
                info!(tx, "retry failed again");
            }

            retries.push(RetryOutcome { tx, status });
        }

        Ok(retries)
    }
}

fn progress_of(
    progress: &mut HashMap<TransactionId, TransactionProgress>,
    tx: TransactionId,
) -> Result<&mut TransactionProgress, BankError> {
    progress
        .get_mut(&tx)
        .ok_or_else(|| BankError::invalid_transition(tx, "unknown", "tracked"))
}
