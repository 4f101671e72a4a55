//! Index-addressed transaction outcome log
//!
//! The log has one slot per transaction id of the batch. Each attempt of a
//! transaction writes its own slot exactly once; a retry overwrites the slot
//! so the log always shows the latest attempt.
//!
//! # Thread Safety
//!
//! Slots live in a `DashMap`, so writers for different ids do not contend on
//! a global lock. Executors write while still holding account locks; the
//! map's shard locks are always taken innermost and never held while waiting
//! on an account, so they cannot take part in a wait cycle.

use crate::types::{BankError, TransactionId, TransactionRecord};
use dashmap::DashMap;

/// Outcome records of a batch, addressed by transaction id
#[derive(Debug)]
pub struct TransactionLog {
    records: DashMap<TransactionId, TransactionRecord>,

    /// Number of slots; valid ids are `0..capacity`
    capacity: usize,
}

impl TransactionLog {
    /// Create a log sized to a batch of `capacity` transactions
    pub fn with_slots(capacity: usize) -> Self {
        Self {
            records: DashMap::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of slots written so far
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Check that `tx` addresses a slot of this log
    pub fn check_slot(&self, tx: TransactionId) -> Result<(), BankError> {
        if (tx as usize) < self.capacity {
            Ok(())
        } else {
            Err(BankError::LogSlotOutOfRange {
                tx,
                capacity: self.capacity,
            })
        }
    }

    /// Write the record of an attempt into its slot
    ///
    /// Returns the record of the previous attempt, if any.
    ///
    /// # Errors
    ///
    /// Returns `BankError::LogSlotOutOfRange` if the record's id is not a
    /// slot of this log.
    pub fn write(&self, record: TransactionRecord) -> Result<Option<TransactionRecord>, BankError> {
        self.check_slot(record.id)?;
        Ok(self.records.insert(record.id, record))
    }

    /// The latest record of a transaction
    pub fn get(&self, tx: TransactionId) -> Option<TransactionRecord> {
        self.records.get(&tx).map(|entry| entry.value().clone())
    }

    /// All written records in ascending id order
    pub fn records(&self) -> Vec<TransactionRecord> {
        let mut records: Vec<TransactionRecord> = self
            .records
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by_key(|record| record.id);
        records
    }
}
