//! Thread-per-transaction execution strategy
//!
//! Every request of a pass gets its own named OS thread, spawned inside a
//! `std::thread::scope` so workers can borrow the executor and the requests
//! without extra reference counting. Workers push their completion into a
//! channel as they finish, which yields completion order directly.
//!
//! # Failure Handling
//!
//! If a thread cannot be spawned, no further workers are started, but the
//! ones already running are joined before the error is returned. Every
//! handle is joined explicitly, so a panicked worker surfaces as
//! `BankError::WorkerPanicked` instead of propagating out of the scope.

use super::{panic_message, Completion, ExecutionStrategy};
use crate::core::TransactionExecutor;
use crate::types::{BankError, TransactionRequest};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use tracing::trace;

/// Runs one scoped OS thread per transaction
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadStrategy;

impl ExecutionStrategy for ThreadStrategy {
    fn name(&self) -> &'static str {
        "threads"
    }

    fn run_all(
        &self,
        executor: &Arc<TransactionExecutor>,
        requests: &[TransactionRequest],
    ) -> Result<Vec<Completion>, BankError> {
        let (sender, receiver) = mpsc::channel();

        thread::scope(|scope| {
            let mut handles = Vec::with_capacity(requests.len());
            let mut spawn_error = None;

            for request in requests {
                let sender = sender.clone();
                let spawned = thread::Builder::new()
                    .name(format!("tx-{}", request.id))
                    .spawn_scoped(scope, move || {
                        let completion = Completion::execute(executor, request);
                        // The receiver outlives every worker of the scope
                        let _ = sender.send(completion);
                    });

                match spawned {
                    Ok(handle) => handles.push(handle),
                    Err(err) => {
                        spawn_error = Some(BankError::worker_spawn(request.id, err.to_string()));
                        break;
                    }
                }
            }
            drop(sender);

            trace!(workers = handles.len(), "waiting for workers");

            let mut panicked = None;
            for handle in handles {
                if let Err(payload) = handle.join() {
                    panicked.get_or_insert_with(|| BankError::worker_panicked(panic_message(&*payload)));
                }
            }

            if let Some(err) = spawn_error.or(panicked) {
                return Err(err);
            }

            Ok(receiver.iter().collect())
        })
    }
}
