//! Execution strategies for the concurrent phase of a batch
//!
//! This module defines the Strategy pattern for how transaction workers are
//! launched and awaited. The orchestrator decides *what* runs and in which
//! phase; a strategy decides *how* the workers of a pass are executed:
//!
//! - `ThreadStrategy`: one named OS thread per transaction in a thread scope
//! - `AsyncStrategy`: one blocking task per transaction on a multi-threaded
//!   tokio runtime
//!
//! Both report completions in the order workers finish, which is the order
//! the orchestrator uses for its retry pass.

use crate::cli::StrategyType;
use crate::core::TransactionExecutor;
use crate::types::{BankError, TransactionId, TransactionRequest, TransactionStatus};
use std::any::Any;
use std::sync::Arc;

pub mod r#async;
pub mod threaded;

pub use self::r#async::{AsyncStrategy, RuntimeConfig};
pub use threaded::ThreadStrategy;

/// Outcome reported by one worker
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub tx: TransactionId,

    /// `Ok` with the business outcome, or the fatal error the worker hit
    pub result: Result<TransactionStatus, BankError>,
}

impl Completion {
    /// Run a request on the calling thread and wrap its outcome
    pub fn execute(executor: &TransactionExecutor, request: &TransactionRequest) -> Self {
        Self {
            tx: request.id,
            result: executor.execute(request),
        }
    }
}

/// How the workers of a pass are launched and awaited
pub trait ExecutionStrategy: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Run every request concurrently, one worker each
    ///
    /// All workers are started before any is awaited. Returns one completion
    /// per request, in the order the workers finished.
    ///
    /// # Errors
    ///
    /// Returns an error only for substrate failures: a worker that could not
    /// be started or that panicked, or a runtime that could not be built.
    /// Workers already started are always awaited before returning. Errors
    /// raised by the executor itself travel inside the completions.
    fn run_all(
        &self,
        executor: &Arc<TransactionExecutor>,
        requests: &[TransactionRequest],
    ) -> Result<Vec<Completion>, BankError>;

    /// Run a single request and wait for it
    fn run_one(
        &self,
        executor: &Arc<TransactionExecutor>,
        request: &TransactionRequest,
    ) -> Result<Completion, BankError> {
        self.run_all(executor, std::slice::from_ref(request))?
            .pop()
            .ok_or_else(|| {
                BankError::worker_panicked(format!("no outcome reported for transaction {}", request.id))
            })
    }
}

/// Best-effort text of a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Create an execution strategy based on the specified strategy type
///
/// # Arguments
///
/// * `strategy_type` - Which strategy to create
/// * `config` - Runtime configuration (ignored by the thread strategy)
pub fn create_strategy(
    strategy_type: StrategyType,
    config: RuntimeConfig,
) -> Box<dyn ExecutionStrategy> {
    match strategy_type {
        StrategyType::Threads => Box::new(ThreadStrategy),
        StrategyType::Tokio => Box::new(AsyncStrategy::new(config)),
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Account;
    use rstest::rstest;

    #[rstest]
    #[case::threads(StrategyType::Threads, "threads")]
    #[case::tokio(StrategyType::Tokio, "tokio")]
    fn test_create_strategy(#[case] strategy_type: StrategyType, #[case] name: &str) {
        let strategy = create_strategy(strategy_type, RuntimeConfig::new(2));
        assert_eq!(strategy.name(), name);
    }

    #[rstest]
    fn test_run_one_reports_its_transaction(
        #[values(StrategyType::Threads, StrategyType::Tokio)] strategy_type: StrategyType,
    ) {
        let strategy = create_strategy(strategy_type, RuntimeConfig::new(2));
        let executor = test_support::executor(vec![Account::new(0, 10)], 4);

        let completion = strategy
            .run_one(&executor, &TransactionRequest::withdraw(3, 0, 25))
            .unwrap();

        assert_eq!(
            completion,
            Completion {
                tx: 3,
                result: Ok(TransactionStatus::Failed)
            }
        );
    }

    #[rstest]
    fn test_executor_errors_travel_in_completions(
        #[values(StrategyType::Threads, StrategyType::Tokio)] strategy_type: StrategyType,
    ) {
        let strategy = create_strategy(strategy_type, RuntimeConfig::new(2));
        let executor = test_support::executor(vec![Account::new(0, 10)], 2);

        let completions = strategy
            .run_all(
                &executor,
                &[
                    TransactionRequest::deposit(0, 0, 5),
                    TransactionRequest::deposit(1, 8, 5),
                ],
            )
            .unwrap();

        assert_eq!(completions.len(), 2);
        let failed = completions.iter().find(|c| c.tx == 1).unwrap();
        assert_eq!(failed.result, Err(BankError::unknown_account(8, 1)));
    }
}
