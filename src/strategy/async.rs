//! Tokio-backed execution strategy
//!
//! This module runs the workers of a pass as blocking tasks on a
//! multi-threaded tokio runtime. Account locks are plain `std::sync::Mutex`
//! locks held across no await point, so each worker is a `spawn_blocking`
//! task rather than an async future.
//!
//! # Architecture
//!
//! ```text
//! AsyncStrategy
//!     ├── RuntimeConfig (worker_threads)
//!     ├── tokio multi-threaded runtime (one per concurrent pass)
//!     └── JoinSet of blocking tasks, one per transaction
//!         └── TransactionExecutor (shared via Arc)
//! ```
//!
//! `JoinSet::join_next` hands back tasks in the order they finish, which is
//! the completion order the orchestrator relies on. The set is always drained
//! completely, so no worker is still running when a pass returns, even when
//! one of them panicked.
//!
//! The blocking pool is sized to the pass, so every worker is started at
//! once no matter how many of them end up waiting on the same account.
//! Single retries run on the calling thread.

use super::{panic_message, Completion, ExecutionStrategy};
use crate::core::TransactionExecutor;
use crate::types::{BankError, TransactionRequest};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{trace, warn};

/// Configuration for the tokio runtime
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Number of runtime worker threads
    pub worker_threads: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            worker_threads: num_cpus::get(),
        }
    }
}

impl RuntimeConfig {
    /// Create a RuntimeConfig, falling back to the default for zero
    pub fn new(worker_threads: usize) -> Self {
        if worker_threads == 0 {
            let default = Self::default();
            warn!(
                "Invalid worker_threads ({}), using default ({})",
                worker_threads, default.worker_threads
            );
            return default;
        }

        Self { worker_threads }
    }
}

/// Runs one blocking tokio task per transaction
#[derive(Debug, Clone)]
pub struct AsyncStrategy {
    config: RuntimeConfig,
}

impl AsyncStrategy {
    /// Create a new AsyncStrategy
    ///
    /// # Arguments
    ///
    /// * `config` - RuntimeConfig with the number of worker threads
    pub fn new(config: RuntimeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }
}

impl ExecutionStrategy for AsyncStrategy {
    fn name(&self) -> &'static str {
        "tokio"
    }

    fn run_all(
        &self,
        executor: &Arc<TransactionExecutor>,
        requests: &[TransactionRequest],
    ) -> Result<Vec<Completion>, BankError> {
        // Every worker needs its own blocking thread; a capped pool would
        // queue workers behind ones waiting on a held lock.
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.worker_threads)
            .max_blocking_threads(requests.len().max(1))
            .thread_name("bank-worker")
            .build()
            .map_err(|e| BankError::Runtime {
                message: e.to_string(),
            })?;

        runtime.block_on(async {
            let mut tasks = JoinSet::new();

            for request in requests {
                let executor = Arc::clone(executor);
                let request = request.clone();
                tasks.spawn_blocking(move || Completion::execute(&executor, &request));
            }

            trace!(workers = tasks.len(), "waiting for workers");

            let mut completions = Vec::with_capacity(requests.len());
            let mut failure = None;

            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok(completion) => completions.push(completion),
                    Err(err) => {
                        let err = if err.is_panic() {
                            BankError::worker_panicked(panic_message(&*err.into_panic()))
                        } else {
                            BankError::worker_panicked(err.to_string())
                        };
                        failure.get_or_insert(err);
                    }
                }
            }

            match failure {
                Some(err) => Err(err),
                None => Ok(completions),
            }
        })
    }

    /// Run a single retry on the calling thread
    ///
    /// A retry never overlaps another worker, so no runtime is built for it.
    fn run_one(
        &self,
        executor: &Arc<TransactionExecutor>,
        request: &TransactionRequest,
    ) -> Result<Completion, BankError> {
        panic::catch_unwind(AssertUnwindSafe(|| Completion::execute(executor, request)))
            .map_err(|payload| BankError::worker_panicked(panic_message(&*payload)))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::executor;
    use super::*;
    use crate::types::{Account, TransactionStatus};
    use rstest::rstest;
    use std::thread;
    use std::time::{Duration, Instant};

    #[rstest]
    #[case::explicit(4, 4)]
    #[case::zero_falls_back(0, num_cpus::get())]
    fn test_runtime_config(#[case] requested: usize, #[case] expected: usize) {
        assert_eq!(RuntimeConfig::new(requested).worker_threads, expected);
    }

    #[test]
    fn test_default_config_uses_cpu_count() {
        assert_eq!(RuntimeConfig::default().worker_threads, num_cpus::get());
    }

    #[test]
    fn test_every_request_completes_once() {
        let executor = executor(vec![Account::new(0, 0), Account::new(1, 0)], 40);
        let requests: Vec<_> = (0..40)
            .map(|id| TransactionRequest::deposit(id, id % 2, 5))
            .collect();

        let strategy = AsyncStrategy::new(RuntimeConfig::new(2));
        let completions = strategy.run_all(&executor, &requests).unwrap();

        let mut ids: Vec<_> = completions.iter().map(|c| c.tx).collect();
        ids.sort_unstable();
        assert_eq!(ids, (0..40).collect::<Vec<_>>());
        assert!(completions
            .iter()
            .all(|c| c.result == Ok(TransactionStatus::Success)));
        assert_eq!(
            executor.locks().store().snapshot().unwrap(),
            vec![Account::new(0, 100), Account::new(1, 100)]
        );
    }

    #[test]
    fn test_single_worker_thread_still_completes_pass() {
        // Blocking tasks do not occupy runtime workers, so even one worker
        // thread can drive a pass of contending transfers.
        let executor = executor(vec![Account::new(0, 50), Account::new(1, 50)], 20);
        let requests: Vec<_> = (0..20)
            .map(|id| {
                if id % 2 == 0 {
                    TransactionRequest::transfer(id, 0, 1, 10)
                } else {
                    TransactionRequest::transfer(id, 1, 0, 10)
                }
            })
            .collect();

        let strategy = AsyncStrategy::new(RuntimeConfig::new(1));
        let completions = strategy.run_all(&executor, &requests).unwrap();

        assert_eq!(completions.len(), 20);
        assert_eq!(executor.locks().store().total_balance().unwrap(), 100);
    }

    #[test]
    fn test_pass_is_not_capped_by_blocking_pool_default() {
        // More workers than tokio's default blocking pool, all stuck behind
        // one held account lock.
        const WORKERS: u32 = 600;

        let executor = executor(vec![Account::new(0, 0)], WORKERS as usize);
        let requests: Vec<_> = (0..WORKERS)
            .map(|id| TransactionRequest::deposit(id, 0, 1))
            .collect();
        let strategy = AsyncStrategy::new(RuntimeConfig::new(2));

        let waiting = thread::scope(|scope| {
            let guard = executor.locks().acquire(0, 0).unwrap();
            let pass = scope.spawn(|| strategy.run_all(&executor, &requests));

            let deadline = Instant::now() + Duration::from_secs(30);
            while executor.locks().contended_acquisitions() < u64::from(WORKERS)
                && Instant::now() < deadline
            {
                thread::sleep(Duration::from_millis(10));
            }
            let waiting = executor.locks().contended_acquisitions();

            drop(guard);
            assert_eq!(pass.join().unwrap().unwrap().len(), WORKERS as usize);
            waiting
        });

        assert_eq!(waiting, u64::from(WORKERS));
        assert_eq!(
            executor.locks().store().total_balance().unwrap(),
            u128::from(WORKERS)
        );
    }

    #[test]
    fn test_run_one_reports_outcome() {
        let executor = executor(vec![Account::new(0, 10)], 2);
        let strategy = AsyncStrategy::new(RuntimeConfig::new(2));

        let completion = strategy
            .run_one(&executor, &TransactionRequest::withdraw(1, 0, 4))
            .unwrap();

        assert_eq!(completion.tx, 1);
        assert_eq!(completion.result, Ok(TransactionStatus::Success));
        assert_eq!(executor.log().get(1).map(|r| r.status), Some(TransactionStatus::Success));
    }
}
