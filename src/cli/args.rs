use crate::strategy::RuntimeConfig;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::warn;

/// Number of accounts created when no account definitions exist
pub const DEFAULT_ACCOUNT_COUNT: usize = 5;

/// Opening balance of each default account
pub const DEFAULT_BALANCE: u64 = 500;

/// Cap on the number of accounts read from the accounts file
pub const DEFAULT_MAX_ACCOUNTS: usize = 100;

/// Run a batch of bank transactions concurrently with ordered account locking
#[derive(Parser, Debug)]
#[command(name = "bank-engine")]
#[command(about = "Run a batch of bank transactions concurrently with ordered account locking", long_about = None)]
pub struct CliArgs {
    /// Transaction batch file, one `kind, from, to, amount` line per transaction
    #[arg(
        value_name = "TRANSACTIONS",
        default_value = "transactions.txt",
        help = "Path to the transaction batch file"
    )]
    pub transactions_file: PathBuf,

    /// Account definitions file; defaults are used if it is missing or empty
    #[arg(
        long = "accounts",
        value_name = "FILE",
        default_value = "accounts.txt",
        help = "Path to the account definitions file"
    )]
    pub accounts_file: PathBuf,

    /// Execution strategy for the concurrent pass
    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        default_value = "threads",
        help = "Execution strategy: 'threads' for one OS thread per transaction or 'tokio' for blocking tasks on a tokio runtime"
    )]
    pub strategy: StrategyType,

    /// Report format written to stdout
    #[arg(
        long = "format",
        value_name = "FORMAT",
        default_value = "text",
        help = "Report format: 'text' or 'csv'"
    )]
    pub format: ReportFormat,

    /// Number of default accounts
    #[arg(
        long = "default-accounts",
        value_name = "COUNT",
        default_value_t = DEFAULT_ACCOUNT_COUNT,
        help = "Number of accounts created when no account definitions exist"
    )]
    pub default_accounts: usize,

    /// Opening balance of default accounts
    #[arg(
        long = "default-balance",
        value_name = "AMOUNT",
        default_value_t = DEFAULT_BALANCE,
        help = "Opening balance of each default account"
    )]
    pub default_balance: u64,

    /// Cap on accounts read from the accounts file
    #[arg(
        long = "max-accounts",
        value_name = "COUNT",
        default_value_t = DEFAULT_MAX_ACCOUNTS,
        help = "Maximum number of accounts read from the accounts file"
    )]
    pub max_accounts: usize,

    /// Runtime worker threads (tokio strategy only)
    #[arg(
        long = "worker-threads",
        value_name = "COUNT",
        help = "Number of tokio runtime worker threads (default: CPU cores)"
    )]
    pub worker_threads: Option<usize>,
}

/// Available execution strategies
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrategyType {
    Threads,
    Tokio,
}

/// Available report formats
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Text,
    Csv,
}

/// Validated settings for one run
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunConfig {
    pub transactions_file: PathBuf,
    pub accounts_file: PathBuf,
    pub strategy: StrategyType,
    pub format: ReportFormat,
    pub default_accounts: usize,
    pub default_balance: u64,
    pub max_accounts: usize,
    pub runtime: RuntimeConfig,
}

impl CliArgs {
    /// Create a RunConfig from CLI arguments
    ///
    /// Zero account counts and a zero worker thread count are invalid; they
    /// fall back to their defaults and a warning is logged.
    pub fn to_run_config(&self) -> RunConfig {
        let default_accounts = if self.default_accounts == 0 {
            warn!(
                "Invalid default_accounts ({}), using default ({})",
                self.default_accounts, DEFAULT_ACCOUNT_COUNT
            );
            DEFAULT_ACCOUNT_COUNT
        } else {
            self.default_accounts
        };

        let max_accounts = if self.max_accounts == 0 {
            warn!(
                "Invalid max_accounts ({}), using default ({})",
                self.max_accounts, DEFAULT_MAX_ACCOUNTS
            );
            DEFAULT_MAX_ACCOUNTS
        } else {
            self.max_accounts
        };

        let runtime = match self.worker_threads {
            Some(worker_threads) => RuntimeConfig::new(worker_threads),
            None => RuntimeConfig::default(),
        };

        RunConfig {
            transactions_file: self.transactions_file.clone(),
            accounts_file: self.accounts_file.clone(),
            strategy: self.strategy,
            format: self.format,
            default_accounts,
            default_balance: self.default_balance,
            max_accounts,
            runtime,
        }
    }
}
