//! End-to-end run: read inputs, run the batch, write the report

use crate::cli::RunConfig;
use crate::core::{AccountStore, BatchReport, Orchestrator};
use crate::io::{read_accounts, read_transactions, write_report};
use crate::strategy::{create_strategy, ExecutionStrategy};
use crate::types::{Account, BankError, TransactionRequest};
use std::io::Write;
use std::sync::Arc;
use tracing::info;

/// Load account definitions, falling back to the default account set
pub fn load_accounts(config: &RunConfig) -> Result<Vec<Account>, BankError> {
    match read_accounts(&config.accounts_file, config.max_accounts)? {
        Some(accounts) => {
            info!(
                count = accounts.len(),
                path = %config.accounts_file.display(),
                "loaded accounts"
            );
            Ok(accounts)
        }
        None => {
            info!(
                count = config.default_accounts,
                balance = config.default_balance,
                "creating default accounts since no file was found or file was empty"
            );
            Ok(Account::default_set(
                config.default_accounts,
                config.default_balance,
            ))
        }
    }
}

/// Run an in-memory batch against a fresh store built from `accounts`
///
/// # Errors
///
/// Returns `BankError::DuplicateAccount` for repeated account ids, plus
/// everything [`Orchestrator::run`] returns.
pub fn run_batch(
    accounts: Vec<Account>,
    batch: &[TransactionRequest],
    strategy: Box<dyn ExecutionStrategy>,
) -> Result<BatchReport, BankError> {
    let store = Arc::new(AccountStore::new(accounts)?);
    Orchestrator::new(store, strategy).run(batch)
}

/// Read both inputs, run the batch and write the report to `output`
///
/// # Arguments
///
/// * `config` - Validated run settings
/// * `output` - Mutable reference to a writer for the report
///
/// # Errors
///
/// Returns the first fatal error of any stage. Nothing is written to
/// `output` unless the batch completed.
pub fn run(config: &RunConfig, output: &mut dyn Write) -> Result<BatchReport, BankError> {
    let accounts = load_accounts(config)?;
    let batch = read_transactions(&config.transactions_file)?;

    info!(
        transactions = batch.len(),
        path = %config.transactions_file.display(),
        "loaded transactions"
    );

    let strategy = create_strategy(config.strategy, config.runtime.clone());
    let report = run_batch(accounts, &batch, strategy)?;

    write_report(&report, config.format, output)?;

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{ReportFormat, StrategyType};
    use crate::strategy::RuntimeConfig;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn config(dir: &Path, format: ReportFormat) -> RunConfig {
        RunConfig {
            transactions_file: dir.join("transactions.txt"),
            accounts_file: dir.join("accounts.txt"),
            strategy: StrategyType::Threads,
            format,
            default_accounts: 5,
            default_balance: 500,
            max_accounts: 100,
            runtime: RuntimeConfig::new(2),
        }
    }

    #[test]
    fn test_missing_accounts_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = config(dir.path(), ReportFormat::Text);

        assert_eq!(load_accounts(&config).unwrap(), Account::default_set(5, 500));
    }

    #[test]
    fn test_run_writes_report() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("accounts.txt"), "2\n0, 500\n1, 500\n").unwrap();
        fs::write(dir.path().join("transactions.txt"), "2, 0, 1, 200\n").unwrap();
        let config = config(dir.path(), ReportFormat::Text);
        let mut output = Vec::new();

        let report = run(&config, &mut output).unwrap();

        assert_eq!(
            report.balances,
            vec![Account::new(0, 300), Account::new(1, 700)]
        );
        let output = String::from_utf8(output).unwrap();
        assert!(output.contains("Transaction 0: Transfer 200 from Account 0 to Account 1 (Success)"));
        assert!(output.contains("Account 1: 700"));
    }

    #[test]
    fn test_missing_transactions_file() {
        let dir = TempDir::new().unwrap();
        let config = config(dir.path(), ReportFormat::Text);
        let mut output = Vec::new();

        let err = run(&config, &mut output).unwrap_err();

        assert!(matches!(err, BankError::FileNotFound { .. }));
        assert!(output.is_empty());
    }

    #[test]
    fn test_empty_transactions_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("transactions.txt"), "\n").unwrap();
        let config = config(dir.path(), ReportFormat::Csv);
        let mut output = Vec::new();

        assert_eq!(run(&config, &mut output).unwrap_err(), BankError::EmptyBatch);
        assert!(output.is_empty());
    }

    #[test]
    fn test_duplicate_account_ids() {
        let result = run_batch(
            vec![Account::new(1, 10), Account::new(1, 20)],
            &[TransactionRequest::deposit(0, 1, 5)],
            create_strategy(StrategyType::Threads, RuntimeConfig::new(1)),
        );

        assert_eq!(result.unwrap_err(), BankError::DuplicateAccount { account: 1 });
    }

    #[test]
    fn test_unknown_account_in_default_set() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("transactions.txt"), "0, -1, 5, 100\n").unwrap();
        let config = config(dir.path(), ReportFormat::Text);

        assert_eq!(
            run(&config, &mut Vec::new()).unwrap_err(),
            BankError::unknown_account(5, 0)
        );
    }
}
