//! Batch report output
//!
//! Two formats are supported:
//!
//! - **text**: the human-readable run summary. The transaction log after the
//!   initial pass, the result of every retry with the retried transaction's
//!   final log line, and the final balances.
//! - **csv**: the final log as CSV (`id,kind,from,to,amount,status`, empty
//!   field for "no account"), a blank line, then the balances
//!   (`id,balance`).
//!
//! Both formats list transactions and accounts in ascending id order.

use crate::cli::ReportFormat;
use crate::core::BatchReport;
use crate::types::{BankError, TransactionKind, TransactionRecord, TransactionStatus};
use csv::Writer;
use std::io::Write;

/// Write a batch report in the requested format
///
/// # Arguments
///
/// * `report` - The finished batch
/// * `format` - Output format
/// * `output` - Mutable reference to a writer for the report
///
/// # Errors
///
/// Returns `BankError::IoError` if the output cannot be written.
pub fn write_report(
    report: &BatchReport,
    format: ReportFormat,
    output: &mut dyn Write,
) -> Result<(), BankError> {
    match format {
        ReportFormat::Text => write_text_report(report, output),
        ReportFormat::Csv => write_csv_report(report, output),
    }
}

/// One log line, e.g. `Transaction 2: Transfer 200 from Account 0 to Account 1 (Success)`
pub fn describe(record: &TransactionRecord) -> String {
    let body = match (record.kind, record.from, record.to) {
        (TransactionKind::Deposit, _, Some(to)) => {
            format!("{} {} to Account {}", record.kind, record.amount, to)
        }
        (TransactionKind::Withdraw, Some(from), _) => {
            format!("{} {} from Account {}", record.kind, record.amount, from)
        }
        (TransactionKind::Transfer, Some(from), Some(to)) => format!(
            "{} {} from Account {} to Account {}",
            record.kind, record.amount, from, to
        ),
        _ => format!("{} {}", record.kind, record.amount),
    };

    format!("Transaction {}: {} ({})", record.id, body, record.status)
}

fn write_text_report(report: &BatchReport, output: &mut dyn Write) -> Result<(), BankError> {
    writeln!(output, "Transaction Log:")?;
    for record in &report.initial_records {
        writeln!(output, "{}", describe(record))?;
    }

    if !report.retries.is_empty() {
        writeln!(output)?;
        writeln!(output, "Retrying {} failed transactions...", report.retries.len())?;

        for retry in &report.retries {
            writeln!(output, "Transaction {} failed. Retrying once...", retry.tx)?;
            let result = match retry.status {
                TransactionStatus::Success => "Success",
                TransactionStatus::Failed => "Failed again",
            };
            writeln!(output, "Retry result for transaction {}: {}", retry.tx, result)?;

            if let Some(record) = report.record(retry.tx) {
                writeln!(output, "{}", describe(record))?;
            }
        }
    }

    writeln!(output)?;
    writeln!(output, "Final account balances:")?;
    for account in &report.balances {
        writeln!(output, "Account {}: {}", account.id, account.balance)?;
    }

    output.flush()?;
    Ok(())
}

fn write_error(error: csv::Error) -> BankError {
    BankError::IoError {
        message: error.to_string(),
    }
}

fn write_csv_report(report: &BatchReport, output: &mut dyn Write) -> Result<(), BankError> {
    {
        let mut writer = Writer::from_writer(&mut *output);
        for record in &report.records {
            writer.serialize(record).map_err(write_error)?;
        }
        writer.flush()?;
    }

    writeln!(output)?;

    let mut writer = Writer::from_writer(&mut *output);
    for account in &report.balances {
        writer.serialize(account).map_err(write_error)?;
    }
    writer.flush()?;

    Ok(())
}
