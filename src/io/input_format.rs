//! Input formats for account definitions and transaction batches
//!
//! Both inputs are comma-separated text read with the `csv` crate, trimmed of
//! surrounding whitespace, without a header row. Blank lines are skipped.
//!
//! # Accounts
//!
//! ```text
//! 3
//! 0, 1000
//! 1, 250
//! 2, 0
//! ```
//!
//! The first line declares how many `id, balance` lines follow. A declared
//! count of zero or less means "no definitions" and the caller falls back to
//! its default account set. A count above the configured cap is truncated
//! with a warning. Lines past the declared count are ignored.
//!
//! # Transactions
//!
//! ```text
//! 0, -1, 3, 100
//! 1, 2, -1, 50
//! 2, 0, 1, 200
//! ```
//!
//! One `kind, from, to, amount` line per transaction, with
//! `0 = Deposit`, `1 = Withdraw`, `2 = Transfer` and `-1` meaning "no
//! account". Transaction ids are assigned by position, starting at 0.

use crate::types::{
    Account, AccountId, Balance, BankError, TransactionId, TransactionKind, TransactionRequest,
};
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::Deserialize;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, warn};

/// Account field value meaning "no account"
pub const NO_ACCOUNT: i64 = -1;

/// Raw transaction line before validation
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
struct TransactionRow {
    kind: i64,
    from: i64,
    to: i64,
    amount: i64,
}

fn reader<R: Read>(input: R) -> csv::Reader<R> {
    ReaderBuilder::new()
        .has_headers(false)
        .trim(Trim::All)
        .flexible(true)
        .from_reader(input)
}

fn open(path: &Path) -> Result<File, BankError> {
    File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => BankError::FileNotFound {
            path: path.display().to_string(),
        },
        _ => BankError::from(e),
    })
}

fn is_blank(record: &StringRecord) -> bool {
    record.iter().all(str::is_empty)
}

fn line_of(record: &StringRecord) -> Option<u64> {
    record.position().map(|pos| pos.line())
}

/// Non-blank records, with csv errors mapped to `BankError`
fn records<R: Read>(
    reader: &mut csv::Reader<R>,
) -> impl Iterator<Item = Result<StringRecord, BankError>> + '_ {
    reader
        .records()
        .map(|result| result.map_err(BankError::from))
        .filter(|result| !matches!(result, Ok(record) if is_blank(record)))
}

fn field<T: FromStr>(record: &StringRecord, index: usize, name: &str) -> Result<T, BankError> {
    let line = line_of(record);
    let raw = record
        .get(index)
        .ok_or_else(|| BankError::parse_error(line, format!("missing {} field", name)))?;

    raw.parse()
        .map_err(|_| BankError::parse_error(line, format!("invalid {} '{}'", name, raw)))
}

/// Parse account definitions
///
/// # Arguments
///
/// * `input` - Reader over the accounts text
/// * `max_accounts` - Cap on the number of accounts taken from the input
///
/// # Returns
///
/// * `Ok(Some(accounts))` for a positive declared count
/// * `Ok(None)` for empty input or a declared count of zero or less
///
/// # Errors
///
/// Returns `BankError::ParseError` for a malformed line or when fewer lines
/// than declared (after truncation) are present.
pub fn parse_accounts<R: Read>(
    input: R,
    max_accounts: usize,
) -> Result<Option<Vec<Account>>, BankError> {
    let mut reader = reader(input);
    let mut lines = records(&mut reader);

    let header = match lines.next() {
        Some(record) => record?,
        None => return Ok(None),
    };
    let declared: i64 = field(&header, 0, "account count")?;

    if declared <= 0 {
        return Ok(None);
    }

    let count = match usize::try_from(declared) {
        Ok(count) if count <= max_accounts => count,
        _ => {
            warn!(
                "Found {} accounts, but only space for {}. Truncating.",
                declared, max_accounts
            );
            max_accounts
        }
    };

    let mut accounts = Vec::with_capacity(count);
    for _ in 0..count {
        let record = lines.next().transpose()?.ok_or_else(|| {
            BankError::parse_error(
                None,
                format!("expected {} account lines, found {}", count, accounts.len()),
            )
        })?;

        let id: AccountId = field(&record, 0, "account id")?;
        let balance: Balance = field(&record, 1, "balance")?;
        accounts.push(Account::new(id, balance));
    }

    Ok(Some(accounts))
}

/// Read account definitions from a file
///
/// A missing file is not an error: it yields `Ok(None)` like an empty one,
/// so the caller can fall back to its default account set.
pub fn read_accounts(path: &Path, max_accounts: usize) -> Result<Option<Vec<Account>>, BankError> {
    match open(path) {
        Ok(file) => parse_accounts(file, max_accounts),
        Err(BankError::FileNotFound { path }) => {
            debug!(path = %path, "accounts file not found");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

fn account_field(value: i64, name: &str, line: Option<u64>) -> Result<Option<AccountId>, BankError> {
    if value == NO_ACCOUNT {
        return Ok(None);
    }

    AccountId::try_from(value)
        .map(Some)
        .map_err(|_| BankError::parse_error(line, format!("invalid {} account {}", name, value)))
}

fn convert_row(
    id: usize,
    row: TransactionRow,
    line: Option<u64>,
) -> Result<TransactionRequest, BankError> {
    let id = TransactionId::try_from(id)
        .map_err(|_| BankError::parse_error(line, "too many transactions"))?;

    let kind = TransactionKind::from_code(row.kind)
        .ok_or(BankError::InvalidTransactionKind {
            code: row.kind,
            line,
        })?;

    let amount = Balance::try_from(row.amount)
        .map_err(|_| BankError::parse_error(line, format!("negative amount {}", row.amount)))?;

    Ok(TransactionRequest {
        id,
        kind,
        from: account_field(row.from, "from", line)?,
        to: account_field(row.to, "to", line)?,
        amount,
    })
}

/// Parse a transaction batch
///
/// # Errors
///
/// - `BankError::ParseError` for a line without four integer fields, an
///   account field below `-1`, or a negative amount
/// - `BankError::InvalidTransactionKind` for a kind code outside `0..=2`
pub fn parse_transactions<R: Read>(input: R) -> Result<Vec<TransactionRequest>, BankError> {
    let mut reader = reader(input);
    let mut batch = Vec::new();

    for record in records(&mut reader) {
        let record = record?;
        let line = line_of(&record);

        if record.len() != 4 {
            return Err(BankError::parse_error(
                line,
                format!("expected 4 fields, found {}", record.len()),
            ));
        }

        let row: TransactionRow = record
            .deserialize(None)
            .map_err(|e| BankError::parse_error(line, e.to_string()))?;

        batch.push(convert_row(batch.len(), row, line)?);
    }

    Ok(batch)
}

/// Read a transaction batch from a file
///
/// # Errors
///
/// Returns `BankError::FileNotFound` if the file does not exist, plus
/// everything [`parse_transactions`] returns.
pub fn read_transactions(path: &Path) -> Result<Vec<TransactionRequest>, BankError> {
    parse_transactions(open(path)?)
}
