//! I/O module
//!
//! Handles input parsing and report output.
//!
//! # Components
//!
//! - `input_format` - Account definition and transaction batch readers
//! - `report` - Text and CSV report writers

pub mod input_format;
pub mod report;

pub use input_format::{parse_accounts, parse_transactions, read_accounts, read_transactions};
pub use report::write_report;
