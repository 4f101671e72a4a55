//! Bank Batch Engine CLI
//!
//! Runs a batch of deposits, withdrawals and transfers concurrently against a
//! set of accounts, retries failed transactions once, and prints a report.
//!
//! # Usage
//!
//! ```bash
//! cargo run
//! cargo run -- transactions.txt --accounts accounts.txt
//! cargo run -- --strategy tokio --worker-threads 8 transactions.txt
//! cargo run -- --format csv transactions.txt > report.csv
//! RUST_LOG=debug cargo run -- transactions.txt
//! ```
//!
//! The report goes to stdout; logs go to stderr.
//!
//! # Execution Strategies
//!
//! - **threads**: one OS thread per transaction (default)
//! - **tokio**: one blocking task per transaction on a tokio runtime
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (transactions file not found, malformed input, unknown account, etc.)

use rust_bank_engine::{cli, pipeline};
use std::io;
use std::process;
use tracing::{error, info};

fn main() {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = cli::parse_args();
    let config = args.to_run_config();

    let mut output = io::stdout().lock();
    match pipeline::run(&config, &mut output) {
        Ok(report) => info!(
            succeeded = report.stats.succeeded,
            failed = report.stats.failed,
            "run finished"
        ),
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    }
}
