// CLI module
// Command-line interface and argument parsing

mod args;

pub use args::{
    CliArgs, ReportFormat, RunConfig, StrategyType, DEFAULT_ACCOUNT_COUNT, DEFAULT_BALANCE,
    DEFAULT_MAX_ACCOUNTS,
};

use clap::Parser;

/// Parse command-line arguments using clap
///
/// If parsing fails (invalid arguments, or `--help`), clap displays an
/// error message or help text and exits the process.
pub fn parse_args() -> CliArgs {
    CliArgs::parse()
}
