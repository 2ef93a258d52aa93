//! Command line interface for avito_bundler_release.
//!
//! Parses arguments, renders progress for the operator and maps failures to
//! exit codes.

mod args;
pub mod commands;
mod locale;
mod output;

pub use args::{Args, Command, RuntimeConfig, Shell};
pub use commands::{execute_command, execute_with_env};
pub use locale::Locale;
pub use output::OutputManager;

use crate::error::Result;

/// Main CLI entry point
pub async fn run() -> Result<i32> {
    let args = Args::parse_args();
    execute_command(args).await
}
