//! Avito Bundler Release - builds the Avito Price Analyzer executable.
//!
//! Exit codes: 0 success, 1 usage or input error, 10/20/30/40 for a failure
//! in stage 1/2/3/4.

use anyhow::Context;
use avito_bundler_release::cli;
use avito_bundler_release::cli::OutputManager;
use std::process;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;

    let exit_code = match runtime.block_on(cli::run()) {
        Ok(exit_code) => exit_code,
        Err(e) => {
            let output = OutputManager::new(false);
            output.error(&format!("Fatal error: {e}"));

            let suggestions = e.recovery_suggestions();
            if !suggestions.is_empty() {
                let _ = output.println("\n💡 Recovery suggestions:");
                for suggestion in suggestions {
                    let _ = output.indent(&suggestion);
                }
            }
            e.exit_code()
        }
    };

    drop(runtime);
    process::exit(exit_code);
}
