//! Command execution.
//!
//! Loads the project once, dispatches to the command and turns failures into
//! a localized banner, recovery suggestions and a stage-specific exit code.

mod build;
mod ci;
mod clean;
mod helpers;
mod status;

use crate::cli::{Args, Command, Locale, OutputManager, RuntimeConfig, Shell};
use crate::config::{EnvConfig, Project};
use crate::error::{ReleaseError, Result};
use crate::pipeline::EntryPoint;

use build::execute_build;
use ci::execute_ci;
use clean::execute_clean;
use helpers::{pause, report_failure};
use status::execute_status;

/// Execute the main command based on parsed arguments
pub async fn execute_command(args: Args) -> Result<i32> {
    execute_with_env(args, EnvConfig::from_process()).await
}

/// Execute with an explicit environment snapshot
pub async fn execute_with_env(args: Args, env: EnvConfig) -> Result<i32> {
    if let Err(validation_error) = args.validate() {
        let error = ReleaseError::from(validation_error);
        OutputManager::new(false).error(&error.to_string());
        return Ok(error.exit_code());
    }

    let output = OutputManager::new(matches!(args.command, Command::Ci { .. }));
    let pause_entry = match &args.command {
        Command::Build {
            entry,
            no_pause: false,
            ..
        } => Some(entry_point(*entry)),
        _ => None,
    };

    let project = match Project::load(&args.project, args.config.as_deref(), &env) {
        Ok(project) => project,
        Err(e) => {
            let config = RuntimeConfig::new(output, Locale::detect(args.lang, None, &env));
            report_failure(&config, &e);
            if let Some(entry) = pause_entry {
                pause(&config, entry);
            }
            return Ok(e.exit_code());
        }
    };

    let locale = Locale::detect(args.lang, project.config.locale.as_deref(), &env);
    let config = RuntimeConfig::new(output, locale);

    let result = match &args.command {
        Command::Build { entry, refresh, .. } => {
            execute_build(&project, &env, &config, entry_point(*entry), *refresh).await
        }
        Command::Ci { tag, refresh } => {
            execute_ci(&project, &env, &config, tag.clone(), *refresh).await
        }
        Command::Status { json } => execute_status(&project, &config, *json).await,
        Command::Clean { all } => execute_clean(&project, &config, *all).await,
    };

    let exit_code = match result {
        Ok(()) => 0,
        Err(e) => {
            log::debug!("Command '{}' failed: {:?}", args.command.name(), e);
            report_failure(&config, &e);
            e.exit_code()
        }
    };

    if let Some(entry) = pause_entry {
        pause(&config, entry);
    }

    Ok(exit_code)
}

fn entry_point(shell: Shell) -> EntryPoint {
    match shell {
        Shell::Powershell => EntryPoint::PowerShell,
        Shell::Cmd => EntryPoint::Cmd,
    }
}
