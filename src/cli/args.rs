//! Command line argument parsing.

use super::OutputManager;
use super::locale::Locale;
use crate::error::CliError;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Build and release pipeline for the Avito Price Analyzer
#[derive(Parser, Debug)]
#[command(
    name = "avito_bundler_release",
    version,
    about = "Build and release pipeline for the Avito Price Analyzer",
    long_about = "Turns the analyzer sources into a self-contained Windows executable.

Stages:
  1. provision  create the isolated Python build environment
  2. install    install requirements.txt and PyInstaller into it
  3. package    run PyInstaller against the .spec file
  4. publish    (ci only) stage the run artifact and attach it to the release

Usage:
  avito_bundler_release build                 interactive build, pauses at the end
  avito_bundler_release build --entry cmd     same, invoked from build.bat
  avito_bundler_release ci                    headless build + publication
  avito_bundler_release status                environment and artifact state
  avito_bundler_release clean --all           remove environment and outputs"
)]
pub struct Args {
    /// Project root containing the entry script, manifest and descriptor
    #[arg(long, global = true, value_name = "DIR", default_value = ".")]
    pub project: PathBuf,

    /// Configuration file (default: <project>/release.toml)
    #[arg(long, global = true, value_name = "FILE", env = "AVITO_RELEASE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Message language
    #[arg(long, global = true, value_enum)]
    pub lang: Option<Locale>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Shell the interactive build was started from
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Shell {
    /// `scripts/build.ps1`
    Powershell,
    /// `scripts/build.bat`
    Cmd,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Interactive build: stages 1-3, then pause
    Build {
        /// Calling shell, selects the pause prompt
        #[arg(long, value_enum, default_value = "powershell")]
        entry: Shell,

        /// Exit without waiting for Enter
        #[arg(long)]
        no_pause: bool,

        /// Recreate the build environment even if it is up to date
        #[arg(long)]
        refresh: bool,
    },

    /// Headless CI build: stages 1-3, run artifact, release on version tags
    Ci {
        /// Release tag to publish (default: GITHUB_REF, then tags at HEAD)
        #[arg(long, value_name = "TAG")]
        tag: Option<String>,

        /// Recreate the build environment even if it is up to date
        #[arg(long)]
        refresh: bool,
    },

    /// Show configuration, environment state and the last run
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete the build environment
    Clean {
        /// Also delete the packager work directory and the artifact
        #[arg(long)]
        all: bool,
    },
}

impl Command {
    /// Command name for messages
    pub fn name(&self) -> &'static str {
        match self {
            Command::Build { .. } => "build",
            Command::Ci { .. } => "ci",
            Command::Status { .. } => "status",
            Command::Clean { .. } => "clean",
        }
    }
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> Result<(), CliError> {
        if let Command::Ci { tag: Some(tag), .. } = &self.command
            && tag.trim().is_empty()
        {
            return Err(CliError::InvalidArguments {
                reason: "--tag must not be empty".to_string(),
            });
        }
        if self.project.as_os_str().is_empty() {
            return Err(CliError::InvalidArguments {
                reason: "--project must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Configuration derived from command line arguments
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    output: OutputManager,
    locale: Locale,
}

impl RuntimeConfig {
    /// Create runtime configuration
    pub fn new(output: OutputManager, locale: Locale) -> Self {
        Self { output, locale }
    }

    /// Get a reference to the output manager
    pub fn output(&self) -> &OutputManager {
        &self.output
    }

    /// Message language
    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// Print message
    pub fn println(&self, message: &str) {
        let _ = self.output.println(message);
    }

    /// Print informational message
    pub fn info_println(&self, message: &str) {
        let _ = self.output.info(message);
    }

    /// Print error message (always shown)
    pub fn error_println(&self, message: &str) {
        self.output.error(message);
    }

    /// Print warning message
    pub fn warning_println(&self, message: &str) {
        let _ = self.output.warn(message);
    }

    /// Print success message
    pub fn success_println(&self, message: &str) {
        let _ = self.output.success(message);
    }

    /// Print indented text
    pub fn indent(&self, message: &str) {
        let _ = self.output.indent(message);
    }
}
