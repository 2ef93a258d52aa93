//! # Avito Bundler Release
//!
//! Build and release pipeline for the Avito Price Analyzer desktop tool.
//!
//! Turns the analyzer's Python sources into a self-contained Windows
//! executable in four strictly sequential stages:
//!
//! 1. **Provision** an isolated Python environment (reused only while its
//!    fingerprint matches the dependency manifest)
//! 2. **Install** the manifest and PyInstaller into it
//! 3. **Package** with PyInstaller into `dist/<app>/<app>.exe`
//! 4. **Publish** (CI only) a run artifact, plus a GitHub release asset for
//!    `v<semver>` tags
//!
//! Any stage failure stops the run with a stage-specific exit code and leaves
//! no artifact behind.
//!
//! ## Usage
//!
//! ```bash
//! avito_bundler_release build               # interactive, pauses at the end
//! avito_bundler_release build --entry cmd   # started from build.bat
//! avito_bundler_release ci                  # GitHub Actions
//! avito_bundler_release status --json
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod cli;
pub mod config;
pub mod environment;
pub mod error;
pub mod install;
pub mod package;
pub mod pipeline;
pub mod process;
pub mod publish;

pub use cli::Args;
pub use config::{EnvConfig, Project, ProjectConfig};
pub use error::{ReleaseError, Result};
pub use pipeline::{EntryPoint, PipelineOptions, PipelineReport, Stage, run_pipeline};
