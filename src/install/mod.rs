//! Dependency Installer.
//!
//! Parses the dependency manifest and installs it, together with the
//! packaging tool, into the build environment.

mod installer;
mod manifest;

pub use installer::{install, install_args, upgrade_args};
pub use manifest::{DependencyManifest, Requirement, normalize_name};
