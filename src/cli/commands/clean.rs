//! Clean command implementation.
//!
//! Removing the build environment is the recovery path after an interrupted
//! run; the next build recreates it from scratch.

use crate::cli::RuntimeConfig;
use crate::config::Project;
use crate::error::{EnvironmentError, Result};
use crate::package;
use crate::pipeline::preflight;
use std::io::ErrorKind;
use std::path::Path;

/// Execute clean command
pub(super) async fn execute_clean(project: &Project, config: &RuntimeConfig, all: bool) -> Result<()> {
    let paths = &project.paths;
    remove_dir(&paths.env_dir, config).await?;

    if all {
        remove_dir(&paths.work_dir, config).await?;
        remove_dir(&paths.release_dir(), config).await?;

        let artifact_root = match preflight(project) {
            Ok(inputs) => inputs.layout.root,
            Err(_) => paths.dist_dir.join(&project.config.app_name),
        };
        if artifact_root.exists() {
            package::remove_artifact(&artifact_root).await?;
            config.indent(&format!("Removed {}", artifact_root.display()));
        }
    }

    config.success_println("Clean completed");
    Ok(())
}

async fn remove_dir(path: &Path, config: &RuntimeConfig) -> Result<()> {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => {
            config.indent(&format!("Removed {}", path.display()));
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(source) => Err(EnvironmentError::RemoveFailed {
            path: path.to_path_buf(),
            source,
        }
        .into()),
    }
}
