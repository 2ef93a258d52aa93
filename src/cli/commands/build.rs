//! Interactive build (PowerShell and cmd entry points).

use super::helpers::ConsoleProgress;
use crate::cli::RuntimeConfig;
use crate::config::{EnvConfig, Project};
use crate::error::Result;
use crate::pipeline::{EntryPoint, PipelineOptions, STAGE_COUNT, run_pipeline};

/// Execute build command
pub(super) async fn execute_build(
    project: &Project,
    env: &EnvConfig,
    config: &RuntimeConfig,
    entry_point: EntryPoint,
    refresh: bool,
) -> Result<()> {
    let options = PipelineOptions {
        entry_point,
        refresh,
        tag: None,
    };

    let mut progress = ConsoleProgress::new(config);
    let report = run_pipeline(project, env, &options, &mut progress).await?;

    let locale = config.locale();
    let _ = config.output().step(STAGE_COUNT, STAGE_COUNT, locale.done());
    if let Some(artifact) = &report.artifact {
        config.success_println(&locale.artifact_ready(&artifact.executable));
        config.indent(&format!(
            "{} files, {} bytes, sha256 {}",
            artifact.digest.files, artifact.digest.bytes, artifact.digest.sha256
        ));
    }

    Ok(())
}
