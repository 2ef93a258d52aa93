//! Headless CI build and publication.

use super::helpers::ConsoleProgress;
use crate::cli::RuntimeConfig;
use crate::config::{EnvConfig, Project};
use crate::error::Result;
use crate::pipeline::{EntryPoint, PipelineOptions, run_pipeline};

/// Execute ci command
pub(super) async fn execute_ci(
    project: &Project,
    env: &EnvConfig,
    config: &RuntimeConfig,
    tag: Option<String>,
    refresh: bool,
) -> Result<()> {
    if !env.is_github_actions() {
        config.warning_println("GITHUB_ACTIONS is not set; running the CI pipeline locally");
    }

    let options = PipelineOptions {
        entry_point: EntryPoint::Ci,
        refresh,
        tag,
    };

    let mut progress = ConsoleProgress::new(config);
    let report = run_pipeline(project, env, &options, &mut progress).await?;

    if let Some(artifact) = &report.artifact {
        config.success_println(&config.locale().artifact_ready(&artifact.executable));
    }
    if let Some(run_artifact) = &report.run_artifact {
        config.indent(&format!(
            "Run artifact: {} ({} bytes)",
            run_artifact.path.display(),
            run_artifact.size
        ));
    }
    match &report.release {
        Some(release) if release.already_uploaded => config.indent(&format!(
            "Release {}: {} already attached ({})",
            release.tag, release.asset_name, release.html_url
        )),
        Some(release) => config.indent(&format!(
            "Release {}: uploaded {} ({})",
            release.tag, release.asset_name, release.html_url
        )),
        None => config.info_println("No version tag; release not updated"),
    }

    Ok(())
}
