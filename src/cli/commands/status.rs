//! Status command implementation.
//!
//! Reports configuration, environment state, the artifact and the last run
//! without running any external tool.

use crate::cli::RuntimeConfig;
use crate::config::Project;
use crate::environment::{EnvironmentFingerprint, EnvironmentState, inspect};
use crate::error::Result;
use crate::package::calculate_sha256;
use crate::pipeline::{PipelineReport, StageStatus, preflight};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Serialize)]
struct StatusSnapshot {
    project_root: PathBuf,
    config_file: Option<PathBuf>,
    app_name: String,
    env_dir: PathBuf,
    environment: String,
    inputs_error: Option<String>,
    artifact: Option<ArtifactStatus>,
    last_run: Option<PipelineReport>,
}

#[derive(Debug, Serialize)]
struct ArtifactStatus {
    executable: PathBuf,
    present: bool,
    sha256: Option<String>,
}

/// Execute status command
pub(super) async fn execute_status(project: &Project, config: &RuntimeConfig, json: bool) -> Result<()> {
    let paths = &project.paths;

    let (artifact, inputs_error, environment) = match preflight(project) {
        Ok(inputs) => {
            let present = inputs.layout.executable.is_file();
            let sha256 = if present {
                calculate_sha256(&inputs.layout.root).await.ok().map(|d| d.sha256)
            } else {
                None
            };
            let environment = environment_state(project, &inputs.manifest_raw);
            (
                Some(ArtifactStatus {
                    executable: inputs.layout.executable,
                    present,
                    sha256,
                }),
                None,
                environment,
            )
        }
        Err(e) => (None, Some(e.to_string()), environment_state(project, &[])),
    };

    let snapshot = StatusSnapshot {
        project_root: paths.project_root.clone(),
        config_file: project.config_file.clone(),
        app_name: project.config.app_name.clone(),
        env_dir: paths.env_dir.clone(),
        environment,
        inputs_error,
        artifact,
        last_run: PipelineReport::load(&paths.report_path())?,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    let _ = config.output().section(&format!("📊 {}", snapshot.app_name));
    config.println(&format!("Project:     {}", snapshot.project_root.display()));
    match &snapshot.config_file {
        Some(file) => config.println(&format!("Config:      {}", file.display())),
        None => config.println("Config:      defaults (no release.toml)"),
    }
    config.println(&format!(
        "Environment: {} ({})",
        snapshot.env_dir.display(),
        snapshot.environment
    ));

    if let Some(error) = &snapshot.inputs_error {
        config.warning_println(error);
    }
    if let Some(artifact) = &snapshot.artifact {
        if artifact.present {
            config.println(&format!("Artifact:    {}", artifact.executable.display()));
            if let Some(sha) = &artifact.sha256 {
                config.indent(&format!("sha256 {}", sha));
            }
        } else {
            config.println(&format!(
                "Artifact:    not built ({})",
                artifact.executable.display()
            ));
        }
    }

    match &snapshot.last_run {
        None => config.println("Last run:    none recorded"),
        Some(report) => {
            config.println(&format!("Last run:    {}", report.summary()));
            for record in &report.stages {
                let status = match &record.status {
                    StageStatus::Pending => "pending".to_string(),
                    StageStatus::Succeeded => "succeeded".to_string(),
                    StageStatus::Reused => "reused".to_string(),
                    StageStatus::Skipped => "skipped".to_string(),
                    StageStatus::Failed { message } => format!("failed: {}", message),
                };
                let duration = record
                    .duration_ms
                    .map(|ms| format!(" ({:.1}s)", ms as f64 / 1000.0))
                    .unwrap_or_default();
                config.indent(&format!(
                    "{}. {}: {}{}",
                    record.stage.number(),
                    record.stage,
                    status,
                    duration
                ));
            }
        }
    }

    Ok(())
}

/// Classify the environment against the recorded interpreter version.
///
/// Uses the version stored in the fingerprint so no interpreter is probed.
fn environment_state(project: &Project, manifest: &[u8]) -> String {
    let env_dir = &project.paths.env_dir;
    let interpreter_version = EnvironmentFingerprint::load(env_dir)
        .map(|recorded| recorded.interpreter_version)
        .unwrap_or_default();
    let expected = EnvironmentFingerprint::compute(
        manifest,
        &project.config.packager_requirement,
        &interpreter_version,
    );

    let state = inspect(env_dir, &expected);
    match state {
        EnvironmentState::Missing => "missing".to_string(),
        EnvironmentState::Stale { reason } => format!("stale: {}", reason),
        EnvironmentState::Ready => "ready".to_string(),
    }
}
