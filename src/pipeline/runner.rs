//! Stage sequencing.
//!
//! Runs the stages strictly in order and stops at the first failure. Every
//! run ends with a saved [`PipelineReport`], whatever the outcome.

use super::report::{PipelineReport, RunOutcome, StageStatus};
use super::stage::{EntryPoint, Stage};
use crate::config::{EnvConfig, Project};
use crate::environment::{self, EnvironmentFingerprint, Provisioned, Toolchain};
use crate::error::{EnvironmentError, InputError, Result};
use crate::install::{self, DependencyManifest};
use crate::package::{self, ArtifactLayout, BuildArtifact, BuildDescriptor};
use crate::publish::{
    self, GitHubReleaseConfig, GitHubReleaseManager, PublishOutcome, PublishPlan,
};
use std::io::ErrorKind;
use std::time::{Duration, Instant};

/// Receives progress while the pipeline runs
pub trait Progress {
    /// A stage is starting
    fn stage_started(&mut self, stage: Stage);

    /// One line of subprocess output from `stage`
    fn output(&mut self, stage: Stage, line: &str);

    /// A stage ended
    fn stage_finished(&mut self, stage: Stage, status: &StageStatus, elapsed: Duration);
}

/// Progress sink that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentProgress;

impl Progress for SilentProgress {
    fn stage_started(&mut self, _stage: Stage) {}

    fn output(&mut self, _stage: Stage, _line: &str) {}

    fn stage_finished(&mut self, _stage: Stage, _status: &StageStatus, _elapsed: Duration) {}
}

/// How the pipeline was invoked
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Invocation entry point; only [`EntryPoint::Ci`] runs stage 4
    pub entry_point: EntryPoint,
    /// Recreate the build environment even if it is ready
    pub refresh: bool,
    /// Explicit release tag, overriding detection
    pub tag: Option<String>,
}

impl PipelineOptions {
    /// Options for `entry_point` with everything else defaulted
    pub fn new(entry_point: EntryPoint) -> Self {
        Self {
            entry_point,
            refresh: false,
            tag: None,
        }
    }
}

/// Validated inputs, gathered before stage 1
#[derive(Debug, Clone)]
pub struct Preflight {
    /// Build descriptor
    pub descriptor: BuildDescriptor,
    /// Dependency manifest bytes, read once per run
    pub manifest_raw: Vec<u8>,
    /// Where the artifact will land
    pub layout: ArtifactLayout,
}

/// Check the three inputs and locate the artifact path
pub fn preflight(project: &Project) -> Result<Preflight> {
    let paths = &project.paths;

    if !paths.entry_script.is_file() {
        return Err(InputError::Missing {
            kind: "entry script",
            path: paths.entry_script.clone(),
        }
        .into());
    }

    let manifest_raw = match std::fs::read(&paths.manifest) {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(InputError::Missing {
                kind: "dependency manifest",
                path: paths.manifest.clone(),
            }
            .into());
        }
        Err(e) => return Err(e.into()),
    };

    let descriptor_path = project.descriptor_path()?;
    if !descriptor_path.is_file() {
        return Err(InputError::Missing {
            kind: "build descriptor",
            path: descriptor_path,
        }
        .into());
    }
    let descriptor = BuildDescriptor::inspect(&descriptor_path)?;

    // Both the folder and the executable must carry the application name.
    let app_name = &project.config.app_name;
    if let Some(name) = descriptor
        .declared_names()
        .find(|name| *name != app_name.as_str())
    {
        return Err(InputError::NameMismatch {
            descriptor_name: name.to_string(),
            app_name: app_name.clone(),
        }
        .into());
    }

    let layout = descriptor.mode.layout(&paths.dist_dir, app_name);

    Ok(Preflight {
        descriptor,
        manifest_raw,
        layout,
    })
}

/// Run the pipeline for `project`.
///
/// Returns the saved report on success. On failure the report is saved with
/// the failing stage and the first error is returned.
pub async fn run_pipeline(
    project: &Project,
    env: &EnvConfig,
    options: &PipelineOptions,
    progress: &mut dyn Progress,
) -> Result<PipelineReport> {
    let mut report = PipelineReport::new(options.entry_point, &project.paths.project_root);
    log::info!(
        "Pipeline run {} ({:?}) for {}",
        report.run_id,
        options.entry_point,
        project.paths.project_root.display()
    );

    let result = execute(project, env, options, progress, &mut report).await;

    match &result {
        Ok(()) => report.finish(RunOutcome::Succeeded, None),
        Err(e) => {
            let outcome = match e.stage() {
                Some(Stage::Publish) => RunOutcome::PublishFailed,
                Some(stage) => RunOutcome::BuildFailed { stage },
                None => RunOutcome::Rejected,
            };
            log::error!("Pipeline run {} failed: {}", report.run_id, e);
            report.finish(outcome, Some(e.to_string()));
        }
    }

    let report_path = project.paths.report_path();
    if let Err(e) = report.save(&report_path) {
        log::warn!("Failed to write {}: {}", report_path.display(), e);
    }

    result.map(|()| report)
}

async fn execute(
    project: &Project,
    env: &EnvConfig,
    options: &PipelineOptions,
    progress: &mut dyn Progress,
    report: &mut PipelineReport,
) -> Result<()> {
    let inputs = preflight(project)?;

    let started = begin(progress, Stage::Provision);
    let result = provision_environment(project, env, options, &inputs, progress).await;
    let (provisioned, fingerprint) = conclude(
        report,
        progress,
        Stage::Provision,
        started,
        result,
        |(provisioned, _)| {
            if provisioned.reused {
                StageStatus::Reused
            } else {
                StageStatus::Succeeded
            }
        },
    )?;

    let started = begin(progress, Stage::Install);
    let result = if provisioned.reused {
        log::info!("Dependencies already installed; skipping");
        Ok(false)
    } else {
        install_dependencies(project, &inputs, &provisioned, &fingerprint, progress)
            .await
            .map(|()| true)
    };
    conclude(report, progress, Stage::Install, started, result, |installed| {
        if *installed {
            StageStatus::Succeeded
        } else {
            StageStatus::Reused
        }
    })?;

    let started = begin(progress, Stage::Package);
    let result: Result<BuildArtifact> = package::package(
        &provisioned.environment,
        &inputs.descriptor,
        &project.config.app_name,
        &project.paths,
        |line| progress.output(Stage::Package, line),
    )
    .await
    .map_err(Into::into);
    let artifact = conclude(report, progress, Stage::Package, started, result, |_| {
        StageStatus::Succeeded
    })?;
    report.artifact = Some(artifact.clone());

    if options.entry_point != EntryPoint::Ci {
        report.record(Stage::Publish, StageStatus::Skipped, None);
        return Ok(());
    }

    let started = begin(progress, Stage::Publish);
    let result = publish_artifact(project, env, options, &artifact, report).await;
    let outcome = conclude(report, progress, Stage::Publish, started, result, |_| {
        StageStatus::Succeeded
    })?;
    report.release = outcome.release;

    Ok(())
}

fn begin(progress: &mut dyn Progress, stage: Stage) -> Instant {
    log::info!("Stage {} ({}) started", stage.number(), stage);
    progress.stage_started(stage);
    Instant::now()
}

fn conclude<T>(
    report: &mut PipelineReport,
    progress: &mut dyn Progress,
    stage: Stage,
    started: Instant,
    result: Result<T>,
    status: impl FnOnce(&T) -> StageStatus,
) -> Result<T> {
    let elapsed = started.elapsed();
    let status = match &result {
        Ok(value) => status(value),
        Err(e) => StageStatus::Failed {
            message: e.to_string(),
        },
    };
    log::info!(
        "Stage {} ({}) finished in {:.1}s: {:?}",
        stage.number(),
        stage,
        elapsed.as_secs_f64(),
        status
    );
    progress.stage_finished(stage, &status, elapsed);
    report.record(stage, status, Some(elapsed));
    result
}

async fn provision_environment(
    project: &Project,
    env: &EnvConfig,
    options: &PipelineOptions,
    inputs: &Preflight,
    progress: &mut dyn Progress,
) -> Result<(Provisioned, EnvironmentFingerprint)> {
    let toolchain = Toolchain::discover(&project.interpreter_candidates(env)).await?;

    // Kept while no toolchain exists; gone for every later failure.
    package::remove_artifact(&inputs.layout.root)
        .await
        .map_err(|source| EnvironmentError::StaleArtifact { source })?;

    let fingerprint = EnvironmentFingerprint::compute(
        &inputs.manifest_raw,
        &project.config.packager_requirement,
        &toolchain.version,
    );

    let provisioned = environment::provision(
        &toolchain,
        &project.paths.env_dir,
        &fingerprint,
        options.refresh,
        &project.paths.project_root,
        |line| progress.output(Stage::Provision, line),
    )
    .await?;

    Ok((provisioned, fingerprint))
}

async fn install_dependencies(
    project: &Project,
    inputs: &Preflight,
    provisioned: &Provisioned,
    fingerprint: &EnvironmentFingerprint,
    progress: &mut dyn Progress,
) -> Result<()> {
    let env_dir = &provisioned.environment.root;
    let manifest = DependencyManifest::parse(&project.paths.manifest, inputs.manifest_raw.clone())?;

    let installed = install::install(
        &provisioned.environment,
        &manifest,
        &project.config.packager_requirement,
        &project.paths.project_root,
        |line| progress.output(Stage::Install, line),
    )
    .await;

    if let Err(e) = installed {
        EnvironmentFingerprint::invalidate(env_dir);
        return Err(e.into());
    }

    // Without a fingerprint the next run rebuilds the environment, which is safe.
    if let Err(e) = fingerprint.store(env_dir) {
        log::warn!("{}", e);
    }
    Ok(())
}

async fn publish_artifact(
    project: &Project,
    env: &EnvConfig,
    options: &PipelineOptions,
    artifact: &BuildArtifact,
    report: &mut PipelineReport,
) -> Result<PublishOutcome> {
    let tag = publish::detect_tag(options.tag.as_deref(), env, &project.paths.project_root)?;
    let plan = PublishPlan::from_tag(tag.as_deref());
    log::info!("Publish plan: {:?}", plan);

    let run_artifact = publish::stage_run_artifact(artifact, project, &plan, env).await?;
    report.run_artifact = Some(run_artifact.clone());

    let release = match plan.release_tag() {
        Some(tag) => {
            let config = GitHubReleaseConfig::resolve(&project.config.github, env)?;
            let manager = GitHubReleaseManager::new(config)?;
            Some(publish::publish_release(&manager, tag, &run_artifact).await?)
        }
        None => None,
    };

    Ok(PublishOutcome {
        run_artifact,
        release,
    })
}
