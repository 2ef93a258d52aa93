//! Publisher (stage 4, CI only).
//!
//! Every successful CI build is staged as a transient run artifact. When the
//! commit carries a `v<semver>` tag the same archive is also attached to the
//! GitHub release for that tag, creating the release if needed. Nothing is
//! staged or published for a failed build; the runner never calls in here.

mod archive;
mod git;
mod github;
mod outputs;
mod tag;

pub use archive::{archive_name, create_archive, platform_label};
pub use git::tags_at_head;
pub use github::{
    AssetInfo, DEFAULT_API_URL, GitHubReleaseConfig, GitHubReleaseManager, ReleaseInfo,
    create_artifact_label, parse_repository, upload_endpoint,
};
pub use outputs::StepOutputs;
pub use tag::{PublishPlan, TAG_PREFIX, VersionTag, detect_tag, matches_release_pattern};

use crate::config::{EnvConfig, Project};
use crate::error::PublishError;
use crate::package::BuildArtifact;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Archive staged for the workflow's upload-artifact step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunArtifact {
    /// Artifact name shown in the workflow run
    pub name: String,
    /// Archive path
    pub path: PathBuf,
    /// Archive size in bytes
    pub size: u64,
}

/// Outcome of attaching the archive to a release
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishedRelease {
    /// Release tag
    pub tag: String,
    /// Release page
    pub html_url: String,
    /// Asset file name
    pub asset_name: String,
    /// Download URL, `None` when the asset was already present
    pub download_url: Option<String>,
    /// True when this run created the release
    pub created: bool,
    /// True when the asset was uploaded by an earlier run
    pub already_uploaded: bool,
}

/// Result of stage 4
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishOutcome {
    /// Staged run artifact
    pub run_artifact: RunArtifact,
    /// Release, when the commit was tagged
    pub release: Option<PublishedRelease>,
}

/// Zip the artifact under `dist/release` and announce it to the workflow.
pub async fn stage_run_artifact(
    artifact: &BuildArtifact,
    project: &Project,
    plan: &PublishPlan,
    env: &EnvConfig,
) -> Result<RunArtifact, PublishError> {
    let label = plan.artifact_label(env);
    let path = create_archive(artifact, &project.paths.release_dir(), &label).await?;
    let size = tokio::fs::metadata(&path)
        .await
        .map(|m| m.len())
        .map_err(|e| PublishError::Archive {
            path: path.clone(),
            reason: e.to_string(),
        })?;

    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| artifact.name.clone());

    let outputs = StepOutputs::new(env.github_output());
    let mut pairs = vec![
        ("artifact-name", name.clone()),
        ("artifact-path", path.display().to_string()),
    ];
    if let Some(tag) = plan.release_tag() {
        pairs.push(("release-tag", tag.name.clone()));
    }
    outputs.write(&pairs)?;

    log::info!("Staged run artifact {} ({} bytes)", path.display(), size);
    Ok(RunArtifact { name, path, size })
}

/// Attach the staged archive to the release for `tag`.
///
/// Re-running for the same tag reuses the release and skips an asset that is
/// already attached.
pub async fn publish_release(
    manager: &GitHubReleaseManager,
    tag: &VersionTag,
    run_artifact: &RunArtifact,
) -> Result<PublishedRelease, PublishError> {
    let (release, created) = manager.ensure_release(tag).await?;
    let asset_name = run_artifact
        .path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| run_artifact.name.clone());

    if release.asset_names().contains(&asset_name) {
        log::info!("Asset {} already attached to {}", asset_name, tag);
        return Ok(PublishedRelease {
            tag: tag.name.clone(),
            html_url: release.html_url,
            asset_name,
            download_url: None,
            created,
            already_uploaded: true,
        });
    }

    let asset = manager.upload_asset(&release, &run_artifact.path).await?;
    log::info!("Uploaded {} ({} bytes)", asset.name, asset.size);

    Ok(PublishedRelease {
        tag: tag.name.clone(),
        html_url: release.html_url,
        asset_name: asset.name,
        download_url: Some(asset.browser_download_url),
        created,
        already_uploaded: false,
    })
}
