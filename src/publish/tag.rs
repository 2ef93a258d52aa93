//! Version tags and the publish state machine.

use crate::config::EnvConfig;
use crate::error::PublishError;
use semver::Version;
use std::fmt;
use std::path::Path;

/// Prefix every release tag carries
pub const TAG_PREFIX: char = 'v';

/// A tag of the form `v<semver>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionTag {
    /// Tag as it appears in the repository
    pub name: String,
    /// Parsed version
    pub version: Version,
}

impl VersionTag {
    /// Parse `v1.2.3`, `v2.0.0-rc.1`, ...
    pub fn parse(tag: &str) -> Result<Self, PublishError> {
        let tag = tag.trim();
        let invalid = |reason: String| PublishError::InvalidTag {
            tag: tag.to_string(),
            reason,
        };

        let version = tag
            .strip_prefix(TAG_PREFIX)
            .ok_or_else(|| invalid(format!("must start with '{}'", TAG_PREFIX)))?;
        let version = Version::parse(version).map_err(|e| invalid(e.to_string()))?;

        Ok(Self {
            name: tag.to_string(),
            version,
        })
    }

    /// Pre-release flag for the GitHub release
    pub fn is_prerelease(&self, zero_versions_are_prereleases: bool) -> bool {
        !self.version.pre.is_empty() || (zero_versions_are_prereleases && self.version.major == 0)
    }
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// True when `tag` triggers a release
pub fn matches_release_pattern(tag: &str) -> bool {
    VersionTag::parse(tag).is_ok()
}

/// Publish state for the commit being built
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishPlan {
    /// No release tag: the build is kept only as a transient run artifact
    UntaggedPush {
        /// Non-release tag that was present, if any
        tag: Option<String>,
    },
    /// Release tag: the artifact is also attached to the release for `tag`
    TaggedPush {
        /// The release tag
        tag: VersionTag,
    },
}

impl PublishPlan {
    /// Decide the plan from the detected tag
    pub fn from_tag(tag: Option<&str>) -> Self {
        match tag {
            None => PublishPlan::UntaggedPush { tag: None },
            Some(raw) => match VersionTag::parse(raw) {
                Ok(tag) => PublishPlan::TaggedPush { tag },
                Err(e) => {
                    log::info!("Tag '{}' does not trigger a release: {}", raw, e);
                    PublishPlan::UntaggedPush {
                        tag: Some(raw.to_string()),
                    }
                }
            },
        }
    }

    /// Release tag, when publishing
    pub fn release_tag(&self) -> Option<&VersionTag> {
        match self {
            PublishPlan::TaggedPush { tag } => Some(tag),
            PublishPlan::UntaggedPush { .. } => None,
        }
    }

    /// Label used in archive names: the release tag, else the short commit
    pub fn artifact_label(&self, env: &EnvConfig) -> String {
        match self {
            PublishPlan::TaggedPush { tag } => tag.name.clone(),
            PublishPlan::UntaggedPush { .. } => env
                .get("GITHUB_SHA")
                .map(|sha| sha.chars().take(7).collect())
                .unwrap_or_else(|| "local".to_string()),
        }
    }
}

/// Find the tag of the commit being built.
///
/// Order: explicit argument, `GITHUB_REF` on a tag push, release tags pointing
/// at `HEAD` in the local repository. A branch `GITHUB_REF` means no tag.
pub fn detect_tag(
    explicit: Option<&str>,
    env: &EnvConfig,
    repo_root: &Path,
) -> Result<Option<String>, PublishError> {
    if let Some(tag) = explicit {
        return Ok(Some(tag.trim().to_string()));
    }

    if let Some(reference) = env.get("GITHUB_REF") {
        return Ok(reference.strip_prefix("refs/tags/").map(str::to_string));
    }

    let tags = super::git::tags_at_head(repo_root)?;
    let mut releases: Vec<VersionTag> = tags
        .iter()
        .filter_map(|t| VersionTag::parse(t).ok())
        .collect();
    releases.sort_by(|a, b| b.version.cmp(&a.version));

    Ok(releases
        .into_iter()
        .next()
        .map(|t| t.name)
        .or_else(|| tags.into_iter().next()))
}
