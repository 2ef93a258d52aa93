//! GitHub release management over the REST API.

use super::tag::VersionTag;
use crate::config::{EnvConfig, GitHubSettings};
use crate::error::PublishError;
use bytes::Bytes;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::OnceLock;
use url::Url;

/// Default API endpoint, overridden by `GITHUB_API_URL` on enterprise runners
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Configuration for GitHub releases
#[derive(Debug, Clone)]
pub struct GitHubReleaseConfig {
    /// Repository owner
    pub owner: String,
    /// Repository name
    pub repo: String,
    /// API base URL
    pub api_url: String,
    /// Whether to mark as pre-release for pre-1.0 versions
    pub prerelease_for_zero_versions: bool,
    /// GitHub token
    pub token: String,
}

impl GitHubReleaseConfig {
    /// Resolve repository and token from `release.toml` and the runner environment
    pub fn resolve(settings: &GitHubSettings, env: &EnvConfig) -> Result<Self, PublishError> {
        let repository = settings
            .repository
            .clone()
            .or_else(|| env.get("GITHUB_REPOSITORY"))
            .ok_or(PublishError::RepositoryMissing)?;
        let (owner, repo) = parse_repository(&repository)?;
        let token = env.github_token().ok_or(PublishError::TokenMissing)?;

        Ok(Self {
            owner,
            repo,
            api_url: env
                .get("GITHUB_API_URL")
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            prerelease_for_zero_versions: settings.prerelease_for_zero_versions,
            token,
        })
    }
}

/// Split `owner/repo`
pub fn parse_repository(value: &str) -> Result<(String, String), PublishError> {
    let invalid = || PublishError::InvalidRepository {
        value: value.to_string(),
    };
    let (owner, repo) = value.trim().split_once('/').ok_or_else(invalid)?;
    let repo = repo.trim_end_matches(".git");
    if owner.is_empty() || repo.is_empty() || repo.contains('/') {
        return Err(invalid());
    }
    Ok((owner.to_string(), repo.to_string()))
}

/// Release as returned by the API
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseInfo {
    /// Release ID
    pub id: u64,
    /// Tag the release belongs to
    pub tag_name: String,
    /// Release page
    pub html_url: String,
    /// RFC 6570 template for asset uploads
    pub upload_url: String,
    /// Whether this is a prerelease
    #[serde(default)]
    pub prerelease: bool,
    /// Assets already attached
    #[serde(default)]
    pub assets: Vec<AssetInfo>,
}

impl ReleaseInfo {
    /// Names of the attached assets
    pub fn asset_names(&self) -> HashSet<String> {
        self.assets.iter().map(|a| a.name.clone()).collect()
    }
}

/// Release asset as returned by the API
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssetInfo {
    /// File name
    pub name: String,
    /// Public download URL
    pub browser_download_url: String,
    /// Size in bytes
    #[serde(default)]
    pub size: u64,
}

#[derive(Serialize)]
struct CreateReleaseRequest<'a> {
    tag_name: &'a str,
    name: String,
    body: String,
    draft: bool,
    prerelease: bool,
}

/// GitHub release manager
pub struct GitHubReleaseManager {
    client: Client,
    config: GitHubReleaseConfig,
}

static RUSTLS_INITIALIZED: OnceLock<()> = OnceLock::new();

impl GitHubReleaseManager {
    /// Create a manager with an authenticated HTTP client
    pub fn new(config: GitHubReleaseConfig) -> Result<Self, PublishError> {
        RUSTLS_INITIALIZED.get_or_init(|| {
            // Fails only when a provider is already installed, which is fine.
            let _ = rustls::crypto::ring::default_provider().install_default();
        });

        let client_error = |reason: String| PublishError::Api {
            operation: "client_init".to_string(),
            status: None,
            reason,
        };

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.token))
            .map_err(|e| client_error(e.to_string()))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("x-github-api-version", HeaderValue::from_static("2022-11-28"));

        let client = Client::builder()
            .default_headers(headers)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| client_error(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn repo_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.config.api_url.trim_end_matches('/'),
            self.config.owner,
            self.config.repo,
            path
        )
    }

    /// Look up the release for `tag`, `None` when it does not exist
    pub async fn find_release(&self, tag: &VersionTag) -> Result<Option<ReleaseInfo>, PublishError> {
        let operation = "get_release_by_tag";
        let response = self
            .client
            .get(self.repo_url(&format!("releases/tags/{}", tag.name)))
            .send()
            .await
            .map_err(|e| transport_error(operation, e))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check_status(operation, response).await?;
        let release = response
            .json::<ReleaseInfo>()
            .await
            .map_err(|e| transport_error(operation, e))?;
        Ok(Some(release))
    }

    /// Create a published release for `tag`
    pub async fn create_release(&self, tag: &VersionTag) -> Result<ReleaseInfo, PublishError> {
        let operation = "create_release";
        let request = CreateReleaseRequest {
            tag_name: &tag.name,
            name: tag.name.clone(),
            body: format!("Release version {}", tag.version),
            draft: false,
            prerelease: tag.is_prerelease(self.config.prerelease_for_zero_versions),
        };

        let response = self
            .client
            .post(self.repo_url("releases"))
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(operation, e))?;
        let response = check_status(operation, response).await?;
        response
            .json::<ReleaseInfo>()
            .await
            .map_err(|e| transport_error(operation, e))
    }

    /// Find the release for `tag` or create it; the flag is true when created
    pub async fn ensure_release(&self, tag: &VersionTag) -> Result<(ReleaseInfo, bool), PublishError> {
        if let Some(release) = self.find_release(tag).await? {
            log::info!("Release {} already exists (id {})", tag, release.id);
            return Ok((release, false));
        }
        let release = self.create_release(tag).await?;
        log::info!("Created release {} (id {})", tag, release.id);
        Ok((release, true))
    }

    /// Upload `path` as a release asset
    pub async fn upload_asset(
        &self,
        release: &ReleaseInfo,
        path: &Path,
    ) -> Result<AssetInfo, PublishError> {
        let operation = "upload_release_asset";
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| PublishError::Archive {
                path: path.to_path_buf(),
                reason: "archive name is not valid UTF-8".to_string(),
            })?;

        let content = tokio::fs::read(path)
            .await
            .map_err(|e| PublishError::Archive {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let url = upload_endpoint(&release.upload_url, filename, &create_artifact_label(filename))
            .map_err(|reason| PublishError::Api {
                operation: operation.to_string(),
                status: None,
                reason,
            })?;

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/zip")
            .body(Bytes::from(content))
            .send()
            .await
            .map_err(|e| transport_error(operation, e))?;
        let response = check_status(operation, response).await?;
        response
            .json::<AssetInfo>()
            .await
            .map_err(|e| transport_error(operation, e))
    }
}

fn transport_error(operation: &str, error: reqwest::Error) -> PublishError {
    PublishError::Api {
        operation: operation.to_string(),
        status: error.status().map(|s| s.as_u16()),
        reason: error.to_string(),
    }
}

async fn check_status(operation: &str, response: Response) -> Result<Response, PublishError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(PublishError::Api {
        operation: operation.to_string(),
        status: Some(status.as_u16()),
        reason: api_message(&body).unwrap_or_else(|| status.to_string()),
    })
}

/// `message` field of a GitHub error body
fn api_message(body: &str) -> Option<String> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()?
        .get("message")?
        .as_str()
        .map(str::to_string)
}

/// Expand the `upload_url` template (`...assets{?name,label}`)
pub fn upload_endpoint(template: &str, name: &str, label: &str) -> Result<Url, String> {
    let base = template.split('{').next().unwrap_or(template);
    Url::parse_with_params(base, &[("name", name), ("label", label)]).map_err(|e| e.to_string())
}

/// Create descriptive label for artifact based on filename
pub fn create_artifact_label(filename: &str) -> String {
    let arch = if filename.contains("aarch64") || filename.contains("arm64") {
        "ARM64"
    } else if filename.contains("x86_64") || filename.contains("amd64") {
        "x86_64"
    } else {
        "multi-arch"
    };

    let platform = if filename.contains("windows") {
        "Windows"
    } else if filename.contains("macos") {
        "macOS"
    } else if filename.contains("linux") {
        "Linux"
    } else {
        "Binary"
    };

    let app = filename.split('-').next().unwrap_or(filename);
    format!("{} {} - {}", app, platform, arch)
}
