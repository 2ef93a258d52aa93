//! Error types for the build and release pipeline.
//!
//! Each pipeline stage owns an error enum; [`ReleaseError`] wraps them and
//! knows which stage failed, which exit code to report and what the operator
//! can do next.

use crate::pipeline::Stage;
use crate::process::ProcessError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, ReleaseError>;

/// Main error type for all pipeline operations
#[derive(Error, Debug)]
pub enum ReleaseError {
    /// Required project inputs are missing or inconsistent
    #[error("Input error: {0}")]
    Input(#[from] InputError),

    /// Stage 1 failures
    #[error("Environment error: {0}")]
    Environment(#[from] EnvironmentError),

    /// Stage 2 failures
    #[error("Install error: {0}")]
    Install(#[from] InstallError),

    /// Stage 3 failures
    #[error("Packaging error: {0}")]
    Package(#[from] PackageError),

    /// Stage 4 failures
    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),

    /// Configuration file errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// CLI argument errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Missing or inconsistent project inputs, detected before stage 1 runs.
#[derive(Error, Debug)]
pub enum InputError {
    /// A required input file does not exist
    #[error("{kind} not found at {path}")]
    Missing {
        /// Which input (entry script, dependency manifest, build descriptor)
        kind: &'static str,
        /// Expected location
        path: PathBuf,
    },

    /// No build descriptor configured and none could be discovered
    #[error("No build descriptor found in {root}; set `descriptor` in release.toml")]
    NoDescriptor {
        /// Project root that was searched
        root: PathBuf,
    },

    /// Several descriptors present and none configured
    #[error("Several build descriptors found ({candidates:?}); set `descriptor` in release.toml")]
    AmbiguousDescriptor {
        /// Candidate descriptor files
        candidates: Vec<PathBuf>,
    },

    /// Descriptor names a different bundle than the configured application
    #[error(
        "Build descriptor produces '{descriptor_name}' but app_name is '{app_name}'; the artifact path would not match"
    )]
    NameMismatch {
        /// Bundle name found in the descriptor
        descriptor_name: String,
        /// Configured application name
        app_name: String,
    },
}

/// Environment provisioning errors (stage 1)
#[derive(Error, Debug)]
pub enum EnvironmentError {
    /// No usable Python interpreter was found
    #[error("Python toolchain not found (tried: {})", tried.join(", "))]
    ToolchainMissing {
        /// Interpreter candidates that were probed
        tried: Vec<String>,
    },

    /// Creating the isolated environment failed
    #[error("Failed to create build environment at {path}: {source}")]
    CreateFailed {
        /// Environment directory
        path: PathBuf,
        /// Underlying subprocess failure
        #[source]
        source: ProcessError,
    },

    /// Environment was created but has no interpreter
    #[error("Build environment at {path} has no interpreter")]
    InterpreterMissing {
        /// Expected interpreter path
        path: PathBuf,
    },

    /// A stale environment could not be removed
    #[error("Failed to remove stale environment {path}: {source}")]
    RemoveFailed {
        /// Environment directory
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// The previous artifact could not be removed before the build
    #[error("Failed to remove the previous artifact: {source}")]
    StaleArtifact {
        /// Underlying cleanup failure
        #[source]
        source: PackageError,
    },

    /// The environment fingerprint could not be written
    #[error("Failed to record environment fingerprint at {path}: {reason}")]
    FingerprintWrite {
        /// Fingerprint file path
        path: PathBuf,
        /// Reason for the error
        reason: String,
    },
}

/// Dependency installation errors (stage 2)
#[derive(Error, Debug)]
pub enum InstallError {
    /// Dependency manifest contains an unparseable line
    #[error("Invalid requirement on line {line} of {path}: {reason}")]
    InvalidManifest {
        /// Manifest path
        path: PathBuf,
        /// 1-based line number
        line: usize,
        /// Reason for the error
        reason: String,
    },

    /// Upgrading the package installer failed
    #[error("Failed to upgrade pip: {source}")]
    InstallerUpgradeFailed {
        /// Underlying subprocess failure
        #[source]
        source: ProcessError,
    },

    /// Installing the declared packages failed
    #[error("Failed to install dependencies: {source}")]
    PackagesFailed {
        /// Underlying subprocess failure
        #[source]
        source: ProcessError,
    },
}

/// Packaging errors (stage 3)
#[derive(Error, Debug)]
pub enum PackageError {
    /// Descriptor file could not be read
    #[error("Failed to read build descriptor {path}: {source}")]
    DescriptorUnreadable {
        /// Descriptor path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// The packaging tool failed
    #[error("PyInstaller failed: {source}")]
    PackagerFailed {
        /// Underlying subprocess failure
        #[source]
        source: ProcessError,
    },

    /// Packager reported success but the executable is missing
    #[error("Packager finished but no executable at {path}")]
    ArtifactMissing {
        /// Expected executable path
        path: PathBuf,
    },

    /// Removing a previous or partial artifact failed
    #[error("Failed to clear artifact directory {path}: {source}")]
    CleanupFailed {
        /// Artifact directory
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Hashing the artifact tree failed
    #[error("Failed to checksum artifact {path}: {reason}")]
    ChecksumFailed {
        /// Artifact path
        path: PathBuf,
        /// Reason for the error
        reason: String,
    },
}

/// Publishing errors (stage 4)
#[derive(Error, Debug)]
pub enum PublishError {
    /// No token available for the GitHub API
    #[error("GitHub token not provided. Set GITHUB_TOKEN or GH_TOKEN")]
    TokenMissing,

    /// Repository could not be determined
    #[error("GitHub repository unknown. Set GITHUB_REPOSITORY or [github].repository")]
    RepositoryMissing,

    /// Repository string is not `owner/repo`
    #[error("Invalid GitHub repository format: '{value}'. Expected: owner/repo")]
    InvalidRepository {
        /// Offending value
        value: String,
    },

    /// Tag does not follow `v<semver>`
    #[error("Invalid version tag '{tag}': {reason}")]
    InvalidTag {
        /// Tag string
        tag: String,
        /// Reason for the error
        reason: String,
    },

    /// Reading tags from the local repository failed
    #[error("Failed to read git tags: {reason}")]
    TagDetection {
        /// Reason for the error
        reason: String,
    },

    /// Building the release archive failed
    #[error("Failed to archive {path}: {reason}")]
    Archive {
        /// Artifact directory
        path: PathBuf,
        /// Reason for the error
        reason: String,
    },

    /// GitHub API call failed
    #[error("GitHub API {operation} failed{}: {reason}", status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Api {
        /// Operation being performed
        operation: String,
        /// HTTP status, when a response was received
        status: Option<u16>,
        /// Reason for the error
        reason: String,
    },

    /// Writing CI step outputs failed
    #[error("Failed to write step outputs to {path}: {source}")]
    StepOutput {
        /// Output file path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read {path}: {source}")]
    Read {
        /// Config file path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for this schema
    #[error("Failed to parse {path}: {source}")]
    Parse {
        /// Config file path
        path: PathBuf,
        /// TOML error
        #[source]
        source: toml::de::Error,
    },

    /// A value is syntactically valid but unusable
    #[error("Invalid value for '{field}': {reason}")]
    Invalid {
        /// Field name
        field: &'static str,
        /// Reason for the error
        reason: String,
    },
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },
}

impl ReleaseError {
    /// Pipeline stage this error belongs to, if any
    pub fn stage(&self) -> Option<Stage> {
        match self {
            ReleaseError::Environment(_) => Some(Stage::Provision),
            ReleaseError::Install(_) => Some(Stage::Install),
            ReleaseError::Package(_) => Some(Stage::Package),
            ReleaseError::Publish(_) => Some(Stage::Publish),
            _ => None,
        }
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self.stage() {
            Some(stage) => stage.exit_code(),
            None => 1,
        }
    }

    /// Last output lines of the failed subprocess behind this error, if any
    pub fn output_tail(&self) -> &[String] {
        match self {
            ReleaseError::Environment(EnvironmentError::CreateFailed { source, .. })
            | ReleaseError::Install(InstallError::InstallerUpgradeFailed { source })
            | ReleaseError::Install(InstallError::PackagesFailed { source })
            | ReleaseError::Package(PackageError::PackagerFailed { source }) => {
                source.output_tail()
            }
            _ => &[],
        }
    }

    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            ReleaseError::Environment(EnvironmentError::ToolchainMissing { .. }) => vec![
                "Install Python 3 from python.org and tick \"Add python.exe to PATH\"".to_string(),
                "Or point AVITO_BUILD_PYTHON at an interpreter".to_string(),
            ],
            ReleaseError::Environment(EnvironmentError::StaleArtifact { .. }) => vec![
                "Close any running copy of the previous build and run again".to_string(),
            ],
            ReleaseError::Environment(_) => vec![
                "Delete the build environment (avito_bundler_release clean) and run again"
                    .to_string(),
            ],
            ReleaseError::Install(InstallError::InvalidManifest { .. }) => {
                vec!["Fix the reported line in requirements.txt".to_string()]
            }
            ReleaseError::Install(_) => vec![
                "Check the network connection and the package names in requirements.txt"
                    .to_string(),
                "Run again; nothing is retried automatically".to_string(),
            ],
            ReleaseError::Package(PackageError::PackagerFailed { .. }) => vec![
                "Check the PyInstaller output above for missing files or hidden imports"
                    .to_string(),
                "Verify the .spec file references existing resources".to_string(),
            ],
            ReleaseError::Publish(PublishError::TokenMissing) => vec![
                "Grant the workflow `contents: write` permission".to_string(),
                "Export GITHUB_TOKEN when publishing outside GitHub Actions".to_string(),
            ],
            ReleaseError::Publish(_) => vec![
                "The build succeeded; re-run the workflow to retry publication".to_string(),
            ],
            ReleaseError::Input(_) | ReleaseError::Config(_) => {
                vec!["Check release.toml and the project layout".to_string()]
            }
            _ => vec!["Check the error message above for specific details".to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_errors_map_to_distinct_exit_codes() {
        let toolchain = ReleaseError::from(EnvironmentError::ToolchainMissing {
            tried: vec!["python".to_string()],
        });
        let publish = ReleaseError::from(PublishError::TokenMissing);
        let input = ReleaseError::from(InputError::NoDescriptor {
            root: PathBuf::from("."),
        });

        assert_eq!(toolchain.stage(), Some(Stage::Provision));
        assert_eq!(toolchain.exit_code(), 10);
        assert_eq!(publish.exit_code(), 40);
        assert_eq!(input.stage(), None);
        assert_eq!(input.exit_code(), 1);

        let stale = ReleaseError::from(EnvironmentError::StaleArtifact {
            source: PackageError::CleanupFailed {
                path: PathBuf::from("dist/App"),
                source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            },
        });
        assert_eq!(stale.stage(), Some(Stage::Provision));
        assert_eq!(stale.exit_code(), 10);
    }

    #[test]
    fn subprocess_failures_expose_their_output_tail() {
        let failure = crate::process::ProcessFailure {
            command: "python -m PyInstaller App.spec".to_string(),
            exit_code: Some(1),
            output_tail: vec![
                "INFO: Building EXE".to_string(),
                "FileNotFoundError: icon.ico".to_string(),
            ],
        };
        let packaging = ReleaseError::from(PackageError::PackagerFailed {
            source: ProcessError::Exited(failure),
        });
        assert_eq!(packaging.output_tail().len(), 2);
        assert_eq!(packaging.output_tail()[1], "FileNotFoundError: icon.ico");

        let token = ReleaseError::from(PublishError::TokenMissing);
        assert!(token.output_tail().is_empty());
    }

    #[test]
    fn toolchain_message_lists_candidates() {
        let err = EnvironmentError::ToolchainMissing {
            tried: vec!["py -3".to_string(), "python".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Python toolchain not found (tried: py -3, python)"
        );
    }

    #[test]
    fn api_error_includes_status_when_present() {
        let with_status = PublishError::Api {
            operation: "create release".to_string(),
            status: Some(422),
            reason: "already_exists".to_string(),
        };
        let without = PublishError::Api {
            operation: "create release".to_string(),
            status: None,
            reason: "timeout".to_string(),
        };
        assert!(with_status.to_string().contains("(HTTP 422)"));
        assert!(!without.to_string().contains("HTTP"));
    }
}
