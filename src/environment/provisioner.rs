//! Build environment provisioning (stage 1).

use super::fingerprint::EnvironmentFingerprint;
use super::toolchain::{Toolchain, env_interpreter};
use crate::error::EnvironmentError;
use crate::process;
use std::path::{Path, PathBuf};

/// What is currently on disk at the environment directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvironmentState {
    /// No environment directory
    Missing,
    /// Directory exists but must not be reused
    Stale {
        /// Why the environment is unusable
        reason: String,
    },
    /// Environment matches the expected fingerprint
    Ready,
}

/// An isolated environment owned by this pipeline run
#[derive(Debug, Clone)]
pub struct BuildEnvironment {
    /// Environment directory
    pub root: PathBuf,
    /// Interpreter inside the environment
    pub python: PathBuf,
}

impl BuildEnvironment {
    /// Describe the environment at `root`
    pub fn at(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            python: env_interpreter(root),
        }
    }
}

/// Outcome of stage 1
#[derive(Debug, Clone)]
pub struct Provisioned {
    /// The environment to install into
    pub environment: BuildEnvironment,
    /// True when an existing environment already matched the fingerprint
    pub reused: bool,
}

/// Classify the environment at `env_dir` against the expected fingerprint
pub fn inspect(env_dir: &Path, expected: &EnvironmentFingerprint) -> EnvironmentState {
    if !env_dir.exists() {
        return EnvironmentState::Missing;
    }
    if !env_interpreter(env_dir).is_file() {
        return EnvironmentState::Stale {
            reason: "interpreter missing".to_string(),
        };
    }
    match EnvironmentFingerprint::load(env_dir) {
        None => EnvironmentState::Stale {
            reason: "no fingerprint (incomplete previous build)".to_string(),
        },
        Some(recorded) if !recorded.matches(expected) => EnvironmentState::Stale {
            reason: if recorded.manifest_sha256 != expected.manifest_sha256 {
                "dependency manifest changed".to_string()
            } else {
                "interpreter or packager changed".to_string()
            },
        },
        Some(_) => EnvironmentState::Ready,
    }
}

/// Stage 1: make sure an environment matching `expected` exists at `env_dir`.
///
/// A matching environment is reused unless `recreate` is set. Anything else at
/// that path is deleted and a fresh venv is created with `toolchain`.
pub async fn provision<F>(
    toolchain: &Toolchain,
    env_dir: &Path,
    expected: &EnvironmentFingerprint,
    recreate: bool,
    cwd: &Path,
    on_line: F,
) -> Result<Provisioned, EnvironmentError>
where
    F: FnMut(&str),
{
    let state = inspect(env_dir, expected);
    log::debug!("Environment {} is {:?}", env_dir.display(), state);

    match state {
        EnvironmentState::Ready if !recreate => {
            log::info!("Reusing build environment at {}", env_dir.display());
            return Ok(Provisioned {
                environment: BuildEnvironment::at(env_dir),
                reused: true,
            });
        }
        EnvironmentState::Missing => {}
        EnvironmentState::Ready | EnvironmentState::Stale { .. } => {
            log::info!("Removing build environment at {} ({:?})", env_dir.display(), state);
            tokio::fs::remove_dir_all(env_dir)
                .await
                .map_err(|source| EnvironmentError::RemoveFailed {
                    path: env_dir.to_path_buf(),
                    source,
                })?;
        }
    }

    let args = toolchain.venv_args(env_dir);
    process::run_streamed(&toolchain.program, &args, cwd, on_line)
        .await
        .map_err(|source| EnvironmentError::CreateFailed {
            path: env_dir.to_path_buf(),
            source,
        })?;

    let environment = BuildEnvironment::at(env_dir);
    if !environment.python.is_file() {
        return Err(EnvironmentError::InterpreterMissing {
            path: environment.python,
        });
    }

    Ok(Provisioned {
        environment,
        reused: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_env(dir: &Path) {
        let python = env_interpreter(dir);
        std::fs::create_dir_all(python.parent().expect("interpreter has parent"))
            .expect("create bin dir");
        std::fs::write(&python, "").expect("write interpreter");
    }

    #[test]
    fn inspect_classifies_environments() {
        let dir = tempfile::tempdir().expect("tempdir");
        let env_dir = dir.path().join("venv");
        let expected = EnvironmentFingerprint::compute(b"requests\n", "pyinstaller", "3.11.4");

        assert_eq!(inspect(&env_dir, &expected), EnvironmentState::Missing);

        std::fs::create_dir_all(&env_dir).expect("create env dir");
        assert!(matches!(
            inspect(&env_dir, &expected),
            EnvironmentState::Stale { reason } if reason == "interpreter missing"
        ));

        fake_env(&env_dir);
        assert!(matches!(
            inspect(&env_dir, &expected),
            EnvironmentState::Stale { reason } if reason.contains("no fingerprint")
        ));

        EnvironmentFingerprint::compute(b"pandas\n", "pyinstaller", "3.11.4")
            .store(&env_dir)
            .expect("store");
        assert!(matches!(
            inspect(&env_dir, &expected),
            EnvironmentState::Stale { reason } if reason == "dependency manifest changed"
        ));

        expected.store(&env_dir).expect("store");
        assert_eq!(inspect(&env_dir, &expected), EnvironmentState::Ready);
    }

    #[tokio::test]
    async fn ready_environment_is_reused_without_running_the_toolchain() {
        let dir = tempfile::tempdir().expect("tempdir");
        let env_dir = dir.path().join("venv");
        let expected = EnvironmentFingerprint::compute(b"requests\n", "pyinstaller", "3.11.4");
        fake_env(&env_dir);
        expected.store(&env_dir).expect("store");

        // Would fail to spawn if provisioning tried to create a venv.
        let toolchain = Toolchain {
            command: "missing".to_string(),
            program: PathBuf::from("no-such-python-9911"),
            launcher_args: Vec::new(),
            version: "3.11.4".to_string(),
        };

        let provisioned = provision(&toolchain, &env_dir, &expected, false, dir.path(), |_| {})
            .await
            .expect("reuse succeeds");
        assert!(provisioned.reused);
        assert_eq!(provisioned.environment.root, env_dir);
    }

    #[tokio::test]
    async fn stale_environment_is_removed_before_recreation() {
        let dir = tempfile::tempdir().expect("tempdir");
        let env_dir = dir.path().join("venv");
        let expected = EnvironmentFingerprint::compute(b"requests\n", "pyinstaller", "3.11.4");
        fake_env(&env_dir);
        std::fs::write(env_dir.join("leftover.txt"), "partial").expect("write");

        let toolchain = Toolchain {
            command: "missing".to_string(),
            program: PathBuf::from("no-such-python-9912"),
            launcher_args: Vec::new(),
            version: "3.11.4".to_string(),
        };

        let err = provision(&toolchain, &env_dir, &expected, false, dir.path(), |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, EnvironmentError::CreateFailed { .. }));
        assert!(!env_dir.exists(), "stale environment must be deleted");
    }
}
