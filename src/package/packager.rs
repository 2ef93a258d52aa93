//! Packaging subprocess (stage 3).

use super::checksum::{ArtifactDigest, calculate_sha256};
use super::descriptor::{BuildDescriptor, BundleMode};
use crate::config::BuildPaths;
use crate::environment::BuildEnvironment;
use crate::error::PackageError;
use crate::process;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// The packaged, runnable output of a successful build
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildArtifact {
    /// Bundle name
    pub name: String,
    /// Output layout
    pub mode: BundleMode,
    /// Artifact directory (one-folder) or file (one-file)
    pub root: PathBuf,
    /// Executable inside the artifact
    pub executable: PathBuf,
    /// Checksum over the artifact tree
    pub digest: ArtifactDigest,
}

/// Arguments passed to the environment interpreter to run PyInstaller
pub fn packager_args(descriptor: &BuildDescriptor, paths: &BuildPaths) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-m", "PyInstaller", "--noconfirm", "--clean", "--distpath"]
        .into_iter()
        .map(OsString::from)
        .collect();
    args.push(paths.dist_dir.as_os_str().to_os_string());
    args.push("--workpath".into());
    args.push(paths.work_dir.as_os_str().to_os_string());
    args.push(descriptor.path.as_os_str().to_os_string());
    args
}

/// Stage 3: run the packager and verify the artifact.
///
/// The artifact path is cleared first and cleared again on any failure, so it
/// only exists after a successful run.
pub async fn package<F>(
    environment: &BuildEnvironment,
    descriptor: &BuildDescriptor,
    app_name: &str,
    paths: &BuildPaths,
    on_line: F,
) -> Result<BuildArtifact, PackageError>
where
    F: FnMut(&str),
{
    let name = descriptor.bundle_name(app_name).to_string();
    let layout = descriptor.mode.layout(&paths.dist_dir, &name);

    remove_artifact(&layout.root).await?;

    let args = packager_args(descriptor, paths);
    if let Err(source) =
        process::run_streamed(&environment.python, &args, &paths.project_root, on_line).await
    {
        discard_partial(&layout.root).await;
        return Err(PackageError::PackagerFailed { source });
    }

    if !layout.executable.is_file() {
        discard_partial(&layout.root).await;
        return Err(PackageError::ArtifactMissing {
            path: layout.executable,
        });
    }

    let digest = calculate_sha256(&layout.root)
        .await
        .map_err(|e| PackageError::ChecksumFailed {
            path: layout.root.clone(),
            reason: e.to_string(),
        })?;

    log::info!(
        "Packaged {} ({} files, {} bytes, sha256 {})",
        layout.executable.display(),
        digest.files,
        digest.bytes,
        digest.sha256
    );

    Ok(BuildArtifact {
        name,
        mode: descriptor.mode,
        root: layout.root,
        executable: layout.executable,
        digest,
    })
}

/// Remove a previous artifact file or directory, if present
pub async fn remove_artifact(path: &Path) -> Result<(), PackageError> {
    let cleanup_failed = |source: std::io::Error| PackageError::CleanupFailed {
        path: path.to_path_buf(),
        source,
    };

    match tokio::fs::symlink_metadata(path).await {
        Ok(metadata) if metadata.is_dir() => {
            tokio::fs::remove_dir_all(path).await.map_err(cleanup_failed)
        }
        Ok(_) => tokio::fs::remove_file(path).await.map_err(cleanup_failed),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(cleanup_failed(e)),
    }
}

async fn discard_partial(path: &Path) {
    if let Err(e) = remove_artifact(path).await {
        log::warn!("Failed to discard partial artifact: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packager_runs_noninteractively_against_the_descriptor() {
        let paths = BuildPaths {
            project_root: PathBuf::from("/p"),
            entry_script: PathBuf::from("/p/main.py"),
            manifest: PathBuf::from("/p/requirements.txt"),
            env_dir: PathBuf::from("/p/venv"),
            dist_dir: PathBuf::from("/p/dist"),
            work_dir: PathBuf::from("/p/build"),
        };
        let descriptor = BuildDescriptor {
            path: PathBuf::from("/p/app.spec"),
            exe_name: None,
            collect_name: None,
            mode: BundleMode::OneFolder,
        };

        let args = packager_args(&descriptor, &paths);
        let rendered: Vec<String> = args
            .iter()
            .map(|a| a.to_string_lossy().to_string())
            .collect();
        assert_eq!(
            rendered,
            vec![
                "-m",
                "PyInstaller",
                "--noconfirm",
                "--clean",
                "--distpath",
                "/p/dist",
                "--workpath",
                "/p/build",
                "/p/app.spec"
            ]
        );
    }

    #[tokio::test]
    async fn remove_artifact_handles_files_dirs_and_absence() {
        let dir = tempfile::tempdir().expect("tempdir");
        let folder = dir.path().join("App");
        std::fs::create_dir_all(folder.join("_internal")).expect("create");
        std::fs::write(folder.join("App.exe"), "x").expect("write");
        let file = dir.path().join("Single.exe");
        std::fs::write(&file, "x").expect("write");

        remove_artifact(&folder).await.expect("remove dir");
        remove_artifact(&file).await.expect("remove file");
        remove_artifact(&dir.path().join("missing")).await.expect("absent is fine");
        assert!(!folder.exists());
        assert!(!file.exists());
    }

    #[tokio::test]
    async fn failed_packager_leaves_no_artifact() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();
        let paths = BuildPaths {
            project_root: root.to_path_buf(),
            entry_script: root.join("main.py"),
            manifest: root.join("requirements.txt"),
            env_dir: root.join("venv"),
            dist_dir: root.join("dist"),
            work_dir: root.join("build"),
        };
        let stale = root.join("dist").join("App");
        std::fs::create_dir_all(&stale).expect("create stale artifact");
        std::fs::write(stale.join("App.exe"), "old").expect("write");

        let environment = BuildEnvironment {
            root: root.join("venv"),
            python: root.join("venv").join("no-such-python"),
        };
        let descriptor = BuildDescriptor {
            path: root.join("App.spec"),
            exe_name: Some("App".to_string()),
            collect_name: Some("App".to_string()),
            mode: BundleMode::OneFolder,
        };

        let err = package(&environment, &descriptor, "App", &paths, |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, PackageError::PackagerFailed { .. }));
        assert!(!stale.exists(), "stale artifact must not survive a failed build");
    }
}
