//! Build environment fingerprints.
//!
//! A fingerprint ties an environment to the manifest, packager requirement and
//! interpreter it was built from. It is written only after dependencies have
//! been installed, so an environment left behind by an interrupted run has no
//! fingerprint and is rebuilt on the next invocation.

use crate::error::EnvironmentError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Fingerprint file name inside the environment directory
pub const FINGERPRINT_FILE: &str = ".avito-build-fingerprint.json";

/// Current version of the fingerprint format
pub const FINGERPRINT_FORMAT_VERSION: u32 = 1;

/// Recorded identity of a build environment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentFingerprint {
    /// Version of the fingerprint format
    pub format_version: u32,
    /// Combined digest compared between runs
    pub digest: String,
    /// Interpreter version the environment was created with
    pub interpreter_version: String,
    /// Packager requirement installed alongside the manifest
    pub packager_requirement: String,
    /// SHA-256 of the dependency manifest bytes
    pub manifest_sha256: String,
    /// When the fingerprint was recorded
    pub recorded_at: chrono::DateTime<chrono::Utc>,
}

impl EnvironmentFingerprint {
    /// Compute the fingerprint for the current inputs
    pub fn compute(manifest: &[u8], packager_requirement: &str, interpreter_version: &str) -> Self {
        let manifest_sha256 = hex::encode(Sha256::digest(manifest));

        let mut hasher = Sha256::new();
        hasher.update(b"manifest:");
        hasher.update(manifest_sha256.as_bytes());
        hasher.update(b"\npackager:");
        hasher.update(packager_requirement.trim().as_bytes());
        hasher.update(b"\ninterpreter:");
        hasher.update(interpreter_version.as_bytes());
        hasher.update(b"\nplatform:");
        hasher.update(std::env::consts::OS.as_bytes());
        hasher.update(b"-");
        hasher.update(std::env::consts::ARCH.as_bytes());

        Self {
            format_version: FINGERPRINT_FORMAT_VERSION,
            digest: hex::encode(hasher.finalize()),
            interpreter_version: interpreter_version.to_string(),
            packager_requirement: packager_requirement.trim().to_string(),
            manifest_sha256,
            recorded_at: chrono::Utc::now(),
        }
    }

    /// True when both fingerprints describe the same environment contents
    pub fn matches(&self, other: &Self) -> bool {
        self.format_version == other.format_version && self.digest == other.digest
    }

    /// Fingerprint path for an environment
    pub fn path_in(env_dir: &Path) -> PathBuf {
        env_dir.join(FINGERPRINT_FILE)
    }

    /// Load the recorded fingerprint; unreadable files count as absent
    pub fn load(env_dir: &Path) -> Option<Self> {
        let path = Self::path_in(env_dir);
        let text = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&text) {
            Ok(fingerprint) => Some(fingerprint),
            Err(e) => {
                log::warn!("Ignoring corrupt fingerprint {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Record this fingerprint inside `env_dir` (write to temp, then rename)
    pub fn store(&self, env_dir: &Path) -> Result<(), EnvironmentError> {
        let path = Self::path_in(env_dir);
        let write_failed = |reason: String| EnvironmentError::FingerprintWrite {
            path: path.clone(),
            reason,
        };

        let serialized =
            serde_json::to_string_pretty(self).map_err(|e| write_failed(e.to_string()))?;
        let temp_path = path.with_extension("tmp");
        std::fs::write(&temp_path, serialized).map_err(|e| write_failed(e.to_string()))?;
        std::fs::rename(&temp_path, &path).map_err(|e| write_failed(e.to_string()))?;
        Ok(())
    }

    /// Remove the fingerprint so the environment is rebuilt next time
    pub fn invalidate(env_dir: &Path) {
        let path = Self::path_in(env_dir);
        if path.exists()
            && let Err(e) = std::fs::remove_file(&path)
        {
            log::warn!("Failed to remove fingerprint {}: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_changes_with_any_input() {
        let base = EnvironmentFingerprint::compute(b"requests\npandas\n", "pyinstaller", "3.11.4");
        let same = EnvironmentFingerprint::compute(b"requests\npandas\n", "pyinstaller", "3.11.4");
        let manifest = EnvironmentFingerprint::compute(b"requests\n", "pyinstaller", "3.11.4");
        let packager =
            EnvironmentFingerprint::compute(b"requests\npandas\n", "pyinstaller==6.3", "3.11.4");
        let interpreter =
            EnvironmentFingerprint::compute(b"requests\npandas\n", "pyinstaller", "3.12.0");

        assert!(base.matches(&same));
        assert!(!base.matches(&manifest));
        assert!(!base.matches(&packager));
        assert!(!base.matches(&interpreter));
    }

    #[test]
    fn store_then_load_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let fingerprint = EnvironmentFingerprint::compute(b"openpyxl\n", "pyinstaller", "3.11.4");
        fingerprint.store(dir.path()).expect("store succeeds");

        let loaded = EnvironmentFingerprint::load(dir.path()).expect("fingerprint loads");
        assert!(loaded.matches(&fingerprint));
        assert_eq!(loaded.manifest_sha256, fingerprint.manifest_sha256);

        EnvironmentFingerprint::invalidate(dir.path());
        assert!(EnvironmentFingerprint::load(dir.path()).is_none());
    }

    #[test]
    fn corrupt_fingerprint_counts_as_absent() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join(FINGERPRINT_FILE), "{not json").expect("write");
        assert!(EnvironmentFingerprint::load(dir.path()).is_none());
    }
}
