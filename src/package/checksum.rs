//! Artifact checksum calculation.
//!
//! Hashes a single file or a whole artifact tree. Directory hashes cover each
//! file's relative path and content in sorted order, so two builds with
//! byte-identical output trees produce the same digest.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io;
use std::path::{Path, PathBuf};

/// Digest and size of an artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactDigest {
    /// Hex-encoded SHA-256
    pub sha256: String,
    /// Number of files hashed
    pub files: usize,
    /// Total bytes hashed
    pub bytes: u64,
}

/// Calculates the SHA-256 of a file or directory tree.
///
/// Any entry that cannot be read fails the whole calculation.
pub async fn calculate_sha256(path: &Path) -> io::Result<ArtifactDigest> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || hash_path(&path))
        .await
        .map_err(io::Error::other)?
}

fn hash_path(path: &Path) -> io::Result<ArtifactDigest> {
    let metadata = std::fs::metadata(path)?;

    if metadata.is_file() {
        let mut hasher = Sha256::new();
        let bytes = hash_file_into(path, &mut hasher)?;
        Ok(ArtifactDigest {
            sha256: hex::encode(hasher.finalize()),
            files: 1,
            bytes,
        })
    } else if metadata.is_dir() {
        hash_directory(path)
    } else {
        Err(io::Error::other(format!(
            "Path is neither file nor directory: {}",
            path.display()
        )))
    }
}

fn hash_directory(dir_path: &Path) -> io::Result<ArtifactDigest> {
    let mut files: Vec<PathBuf> = Vec::new();
    for entry in walkdir::WalkDir::new(dir_path).follow_links(false) {
        let entry = entry?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    files.sort();

    let mut hasher = Sha256::new();
    let mut bytes = 0u64;

    for file in &files {
        if let Ok(rel_path) = file.strip_prefix(dir_path) {
            // Normalize separators so the digest is the same on every host
            let rel = rel_path.to_string_lossy().replace('\\', "/");
            hasher.update(rel.as_bytes());
        }
        bytes += hash_file_into(file, &mut hasher)?;
    }

    Ok(ArtifactDigest {
        sha256: hex::encode(hasher.finalize()),
        files: files.len(),
        bytes,
    })
}

fn hash_file_into(path: &Path, hasher: &mut Sha256) -> io::Result<u64> {
    let mut file = std::fs::File::open(path)?;
    io::copy(&mut file, hasher)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_tree(root: &Path) {
        std::fs::create_dir_all(root.join("_internal")).expect("create dirs");
        std::fs::write(root.join("App.exe"), b"MZ fake executable").expect("write exe");
        std::fs::write(root.join("_internal").join("base_library.zip"), b"zip").expect("write");
    }

    #[tokio::test]
    async fn identical_trees_have_identical_digests() {
        let a = tempfile::tempdir().expect("tempdir");
        let b = tempfile::tempdir().expect("tempdir");
        write_tree(a.path());
        write_tree(b.path());

        let digest_a = calculate_sha256(a.path()).await.expect("hash a");
        let digest_b = calculate_sha256(b.path()).await.expect("hash b");
        assert_eq!(digest_a, digest_b);
        assert_eq!(digest_a.files, 2);
        assert_eq!(digest_a.bytes, 21);
    }

    #[tokio::test]
    async fn renamed_file_changes_the_digest() {
        let a = tempfile::tempdir().expect("tempdir");
        let b = tempfile::tempdir().expect("tempdir");
        write_tree(a.path());
        write_tree(b.path());
        std::fs::rename(b.path().join("App.exe"), b.path().join("Other.exe")).expect("rename");

        let digest_a = calculate_sha256(a.path()).await.expect("hash a");
        let digest_b = calculate_sha256(b.path()).await.expect("hash b");
        assert_ne!(digest_a.sha256, digest_b.sha256);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn unreadable_directory_fails_the_checksum() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().expect("tempdir");
        write_tree(dir.path());
        let locked = dir.path().join("_internal");
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000))
            .expect("chmod");

        // Permission bits do not bind a privileged user.
        let readable = std::fs::read_dir(&locked).is_ok();
        let result = calculate_sha256(dir.path()).await;
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755))
            .expect("restore");
        if readable {
            return;
        }

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn single_file_digest_matches_sha256() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("App.exe");
        std::fs::write(&file, b"abc").expect("write");

        let digest = calculate_sha256(&file).await.expect("hash");
        assert_eq!(
            digest.sha256,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(digest.files, 1);
    }
}
