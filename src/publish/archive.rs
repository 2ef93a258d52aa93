//! Release archive creation.
//!
//! The artifact is zipped with entries in sorted order and a fixed timestamp,
//! so the same artifact tree always yields a byte-identical archive.

use crate::error::PublishError;
use crate::package::BuildArtifact;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use zip::CompressionMethod;
use zip::write::{SimpleFileOptions, ZipWriter};

/// Platform part of archive names
pub fn platform_label() -> String {
    let os = match std::env::consts::OS {
        "macos" => "macos",
        "windows" => "windows",
        _ => "linux",
    };
    format!("{}-{}", os, std::env::consts::ARCH)
}

/// `<app>-<label>-<os>-<arch>.zip`
pub fn archive_name(app_name: &str, label: &str) -> String {
    format!("{}-{}-{}.zip", app_name, label, platform_label())
}

/// Zip `artifact` into `dest_dir`, returning the archive path.
///
/// A stale archive with the same name is replaced.
pub async fn create_archive(
    artifact: &BuildArtifact,
    dest_dir: &Path,
    label: &str,
) -> Result<PathBuf, PublishError> {
    let dest = dest_dir.join(archive_name(&artifact.name, label));
    let source = artifact.root.clone();
    let prefix = artifact.name.clone();

    log::info!("Archiving {} into {}", source.display(), dest.display());

    let target = dest.clone();
    let result = tokio::task::spawn_blocking(move || write_zip(&source, &target, &prefix))
        .await
        .map_err(|e| e.to_string())
        .and_then(|inner| inner);

    if let Err(reason) = result {
        let _ = std::fs::remove_file(&dest);
        return Err(PublishError::Archive {
            path: artifact.root.clone(),
            reason,
        });
    }

    Ok(dest)
}

fn write_zip(source: &Path, dest: &Path, prefix: &str) -> Result<(), String> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
    }

    let file = File::create(dest).map_err(|e| e.to_string())?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default())
        .unix_permissions(0o755);

    if source.is_file() {
        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| prefix.to_string());
        zip.start_file(name, options).map_err(|e| e.to_string())?;
        copy_into(source, &mut zip)?;
    } else {
        for entry in WalkDir::new(source).sort_by_file_name() {
            let entry = entry.map_err(|e| e.to_string())?;
            let relative = entry
                .path()
                .strip_prefix(source)
                .map_err(|e| e.to_string())?;
            let mut name = prefix.to_string();
            for component in relative.components() {
                name.push('/');
                name.push_str(&component.as_os_str().to_string_lossy());
            }

            if entry.file_type().is_dir() {
                zip.add_directory(format!("{}/", name), options)
                    .map_err(|e| e.to_string())?;
            } else if entry.file_type().is_file() {
                zip.start_file(name, options).map_err(|e| e.to_string())?;
                copy_into(entry.path(), &mut zip)?;
            }
        }
    }

    let mut writer = zip.finish().map_err(|e| e.to_string())?;
    writer.flush().map_err(|e| e.to_string())?;
    Ok(())
}

fn copy_into<W: Write + std::io::Seek>(path: &Path, zip: &mut ZipWriter<W>) -> Result<(), String> {
    let mut file =
        File::open(path).map_err(|e| format!("{}: {}", path.display(), e))?;
    std::io::copy(&mut file, zip).map_err(|e| format!("{}: {}", path.display(), e))?;
    Ok(())
}
