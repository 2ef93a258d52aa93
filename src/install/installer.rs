//! Package installation into the build environment (stage 2).

use super::manifest::DependencyManifest;
use crate::environment::BuildEnvironment;
use crate::error::InstallError;
use crate::process;
use std::ffi::OsString;
use std::path::Path;

/// Arguments that upgrade pip inside the environment
pub fn upgrade_args() -> Vec<OsString> {
    ["-m", "pip", "install", "--upgrade", "pip", "--disable-pip-version-check"]
        .into_iter()
        .map(OsString::from)
        .collect()
}

/// Arguments that install the manifest plus the packager
pub fn install_args(manifest: &DependencyManifest, packager_requirement: &str) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-m", "pip", "install", "--disable-pip-version-check", "-r"]
        .into_iter()
        .map(OsString::from)
        .collect();
    args.push(manifest.path.as_os_str().to_os_string());

    let packager_name = packager_requirement
        .split(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
        .next()
        .unwrap_or(packager_requirement);
    if !manifest.contains(packager_name) {
        args.push(packager_requirement.trim().into());
    }
    args
}

/// Stage 2: upgrade pip, then install every declared package.
///
/// Fails on the first unsuccessful pip invocation; pip resolves the whole set
/// in one transaction, so a single unresolvable package aborts the stage.
pub async fn install<F>(
    environment: &BuildEnvironment,
    manifest: &DependencyManifest,
    packager_requirement: &str,
    cwd: &Path,
    mut on_line: F,
) -> Result<(), InstallError>
where
    F: FnMut(&str),
{
    log::info!("Upgrading pip in {}", environment.root.display());
    process::run_streamed(&environment.python, &upgrade_args(), cwd, &mut on_line)
        .await
        .map_err(|source| InstallError::InstallerUpgradeFailed { source })?;

    log::info!(
        "Installing {} requirement(s) from {}",
        manifest.requirements.len(),
        manifest.path.display()
    );
    process::run_streamed(
        &environment.python,
        &install_args(manifest, packager_requirement),
        cwd,
        &mut on_line,
    )
    .await
    .map_err(|source| InstallError::PackagesFailed { source })?;

    Ok(())
}
