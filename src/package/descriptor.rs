//! Build descriptor (`.spec`) inspection.
//!
//! The descriptor is opaque packaging policy. The pipeline only reads the
//! `name=` of the EXE and COLLECT steps and whether the build is one-folder or
//! one-file, because those facts decide where the artifact lands.

use crate::error::PackageError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\bname\s*=\s*['"](?P<name>[^'"]+)['"]"#).expect("name regex is valid")
});

/// How the packager lays out its output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BundleMode {
    /// `dist/<name>/<name>.exe` plus support files
    OneFolder,
    /// A single `dist/<name>.exe`
    OneFile,
}

/// Where the artifact of a build is expected
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactLayout {
    /// Path removed before packaging and published afterwards
    pub root: PathBuf,
    /// The executable the operator runs
    pub executable: PathBuf,
}

impl BundleMode {
    /// Deterministic artifact location for bundle `name` under `dist_dir`
    pub fn layout(self, dist_dir: &Path, name: &str) -> ArtifactLayout {
        let exe_name = format!("{}{}", name, std::env::consts::EXE_SUFFIX);
        match self {
            BundleMode::OneFolder => {
                let root = dist_dir.join(name);
                ArtifactLayout {
                    executable: root.join(&exe_name),
                    root,
                }
            }
            BundleMode::OneFile => {
                let executable = dist_dir.join(&exe_name);
                ArtifactLayout {
                    root: executable.clone(),
                    executable,
                }
            }
        }
    }
}

/// The parts of the descriptor the pipeline depends on
#[derive(Debug, Clone)]
pub struct BuildDescriptor {
    /// Descriptor file
    pub path: PathBuf,
    /// `name=` of the EXE step, which names the executable
    pub exe_name: Option<String>,
    /// `name=` of the COLLECT step, which names the bundle folder
    pub collect_name: Option<String>,
    /// Output layout
    pub mode: BundleMode,
}

impl BuildDescriptor {
    /// Read and inspect the descriptor at `path`
    pub fn inspect(path: &Path) -> Result<Self, PackageError> {
        let text =
            std::fs::read_to_string(path).map_err(|source| PackageError::DescriptorUnreadable {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::from_source(path, &text))
    }

    /// Inspect descriptor text
    pub fn from_source(path: &Path, text: &str) -> Self {
        let exe_at = text.find("EXE(");
        let collect_at = text.find("COLLECT(");
        let mode = if collect_at.is_some() {
            BundleMode::OneFolder
        } else {
            BundleMode::OneFile
        };

        // EXE's arguments end where COLLECT starts, if it follows.
        let exe_name = exe_at.and_then(|start| {
            let end = collect_at.filter(|&c| c > start).unwrap_or(text.len());
            declared_name(&text[start..end])
        });
        let collect_name = collect_at.and_then(|start| declared_name(&text[start..]));

        Self {
            path: path.to_path_buf(),
            exe_name,
            collect_name,
            mode,
        }
    }

    /// Every `name=` the descriptor declares
    pub fn declared_names(&self) -> impl Iterator<Item = &str> {
        self.exe_name
            .as_deref()
            .into_iter()
            .chain(self.collect_name.as_deref())
    }

    /// Name of the output under `dist/`, falling back to the application name
    pub fn bundle_name<'a>(&'a self, app_name: &'a str) -> &'a str {
        let declared = match self.mode {
            BundleMode::OneFolder => self.collect_name.as_deref(),
            BundleMode::OneFile => self.exe_name.as_deref(),
        };
        declared.unwrap_or(app_name)
    }
}

fn declared_name(call: &str) -> Option<String> {
    NAME_RE.captures(call).map(|caps| caps["name"].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE_FOLDER_SPEC: &str = r#"
a = Analysis(['main.py'], pathex=[], datas=[], hiddenimports=['openpyxl.cell._writer'])
pyz = PYZ(a.pure)
exe = EXE(pyz, a.scripts, [], exclude_binaries=True, name='AvitoPriceAnalyzerExe', console=False)
coll = COLLECT(exe, a.binaries, a.datas, strip=False, upx=True, name='AvitoPriceAnalyzer')
"#;

    const ONE_FILE_SPEC: &str = r#"
a = Analysis(['main.py'])
pyz = PYZ(a.pure)
exe = EXE(pyz, a.scripts, a.binaries, a.datas, name="Analyzer", console=False)
"#;

    #[test]
    fn one_folder_spec_records_exe_and_collect_names() {
        let descriptor = BuildDescriptor::from_source(Path::new("app.spec"), ONE_FOLDER_SPEC);
        assert_eq!(descriptor.mode, BundleMode::OneFolder);
        assert_eq!(descriptor.exe_name.as_deref(), Some("AvitoPriceAnalyzerExe"));
        assert_eq!(descriptor.collect_name.as_deref(), Some("AvitoPriceAnalyzer"));
        assert_eq!(descriptor.bundle_name("App"), "AvitoPriceAnalyzer");
        assert_eq!(
            descriptor.declared_names().collect::<Vec<_>>(),
            ["AvitoPriceAnalyzerExe", "AvitoPriceAnalyzer"]
        );
    }

    #[test]
    fn one_file_spec_uses_exe_name() {
        let descriptor = BuildDescriptor::from_source(Path::new("app.spec"), ONE_FILE_SPEC);
        assert_eq!(descriptor.mode, BundleMode::OneFile);
        assert_eq!(descriptor.exe_name.as_deref(), Some("Analyzer"));
        assert_eq!(descriptor.collect_name, None);
        assert_eq!(descriptor.bundle_name("App"), "Analyzer");
    }

    #[test]
    fn unnamed_spec_falls_back_to_app_name() {
        let descriptor = BuildDescriptor::from_source(Path::new("app.spec"), "exe = EXE(pyz)\n");
        assert_eq!(descriptor.declared_names().count(), 0);
        assert_eq!(descriptor.bundle_name("AvitoPriceAnalyzer"), "AvitoPriceAnalyzer");
    }

    #[test]
    fn one_folder_layout_is_dist_name_name_exe() {
        let layout = BundleMode::OneFolder.layout(Path::new("dist"), "AvitoPriceAnalyzer");
        assert_eq!(layout.root, Path::new("dist").join("AvitoPriceAnalyzer"));
        assert_eq!(
            layout.executable,
            Path::new("dist")
                .join("AvitoPriceAnalyzer")
                .join(format!("AvitoPriceAnalyzer{}", std::env::consts::EXE_SUFFIX))
        );
    }

    #[test]
    fn one_file_layout_root_is_the_executable() {
        let layout = BundleMode::OneFile.layout(Path::new("dist"), "Analyzer");
        assert_eq!(layout.root, layout.executable);
    }
}
