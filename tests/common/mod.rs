//! Shared helpers for integration tests.

#![allow(dead_code)]

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Descriptor for a one-folder build named `App`
pub const APP_SPEC: &str = r#"
a = Analysis(['main.py'], pathex=[], datas=[])
pyz = PYZ(a.pure)
exe = EXE(pyz, a.scripts, [], exclude_binaries=True, name='App', console=False)
coll = COLLECT(exe, a.binaries, a.datas, name='App')
"#;

/// A scratch analyzer project
pub struct TestProject {
    pub temp: TempDir,
}

impl TestProject {
    /// Project with entry script, manifest, descriptor and `release.toml`
    pub fn new() -> Self {
        let project = Self {
            temp: TempDir::new().expect("tempdir"),
        };
        project.write("main.py", "print('analyzer')\n");
        project.write("requirements.txt", "requests==2.31.0\nopenpyxl\n");
        project.write("App.spec", APP_SPEC);
        project.write("release.toml", "app_name = \"App\"\n");
        project
    }

    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.temp.path().join(relative)
    }

    pub fn write(&self, relative: &str, content: &str) {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent");
        }
        std::fs::write(path, content).expect("write file");
    }

    /// Command with a clean environment rooted at this project
    pub fn cmd(&self) -> Command {
        let mut cmd = cargo_bin_cmd!("avito_bundler_release");
        cmd.env_clear()
            .env("PATH", std::env::var("PATH").unwrap_or_default())
            .env("AVITO_BUILD_LANG", "en")
            .arg("--project")
            .arg(self.root());
        cmd
    }

    /// Last pipeline report as JSON
    pub fn report(&self) -> serde_json::Value {
        let text = std::fs::read_to_string(self.path("dist/.pipeline-report.json"))
            .expect("report exists");
        serde_json::from_str(&text).expect("report is JSON")
    }
}

/// Install the fake interpreter into `dir`, returning its path
#[cfg(unix)]
pub fn fake_python(dir: &Path) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("fake-python");
    std::fs::write(&path, include_str!("../fixtures/fake_python.sh")).expect("write fake python");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).expect("chmod");
    path
}
