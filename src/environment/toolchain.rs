//! Python toolchain discovery.

use crate::error::EnvironmentError;
use crate::process;
use regex::Regex;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Python\s+(?P<version>\d+\.\d+(?:\.\d+)?\S*)").expect("version regex is valid")
});

/// A working Python 3 interpreter on the host
#[derive(Debug, Clone)]
pub struct Toolchain {
    /// Candidate string as configured (e.g. `py -3`)
    pub command: String,
    /// Resolved program path
    pub program: PathBuf,
    /// Arguments that precede every invocation (`-3` for the `py` launcher)
    pub launcher_args: Vec<String>,
    /// Reported version, e.g. `3.11.4`
    pub version: String,
}

impl Toolchain {
    /// Probe `candidates` in order and return the first Python 3 that answers
    /// `--version`.
    ///
    /// Nothing is written to disk and no network is touched until a toolchain
    /// has been found.
    pub async fn discover(candidates: &[String]) -> Result<Self, EnvironmentError> {
        for candidate in candidates {
            match Self::probe(candidate).await {
                Some(toolchain) => {
                    log::info!(
                        "Using Python {} from {}",
                        toolchain.version,
                        toolchain.program.display()
                    );
                    return Ok(toolchain);
                }
                None => log::debug!("Interpreter candidate '{}' is not usable", candidate),
            }
        }

        Err(EnvironmentError::ToolchainMissing {
            tried: candidates.to_vec(),
        })
    }

    async fn probe(candidate: &str) -> Option<Self> {
        let mut parts = candidate.split_whitespace();
        let program = parts.next()?;
        let launcher_args: Vec<String> = parts.map(str::to_string).collect();

        let program = match which::which(program) {
            Ok(path) => path,
            Err(e) => {
                log::debug!("{} not found in PATH: {}", program, e);
                return None;
            }
        };

        let mut args = launcher_args.clone();
        args.push("--version".to_string());
        let output = match process::capture(&program, &args).await {
            Ok(output) => output,
            Err(e) => {
                log::debug!("{} --version failed: {}", program.display(), e);
                return None;
            }
        };

        // Python 2 reports its version on stderr
        let version = parse_version(&output.stdout).or_else(|| parse_version(&output.stderr))?;
        if !version.starts_with("3.") {
            log::warn!(
                "{} is Python {}; Python 3 is required",
                program.display(),
                version
            );
            return None;
        }

        Some(Self {
            command: candidate.to_string(),
            program,
            launcher_args,
            version,
        })
    }

    /// Arguments that create a venv at `env_dir`
    pub fn venv_args(&self, env_dir: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = self.launcher_args.iter().map(OsString::from).collect();
        args.push("-m".into());
        args.push("venv".into());
        args.push(env_dir.as_os_str().to_os_string());
        args
    }
}

/// Extract the version from `python --version` output
pub fn parse_version(text: &str) -> Option<String> {
    VERSION_RE
        .captures(text)
        .map(|caps| caps["version"].to_string())
}

/// Interpreter inside a venv
pub fn env_interpreter(env_dir: &Path) -> PathBuf {
    if cfg!(windows) {
        env_dir.join("Scripts").join("python.exe")
    } else {
        env_dir.join("bin").join("python")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_release_and_prerelease_versions() {
        assert_eq!(parse_version("Python 3.11.4\n").as_deref(), Some("3.11.4"));
        assert_eq!(parse_version("Python 3.13.0rc1").as_deref(), Some("3.13.0rc1"));
        assert_eq!(parse_version("Python 2.7.18").as_deref(), Some("2.7.18"));
        assert_eq!(parse_version("command not found"), None);
    }

    #[test]
    fn venv_args_keep_launcher_flags_first() {
        let toolchain = Toolchain {
            command: "py -3".to_string(),
            program: PathBuf::from("py"),
            launcher_args: vec!["-3".to_string()],
            version: "3.12.1".to_string(),
        };
        let args = toolchain.venv_args(Path::new("venv"));
        assert_eq!(
            args,
            vec![
                OsString::from("-3"),
                OsString::from("-m"),
                OsString::from("venv"),
                OsString::from("venv")
            ]
        );
    }

    #[tokio::test]
    async fn missing_candidates_report_toolchain_missing() {
        let candidates = vec![
            "no-such-python-7731".to_string(),
            "no-such-python-7732 -3".to_string(),
        ];
        let err = Toolchain::discover(&candidates).await.unwrap_err();
        match err {
            EnvironmentError::ToolchainMissing { tried } => assert_eq!(tried, candidates),
            other => panic!("unexpected error: {other}"),
        }
    }
}
