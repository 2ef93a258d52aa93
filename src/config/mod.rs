//! Project configuration.
//!
//! Settings come from an optional `release.toml` at the project root; every
//! key has a default matching the analyzer repository layout. Paths are
//! resolved once against the absolutized project root into [`BuildPaths`].

mod env;

pub use env::{ENV_DIR_OVERRIDE, EnvConfig, LANG_OVERRIDE, PYTHON_OVERRIDE};

use crate::error::{ConfigError, InputError, Result};
use path_absolutize::Absolutize;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name
pub const CONFIG_FILE_NAME: &str = "release.toml";

/// Contents of `release.toml`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    /// Application name; the artifact lives at `dist/<app_name>/<app_name>.exe`
    pub app_name: String,
    /// Entry-point script handed to the packager through the descriptor
    pub entry_script: PathBuf,
    /// Dependency manifest
    pub manifest: PathBuf,
    /// Build descriptor; discovered when unset
    pub descriptor: Option<PathBuf>,
    /// Build environment directory
    pub env_dir: PathBuf,
    /// Packager output directory
    pub dist_dir: PathBuf,
    /// Packager work directory
    pub work_dir: PathBuf,
    /// Interpreter commands probed in order (`"py -3"` passes `-3` to `py`)
    pub interpreters: Vec<String>,
    /// Requirement installed alongside the manifest
    pub packager_requirement: String,
    /// Message language (`en` or `ru`)
    pub locale: Option<String>,
    /// Release publication settings
    pub github: GitHubSettings,
}

/// `[github]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GitHubSettings {
    /// `owner/repo`; falls back to `GITHUB_REPOSITORY`
    pub repository: Option<String>,
    /// Mark `v0.x` releases as pre-releases
    pub prerelease_for_zero_versions: bool,
}

impl Default for GitHubSettings {
    fn default() -> Self {
        Self {
            repository: None,
            prerelease_for_zero_versions: true,
        }
    }
}

impl Default for ProjectConfig {
    fn default() -> Self {
        let interpreters = if cfg!(windows) {
            vec!["py -3".to_string(), "python".to_string()]
        } else {
            vec!["python3".to_string(), "python".to_string()]
        };

        Self {
            app_name: "AvitoPriceAnalyzer".to_string(),
            entry_script: PathBuf::from("main.py"),
            manifest: PathBuf::from("requirements.txt"),
            descriptor: None,
            env_dir: PathBuf::from("venv"),
            dist_dir: PathBuf::from("dist"),
            work_dir: PathBuf::from("build"),
            interpreters,
            packager_requirement: "pyinstaller".to_string(),
            locale: None,
            github: GitHubSettings::default(),
        }
    }
}

impl ProjectConfig {
    /// Parse configuration text
    pub fn from_toml_str(text: &str, path: &Path) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path`, falling back to defaults when the file does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No {} found, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text, path)
    }

    fn validate(&self) -> Result<()> {
        let name = self.app_name.trim();
        if name.is_empty() {
            return Err(ConfigError::Invalid {
                field: "app_name",
                reason: "must not be empty".to_string(),
            }
            .into());
        }
        if name.contains(['/', '\\', ':']) {
            return Err(ConfigError::Invalid {
                field: "app_name",
                reason: format!("'{}' must be a plain file name", name),
            }
            .into());
        }
        if self.interpreters.iter().all(|i| i.trim().is_empty()) {
            return Err(ConfigError::Invalid {
                field: "interpreters",
                reason: "at least one interpreter command is required".to_string(),
            }
            .into());
        }
        if self.packager_requirement.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "packager_requirement",
                reason: "must not be empty".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// Absolute locations of everything the pipeline reads or writes
#[derive(Debug, Clone, Serialize)]
pub struct BuildPaths {
    /// Project root
    pub project_root: PathBuf,
    /// Entry-point script
    pub entry_script: PathBuf,
    /// Dependency manifest
    pub manifest: PathBuf,
    /// Build environment directory
    pub env_dir: PathBuf,
    /// Packager output directory
    pub dist_dir: PathBuf,
    /// Packager work directory
    pub work_dir: PathBuf,
}

impl BuildPaths {
    /// Resolve configured paths against `project_root`
    pub fn resolve(project_root: &Path, config: &ProjectConfig, env: &EnvConfig) -> Result<Self> {
        let root = project_root.absolutize()?.to_path_buf();
        let env_dir = env
            .get(ENV_DIR_OVERRIDE)
            .map(PathBuf::from)
            .unwrap_or_else(|| config.env_dir.clone());

        Ok(Self {
            entry_script: root.join(&config.entry_script),
            manifest: root.join(&config.manifest),
            env_dir: root.join(env_dir),
            dist_dir: root.join(&config.dist_dir),
            work_dir: root.join(&config.work_dir),
            project_root: root,
        })
    }

    /// Pipeline report written after every run
    pub fn report_path(&self) -> PathBuf {
        self.dist_dir.join(".pipeline-report.json")
    }

    /// Directory for release archives
    pub fn release_dir(&self) -> PathBuf {
        self.dist_dir.join("release")
    }
}

/// Loaded configuration plus resolved paths
#[derive(Debug, Clone)]
pub struct Project {
    /// Parsed configuration
    pub config: ProjectConfig,
    /// Resolved paths
    pub paths: BuildPaths,
    /// Config file that was read, if any
    pub config_file: Option<PathBuf>,
}

impl Project {
    /// Load the project rooted at `root`
    pub fn load(root: &Path, config_path: Option<&Path>, env: &EnvConfig) -> Result<Self> {
        let config_path = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| root.join(CONFIG_FILE_NAME));

        if config_path != root.join(CONFIG_FILE_NAME) && !config_path.exists() {
            return Err(ConfigError::Read {
                path: config_path.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
            }
            .into());
        }

        let config = ProjectConfig::load(&config_path)?;
        let paths = BuildPaths::resolve(root, &config, env)?;
        let config_file = config_path.exists().then_some(config_path);

        Ok(Self {
            config,
            paths,
            config_file,
        })
    }

    /// Interpreter commands to probe, honoring `AVITO_BUILD_PYTHON`
    pub fn interpreter_candidates(&self, env: &EnvConfig) -> Vec<String> {
        match env.get(PYTHON_OVERRIDE) {
            Some(forced) => vec![forced],
            None => self
                .config
                .interpreters
                .iter()
                .map(|i| i.trim().to_string())
                .filter(|i| !i.is_empty())
                .collect(),
        }
    }

    /// Locate the build descriptor.
    ///
    /// Order: configured path, `<app_name>.spec`, the only `*.spec` in the root.
    pub fn descriptor_path(&self) -> std::result::Result<PathBuf, InputError> {
        let root = &self.paths.project_root;

        if let Some(configured) = &self.config.descriptor {
            return Ok(root.join(configured));
        }

        let by_name = root.join(format!("{}.spec", self.config.app_name));
        if by_name.is_file() {
            return Ok(by_name);
        }

        let pattern = format!(
            "{}/*.spec",
            glob::Pattern::escape(&root.to_string_lossy())
        );
        let mut candidates: Vec<PathBuf> = match glob::glob(&pattern) {
            Ok(paths) => paths.filter_map(|p| p.ok()).filter(|p| p.is_file()).collect(),
            Err(e) => {
                log::warn!("Invalid descriptor search pattern {}: {}", pattern, e);
                Vec::new()
            }
        };
        candidates.sort();

        match candidates.len() {
            0 => Err(InputError::NoDescriptor { root: root.clone() }),
            1 => Ok(candidates.remove(0)),
            _ => Err(InputError::AmbiguousDescriptor { candidates }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_analyzer_layout() {
        let config = ProjectConfig::default();
        assert_eq!(config.app_name, "AvitoPriceAnalyzer");
        assert_eq!(config.entry_script, PathBuf::from("main.py"));
        assert_eq!(config.manifest, PathBuf::from("requirements.txt"));
        assert_eq!(config.packager_requirement, "pyinstaller");
        assert!(config.github.prerelease_for_zero_versions);
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let config = ProjectConfig::from_toml_str(
            "app_name = \"Analyzer\"\n[github]\nrepository = \"acme/analyzer\"\n",
            Path::new("release.toml"),
        )
        .expect("valid config");
        assert_eq!(config.app_name, "Analyzer");
        assert_eq!(config.env_dir, PathBuf::from("venv"));
        assert_eq!(config.github.repository.as_deref(), Some("acme/analyzer"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result = ProjectConfig::from_toml_str("app_nmae = \"x\"\n", Path::new("release.toml"));
        assert!(matches!(
            result,
            Err(crate::ReleaseError::Config(ConfigError::Parse { .. }))
        ));
    }

    #[test]
    fn app_name_must_be_a_file_name() {
        let result =
            ProjectConfig::from_toml_str("app_name = \"dist/app\"\n", Path::new("release.toml"));
        assert!(matches!(
            result,
            Err(crate::ReleaseError::Config(ConfigError::Invalid { field: "app_name", .. }))
        ));
    }

    #[test]
    fn env_dir_override_is_applied() {
        let dir = tempfile::tempdir().expect("tempdir");
        let env = EnvConfig::from_pairs([(ENV_DIR_OVERRIDE, ".venv-ci")]);
        let paths = BuildPaths::resolve(dir.path(), &ProjectConfig::default(), &env)
            .expect("paths resolve");
        assert!(paths.env_dir.ends_with(".venv-ci"));
        assert!(paths.env_dir.is_absolute());
    }

    #[test]
    fn python_override_replaces_candidates() {
        let dir = tempfile::tempdir().expect("tempdir");
        let env = EnvConfig::from_pairs([(PYTHON_OVERRIDE, "/opt/python/bin/python3.11")]);
        let project = Project::load(dir.path(), None, &env).expect("project loads");
        assert_eq!(
            project.interpreter_candidates(&env),
            vec!["/opt/python/bin/python3.11".to_string()]
        );
    }

    #[test]
    fn descriptor_discovery_prefers_app_name_then_single_spec() {
        let dir = tempfile::tempdir().expect("tempdir");
        let env = EnvConfig::default();

        let project = Project::load(dir.path(), None, &env).expect("project loads");
        assert!(matches!(
            project.descriptor_path(),
            Err(InputError::NoDescriptor { .. })
        ));

        std::fs::write(dir.path().join("other.spec"), "").expect("write spec");
        let found = project.descriptor_path().expect("single spec found");
        assert!(found.ends_with("other.spec"));

        std::fs::write(dir.path().join("third.spec"), "").expect("write spec");
        assert!(matches!(
            project.descriptor_path(),
            Err(InputError::AmbiguousDescriptor { .. })
        ));

        std::fs::write(dir.path().join("AvitoPriceAnalyzer.spec"), "").expect("write spec");
        let found = project.descriptor_path().expect("named spec wins");
        assert!(found.ends_with("AvitoPriceAnalyzer.spec"));
    }

    #[test]
    fn explicit_missing_config_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("custom.toml");
        let result = Project::load(dir.path(), Some(&missing), &EnvConfig::default());
        assert!(matches!(
            result,
            Err(crate::ReleaseError::Config(ConfigError::Read { .. }))
        ));
    }
}
