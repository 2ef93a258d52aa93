//! Snapshot of the process environment.
//!
//! The pipeline reads environment variables once at startup and passes the
//! snapshot around, so lookups are consistent for the whole run and tests can
//! inject values without touching the real environment.

use std::collections::HashMap;
use std::path::PathBuf;

/// Forces a single interpreter instead of probing `interpreters`
pub const PYTHON_OVERRIDE: &str = "AVITO_BUILD_PYTHON";
/// Overrides the build environment directory
pub const ENV_DIR_OVERRIDE: &str = "AVITO_BUILD_ENV_DIR";
/// Overrides the message language (`en` or `ru`)
pub const LANG_OVERRIDE: &str = "AVITO_BUILD_LANG";

/// Immutable view of environment variables
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    vars: HashMap<String, String>,
}

impl EnvConfig {
    /// Capture the current process environment
    pub fn from_process() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    /// Build from explicit pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Get a variable, treating empty values as unset
    pub fn get(&self, key: &str) -> Option<String> {
        self.vars
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    /// True when running under GitHub Actions
    pub fn is_github_actions(&self) -> bool {
        self.get("GITHUB_ACTIONS").as_deref() == Some("true")
    }

    /// GitHub token supplied by the runner or the operator
    pub fn github_token(&self) -> Option<String> {
        self.get("GITHUB_TOKEN").or_else(|| self.get("GH_TOKEN"))
    }

    /// File that receives `key=value` step outputs
    pub fn github_output(&self) -> Option<PathBuf> {
        self.get("GITHUB_OUTPUT").map(PathBuf::from)
    }

    /// Language hint from the locale variables
    pub fn language_hint(&self) -> Option<String> {
        self.get(LANG_OVERRIDE)
            .or_else(|| self.get("LC_ALL"))
            .or_else(|| self.get("LANG"))
    }
}
