//! Step outputs for the workflow file (`$GITHUB_OUTPUT`).

use crate::error::PublishError;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

/// Appends `key=value` pairs to the runner's output file
#[derive(Debug, Clone)]
pub struct StepOutputs {
    path: Option<PathBuf>,
}

impl StepOutputs {
    /// Write to `path`; `None` makes every write a no-op
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    /// Append all pairs in one write
    pub fn write(&self, pairs: &[(&str, String)]) -> Result<(), PublishError> {
        let Some(path) = &self.path else {
            log::debug!("No GITHUB_OUTPUT set; skipping step outputs");
            return Ok(());
        };

        let mut text = String::new();
        for (key, value) in pairs {
            text.push_str(&format_output(key, value));
        }

        let write_failed = |source: std::io::Error| PublishError::StepOutput {
            path: path.clone(),
            source,
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(write_failed)?;
        file.write_all(text.as_bytes()).map_err(write_failed)?;
        Ok(())
    }
}

/// One output entry; multi-line values use the heredoc form
fn format_output(key: &str, value: &str) -> String {
    if value.contains('\n') {
        let delimiter = format!("ghadelimiter_{}", uuid::Uuid::new_v4());
        format!("{key}<<{delimiter}\n{value}\n{delimiter}\n")
    } else {
        format!("{key}={value}\n")
    }
}
