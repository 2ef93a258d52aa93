//! Machine-readable record of a pipeline run.
//!
//! Written to `dist/.pipeline-report.json` after every run, successful or
//! not, and read back by the `status` command.

use super::stage::{EntryPoint, Stage};
use crate::error::Result;
use crate::package::BuildArtifact;
use crate::publish::{PublishedRelease, RunArtifact};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

/// Result of one stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StageStatus {
    /// Not reached
    Pending,
    /// Completed
    Succeeded,
    /// Nothing to do; an earlier run already produced the result
    Reused,
    /// Not applicable for this entry point
    Skipped,
    /// Aborted the run
    Failed {
        /// Error message
        message: String,
    },
}

/// Per-stage entry of the report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageRecord {
    /// Which stage
    pub stage: Stage,
    /// What happened
    #[serde(flatten)]
    pub status: StageStatus,
    /// Wall-clock duration in milliseconds
    pub duration_ms: Option<u64>,
}

/// Final outcome of the run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Still running (only seen if the process died)
    Running,
    /// All applicable stages succeeded
    Succeeded,
    /// A build stage failed; no artifact exists
    BuildFailed {
        /// The failing stage
        stage: Stage,
    },
    /// The build succeeded but publication failed
    PublishFailed,
    /// Rejected before stage 1 (configuration or input error)
    Rejected,
}

/// Report of one pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    /// Unique run identifier
    pub run_id: Uuid,
    /// Tool version that produced the report
    pub tool_version: String,
    /// Invocation entry point
    pub entry_point: EntryPoint,
    /// Project root
    pub project_root: PathBuf,
    /// Start time
    pub started_at: DateTime<Utc>,
    /// End time
    pub finished_at: Option<DateTime<Utc>>,
    /// Stage results in execution order
    pub stages: Vec<StageRecord>,
    /// Packaged artifact, present only after stage 3 succeeded
    pub artifact: Option<BuildArtifact>,
    /// Staged CI run artifact
    pub run_artifact: Option<RunArtifact>,
    /// Release the artifact was attached to
    pub release: Option<PublishedRelease>,
    /// Final outcome
    pub outcome: RunOutcome,
    /// Error message of the failure, if any
    pub error: Option<String>,
}

impl PipelineReport {
    /// Start a report with every stage pending
    pub fn new(entry_point: EntryPoint, project_root: &Path) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            entry_point,
            project_root: project_root.to_path_buf(),
            started_at: Utc::now(),
            finished_at: None,
            stages: Stage::ALL
                .iter()
                .map(|&stage| StageRecord {
                    stage,
                    status: StageStatus::Pending,
                    duration_ms: None,
                })
                .collect(),
            artifact: None,
            run_artifact: None,
            release: None,
            outcome: RunOutcome::Running,
            error: None,
        }
    }

    /// Record the result of `stage`
    pub fn record(&mut self, stage: Stage, status: StageStatus, duration: Option<Duration>) {
        if let Some(record) = self.stages.iter_mut().find(|r| r.stage == stage) {
            record.status = status;
            record.duration_ms = duration.map(|d| d.as_millis() as u64);
        }
    }

    /// Status of `stage`
    pub fn status(&self, stage: Stage) -> Option<&StageStatus> {
        self.stages
            .iter()
            .find(|r| r.stage == stage)
            .map(|r| &r.status)
    }

    /// Close the report with its outcome
    pub fn finish(&mut self, outcome: RunOutcome, error: Option<String>) {
        self.outcome = outcome;
        self.error = error;
        self.finished_at = Some(Utc::now());
    }

    /// Total run time, once finished
    pub fn elapsed(&self) -> Option<chrono::Duration> {
        self.finished_at.map(|end| end - self.started_at)
    }

    /// One-line description for terminal output
    pub fn summary(&self) -> String {
        let outcome = match &self.outcome {
            RunOutcome::Running => "did not finish".to_string(),
            RunOutcome::Succeeded => "succeeded".to_string(),
            RunOutcome::BuildFailed { stage } => {
                format!("failed at stage {} ({})", stage.number(), stage)
            }
            RunOutcome::PublishFailed => "built, publication failed".to_string(),
            RunOutcome::Rejected => "rejected before building".to_string(),
        };
        format!(
            "Run {} ({:?}) {} at {}",
            self.run_id,
            self.entry_point,
            outcome,
            self.started_at.format("%Y-%m-%d %H:%M:%S UTC")
        )
    }

    /// Write atomically: temp file, then rename
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let serialized = serde_json::to_string_pretty(self)?;
        let temp_path = path.with_extension("tmp");
        {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(serialized.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&temp_path, path)?;
        log::debug!("Pipeline report written to {}", path.display());
        Ok(())
    }

    /// Read a saved report, `None` when no run has been recorded
    pub fn load(path: &Path) -> Result<Option<Self>> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&text)?))
    }
}
