//! Pipeline sequencing: stages, entry points and the per-run report.

mod report;
mod runner;
mod stage;

pub use report::{PipelineReport, RunOutcome, StageRecord, StageStatus};
pub use runner::{
    PipelineOptions, Preflight, Progress, SilentProgress, preflight, run_pipeline,
};
pub use stage::{EntryPoint, STAGE_COUNT, Stage};
