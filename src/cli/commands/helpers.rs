//! Shared helpers for command implementations.

use crate::cli::RuntimeConfig;
use crate::error::ReleaseError;
use crate::pipeline::{EntryPoint, Progress, STAGE_COUNT, Stage, StageStatus};
use std::io::{BufRead, IsTerminal, Write};
use std::time::Duration;

/// Subprocess lines repeated under the failure banner
const FAILURE_TAIL_LINES: usize = 15;

/// Prints numbered step lines and tool output while the pipeline runs
pub(super) struct ConsoleProgress<'a> {
    config: &'a RuntimeConfig,
}

impl<'a> ConsoleProgress<'a> {
    pub(super) fn new(config: &'a RuntimeConfig) -> Self {
        Self { config }
    }
}

impl Progress for ConsoleProgress<'_> {
    fn stage_started(&mut self, stage: Stage) {
        let output = self.config.output();
        let title = self.config.locale().stage_title(stage);
        output.group(&format!("[{}/{}] {}", stage.number(), STAGE_COUNT, title));
        let _ = output.step(stage.number(), STAGE_COUNT, title);
    }

    fn output(&mut self, _stage: Stage, line: &str) {
        let _ = self.config.output().tool_line(line);
    }

    fn stage_finished(&mut self, stage: Stage, status: &StageStatus, elapsed: Duration) {
        let locale = self.config.locale();
        match status {
            StageStatus::Succeeded => self.config.success_println(&format!(
                "{} ({:.1}s)",
                locale.stage_title(stage),
                elapsed.as_secs_f64()
            )),
            StageStatus::Reused => self.config.indent(locale.reused()),
            StageStatus::Failed { .. } | StageStatus::Pending | StageStatus::Skipped => {}
        }
        self.config.output().end_group();
    }
}

/// Print the localized banner, the error and recovery suggestions
pub(super) fn report_failure(config: &RuntimeConfig, error: &ReleaseError) {
    let locale = config.locale();
    let banner = locale.failure_banner(error.stage());

    config.println("");
    config.error_println(&banner);
    config.error_println(&error.to_string());
    config.output().annotate_error(&banner, &error.to_string());

    let tail = error.output_tail();
    if !tail.is_empty() {
        config.output().error_detail(locale.output_tail_header());
        for line in &tail[tail.len().saturating_sub(FAILURE_TAIL_LINES)..] {
            config.output().error_detail(line);
        }
    }

    let suggestions = error.recovery_suggestions();
    if !suggestions.is_empty() {
        config.println(&format!("\n{}", locale.suggestions_header()));
        for suggestion in suggestions {
            config.println(&format!("  • {}", suggestion));
        }
    }
}

/// Wait for Enter so a double-clicked window stays open.
///
/// Skipped when stdin is not a terminal.
pub(super) fn pause(config: &RuntimeConfig, entry: EntryPoint) {
    let stdin = std::io::stdin();
    if !stdin.is_terminal() {
        log::debug!("stdin is not a terminal; not pausing");
        return;
    }

    print!("\n{} ", config.locale().pause_prompt(entry));
    let _ = std::io::stdout().flush();
    let mut line = String::new();
    let _ = stdin.lock().read_line(&mut line);
}
