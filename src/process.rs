//! Subprocess invocation for the external tools the pipeline drives.
//!
//! Every external call (interpreter probe, venv creation, pip, PyInstaller)
//! goes through here. Output is streamed line by line to the caller while the
//! last lines are kept, so a failure surfaces as one [`ProcessError`] carrying
//! the command, its exit status and the tail of its output.

use std::collections::VecDeque;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::Path;
use std::process::Stdio;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

/// Number of trailing output lines kept for error reports
pub const TAIL_LINES: usize = 40;

/// A subprocess that could not be started or exited unsuccessfully
#[derive(Error, Debug)]
pub enum ProcessError {
    /// The program could not be spawned
    #[error("failed to run {command}: {source}")]
    Spawn {
        /// Rendered command line
        command: String,
        /// The underlying error
        #[source]
        source: std::io::Error,
    },

    /// The program ran and exited with a failure status
    #[error("{0}")]
    Exited(ProcessFailure),
}

/// Captured details of a failed subprocess
#[derive(Debug, Clone)]
pub struct ProcessFailure {
    /// Rendered command line
    pub command: String,
    /// Exit code, `None` when terminated by a signal
    pub exit_code: Option<i32>,
    /// Last lines of combined stdout/stderr
    pub output_tail: Vec<String>,
}

impl fmt::Display for ProcessFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.exit_code {
            Some(code) => write!(f, "{} exited with code {}", self.command, code)?,
            None => write!(f, "{} was terminated", self.command)?,
        }
        if let Some(last) = self.output_tail.iter().rev().find(|l| !l.trim().is_empty()) {
            write!(f, " ({})", last.trim())?;
        }
        Ok(())
    }
}

impl ProcessError {
    /// Output tail of a failed run, empty for spawn failures
    pub fn output_tail(&self) -> &[String] {
        match self {
            ProcessError::Spawn { .. } => &[],
            ProcessError::Exited(failure) => &failure.output_tail,
        }
    }
}

/// Output of a short-lived command run to completion
#[derive(Debug, Clone)]
pub struct CapturedOutput {
    /// Standard output, lossily decoded
    pub stdout: String,
    /// Standard error, lossily decoded
    pub stderr: String,
}

/// Render a program and its arguments the way an operator would type them
pub fn render_command<S: AsRef<OsStr>>(program: &Path, args: &[S]) -> String {
    let mut rendered = program.display().to_string();
    for arg in args {
        let arg = arg.as_ref().to_string_lossy();
        rendered.push(' ');
        if arg.contains(' ') {
            rendered.push('"');
            rendered.push_str(&arg);
            rendered.push('"');
        } else {
            rendered.push_str(&arg);
        }
    }
    rendered
}

/// Run a command to completion, capturing its output.
///
/// Used for quick probes such as `python --version`.
pub async fn capture<S: AsRef<OsStr>>(
    program: &Path,
    args: &[S],
) -> Result<CapturedOutput, ProcessError> {
    let command = render_command(program, args);
    log::debug!("Probing {}", command);

    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|source| ProcessError::Spawn {
            command: command.clone(),
            source,
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    if !output.status.success() {
        let output_tail = stdout
            .lines()
            .chain(stderr.lines())
            .map(str::to_string)
            .collect::<Vec<_>>();
        let skip = output_tail.len().saturating_sub(TAIL_LINES);
        return Err(ProcessError::Exited(ProcessFailure {
            command,
            exit_code: output.status.code(),
            output_tail: output_tail.into_iter().skip(skip).collect(),
        }));
    }

    Ok(CapturedOutput { stdout, stderr })
}

/// Run a command in `cwd`, streaming each output line to `on_line`.
///
/// Blocks the pipeline until the child exits. stdout and stderr are merged in
/// arrival order.
pub async fn run_streamed<F>(
    program: &Path,
    args: &[OsString],
    cwd: &Path,
    mut on_line: F,
) -> Result<(), ProcessError>
where
    F: FnMut(&str),
{
    let command = render_command(program, args);
    log::info!("Running {} (in {})", command, cwd.display());

    let mut child = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .env("PYTHONUNBUFFERED", "1")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| ProcessError::Spawn {
            command: command.clone(),
            source,
        })?;

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let mut readers = Vec::with_capacity(2);
    if let Some(stdout) = child.stdout.take() {
        readers.push(tokio::spawn(forward_lines(stdout, tx.clone())));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(tokio::spawn(forward_lines(stderr, tx.clone())));
    }
    drop(tx);

    let mut tail: VecDeque<String> = VecDeque::with_capacity(TAIL_LINES);
    while let Some(line) = rx.recv().await {
        log::debug!("| {}", line);
        on_line(&line);
        if tail.len() == TAIL_LINES {
            tail.pop_front();
        }
        tail.push_back(line);
    }

    for reader in readers {
        if let Err(e) = reader.await {
            log::warn!("Output reader for {} stopped: {}", command, e);
        }
    }

    let status = child.wait().await.map_err(|source| ProcessError::Spawn {
        command: command.clone(),
        source,
    })?;

    if status.success() {
        log::debug!("{} finished successfully", command);
        Ok(())
    } else {
        Err(ProcessError::Exited(ProcessFailure {
            command,
            exit_code: status.code(),
            output_tail: tail.into_iter().collect(),
        }))
    }
}

/// Forward lines from a child pipe until EOF.
///
/// Reads raw bytes so non-UTF-8 console output (cp866 from Windows tools)
/// never stops the reader and stalls the child on a full pipe.
async fn forward_lines<R>(reader: R, tx: mpsc::UnboundedSender<String>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf)
                    .trim_end_matches(['\r', '\n'])
                    .to_string();
                if tx.send(line).is_err() {
                    break;
                }
            }
            Err(e) => {
                log::warn!("Failed to read subprocess output: {}", e);
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn render_command_quotes_arguments_with_spaces() {
        let rendered = render_command(
            Path::new("python"),
            &["-m", "pip", "install", "-r", "my requirements.txt"],
        );
        assert_eq!(
            rendered,
            "python -m pip install -r \"my requirements.txt\""
        );
    }

    #[test]
    fn failure_display_uses_last_non_empty_line() {
        let failure = ProcessFailure {
            command: "pip install".to_string(),
            exit_code: Some(1),
            output_tail: vec![
                "Collecting nonexistent-pkg".to_string(),
                "ERROR: No matching distribution found for nonexistent-pkg".to_string(),
                String::new(),
            ],
        };
        assert_eq!(
            failure.to_string(),
            "pip install exited with code 1 (ERROR: No matching distribution found for nonexistent-pkg)"
        );
    }

    #[tokio::test]
    async fn spawn_failure_is_reported_for_missing_program() {
        let result = run_streamed(
            &PathBuf::from("definitely-not-a-real-program-4821"),
            &[],
            Path::new("."),
            |_| {},
        )
        .await;
        assert!(matches!(result, Err(ProcessError::Spawn { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn streamed_run_reports_exit_code_and_tail() {
        let args: Vec<OsString> = vec!["-c".into(), "echo one; echo two >&2; exit 3".into()];
        let mut seen = Vec::new();
        let result = run_streamed(Path::new("/bin/sh"), &args, Path::new("."), |line| {
            seen.push(line.to_string())
        })
        .await;

        let Err(ProcessError::Exited(failure)) = result else {
            panic!("expected exit failure");
        };
        assert_eq!(failure.exit_code, Some(3));
        assert_eq!(seen.len(), 2);
        assert!(failure.output_tail.contains(&"one".to_string()));
        assert!(failure.output_tail.contains(&"two".to_string()));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn capture_collects_stdout() {
        let output = capture(Path::new("/bin/sh"), &["-c", "echo Python 3.11.4"])
            .await
            .expect("sh runs");
        assert_eq!(output.stdout.trim(), "Python 3.11.4");
    }
}
