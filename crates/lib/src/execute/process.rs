//! Spawning external commands.
//!
//! Commands are awaited synchronously from the orchestrator's point of view:
//! one at a time, each finishing before the next starts. A tripped
//! [`CancelSignal`] kills the running child.

use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};

use serde::Serialize;
use tokio::process::Command;
use tracing::debug;

use super::cancel::CancelSignal;

/// A fully rendered external command ready to spawn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Invocation {
  pub program: String,
  pub args: Vec<String>,
  /// Added on top of the inherited process environment.
  pub env: BTreeMap<String, String>,
  pub cwd: PathBuf,
  /// Name of the container an engine `run` starts.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub container: Option<String>,
}

impl Invocation {
  /// The command line in copy-pasteable shell form.
  pub fn command_line(&self) -> String {
    shell_join(&self.program, &self.args)
  }

  fn command(&self) -> Command {
    let mut command = Command::new(&self.program);
    command
      .args(&self.args)
      .envs(&self.env)
      .current_dir(&self.cwd)
      .kill_on_drop(true);
    command
  }
}

/// How a command ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
  Success,
  /// Non-zero exit; the code is `None` only when the platform reports none.
  Failed(Option<i32>),
  Cancelled,
}

/// Output of a captured command.
#[derive(Debug, Clone)]
pub struct Captured {
  pub status: RunStatus,
  pub stdout: String,
  pub stderr: String,
}

impl Captured {
  pub fn success(&self) -> bool {
    self.status == RunStatus::Success
  }
}

/// Run with inherited stdio, waiting for exit or cancellation.
pub async fn run(invocation: &Invocation, cancel: &mut CancelSignal) -> io::Result<RunStatus> {
  if cancel.is_cancelled() {
    return Ok(RunStatus::Cancelled);
  }

  debug!(command = %invocation.command_line(), cwd = ?invocation.cwd, "spawning process");
  let mut child = invocation.command().spawn()?;

  tokio::select! {
    status = child.wait() => Ok(status_of(status?)),
    _ = cancel.cancelled() => {
      debug!(command = %invocation.program, "killing process after interrupt");
      child.kill().await?;
      Ok(RunStatus::Cancelled)
    }
  }
}

/// Run with captured stdout and stderr.
pub async fn capture(invocation: &Invocation, cancel: &mut CancelSignal) -> io::Result<Captured> {
  if cancel.is_cancelled() {
    return Ok(cancelled_capture());
  }

  debug!(command = %invocation.command_line(), "capturing process output");
  let child = invocation
    .command()
    .stdin(Stdio::null())
    .stdout(Stdio::piped())
    .stderr(Stdio::piped())
    .spawn()?;

  tokio::select! {
    output = child.wait_with_output() => {
      let output = output?;
      let captured = Captured {
        status: status_of(output.status),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
      };
      if !captured.success() && !captured.stderr.is_empty() {
        debug!(stderr = %captured.stderr.trim(), "command stderr");
      }
      Ok(captured)
    }
    // Dropping the output future drops the child, which kills it.
    _ = cancel.cancelled() => Ok(cancelled_capture()),
  }
}

fn cancelled_capture() -> Captured {
  Captured {
    status: RunStatus::Cancelled,
    stdout: String::new(),
    stderr: String::new(),
  }
}

fn status_of(status: ExitStatus) -> RunStatus {
  if status.success() {
    return RunStatus::Success;
  }
  RunStatus::Failed(exit_code(status))
}

/// Exit code, or `128 + signal` for a signal-terminated process.
#[cfg(unix)]
fn exit_code(status: ExitStatus) -> Option<i32> {
  use std::os::unix::process::ExitStatusExt;
  status.code().or_else(|| status.signal().map(|s| 128 + s))
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> Option<i32> {
  status.code()
}

/// Join a program and its arguments into one POSIX shell command line.
pub fn shell_join(program: &str, args: &[String]) -> String {
  std::iter::once(program)
    .chain(args.iter().map(String::as_str))
    .map(shell_quote)
    .collect::<Vec<_>>()
    .join(" ")
}

/// Quote a word for POSIX `sh` unless it is made of safe characters only.
pub fn shell_quote(word: &str) -> String {
  let safe = !word.is_empty()
    && word
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | ':' | '=' | ',' | '+' | '@' | '%'));
  if safe {
    word.to_string()
  } else {
    format!("'{}'", word.replace('\'', r"'\''"))
  }
}
