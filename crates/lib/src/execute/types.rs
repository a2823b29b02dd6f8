//! Types for task execution.
//!
//! This module defines the error type every failure of an invocation rolls
//! up into, and the report a successful run returns.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use super::strategy::ExecutionStrategy;
use crate::config::ConfigError;
use crate::consts::{EXIT_INTERRUPTED, EXIT_RESOLUTION, EXIT_SANDBOX};
use crate::placeholder::PlaceholderError;
use crate::release::ReleaseReport;
use crate::sandbox::SandboxError;
use crate::task::RegistryError;

/// Errors that abort an invocation.
#[derive(Debug, Error)]
pub enum ExecuteError {
  #[error(transparent)]
  Config(#[from] ConfigError),

  #[error(transparent)]
  Registry(#[from] RegistryError),

  #[error("unknown task '{name}'{}", suggestion.as_ref().map(|s| format!(" (did you mean '{s}'?)")).unwrap_or_default())]
  UnknownTask { name: String, suggestion: Option<String> },

  #[error(transparent)]
  Sandbox(#[from] SandboxError),

  /// An external command exited non-zero.
  #[error("task '{task}' failed{}", code.map(|c| format!(" with exit code {c}")).unwrap_or_default())]
  TaskFailed { task: String, code: Option<i32> },

  #[error("interrupted while running task '{task}'")]
  Interrupted { task: String },

  #[error("task '{task}': {source}")]
  Template {
    task: String,
    #[source]
    source: PlaceholderError,
  },

  #[error("failed to spawn '{program}': {source}")]
  Spawn {
    program: String,
    #[source]
    source: std::io::Error,
  },

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

impl ExecuteError {
  /// Process exit code the CLI reports for this error.
  pub fn exit_code(&self) -> i32 {
    match self {
      ExecuteError::Config(_)
      | ExecuteError::Registry(_)
      | ExecuteError::UnknownTask { .. }
      | ExecuteError::Template { .. } => EXIT_RESOLUTION,
      ExecuteError::Sandbox(SandboxError::Interrupted { .. }) | ExecuteError::Interrupted { .. } => EXIT_INTERRUPTED,
      ExecuteError::Sandbox(_) => EXIT_SANDBOX,
      ExecuteError::TaskFailed { code, .. } => code.filter(|c| *c != 0).unwrap_or(1),
      ExecuteError::Spawn { source, .. } if source.kind() == std::io::ErrorKind::NotFound => 127,
      ExecuteError::Spawn { .. } | ExecuteError::Io(_) => 1,
    }
  }
}

/// One task that actually ran.
#[derive(Debug, Clone, Serialize)]
pub struct TaskRun {
  pub name: String,
  pub strategy: ExecutionStrategy,
  pub arch: String,
  pub duration: Duration,
}

/// What a successful invocation did, in execution order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
  pub executed: Vec<TaskRun>,
  pub releases: Vec<ReleaseReport>,
}

impl RunReport {
  pub fn total_duration(&self) -> Duration {
    self.executed.iter().map(|t| t.duration).sum()
  }
}

/// One step of a dry run.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedStep {
  pub task: String,
  pub strategy: ExecutionStrategy,
  pub arch: String,
  /// Command lines as they would be spawned. Empty for aggregate tasks.
  pub commands: Vec<String>,
  /// Set for fan-out and builder steps, which have no fixed command list.
  pub note: Option<String>,
}
