//! Declarative task records.

use serde::Serialize;
use thiserror::Error;

use crate::placeholder::{PlaceholderError, Resolver, substitute};

/// An external command whose program and arguments are placeholder templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandTemplate {
  pub program: String,
  pub args: Vec<String>,
}

impl CommandTemplate {
  pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      program: program.into(),
      args: args.into_iter().map(Into::into).collect(),
    }
  }

  /// Substitute every placeholder from `resolver`.
  pub fn render(&self, resolver: &impl Resolver) -> Result<RenderedCommand, PlaceholderError> {
    Ok(RenderedCommand {
      program: substitute(&self.program, resolver)?,
      args: self
        .args
        .iter()
        .map(|arg| substitute(arg, resolver))
        .collect::<Result<_, _>>()?,
    })
  }
}

/// A command line with every placeholder substituted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedCommand {
  pub program: String,
  pub args: Vec<String>,
}

/// Run a task once per release platform, then publish once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FanOut {
  /// Task run per platform with `ARCH` set to the platform's architecture.
  pub task: String,
  /// Template of the artifact each per-platform run produces.
  pub artifact: Option<String>,
  /// Commands run once after every platform succeeded.
  pub publish: Vec<CommandTemplate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Action {
  /// Aggregate task: only its prerequisites do work.
  None,
  Commands { commands: Vec<CommandTemplate> },
  /// Make the multi-platform builder ready.
  EnsureBuilder,
  FanOut(FanOut),
}

/// A named unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskDef {
  pub name: String,
  pub description: String,
  pub prerequisites: Vec<String>,
  pub action: Action,
  /// Always run directly on the host, regardless of the execution strategy.
  pub host_only: bool,
}

impl TaskDef {
  pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      description: description.into(),
      prerequisites: Vec::new(),
      action: Action::None,
      host_only: false,
    }
  }

  pub fn requires<I, S>(mut self, prerequisites: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.prerequisites = prerequisites.into_iter().map(Into::into).collect();
    self
  }

  pub fn commands(mut self, commands: Vec<CommandTemplate>) -> Self {
    self.action = Action::Commands { commands };
    self
  }

  pub fn action(mut self, action: Action) -> Self {
    self.action = action;
    self
  }

  pub fn host_only(mut self) -> Self {
    self.host_only = true;
    self
  }
}

/// Listing entry of the introspection view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskSummary {
  pub name: String,
  pub description: String,
  pub prerequisites: Vec<String>,
}

/// A task set that cannot be scheduled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
  #[error("task {0} is declared more than once")]
  Duplicate(String),

  #[error("task {task} requires undeclared task {prerequisite}")]
  UnknownPrerequisite { task: String, prerequisite: String },

  #[error("task {task} fans out over undeclared task {target}")]
  UnknownFanOutTarget { task: String, target: String },

  #[error("task {task} fans out over {target}, which reaches fan-out task {nested}")]
  NestedFanOut {
    task: String,
    target: String,
    nested: String,
  },

  #[error("prerequisite cycle through task {0}")]
  Cycle(String),
}
