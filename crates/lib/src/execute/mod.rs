//! Task dispatch.
//!
//! An [`Orchestrator`] owns one invocation: the resolved snapshot, the
//! chosen execution strategy and the set of tasks already completed. It
//! walks a task's plan sequentially and stops at the first failure.

pub mod cancel;
pub mod process;
pub mod strategy;
pub mod types;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::config::{ConfigSnapshot, HostFacts};
use crate::consts::ENGINE_RUN_FAILURE;
use crate::sandbox::{BuilderManager, BuilderSpec, Engine, SandboxError};
use crate::task::{Action, CommandTemplate, RenderedCommand, TaskDef, TaskRegistry};
use crate::util::hash::{Fingerprint, Hashable};

use cancel::CancelSignal;
use process::RunStatus;

pub use strategy::ExecutionStrategy;
pub use types::{ExecuteError, PlannedStep, RunReport, TaskRun};

/// Runs tasks from a registry against one configuration snapshot.
pub struct Orchestrator<'r> {
  registry: &'r TaskRegistry,
  snapshot: ConfigSnapshot,
  strategy: ExecutionStrategy,
  root: PathBuf,
  cancel: CancelSignal,
  builders: BuilderManager,
  completed: HashSet<(String, Fingerprint)>,
  engine_checked: bool,
  report: RunReport,
}

impl<'r> Orchestrator<'r> {
  pub fn new(registry: &'r TaskRegistry, snapshot: ConfigSnapshot, host: &HostFacts, root: impl Into<PathBuf>) -> Self {
    let strategy = ExecutionStrategy::select(&snapshot, host);
    Self {
      registry,
      snapshot,
      strategy,
      root: root.into(),
      cancel: CancelSignal::never(),
      builders: BuilderManager::default(),
      completed: HashSet::new(),
      engine_checked: false,
      report: RunReport::default(),
    }
  }

  pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
    self.cancel = cancel;
    self
  }

  pub fn with_builders(mut self, builders: BuilderManager) -> Self {
    self.builders = builders;
    self
  }

  pub fn strategy(&self) -> ExecutionStrategy {
    self.strategy
  }

  pub fn snapshot(&self) -> &ConfigSnapshot {
    &self.snapshot
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  /// Execute `name` and its prerequisites.
  ///
  /// Templates and release platforms are checked up front, so a run that
  /// fails to resolve executes nothing.
  pub async fn run(&mut self, name: &str) -> Result<RunReport, ExecuteError> {
    let steps = self.plan(name)?;
    info!(task = %name, steps = steps.len(), strategy = %self.strategy, "starting");

    let snapshot = self.snapshot.clone();
    self.run_with(name, &snapshot).await?;

    Ok(std::mem::take(&mut self.report))
  }

  /// What `run` would execute, without executing anything.
  pub fn plan(&self, name: &str) -> Result<Vec<PlannedStep>, ExecuteError> {
    let mut steps = Vec::new();
    let mut seen = HashSet::new();
    self.plan_with(name, &self.snapshot, &mut seen, &mut steps)?;
    Ok(steps)
  }

  fn plan_with(
    &self,
    name: &str,
    snapshot: &ConfigSnapshot,
    seen: &mut HashSet<(String, Fingerprint)>,
    steps: &mut Vec<PlannedStep>,
  ) -> Result<(), ExecuteError> {
    let tasks = self.tasks_for(name)?;
    let fingerprint = fingerprint(snapshot)?;

    for task in tasks {
      if !seen.insert((task.name.clone(), fingerprint.clone())) {
        continue;
      }
      let strategy = self.strategy.for_task(task);
      let mut step = PlannedStep {
        task: task.name.clone(),
        strategy,
        arch: snapshot.get_str("ARCH"),
        commands: Vec::new(),
        note: None,
      };

      match &task.action {
        Action::None => {}
        Action::Commands { commands } => {
          step.commands = self.command_lines(&task.name, commands, snapshot, strategy)?;
        }
        Action::EnsureBuilder => {
          step.note = Some(format!(
            "ensure builder {} is bootstrapped",
            snapshot.get_str("BUILDER_NAME")
          ));
        }
        Action::FanOut(fan_out) => {
          let platforms = snapshot.platforms()?;
          for platform in &platforms {
            self.plan_with(&fan_out.task, &snapshot.for_platform(platform), seen, steps)?;
          }
          step.strategy = ExecutionStrategy::Direct;
          step.commands = self.command_lines(&task.name, &fan_out.publish, snapshot, ExecutionStrategy::Direct)?;
          step.note = Some(format!("publish after {} for {} platforms", fan_out.task, platforms.len()));
        }
      }
      steps.push(step);
    }
    Ok(())
  }

  fn command_lines(
    &self,
    task: &str,
    templates: &[CommandTemplate],
    snapshot: &ConfigSnapshot,
    strategy: ExecutionStrategy,
  ) -> Result<Vec<String>, ExecuteError> {
    let rendered = render(task, templates, snapshot)?;
    Ok(
      strategy
        .wrap(&rendered, snapshot, &self.root)
        .iter()
        .map(|i| i.command_line())
        .collect(),
    )
  }

  fn tasks_for(&self, name: &str) -> Result<Vec<&'r TaskDef>, ExecuteError> {
    let registry = self.registry;
    registry.plan(name).ok_or_else(|| ExecuteError::UnknownTask {
      name: name.to_string(),
      suggestion: registry.suggest(name),
    })
  }

  /// Execute the plan of `name` against `snapshot`, skipping tasks already
  /// completed with the same configuration.
  pub(crate) async fn run_with(&mut self, name: &str, snapshot: &ConfigSnapshot) -> Result<(), ExecuteError> {
    let tasks = self.tasks_for(name)?;
    let fingerprint = fingerprint(snapshot)?;

    for task in tasks {
      if self.cancel.is_cancelled() {
        return Err(ExecuteError::Interrupted {
          task: task.name.clone(),
        });
      }

      let key = (task.name.clone(), fingerprint.clone());
      if self.completed.contains(&key) {
        debug!(task = %task.name, fingerprint = %fingerprint, "already completed");
        continue;
      }

      self.execute_task(task, snapshot).await?;
      self.completed.insert(key);
    }
    Ok(())
  }

  async fn execute_task(&mut self, task: &'r TaskDef, snapshot: &ConfigSnapshot) -> Result<(), ExecuteError> {
    let strategy = self.strategy.for_task(task);
    let arch = snapshot.get_str("ARCH");
    info!(task = %task.name, %strategy, %arch, "running task");
    let started = Instant::now();

    match &task.action {
      Action::None => {}
      Action::Commands { commands } => {
        self.run_commands(&task.name, commands, snapshot, strategy).await?;
      }
      Action::EnsureBuilder => self.ensure_builder(snapshot).await?,
      Action::FanOut(fan_out) => {
        let release = Box::pin(crate::release::release(self, &task.name, fan_out, snapshot)).await?;
        self.report.releases.push(release);
      }
    }

    let duration = started.elapsed();
    debug!(task = %task.name, ?duration, "task finished");
    self.report.executed.push(TaskRun {
      name: task.name.clone(),
      strategy,
      arch,
      duration,
    });
    Ok(())
  }

  /// Render, wrap and run an action's commands, stopping at the first
  /// non-zero exit.
  pub(crate) async fn run_commands(
    &mut self,
    task: &str,
    templates: &[CommandTemplate],
    snapshot: &ConfigSnapshot,
    strategy: ExecutionStrategy,
  ) -> Result<(), ExecuteError> {
    let rendered = render(task, templates, snapshot)?;
    let invocations = strategy.wrap(&rendered, snapshot, &self.root);

    if strategy == ExecutionStrategy::Sandboxed && !invocations.is_empty() {
      self.check_engine(snapshot).await?;
    }

    for invocation in &invocations {
      let status = process::run(invocation, &mut self.cancel).await.map_err(|source| {
        if strategy == ExecutionStrategy::Sandboxed {
          ExecuteError::Sandbox(SandboxError::Unavailable {
            engine: invocation.program.clone(),
            reason: source.to_string(),
          })
        } else {
          ExecuteError::Spawn {
            program: invocation.program.clone(),
            source,
          }
        }
      })?;

      match status {
        RunStatus::Success => {}
        RunStatus::Cancelled => {
          if let Some(container) = &invocation.container {
            self.remove_container(snapshot, container).await;
          }
          return Err(ExecuteError::Interrupted { task: task.to_string() });
        }
        RunStatus::Failed(Some(ENGINE_RUN_FAILURE)) if strategy == ExecutionStrategy::Sandboxed => {
          return Err(
            SandboxError::Unavailable {
              engine: invocation.program.clone(),
              reason: format!("engine run failed with exit code {ENGINE_RUN_FAILURE}"),
            }
            .into(),
          );
        }
        RunStatus::Failed(code) => {
          return Err(ExecuteError::TaskFailed {
            task: task.to_string(),
            code,
          });
        }
      }
    }
    Ok(())
  }

  /// Make the snapshot's builder ready. Memoized per builder name.
  pub(crate) async fn ensure_builder(&mut self, snapshot: &ConfigSnapshot) -> Result<(), ExecuteError> {
    let engine = Engine::new(snapshot.get_str("CONTAINER_ENGINE"), self.root.clone());
    let spec = BuilderSpec::from_snapshot(snapshot);
    let state = self.builders.ensure_ready(&engine, &spec, &mut self.cancel).await?;
    debug!(builder = %spec.name, %state, "builder ready");
    Ok(())
  }

  async fn remove_container(&self, snapshot: &ConfigSnapshot, container: &str) {
    let engine = Engine::new(snapshot.get_str("CONTAINER_ENGINE"), self.root.clone());
    if let Err(err) = engine.remove_container(container).await {
      warn!(%container, error = %err, "failed to remove interrupted container");
    }
  }

  async fn check_engine(&mut self, snapshot: &ConfigSnapshot) -> Result<(), ExecuteError> {
    if self.engine_checked {
      return Ok(());
    }
    let engine = Engine::new(snapshot.get_str("CONTAINER_ENGINE"), self.root.clone());
    engine.check_reachable(&mut self.cancel).await?;
    self.engine_checked = true;
    Ok(())
  }
}

fn render(task: &str, templates: &[CommandTemplate], snapshot: &ConfigSnapshot) -> Result<Vec<RenderedCommand>, ExecuteError> {
  templates
    .iter()
    .map(|t| t.render(snapshot))
    .collect::<Result<_, _>>()
    .map_err(|source| ExecuteError::Template {
      task: task.to_string(),
      source,
    })
}

fn fingerprint(snapshot: &ConfigSnapshot) -> Result<Fingerprint, ExecuteError> {
  snapshot
    .fingerprint()
    .map_err(|e| ExecuteError::Io(std::io::Error::other(e)))
}
