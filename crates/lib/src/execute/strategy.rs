//! Execution strategies.
//!
//! Every action passes through [`ExecutionStrategy::wrap`], the single seam
//! that decides how rendered commands become process invocations.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::config::{ConfigSnapshot, HostFacts};
use crate::consts::{APP_NAME, IN_SANDBOX_ENV};
use crate::task::{RenderedCommand, TaskDef};

use super::process::{Invocation, shell_join};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStrategy {
  /// Children of this process, in the project root.
  Direct,
  /// One engine `run` per action inside the sandbox image.
  Sandboxed,
}

impl ExecutionStrategy {
  /// `USE_SANDBOX` picks the strategy, except inside a sandbox where
  /// everything runs directly.
  pub fn select(snapshot: &ConfigSnapshot, host: &HostFacts) -> Self {
    if host.in_sandbox {
      return ExecutionStrategy::Direct;
    }
    match snapshot.get_bool("USE_SANDBOX") {
      Some(false) => ExecutionStrategy::Direct,
      _ => ExecutionStrategy::Sandboxed,
    }
  }

  /// Host-only tasks opt out of sandboxing.
  pub fn for_task(self, task: &TaskDef) -> Self {
    if task.host_only { ExecutionStrategy::Direct } else { self }
  }

  /// Turn an action's commands into invocations.
  ///
  /// Direct yields one invocation per command. Sandboxed yields a single
  /// engine call whose body runs the commands in order and stops at the
  /// first failure. Both see the full snapshot as environment.
  pub fn wrap(self, commands: &[RenderedCommand], snapshot: &ConfigSnapshot, root: &Path) -> Vec<Invocation> {
    if commands.is_empty() {
      return Vec::new();
    }

    let env = snapshot.to_env();
    match self {
      ExecutionStrategy::Direct => commands
        .iter()
        .map(|c| Invocation {
          program: c.program.clone(),
          args: c.args.clone(),
          env: env.clone(),
          cwd: root.to_path_buf(),
          container: None,
        })
        .collect(),
      ExecutionStrategy::Sandboxed => {
        let workdir = snapshot.get_str("SANDBOX_WORKDIR");
        let body = commands
          .iter()
          .map(|c| shell_join(&c.program, &c.args))
          .collect::<Vec<_>>()
          .join(" && ");

        let container = container_name();
        let mut args = vec![
          "run".to_string(),
          "--rm".to_string(),
          "-v".to_string(),
          format!("{}:{}", root.display(), workdir),
          "-w".to_string(),
          workdir,
          // init process as PID 1 forwards the engine's SIGTERM to the body
          "--init".to_string(),
          "--name".to_string(),
          container.clone(),
        ];
        for (key, value) in &env {
          args.push("-e".to_string());
          args.push(format!("{key}={value}"));
        }
        args.push("-e".to_string());
        args.push(format!("{IN_SANDBOX_ENV}=1"));
        args.push(snapshot.get_str("SANDBOX_IMAGE"));
        args.extend(["/bin/sh".to_string(), "-c".to_string(), body]);

        vec![Invocation {
          program: snapshot.get_str("CONTAINER_ENGINE"),
          args,
          env,
          cwd: root.to_path_buf(),
          container: Some(container),
        }]
      }
    }
  }
}

/// Unique per sandboxed run within this process.
fn container_name() -> String {
  static NEXT: AtomicU64 = AtomicU64::new(0);
  let n = NEXT.fetch_add(1, Ordering::Relaxed);
  format!("{APP_NAME}-{}-{n}", std::process::id())
}

impl std::fmt::Display for ExecutionStrategy {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      ExecutionStrategy::Direct => write!(f, "direct"),
      ExecutionStrategy::Sandboxed => write!(f, "sandboxed"),
    }
  }
}
