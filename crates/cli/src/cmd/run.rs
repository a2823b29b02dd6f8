//! Implementation of the `taskwell run` command.
//!
//! Resolves the configuration, then executes a task and its prerequisites.
//! Ctrl-C kills the running command and stops the invocation.

use std::path::Path;

use anyhow::Result;
use tracing::debug;

use taskwell_lib::execute::{ExecuteError, Orchestrator};
use taskwell_lib::execute::cancel::cancel_pair;
use taskwell_lib::task::project::builtin_registry;

use crate::output::{format_duration, print_detail, print_json, print_stat, print_success};

pub fn cmd_run(root: &Path, task: &str, overrides: &[String], json: bool) -> Result<()> {
  let registry = builtin_registry().map_err(ExecuteError::from)?;

  let report = super::runtime()?.block_on(async {
    let (snapshot, host) = super::resolve_snapshot(root, overrides).await?;

    let (handle, signal) = cancel_pair();
    tokio::spawn(async move {
      if tokio::signal::ctrl_c().await.is_ok() {
        debug!("interrupt received");
        handle.cancel();
      }
    });

    Orchestrator::new(&registry, snapshot, &host, root)
      .with_cancel(signal)
      .run(task)
      .await
  })?;

  if json {
    return print_json(&report);
  }

  print_success(&format!(
    "{} finished in {}",
    task,
    format_duration(report.total_duration())
  ));
  for run in &report.executed {
    print_stat(
      &run.name,
      &format!("{} ({}, {})", format_duration(run.duration), run.strategy, run.arch),
    );
  }
  for release in &report.releases {
    for artifact in &release.artifacts {
      let path = artifact.path.as_deref().unwrap_or("-");
      let state = if artifact.present { "" } else { " (missing)" };
      print_detail(&format!("{} {}{}", artifact.platform, path, state));
    }
    if release.published {
      print_detail(&format!("{} published", release.task));
    }
  }

  Ok(())
}
