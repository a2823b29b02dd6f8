//! Multi-platform release.
//!
//! A fan-out task runs its target once per release platform, each time on a
//! snapshot whose `TARGET_OS` and `ARCH` are that platform's, then publishes one
//! multi-platform artifact from the host. The first failing platform stops
//! the release: later platforms are not attempted and nothing is published.

use serde::Serialize;
use tracing::info;

use crate::config::ConfigSnapshot;
use crate::execute::{ExecuteError, ExecutionStrategy, Orchestrator};
use crate::placeholder::substitute;
use crate::task::FanOut;

/// One platform's output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
  /// `os/arch`
  pub platform: String,
  /// Relative to the project root.
  pub path: Option<String>,
  /// Whether the path existed after the platform's run.
  pub present: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseReport {
  pub task: String,
  pub artifacts: Vec<Artifact>,
  pub published: bool,
}

/// Drive `fan_out` over every platform of the snapshot.
pub async fn release(
  orchestrator: &mut Orchestrator<'_>,
  task: &str,
  fan_out: &FanOut,
  snapshot: &ConfigSnapshot,
) -> Result<ReleaseReport, ExecuteError> {
  let platforms = snapshot.platforms()?;
  orchestrator.ensure_builder(snapshot).await?;

  let mut artifacts = Vec::with_capacity(platforms.len());
  for platform in &platforms {
    info!(release = %task, target = %fan_out.task, platform = %platform.qualified(), "building platform");
    let per_platform = snapshot.for_platform(platform);

    orchestrator.run_with(&fan_out.task, &per_platform).await?;

    let path = fan_out
      .artifact
      .as_deref()
      .map(|template| substitute(template, &per_platform))
      .transpose()
      .map_err(|source| ExecuteError::Template {
        task: task.to_string(),
        source,
      })?;
    let present = path
      .as_deref()
      .is_some_and(|p| orchestrator.root().join(p).exists());

    artifacts.push(Artifact {
      platform: platform.qualified(),
      path,
      present,
    });
  }

  let published = !fan_out.publish.is_empty();
  if published {
    info!(release = %task, platforms = platforms.len(), "publishing");
    orchestrator
      .run_commands(task, &fan_out.publish, snapshot, ExecutionStrategy::Direct)
      .await?;
  }

  Ok(ReleaseReport {
    task: task.to_string(),
    artifacts,
    published,
  })
}
