//! Sandbox lifecycle: the container engine and the multi-platform builder.
//!
//! The builder is an external, named resource that outlives any single
//! invocation. [`BuilderManager::ensure_ready`] drives it through
//! `Absent -> Created -> Bootstrapped` and never tears it down.

pub mod engine;
pub mod lock;

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

pub use engine::Engine;
pub use lock::{BuilderLock, BuilderLockError, LockMetadata};

use crate::config::ConfigSnapshot;
use crate::execute::cancel::CancelSignal;
use crate::platform::paths::cache_dir;

const LOCK_RETRY: Duration = Duration::from_millis(250);

#[derive(Debug, Error)]
pub enum SandboxError {
  #[error("sandbox unavailable: {engine}: {reason}")]
  Unavailable { engine: String, reason: String },

  #[error("host engine lacks {capability}: {detail}")]
  UnsupportedHostEngine { capability: String, detail: String },

  #[error("provisioning builder {name} failed: {reason}")]
  Provisioning { name: String, reason: String },

  #[error(transparent)]
  Lock(#[from] BuilderLockError),

  #[error("interrupted during '{operation}'")]
  Interrupted { operation: String },
}

/// Observed state of the named builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BuilderState {
  Absent,
  Created,
  Bootstrapped,
}

impl std::fmt::Display for BuilderState {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      BuilderState::Absent => write!(f, "absent"),
      BuilderState::Created => write!(f, "created"),
      BuilderState::Bootstrapped => write!(f, "bootstrapped"),
    }
  }
}

/// The builder a snapshot asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuilderSpec {
  pub name: String,
  /// Platforms in `os/arch` form, comma separated.
  pub platforms: String,
  pub emulator_image: String,
}

impl BuilderSpec {
  pub fn from_snapshot(snapshot: &ConfigSnapshot) -> Self {
    Self {
      name: snapshot.get_str("BUILDER_NAME"),
      platforms: snapshot.get_str("BUILDX_PLATFORMS"),
      emulator_image: snapshot.get_str("EMULATOR_IMAGE"),
    }
  }
}

/// Makes builders ready, at most once per name and invocation.
#[derive(Debug)]
pub struct BuilderManager {
  lock_dir: PathBuf,
  ready: HashSet<String>,
}

impl Default for BuilderManager {
  fn default() -> Self {
    Self::new(cache_dir().join("builders"))
  }
}

impl BuilderManager {
  pub fn new(lock_dir: impl Into<PathBuf>) -> Self {
    Self {
      lock_dir: lock_dir.into(),
      ready: HashSet::new(),
    }
  }

  /// Whether `name` was already seen bootstrapped by this manager.
  pub fn is_ready(&self, name: &str) -> bool {
    self.ready.contains(name)
  }

  /// Leave the builder `Bootstrapped`, creating and booting it as needed.
  ///
  /// Once a builder was observed bootstrapped, later calls return without
  /// spawning anything.
  pub async fn ensure_ready(
    &mut self,
    engine: &Engine,
    spec: &BuilderSpec,
    cancel: &mut CancelSignal,
  ) -> Result<BuilderState, SandboxError> {
    if self.ready.contains(&spec.name) {
      debug!(builder = %spec.name, "builder already ready");
      return Ok(BuilderState::Bootstrapped);
    }

    engine.probe_capability(cancel).await?;

    let _lock = self.lock(&spec.name, cancel).await?;

    let mut state = engine.inspect(&spec.name, cancel).await?;
    debug!(builder = %spec.name, %state, "inspected builder");

    if state == BuilderState::Absent {
      info!(builder = %spec.name, platforms = %spec.platforms, "creating builder");
      engine.create(spec, cancel).await?;
      state = BuilderState::Created;
    }

    if state == BuilderState::Created {
      info!(builder = %spec.name, "bootstrapping builder");
      engine.bootstrap(spec, cancel).await?;

      state = engine.inspect(&spec.name, cancel).await?;
      if state != BuilderState::Bootstrapped {
        return Err(SandboxError::Provisioning {
          name: spec.name.clone(),
          reason: format!("builder is {state} after bootstrap"),
        });
      }
    }

    self.ready.insert(spec.name.clone());
    Ok(state)
  }

  async fn lock(&self, name: &str, cancel: &mut CancelSignal) -> Result<BuilderLock, SandboxError> {
    let mut announced = false;
    loop {
      match BuilderLock::try_acquire(&self.lock_dir, name) {
        Ok(lock) => return Ok(lock),
        Err(err) if err.is_contention() => {
          if !announced {
            info!(builder = %name, "{err}; waiting");
            announced = true;
          }
          tokio::select! {
            _ = tokio::time::sleep(LOCK_RETRY) => {}
            _ = cancel.cancelled() => {
              return Err(SandboxError::Interrupted {
                operation: format!("waiting for builder lock {name}"),
              });
            }
          }
        }
        Err(err) => return Err(err.into()),
      }
    }
  }
}
