//! Thin wrapper over the container engine CLI.

use std::collections::BTreeMap;
use std::path::PathBuf;

use semver::Version;
use tracing::debug;

use super::{BuilderSpec, BuilderState, SandboxError};
use crate::consts::MIN_ENGINE_VERSION;
use crate::execute::cancel::CancelSignal;
use crate::execute::process::{Captured, Invocation, RunStatus, capture};

/// What the builder capability probe demands of the host.
pub const BUILDX_CAPABILITY: &str = "buildx on a container engine >= 19.03";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Engine {
  pub program: String,
  pub cwd: PathBuf,
}

impl Engine {
  pub fn new(program: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
    Self {
      program: program.into(),
      cwd: cwd.into(),
    }
  }

  pub fn invocation<I, S>(&self, args: I) -> Invocation
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Invocation {
      program: self.program.clone(),
      args: args.into_iter().map(Into::into).collect(),
      env: BTreeMap::new(),
      cwd: self.cwd.clone(),
      container: None,
    }
  }

  /// Run an engine subcommand with captured output.
  ///
  /// An engine that cannot be spawned is unavailable; a non-zero exit is
  /// returned to the caller to interpret.
  pub async fn exec(&self, args: &[&str], cancel: &mut CancelSignal) -> Result<Captured, SandboxError> {
    let invocation = self.invocation(args.iter().copied());
    let captured = capture(&invocation, cancel)
      .await
      .map_err(|e| SandboxError::Unavailable {
        engine: self.program.clone(),
        reason: e.to_string(),
      })?;

    if captured.status == RunStatus::Cancelled {
      return Err(SandboxError::Interrupted {
        operation: invocation.command_line(),
      });
    }
    Ok(captured)
  }

  /// Fail unless the engine answers `info`.
  pub async fn check_reachable(&self, cancel: &mut CancelSignal) -> Result<(), SandboxError> {
    let captured = self.exec(&["info"], cancel).await?;
    if !captured.success() {
      return Err(SandboxError::Unavailable {
        engine: self.program.clone(),
        reason: failure_reason(&captured),
      });
    }
    debug!(engine = %self.program, "container engine reachable");
    Ok(())
  }

  /// Force-remove a container whose client was killed. Not cancellable.
  pub async fn remove_container(&self, name: &str) -> Result<(), SandboxError> {
    let captured = self.exec(&["rm", "-f", name], &mut CancelSignal::never()).await?;
    if !captured.success() {
      return Err(SandboxError::Unavailable {
        engine: self.program.clone(),
        reason: failure_reason(&captured),
      });
    }
    debug!(engine = %self.program, container = name, "removed container");
    Ok(())
  }

  /// Require buildx and a recent enough engine server.
  pub async fn probe_capability(&self, cancel: &mut CancelSignal) -> Result<Version, SandboxError> {
    let buildx = self.exec(&["buildx", "version"], cancel).await?;
    if !buildx.success() {
      return Err(unsupported(format!("buildx is not available: {}", failure_reason(&buildx))));
    }

    let version = self
      .exec(&["version", "--format", "{{.Server.Version}}"], cancel)
      .await?;
    if !version.success() {
      return Err(SandboxError::Unavailable {
        engine: self.program.clone(),
        reason: failure_reason(&version),
      });
    }

    let reported = version.stdout.trim();
    let server = parse_engine_version(reported)
      .ok_or_else(|| unsupported(format!("cannot parse engine server version '{reported}'")))?;

    let (major, minor) = MIN_ENGINE_VERSION;
    if server < Version::new(major, minor, 0) {
      return Err(unsupported(format!(
        "engine server version {server} is older than {major}.{minor:02}"
      )));
    }

    debug!(engine = %self.program, version = %server, "engine supports buildx");
    Ok(server)
  }

  /// Observe a builder's state.
  pub async fn inspect(&self, name: &str, cancel: &mut CancelSignal) -> Result<BuilderState, SandboxError> {
    let captured = self.exec(&["buildx", "inspect", name], cancel).await?;
    if !captured.success() {
      return Ok(BuilderState::Absent);
    }
    Ok(state_from_inspect(&captured.stdout))
  }

  /// Register the builder, tolerating one that already exists.
  pub async fn create(&self, spec: &BuilderSpec, cancel: &mut CancelSignal) -> Result<(), SandboxError> {
    let captured = self
      .exec(
        &[
          "buildx",
          "create",
          "--name",
          &spec.name,
          "--driver",
          "docker-container",
          "--platform",
          &spec.platforms,
        ],
        cancel,
      )
      .await?;

    if captured.success() {
      return Ok(());
    }
    let stderr = captured.stderr.to_lowercase();
    if stderr.contains("existing instance") || stderr.contains("already exists") {
      debug!(builder = %spec.name, "builder already registered");
      return Ok(());
    }
    Err(SandboxError::Provisioning {
      name: spec.name.clone(),
      reason: format!("create failed: {}", failure_reason(&captured)),
    })
  }

  /// Register emulators for foreign architectures and boot the builder.
  pub async fn bootstrap(&self, spec: &BuilderSpec, cancel: &mut CancelSignal) -> Result<(), SandboxError> {
    let emulators = self
      .exec(
        &["run", "--rm", "--privileged", &spec.emulator_image, "--reset", "-p", "yes"],
        cancel,
      )
      .await?;
    if !emulators.success() {
      return Err(SandboxError::Provisioning {
        name: spec.name.clone(),
        reason: format!("registering emulators failed: {}", failure_reason(&emulators)),
      });
    }

    let boot = self
      .exec(&["buildx", "inspect", "--bootstrap", &spec.name], cancel)
      .await?;
    if !boot.success() {
      return Err(SandboxError::Provisioning {
        name: spec.name.clone(),
        reason: format!("bootstrap failed: {}", failure_reason(&boot)),
      });
    }
    Ok(())
  }
}

fn unsupported(detail: String) -> SandboxError {
  SandboxError::UnsupportedHostEngine {
    capability: BUILDX_CAPABILITY.to_string(),
    detail,
  }
}

fn failure_reason(captured: &Captured) -> String {
  let stderr = captured.stderr.trim();
  if !stderr.is_empty() {
    return stderr.to_string();
  }
  match captured.status {
    RunStatus::Failed(Some(code)) => format!("exit code {code}"),
    _ => "unknown failure".to_string(),
  }
}

/// `Status: running` on any line means the builder is booted.
pub fn state_from_inspect(output: &str) -> BuilderState {
  let running = output.lines().any(|line| {
    line
      .trim()
      .strip_prefix("Status:")
      .is_some_and(|status| status.trim() == "running")
  });
  if running {
    BuilderState::Bootstrapped
  } else {
    BuilderState::Created
  }
}

/// Parse an engine's self-reported version leniently.
///
/// Engines report things like `24.0.7`, `v20.10.21+dfsg1` or `19.03.12`, the
/// last of which is not valid semver because of the leading zero.
pub fn parse_engine_version(reported: &str) -> Option<Version> {
  let reported = reported.trim();
  let reported = reported.strip_prefix('v').unwrap_or(reported);
  let core = reported
    .split(|c: char| !(c.is_ascii_digit() || c == '.'))
    .next()
    .unwrap_or_default();

  let mut parts = core.split('.').filter(|p| !p.is_empty()).map(str::parse::<u64>);
  let major = parts.next()?.ok()?;
  let minor = parts.next().transpose().ok()?.unwrap_or(0);
  let patch = parts.next().transpose().ok()?.unwrap_or(0);
  Some(Version::new(major, minor, patch))
}
