//! Host facts: every impure input to configuration resolution.
//!
//! Facts are gathered once, before resolution, so that `resolve` itself is a
//! pure function of its arguments.

use std::path::Path;

use serde::Serialize;
use tokio::process::Command;
use tracing::debug;

use crate::consts::IN_SANDBOX_ENV;
use crate::platform::arch::Arch;

/// Facts about the host used by derivation rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HostFacts {
  /// Architecture reported by the host toolchain (`go env GOARCH`).
  pub toolchain_arch: Option<String>,
  /// Contents of the project's `TAG` file.
  pub version_file: Option<String>,
  /// Short commit of the project checkout.
  pub commit: Option<String>,
  /// The orchestrator already runs inside a sandbox.
  pub in_sandbox: bool,
}

impl HostFacts {
  /// Probe the host for the project rooted at `root`.
  pub async fn probe(root: &Path) -> Self {
    let toolchain_arch = match command_output("go", &["env", "GOARCH"], root).await {
      Some(arch) => Some(arch),
      None => Arch::current().map(|a| a.as_str().to_string()),
    };

    let version_file = tokio::fs::read_to_string(root.join("TAG"))
      .await
      .ok()
      .map(|s| s.trim().to_string())
      .filter(|s| !s.is_empty());

    let commit = command_output("git", &["rev-parse", "--short", "HEAD"], root).await;

    let facts = Self {
      toolchain_arch,
      version_file,
      commit,
      in_sandbox: in_sandbox_from_env(),
    };
    debug!(?facts, "probed host facts");
    facts
  }
}

/// Whether the sandbox context flag is set in the current environment.
pub fn in_sandbox_from_env() -> bool {
  std::env::var(IN_SANDBOX_ENV).is_ok_and(|v| !v.trim().is_empty())
}

/// Trimmed stdout of a successful command, `None` if it cannot run or fails.
async fn command_output(program: &str, args: &[&str], cwd: &Path) -> Option<String> {
  let output = Command::new(program).args(args).current_dir(cwd).output().await.ok()?;
  if !output.status.success() {
    debug!(program, ?args, code = ?output.status.code(), "host probe failed");
    return None;
  }
  let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
  (!stdout.is_empty()).then_some(stdout)
}
