//! Shared test helpers for CLI integration tests.

#![allow(dead_code)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

/// Stand-in container engine. Records its arguments, runs sandboxed bodies
/// on the host, and fails like a stopped daemon when `engine-down` exists.
const ENGINE: &str = r#"#!/bin/sh
state="$(dirname "$0")/engine-state"
mkdir -p "$state"
echo "$*" >> "$state/calls.log"
[ -f "$state/engine-down" ] && { echo "Cannot connect to the Docker daemon" >&2; exit 1; }
case "$1" in
  version) echo "24.0.7" ;;
  buildx)
    case "$2" in
      create) touch "$state/created" ;;
      inspect)
        if [ "$3" = "--bootstrap" ]; then touch "$state/bootstrapped"; exit 0; fi
        [ -f "$state/created" ] || exit 1
        if [ -f "$state/bootstrapped" ]; then echo "Status: running"; else echo "Status: inactive"; fi ;;
    esac ;;
  run)
    shift
    body=""
    while [ $# -gt 0 ]; do
      case "$1" in
        --privileged) exit 0 ;;
        -e) export "$2"; shift 2 ;;
        -c) body="$2"; shift 2 ;;
        *) shift ;;
      esac
    done
    exec /bin/sh -c "$body" ;;
esac
exit 0
"#;

/// Isolated project directory with its own cache and fake engine.
pub struct TestEnv {
  pub temp: TempDir,
}

impl TestEnv {
  pub fn new() -> Self {
    let env = Self {
      temp: TempDir::new().unwrap(),
    };
    env.write_script("engine", ENGINE);
    env
  }

  pub fn path(&self) -> &Path {
    self.temp.path()
  }

  /// Write an executable script relative to the project root.
  pub fn write_script(&self, relative_path: &str, body: &str) {
    let path = self.path().join(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    let body = if body.starts_with("#!") {
      body.to_string()
    } else {
      format!("#!/bin/sh\n{body}\n")
    };
    std::fs::write(&path, body).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
  }

  pub fn engine_path(&self) -> PathBuf {
    self.path().join("engine")
  }

  pub fn engine_down(&self) {
    let state = self.path().join("engine-state");
    std::fs::create_dir_all(&state).unwrap();
    std::fs::write(state.join("engine-down"), "").unwrap();
  }

  pub fn engine_calls(&self) -> Vec<String> {
    read_lines(&self.path().join("engine-state").join("calls.log"))
  }

  pub fn run_log(&self) -> Vec<String> {
    read_lines(&self.path().join("run.log"))
  }

  /// `taskwell -C <project>` with a clean option environment.
  pub fn cmd(&self) -> Command {
    let mut cmd = cargo_bin_cmd!("taskwell");
    cmd
      .arg("-C")
      .arg(self.path())
      .env("TASKWELL_CACHE_DIR", self.path().join("cache"))
      .env("CONTAINER_ENGINE", self.engine_path())
      .env("ARCH", "amd64")
      .env_remove("TASKWELL_IN_SANDBOX")
      .env_remove("USE_SANDBOX")
      .env_remove("PLATFORMS")
      .env_remove("TAG");
    cmd
  }
}

fn read_lines(path: &Path) -> Vec<String> {
  std::fs::read_to_string(path)
    .unwrap_or_default()
    .lines()
    .map(str::to_string)
    .collect()
}
