//! Test utilities for taskwell-lib.
//!
//! Cross-platform shell helpers, and a scripted stand-in for the container
//! engine CLI that records every call it receives.

/// Returns the shell command and args to execute a shell script.
#[cfg(unix)]
pub fn shell(script: &str) -> (&'static str, Vec<String>) {
  ("/bin/sh", vec!["-c".to_string(), script.to_string()])
}

#[cfg(windows)]
pub fn shell(script: &str) -> (&'static str, Vec<String>) {
  ("cmd.exe", vec!["/C".to_string(), script.to_string()])
}

#[cfg(unix)]
pub use fake::FakeEngine;

#[cfg(unix)]
mod fake {
  use std::os::unix::fs::PermissionsExt;
  use std::path::{Path, PathBuf};

  use crate::sandbox::Engine;

  /// Behavior is switched by flag files in the state directory:
  /// `engine-down`, `no-buildx`, `create-conflict`, `run-fails-125`, plus the
  /// builder's own `created` and `bootstrapped` markers.
  const SCRIPT: &str = r#"#!/bin/sh
state="__STATE__"
echo "$*" >> "$state/calls.log"
if [ -f "$state/engine-down" ]; then
  echo "Cannot connect to the engine daemon" >&2
  exit 1
fi
case "$1" in
  info) exit 0 ;;
  version)
    if [ -f "$state/server-version" ]; then cat "$state/server-version"; else echo "24.0.7"; fi
    exit 0 ;;
  buildx)
    case "$2" in
      version)
        if [ -f "$state/no-buildx" ]; then echo "'buildx' is not a command" >&2; exit 1; fi
        echo "github.com/docker/buildx v0.12.1"
        exit 0 ;;
      create)
        if [ -f "$state/create-conflict" ]; then
          touch "$state/created"
          echo "ERROR: existing instance for \"$4\" but no append mode" >&2
          exit 1
        fi
        touch "$state/created"
        exit 0 ;;
      inspect)
        if [ "$3" = "--bootstrap" ]; then touch "$state/bootstrapped"; exit 0; fi
        if [ ! -f "$state/created" ]; then echo "ERROR: no builder \"$3\" found" >&2; exit 1; fi
        echo "Name:   $3"
        if [ -f "$state/bootstrapped" ]; then echo "Status: running"; else echo "Status: inactive"; fi
        exit 0 ;;
    esac
    exit 0 ;;
  run)
    if [ -f "$state/run-fails-125" ]; then echo "Unable to find image" >&2; exit 125; fi
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

  pub struct FakeEngine {
    script: PathBuf,
    state: PathBuf,
  }

  impl FakeEngine {
    /// Write the fake engine into `dir`.
    pub fn install(dir: &Path) -> Self {
      let state = dir.join("engine-state");
      std::fs::create_dir_all(&state).unwrap();
      let script = dir.join("fake-engine");
      std::fs::write(&script, SCRIPT.replace("__STATE__", &state.display().to_string())).unwrap();
      std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
      Self { script, state }
    }

    pub fn program(&self) -> String {
      self.script.display().to_string()
    }

    pub fn engine(&self) -> Engine {
      Engine::new(self.program(), self.state.parent().unwrap_or(&self.state))
    }

    pub fn set_flag(&self, name: &str) {
      std::fs::write(self.state.join(name), "").unwrap();
    }

    pub fn set_server_version(&self, version: &str) {
      std::fs::write(self.state.join("server-version"), version).unwrap();
    }

    /// Every argument list the engine saw, in order.
    pub fn calls(&self) -> Vec<String> {
      std::fs::read_to_string(self.state.join("calls.log"))
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
    }
  }
}
