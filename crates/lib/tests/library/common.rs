//! Shared helpers for library integration tests.
//!
//! A [`Project`] is a throwaway project root holding executable scripts at
//! the paths the built-in tasks call, plus a scripted container engine that
//! records its arguments and runs sandboxed bodies on the host.

#![allow(dead_code)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use taskwell_lib::config::{ConfigSnapshot, HostFacts, Overrides, builtin_options, resolve};
use taskwell_lib::execute::{ExecuteError, Orchestrator, RunReport};
use taskwell_lib::sandbox::BuilderManager;
use taskwell_lib::task::TaskRegistry;
use tempfile::TempDir;

const ENGINE: &str = r#"#!/bin/sh
state="__STATE__"
echo "$*" >> "$state/calls.log"
[ -f "$state/engine-down" ] && { echo "cannot connect" >&2; exit 1; }
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

pub struct Project {
  pub temp: TempDir,
}

impl Project {
  pub fn new() -> Self {
    let temp = TempDir::new().unwrap();
    std::fs::create_dir_all(temp.path().join("engine-state")).unwrap();
    let project = Self { temp };
    project.write_script(
      "engine",
      &ENGINE.replace("__STATE__", &project.path().join("engine-state").display().to_string()),
    );
    project
  }

  pub fn path(&self) -> &Path {
    self.temp.path()
  }

  /// Write an executable `/bin/sh` script relative to the project root.
  pub fn write_script(&self, relative: &str, body: &str) {
    let path = self.path().join(relative);
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

  /// A script that appends `<name> $ARCH` to `run.log`, then runs `extra`.
  pub fn logging_script(&self, relative: &str, name: &str, extra: &str) {
    self.write_script(relative, &format!("echo \"{name} $ARCH\" >> run.log\n{extra}"));
  }

  pub fn engine_program(&self) -> String {
    self.path().join("engine").display().to_string()
  }

  pub fn engine_flag(&self, flag: &str) {
    std::fs::write(self.path().join("engine-state").join(flag), "").unwrap();
  }

  pub fn engine_calls(&self) -> Vec<String> {
    read_lines(&self.path().join("engine-state").join("calls.log"))
  }

  pub fn run_log(&self) -> Vec<String> {
    read_lines(&self.path().join("run.log"))
  }

  pub fn lock_dir(&self) -> PathBuf {
    self.path().join("locks")
  }

  /// Resolve the built-in options with the fake engine and `pairs` as overrides.
  pub fn snapshot(&self, pairs: &[(&str, &str)]) -> ConfigSnapshot {
    let mut overrides = Overrides::new();
    overrides.insert("CONTAINER_ENGINE".to_string(), self.engine_program());
    for (k, v) in pairs {
      overrides.insert(k.to_string(), v.to_string());
    }
    resolve(&builtin_options(), &overrides, &host()).unwrap()
  }

  pub async fn run(&self, registry: &TaskRegistry, task: &str, pairs: &[(&str, &str)]) -> Result<RunReport, ExecuteError> {
    Orchestrator::new(registry, self.snapshot(pairs), &HostFacts::default(), self.path())
      .with_builders(BuilderManager::new(self.lock_dir()))
      .run(task)
      .await
  }
}

pub fn host() -> HostFacts {
  HostFacts {
    toolchain_arch: Some("amd64".to_string()),
    version_file: Some("v0.3.0".to_string()),
    commit: Some("abc1234".to_string()),
    in_sandbox: false,
  }
}

fn read_lines(path: &Path) -> Vec<String> {
  std::fs::read_to_string(path)
    .unwrap_or_default()
    .lines()
    .map(str::to_string)
    .collect()
}
