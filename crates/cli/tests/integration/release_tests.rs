use predicates::prelude::*;

use super::common::TestEnv;

fn build_script(env: &TestEnv, fail: &str) {
  env.write_script(
    "build/build.sh",
    &format!(
      r#"echo "build $ARCH" >> run.log
case " {fail} " in *" $ARCH "*) exit 9 ;; esac
mkdir -p "$OUTPUT_DIR/$ARCH" && touch "$OUTPUT_DIR/$ARCH/controller""#
    ),
  );
}

#[test]
fn release_publishes_after_every_platform() {
  let env = TestEnv::new();
  build_script(&env, "");

  env
    .cmd()
    .args(["run", "release", "USE_SANDBOX=false", "PLATFORMS=amd64 arm64 s390x"])
    .assert()
    .success()
    .stdout(predicate::str::contains("linux/s390x rootfs/bin/s390x/controller"))
    .stdout(predicate::str::contains("release published"));

  assert_eq!(env.run_log(), vec!["build amd64", "build arm64", "build s390x"]);
  let publishes: Vec<_> = env
    .engine_calls()
    .into_iter()
    .filter(|c| c.starts_with("buildx build"))
    .collect();
  assert_eq!(publishes.len(), 1);
  assert!(publishes[0].contains("--platform linux/amd64,linux/arm64,linux/s390x"));
  assert!(publishes[0].contains("-t localhost:5000/controller:1.0.0-dev"));
}

#[test]
fn failed_platform_stops_release_with_its_exit_code() {
  let env = TestEnv::new();
  build_script(&env, "amd64");

  env
    .cmd()
    .args(["run", "release", "USE_SANDBOX=false", "PLATFORMS=amd64 arm64"])
    .assert()
    .code(9)
    .stderr(predicate::str::contains("task 'build' failed"));

  assert_eq!(env.run_log(), vec!["build amd64"]);
  assert!(!env.engine_calls().iter().any(|c| c.starts_with("buildx build")));
}

#[test]
fn ensure_builder_is_idempotent_across_runs() {
  let env = TestEnv::new();

  env.cmd().args(["run", "ensure-builder"]).assert().success();
  env.cmd().args(["run", "ensure-builder"]).assert().success();

  let calls = env.engine_calls();
  assert_eq!(calls.iter().filter(|c| c.starts_with("buildx create")).count(), 1);
  assert_eq!(calls.iter().filter(|c| c.starts_with("run --rm --privileged")).count(), 1);
}
