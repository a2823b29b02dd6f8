use taskwell_lib::config::HostFacts;
use taskwell_lib::execute::{ExecuteError, Orchestrator};
use taskwell_lib::sandbox::BuilderManager;
use taskwell_lib::task::project::builtin_registry;

use super::common::Project;

/// `build/build.sh` that logs, fails for arches listed in `fail`, and
/// otherwise writes the controller binary.
fn build_script(project: &Project, fail: &str) {
  project.write_script(
    "build/build.sh",
    &format!(
      r#"echo "build $ARCH" >> run.log
case " {fail} " in *" $ARCH "*) exit 7 ;; esac
mkdir -p "$OUTPUT_DIR/$ARCH" && touch "$OUTPUT_DIR/$ARCH/controller""#
    ),
  );
}

fn publishes(project: &Project) -> Vec<String> {
  project
    .engine_calls()
    .into_iter()
    .filter(|c| c.starts_with("buildx build"))
    .collect()
}

#[tokio::test]
async fn release_builds_each_platform_and_publishes_once() {
  let project = Project::new();
  build_script(&project, "");
  let registry = builtin_registry().unwrap();

  let report = project
    .run(&registry, "release", &[("USE_SANDBOX", "false"), ("PLATFORMS", "amd64 arm64")])
    .await
    .unwrap();

  assert_eq!(project.run_log(), vec!["build amd64", "build arm64"]);

  let publish = publishes(&project);
  assert_eq!(publish.len(), 1);
  assert_eq!(
    publish[0],
    "buildx build --builder taskwell --platform linux/amd64,linux/arm64 \
     --build-arg BASE_IMAGE=docker.io/library/alpine:3.20 --build-arg COMMIT_SHA=abc1234 \
     --push -t localhost:5000/controller:v0.3.0 rootfs"
  );

  let release = &report.releases[0];
  assert_eq!(release.task, "release");
  assert!(release.published);
  let paths: Vec<_> = release.artifacts.iter().map(|a| a.path.clone().unwrap()).collect();
  assert_eq!(paths, vec!["rootfs/bin/amd64/controller", "rootfs/bin/arm64/controller"]);
  assert!(release.artifacts.iter().all(|a| a.present));
}

#[tokio::test]
async fn amd64_failure_aborts_before_arm64_and_publish() {
  let project = Project::new();
  build_script(&project, "amd64");
  let registry = builtin_registry().unwrap();

  let err = project
    .run(&registry, "release", &[("USE_SANDBOX", "false"), ("PLATFORMS", "amd64 arm64")])
    .await
    .unwrap_err();

  assert!(matches!(err, ExecuteError::TaskFailed { ref task, code: Some(7) } if task == "build"));
  assert_eq!(project.run_log(), vec!["build amd64"]);
  assert!(publishes(&project).is_empty());
}

#[tokio::test]
async fn second_of_four_platforms_failing_stops_the_rest() {
  let project = Project::new();
  build_script(&project, "arm");
  let registry = builtin_registry().unwrap();

  let err = project
    .run(
      &registry,
      "release",
      &[("USE_SANDBOX", "false"), ("PLATFORMS", "amd64 arm arm64 s390x")],
    )
    .await
    .unwrap_err();

  assert_eq!(err.exit_code(), 7);
  assert_eq!(project.run_log(), vec!["build amd64", "build arm"]);
  assert!(publishes(&project).is_empty());
}

#[tokio::test]
async fn sandboxed_release_builds_inside_sandbox() {
  let project = Project::new();
  project.write_script("build/build.sh", "echo \"build $ARCH $TASKWELL_IN_SANDBOX\" >> run.log");
  let registry = builtin_registry().unwrap();

  project
    .run(&registry, "release", &[("PLATFORMS", "arm64 s390x")])
    .await
    .unwrap();

  assert_eq!(project.run_log(), vec!["build arm64 1", "build s390x 1"]);
  let calls = project.engine_calls();
  assert_eq!(calls.iter().filter(|c| *c == "info").count(), 1);
  assert_eq!(calls.iter().filter(|c| c.starts_with("run --rm -v")).count(), 2);
  assert_eq!(publishes(&project).len(), 1);
}

#[tokio::test]
async fn builder_is_provisioned_once_across_invocations() {
  let project = Project::new();
  let registry = builtin_registry().unwrap();
  let snapshot = project.snapshot(&[("USE_SANDBOX", "false")]);

  for _ in 0..2 {
    Orchestrator::new(&registry, snapshot.clone(), &HostFacts::default(), project.path())
      .with_builders(BuilderManager::new(project.lock_dir()))
      .run("ensure-builder")
      .await
      .unwrap();
  }

  let calls = project.engine_calls();
  assert_eq!(calls.iter().filter(|c| c.starts_with("buildx create")).count(), 1);
  assert_eq!(calls.iter().filter(|c| c.starts_with("run --rm --privileged")).count(), 1);
  assert_eq!(calls.iter().filter(|c| *c == "buildx inspect taskwell").count(), 3);
}
