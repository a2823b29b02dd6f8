use taskwell_lib::consts::EXIT_RESOLUTION;
use taskwell_lib::execute::{ExecuteError, ExecutionStrategy};
use taskwell_lib::task::project::builtin_registry;

use super::common::Project;

#[tokio::test]
async fn verify_runs_each_prerequisite_once() {
  let project = Project::new();
  project.logging_script("build/lint.sh", "lint", "");
  project.logging_script("build/test.sh", "test", "");
  let registry = builtin_registry().unwrap();

  let report = project
    .run(&registry, "verify", &[("USE_SANDBOX", "false")])
    .await
    .unwrap();

  assert_eq!(project.run_log(), vec!["lint amd64", "test amd64"]);
  let names: Vec<_> = report.executed.iter().map(|t| t.name.as_str()).collect();
  assert_eq!(names, vec!["lint", "test", "verify"]);
}

#[tokio::test]
async fn direct_test_sees_snapshot_without_touching_engine() {
  let project = Project::new();
  project.write_script("build/test.sh", "echo \"$ARCH|$TAG|$FOCUS|$USE_SANDBOX\" >> run.log");
  let registry = builtin_registry().unwrap();

  let report = project
    .run(&registry, "test", &[("USE_SANDBOX", "false"), ("FOCUS", "Ingress")])
    .await
    .unwrap();

  assert_eq!(project.run_log(), vec!["amd64|v0.3.0|Ingress|false"]);
  assert_eq!(report.executed[0].strategy, ExecutionStrategy::Direct);
  assert!(project.engine_calls().is_empty());
}

#[tokio::test]
async fn sandboxed_build_feeds_host_image_build() {
  let project = Project::new();
  project.write_script(
    "build/build.sh",
    "echo \"build $ARCH sandbox=$TASKWELL_IN_SANDBOX\" >> run.log",
  );
  project.logging_script("test/e2e/run.sh", "e2e", "");
  let registry = builtin_registry().unwrap();

  let report = project.run(&registry, "e2e-test", &[]).await.unwrap();

  assert_eq!(project.run_log(), vec!["build amd64 sandbox=1", "e2e amd64"]);

  let strategies: Vec<_> = report.executed.iter().map(|t| (t.name.as_str(), t.strategy)).collect();
  assert_eq!(
    strategies,
    vec![
      ("build", ExecutionStrategy::Sandboxed),
      ("image", ExecutionStrategy::Direct),
      ("e2e-test", ExecutionStrategy::Direct),
    ]
  );

  let calls = project.engine_calls();
  assert_eq!(calls[0], "info");
  assert!(calls[1].starts_with("run --rm -v "));
  assert!(
    calls
      .iter()
      .any(|c| c.starts_with("build --platform linux/amd64") && c.ends_with("-t localhost:5000/controller-amd64:v0.3.0 rootfs"))
  );
}

#[tokio::test]
async fn failing_command_stops_the_run() {
  let project = Project::new();
  project.logging_script("build/lint.sh", "lint", "exit 3");
  project.logging_script("build/test.sh", "test", "");
  let registry = builtin_registry().unwrap();

  let err = project
    .run(&registry, "verify", &[("USE_SANDBOX", "false")])
    .await
    .unwrap_err();

  assert!(matches!(err, ExecuteError::TaskFailed { ref task, code: Some(3) } if task == "lint"));
  assert_eq!(err.exit_code(), 3);
  assert_eq!(project.run_log(), vec!["lint amd64"]);
}

#[tokio::test]
async fn unknown_task_has_distinct_exit_code() {
  let project = Project::new();
  let registry = builtin_registry().unwrap();

  let err = project.run(&registry, "unknown-task", &[]).await.unwrap_err();

  assert!(matches!(err, ExecuteError::UnknownTask { ref name, .. } if name == "unknown-task"));
  assert_eq!(err.exit_code(), EXIT_RESOLUTION);
  assert!(project.engine_calls().is_empty());
}

#[tokio::test]
async fn missing_script_is_a_spawn_error() {
  let project = Project::new();
  let registry = builtin_registry().unwrap();

  let err = project
    .run(&registry, "lint", &[("USE_SANDBOX", "false")])
    .await
    .unwrap_err();

  assert!(matches!(err, ExecuteError::Spawn { .. }));
  assert_eq!(err.exit_code(), 127);
}

#[tokio::test]
async fn clean_removes_arch_output_on_host() {
  let project = Project::new();
  std::fs::create_dir_all(project.path().join("rootfs/bin/arm64")).unwrap();
  std::fs::write(project.path().join("rootfs/bin/arm64/controller"), "").unwrap();
  std::fs::create_dir_all(project.path().join("rootfs/bin/amd64")).unwrap();
  let registry = builtin_registry().unwrap();

  project.run(&registry, "clean", &[("ARCH", "arm64")]).await.unwrap();

  assert!(!project.path().join("rootfs/bin/arm64").exists());
  assert!(project.path().join("rootfs/bin/amd64").exists());
  assert!(project.engine_calls().is_empty());
}
