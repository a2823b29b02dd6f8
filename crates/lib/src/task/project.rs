//! Built-in tasks of a container-shipped controller project.
//!
//! Script paths are relative to the project root. The scripts themselves are
//! opaque: they receive the resolved configuration as environment variables.

use super::types::{Action, CommandTemplate, FanOut, RegistryError, TaskDef};
use super::TaskRegistry;

fn cmd<const N: usize>(program: &str, args: [&str; N]) -> CommandTemplate {
  CommandTemplate::new(program, args)
}

pub fn builtin_tasks() -> Vec<TaskDef> {
  vec![
    TaskDef::new("clean", "Remove binaries built for $ARCH")
      .commands(vec![cmd("rm", ["-rf", "$${OUTPUT_DIR}/$${ARCH}"])])
      .host_only(),
    TaskDef::new("build", "Build the controller binary for $ARCH").commands(vec![cmd("build/build.sh", [])]),
    TaskDef::new("image", "Build the container image for $ARCH")
      .requires(["build"])
      .commands(vec![cmd(
        "$${CONTAINER_ENGINE}",
        [
          "build",
          "--platform",
          "$${TARGET_OS}/$${ARCH}",
          "--build-arg",
          "BASE_IMAGE=$${BASE_IMAGE}",
          "--build-arg",
          "TARGETARCH=$${ARCH}",
          "--build-arg",
          "COMMIT_SHA=$${COMMIT_SHA}",
          "-t",
          "$${IMAGE}-$${ARCH}:$${TAG}",
          "rootfs",
        ],
      )])
      .host_only(),
    TaskDef::new("push", "Push the $ARCH image to the registry")
      .requires(["image"])
      .commands(vec![cmd("$${CONTAINER_ENGINE}", ["push", "$${IMAGE}-$${ARCH}:$${TAG}"])])
      .host_only(),
    TaskDef::new("test", "Run unit tests").commands(vec![cmd("build/test.sh", [])]),
    TaskDef::new("lint", "Run linters").commands(vec![cmd("build/lint.sh", [])]),
    TaskDef::new("verify", "Run linters and unit tests").requires(["lint", "test"]),
    TaskDef::new("e2e-test", "Run end-to-end tests against the $ARCH image")
      .requires(["image"])
      .commands(vec![cmd("test/e2e/run.sh", [])])
      .host_only(),
    TaskDef::new("ensure-builder", "Provision the multi-platform image builder")
      .action(Action::EnsureBuilder)
      .host_only(),
    TaskDef::new("release", "Build every platform and publish one multi-platform image")
      .requires(["ensure-builder"])
      .action(Action::FanOut(FanOut {
        task: "build".to_string(),
        artifact: Some("$${OUTPUT_DIR}/$${ARCH}/controller".to_string()),
        publish: vec![cmd(
          "$${CONTAINER_ENGINE}",
          [
            "buildx",
            "build",
            "--builder",
            "$${BUILDER_NAME}",
            "--platform",
            "$${BUILDX_PLATFORMS}",
            "--build-arg",
            "BASE_IMAGE=$${BASE_IMAGE}",
            "--build-arg",
            "COMMIT_SHA=$${COMMIT_SHA}",
            "--push",
            "-t",
            "$${IMAGE}:$${TAG}",
            "rootfs",
          ],
        )],
      }))
      .host_only(),
  ]
}

/// The validated built-in registry.
pub fn builtin_registry() -> Result<TaskRegistry, RegistryError> {
  TaskRegistry::new(builtin_tasks())
}
