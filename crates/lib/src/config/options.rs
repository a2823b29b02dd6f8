//! The options a project invocation understands.

use std::collections::BTreeMap;

use super::host::HostFacts;
use super::types::{OptionKind, OptionValue};
use crate::platform::os::Os;
use crate::platform::parse_platforms;

/// Options resolved so far, visible to derivation rules of later options.
pub type Resolved = BTreeMap<String, OptionValue>;

/// Computes a value from already-resolved options and host facts.
pub type Derivation = fn(&Resolved, &HostFacts) -> Option<String>;

/// Checks a parsed value, returning the reason it is rejected.
pub type Validation = fn(&OptionValue) -> Result<(), String>;

/// Declaration of one tunable.
#[derive(Debug, Clone)]
pub struct OptionSpec {
  pub name: &'static str,
  pub kind: OptionKind,
  pub description: &'static str,
  pub default: Option<&'static str>,
  pub derive: Option<Derivation>,
  pub validate: Option<Validation>,
  pub mandatory: bool,
}

impl OptionSpec {
  const fn new(name: &'static str, kind: OptionKind, description: &'static str) -> Self {
    Self {
      name,
      kind,
      description,
      default: None,
      derive: None,
      validate: None,
      mandatory: false,
    }
  }

  const fn default(mut self, value: &'static str) -> Self {
    self.default = Some(value);
    self
  }

  const fn derive(mut self, rule: Derivation) -> Self {
    self.derive = Some(rule);
    self
  }

  const fn validate(mut self, check: Validation) -> Self {
    self.validate = Some(check);
    self
  }

  const fn mandatory(mut self) -> Self {
    self.mandatory = true;
    self
  }
}

fn host_arch(_: &Resolved, host: &HostFacts) -> Option<String> {
  host.toolchain_arch.clone()
}

fn version_file(_: &Resolved, host: &HostFacts) -> Option<String> {
  host.version_file.clone()
}

fn commit(_: &Resolved, host: &HostFacts) -> Option<String> {
  host.commit.clone()
}

fn image(resolved: &Resolved, _: &HostFacts) -> Option<String> {
  let registry = resolved.get("REGISTRY")?.render();
  let name = resolved.get("IMAGE_NAME")?.render();
  Some(format!("{registry}/{name}"))
}

fn target_os(value: &OptionValue) -> Result<(), String> {
  value.render().parse::<Os>().map(|_| ())
}

fn builder_name(value: &OptionValue) -> Result<(), String> {
  let name = value.render();
  let valid = name
    .chars()
    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    && name.starts_with(|c: char| c.is_ascii_alphanumeric());
  if valid {
    Ok(())
  } else {
    Err("builder names use letters, digits, '-', '_' and '.', starting with a letter or digit".to_string())
  }
}

fn platform_list(value: &OptionValue) -> Result<(), String> {
  let OptionValue::List(entries) = value else {
    return Ok(());
  };
  parse_platforms(entries.iter().map(String::as_str)).map(|_| ())
}

fn buildx_platforms(resolved: &Resolved, _: &HostFacts) -> Option<String> {
  let OptionValue::List(entries) = resolved.get("PLATFORMS")? else {
    return None;
  };
  let platforms = parse_platforms(entries.iter().map(String::as_str)).ok()?;
  Some(platforms.iter().map(|p| p.qualified()).collect::<Vec<_>>().join(","))
}

/// Options in resolution order. Derivations only read options declared
/// above them.
pub fn builtin_options() -> Vec<OptionSpec> {
  use OptionKind::*;

  vec![
    OptionSpec::new("ARCH", Str, "Target architecture for single-target tasks")
      .derive(host_arch)
      .mandatory(),
    OptionSpec::new("TARGET_OS", Str, "Target operating system for single-target tasks")
      .default("linux")
      .validate(target_os)
      .mandatory(),
    OptionSpec::new("TAG", Str, "Version label of produced artifacts")
      .derive(version_file)
      .default("1.0.0-dev")
      .mandatory(),
    OptionSpec::new("COMMIT_SHA", Str, "Source revision stamped into artifacts")
      .derive(commit)
      .default("git-unknown"),
    OptionSpec::new("REGISTRY", Str, "Registry prefix artifacts are addressed by")
      .default("localhost:5000")
      .mandatory(),
    OptionSpec::new("IMAGE_NAME", Str, "Image repository name under the registry")
      .default("controller")
      .mandatory(),
    OptionSpec::new("IMAGE", Str, "Full image reference without tag")
      .derive(image)
      .mandatory(),
    OptionSpec::new("BASE_IMAGE", Str, "Base image for the controller image").default("docker.io/library/alpine:3.20"),
    OptionSpec::new("USE_SANDBOX", Bool, "Run actions inside the build sandbox").default("true"),
    OptionSpec::new("PLATFORMS", List, "Release targets, in order")
      .default("amd64 arm arm64 s390x")
      .validate(platform_list)
      .mandatory(),
    OptionSpec::new("BUILDX_PLATFORMS", Str, "Release targets in os/arch form")
      .derive(buildx_platforms)
      .mandatory(),
    OptionSpec::new("OUTPUT_DIR", Str, "Directory receiving per-architecture binaries")
      .default("rootfs/bin")
      .mandatory(),
    OptionSpec::new("CONTAINER_ENGINE", Str, "Container engine CLI")
      .default("docker")
      .mandatory(),
    OptionSpec::new("SANDBOX_IMAGE", Str, "Image sandboxed actions run in")
      .default("docker.io/library/golang:1.22")
      .mandatory(),
    OptionSpec::new("SANDBOX_WORKDIR", Str, "Mount point of the project inside the sandbox")
      .default("/workspace")
      .mandatory(),
    OptionSpec::new("BUILDER_NAME", Str, "Name of the multi-platform builder")
      .default("taskwell")
      .validate(builder_name)
      .mandatory(),
    OptionSpec::new("EMULATOR_IMAGE", Str, "Image registering binfmt emulators")
      .default("docker.io/multiarch/qemu-user-static:latest")
      .mandatory(),
    OptionSpec::new("FOCUS", Str, "Test filter passed to test suites").default(""),
    OptionSpec::new("E2E_NODES", Str, "Parallel e2e test nodes").default("6"),
  ]
}
