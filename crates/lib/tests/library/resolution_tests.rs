use proptest::prelude::*;
use taskwell_lib::config::{ConfigError, HostFacts, Overrides, builtin_options, resolve};

use super::common::{Project, host};

#[test]
fn arch_follows_host_toolchain() {
  let host = HostFacts {
    toolchain_arch: Some("arm64".to_string()),
    ..Default::default()
  };

  let snapshot = resolve(&builtin_options(), &Overrides::new(), &host).unwrap();

  assert_eq!(snapshot.get_str("ARCH"), "arm64");
}

#[test]
fn unresolvable_arch_is_missing() {
  let err = resolve(&builtin_options(), &Overrides::new(), &HostFacts::default()).unwrap_err();
  assert_eq!(
    err,
    ConfigError::Missing {
      option: "ARCH".to_string()
    }
  );
}

#[test]
fn bad_platforms_fail_before_anything_runs() {
  let project = Project::new();
  project.logging_script("build/build.sh", "build", "");

  let mut overrides = Overrides::new();
  overrides.insert("PLATFORMS".to_string(), "amd64 mips".to_string());
  let err = resolve(&builtin_options(), &overrides, &host()).unwrap_err();

  assert!(matches!(err, ConfigError::Invalid { ref option, .. } if option == "PLATFORMS"));
  assert!(project.run_log().is_empty());
}

fn option_names() -> Vec<&'static str> {
  builtin_options().iter().map(|o| o.name).collect()
}

fn arb_overrides() -> impl Strategy<Value = Overrides> {
  let names = option_names();
  prop::collection::btree_map(
    prop::sample::select(names),
    prop_oneof![
      Just(String::new()),
      Just("true".to_string()),
      Just("amd64 arm64".to_string()),
      "[a-z0-9./:-]{1,12}",
    ],
    0..8,
  )
  .prop_map(|m| m.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
}

proptest! {
  #[test]
  fn resolution_is_deterministic(overrides in arb_overrides(), arch in prop::option::of("[a-z0-9]{1,8}")) {
    let host = HostFacts {
      toolchain_arch: arch,
      ..Default::default()
    };

    let first = resolve(&builtin_options(), &overrides, &host);
    let second = resolve(&builtin_options(), &overrides, &host);

    prop_assert_eq!(first, second);
  }

  #[test]
  fn non_empty_override_always_wins(value in "[a-z][a-z0-9]{0,10}") {
    let mut overrides = Overrides::new();
    overrides.insert("IMAGE_NAME".to_string(), value.clone());

    let snapshot = resolve(&builtin_options(), &overrides, &host()).unwrap();

    prop_assert_eq!(snapshot.get_str("IMAGE_NAME"), value.clone());
    prop_assert_eq!(snapshot.get_str("IMAGE"), format!("localhost:5000/{value}"));
  }
}
