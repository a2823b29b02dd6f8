mod config;
mod info;
mod list;
mod plan;
mod run;

use std::path::Path;

use taskwell_lib::config::{
  ConfigSnapshot, HostFacts, builtin_options, layer, overrides_from_env, parse_overrides, resolve,
};
use taskwell_lib::execute::ExecuteError;

pub use config::cmd_config;
pub use info::cmd_info;
pub use list::cmd_list;
pub use plan::cmd_plan;
pub use run::cmd_run;

/// Probe the host and resolve the snapshot for `root`.
///
/// Command line `KEY=VALUE` arguments win over environment variables.
async fn resolve_snapshot(root: &Path, args: &[String]) -> Result<(ConfigSnapshot, HostFacts), ExecuteError> {
  let specs = builtin_options();
  let cli = parse_overrides(&specs, args)?;
  let overrides = layer(overrides_from_env(&specs, std::env::vars()), cli);

  let host = HostFacts::probe(root).await;
  let snapshot = resolve(&specs, &overrides, &host)?;
  Ok((snapshot, host))
}

fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
  use anyhow::Context;
  tokio::runtime::Runtime::new().context("Failed to create async runtime")
}
