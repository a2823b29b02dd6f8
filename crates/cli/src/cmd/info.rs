use std::path::Path;

use anyhow::Result;
use serde::Serialize;

use taskwell_lib::config::HostFacts;
use taskwell_lib::platform::Platform;
use taskwell_lib::platform::paths::cache_dir;

use crate::output::{print_json, print_stat};

#[derive(Serialize)]
struct Info {
  version: &'static str,
  platform: Option<String>,
  root: String,
  cache_dir: String,
  host: HostFacts,
}

pub fn cmd_info(root: &Path, json: bool) -> Result<()> {
  let host = super::runtime()?.block_on(HostFacts::probe(root));
  let info = Info {
    version: env!("CARGO_PKG_VERSION"),
    platform: Platform::current().map(|p| p.qualified()),
    root: root.display().to_string(),
    cache_dir: cache_dir().display().to_string(),
    host,
  };

  if json {
    return print_json(&info);
  }

  println!("taskwell v{}", info.version);
  print_stat("Platform", info.platform.as_deref().unwrap_or("unknown"));
  print_stat("Project root", &info.root);
  print_stat("Cache", &info.cache_dir);
  print_stat("Toolchain arch", info.host.toolchain_arch.as_deref().unwrap_or("unknown"));
  print_stat("Version file", info.host.version_file.as_deref().unwrap_or("-"));
  print_stat("Commit", info.host.commit.as_deref().unwrap_or("-"));
  print_stat("In sandbox", &info.host.in_sandbox.to_string());

  Ok(())
}
