//! Implementation of the `taskwell config` command.

use std::path::Path;

use anyhow::Result;
use owo_colors::{OwoColorize, Stream};

use taskwell_lib::config::builtin_options;

use crate::output::print_json;

pub fn cmd_config(root: &Path, overrides: &[String], json: bool) -> Result<()> {
  let (snapshot, _) = super::runtime()?.block_on(super::resolve_snapshot(root, overrides))?;

  if json {
    return print_json(&snapshot);
  }

  // Declaration order, which is also resolution order.
  for spec in builtin_options() {
    let value = snapshot.get_str(spec.name);
    println!(
      "{}={}  {}",
      spec.name,
      value,
      format!("# {}", spec.description).if_supports_color(Stream::Stdout, |s| s.dimmed())
    );
  }

  Ok(())
}
