//! Implementation of the `taskwell plan` command.
//!
//! Shows the tasks a run would execute and the exact command lines, without
//! executing anything.

use std::path::Path;

use anyhow::Result;
use owo_colors::{OwoColorize, Stream};

use taskwell_lib::execute::{ExecuteError, Orchestrator};
use taskwell_lib::task::project::builtin_registry;

use crate::output::{print_detail, print_info, print_json};

pub fn cmd_plan(root: &Path, task: &str, overrides: &[String], json: bool) -> Result<()> {
  let registry = builtin_registry().map_err(ExecuteError::from)?;

  let steps = super::runtime()?.block_on(async {
    let (snapshot, host) = super::resolve_snapshot(root, overrides).await?;
    Orchestrator::new(&registry, snapshot, &host, root).plan(task)
  })?;

  if json {
    return print_json(&steps);
  }

  for step in &steps {
    print_info(&format!(
      "{} {}",
      step.task,
      format!("[{}, {}]", step.strategy, step.arch).if_supports_color(Stream::Stdout, |s| s.dimmed())
    ));
    if let Some(note) = &step.note {
      print_detail(&note.if_supports_color(Stream::Stdout, |s| s.dimmed()).to_string());
    }
    for command in &step.commands {
      print_detail(command);
    }
  }

  Ok(())
}
