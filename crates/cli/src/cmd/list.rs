//! Implementation of the `taskwell list` command, the default when no
//! command is given.

use anyhow::Result;
use owo_colors::{OwoColorize, Stream};

use taskwell_lib::execute::ExecuteError;
use taskwell_lib::task::project::builtin_registry;

use crate::output::print_json;

pub fn cmd_list(json: bool) -> Result<()> {
  let registry = builtin_registry().map_err(ExecuteError::from)?;
  let tasks = registry.list_tasks();

  if json {
    return print_json(&tasks);
  }

  let width = tasks.iter().map(|t| t.name.len()).max().unwrap_or(0);
  println!("Tasks:");
  for task in &tasks {
    let requires = if task.prerequisites.is_empty() {
      String::new()
    } else {
      format!(" (requires {})", task.prerequisites.join(", "))
    };
    let name = format!("{:<width$}", task.name);
    println!(
      "  {}  {}{}",
      name.if_supports_color(Stream::Stdout, |s| s.bold()),
      task.description,
      requires.if_supports_color(Stream::Stdout, |s| s.dimmed()),
    );
  }
  println!();
  println!("Run a task with: taskwell run <TASK> [KEY=VALUE...]");

  Ok(())
}
