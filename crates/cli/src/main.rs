mod cmd;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use taskwell_lib::config::ConfigError;
use taskwell_lib::consts::EXIT_RESOLUTION;
use taskwell_lib::execute::ExecuteError;

use crate::output::print_error;

/// taskwell - build, test and release orchestration
#[derive(Parser)]
#[command(name = "taskwell")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Project root (default: current directory)
  #[arg(short = 'C', long = "chdir", global = true, value_name = "DIR")]
  chdir: Option<PathBuf>,

  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Run a task and its prerequisites
  Run {
    /// Task to run
    task: String,

    /// Option overrides
    #[arg(value_name = "KEY=VALUE")]
    overrides: Vec<String>,

    /// Output the run report as JSON
    #[arg(long)]
    json: bool,
  },

  /// Show what a run would execute, without executing it
  Plan {
    /// Task to plan
    task: String,

    /// Option overrides
    #[arg(value_name = "KEY=VALUE")]
    overrides: Vec<String>,

    #[arg(long)]
    json: bool,
  },

  /// List available tasks (default)
  List {
    #[arg(long)]
    json: bool,
  },

  /// Show the resolved configuration
  Config {
    /// Option overrides
    #[arg(value_name = "KEY=VALUE")]
    overrides: Vec<String>,

    #[arg(long)]
    json: bool,
  },

  /// Show host information
  Info {
    #[arg(long)]
    json: bool,
  },
}

fn main() -> ExitCode {
  let cli = Cli::parse();

  let filter = EnvFilter::try_from_default_env()
    .unwrap_or_else(|_| EnvFilter::new(if cli.verbose { "debug" } else { "info" }));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  match dispatch(cli) {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      print_error(&format!("{err:#}"));
      ExitCode::from(u8::try_from(exit_code(&err)).unwrap_or(1))
    }
  }
}

fn dispatch(cli: Cli) -> Result<()> {
  let root = project_root(cli.chdir)?;

  match cli.command.unwrap_or(Commands::List { json: false }) {
    Commands::Run { task, overrides, json } => cmd::cmd_run(&root, &task, &overrides, json),
    Commands::Plan { task, overrides, json } => cmd::cmd_plan(&root, &task, &overrides, json),
    Commands::List { json } => cmd::cmd_list(json),
    Commands::Config { overrides, json } => cmd::cmd_config(&root, &overrides, json),
    Commands::Info { json } => cmd::cmd_info(&root, json),
  }
}

fn project_root(chdir: Option<PathBuf>) -> Result<PathBuf> {
  let dir = match chdir {
    Some(dir) => dir,
    None => std::env::current_dir().context("Failed to read current directory")?,
  };
  dunce::canonicalize(&dir).with_context(|| format!("Project root not found: {}", dir.display()))
}

fn exit_code(err: &anyhow::Error) -> i32 {
  if let Some(err) = err.downcast_ref::<ExecuteError>() {
    return err.exit_code();
  }
  if err.downcast_ref::<ConfigError>().is_some() {
    return EXIT_RESOLUTION;
  }
  1
}
