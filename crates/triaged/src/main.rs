//! Command line for the `triage` literature pipeline.
//!
//! This crate wraps the `triage` library for use from the shell scripts that drive a
//! literature-triage run. Model calls happen outside; this binary checks what came back and
//! keeps the files and the article store consistent. It supports:
//! - Validating model responses and article records into pass/fail files
//! - Splitting feeds into batches and collecting stage files
//! - Crossref enrichment and reference-manager items
//! - Article store maintenance
//!
//! # Usage
//!
//! ```bash
//! # Write a default configuration and create the article store
//! triage init
//!
//! # First attempt: quarantine unusable responses
//! triage validate screening --articles batch_001.json --response screening.txt
//!
//! # Second attempt on the quarantined articles: abort on anything unusable
//! triage validate screening --articles screening_fail.json --response retry.txt --strict
//!
//! # Which model the second attempt should call
//! triage model screening --attempt 2
//! ```
//!
//! Messages are styled on stdout, logs go to stderr, and verbosity is raised with `-v`.

#![warn(missing_docs, clippy::missing_docs_in_private_items)]

use std::{
  fs,
  path::{Path, PathBuf},
  process::ExitCode,
};

use clap::{builder::ArgAction, Args, Parser, Subcommand};
use console::style;
use serde_json::Value;
use tracing::{debug, trace, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use triage::{
  article::{Article, Item},
  config::Config,
  database::Database,
  enrich::{Enrichment, ReferenceItem, ReferenceNote},
  output::{read_items, write_split},
  prelude::DatabaseInstruction,
  stage::Stage,
};

pub mod commands;
pub mod error;
pub mod interaction;

use crate::{commands::*, error::*, interaction::*};

/// Command line interface configuration and argument parsing
#[derive(Parser)]
#[command(author, version, about = "Validation and retry layer for LLM literature triage")]
pub struct Cli {
  /// Verbose mode (-v, -vv, -vvv) for different levels of logging detail
  #[arg(
        short,
        long,
        action = ArgAction::Count,
        global = true,
        help = "Increase logging verbosity"
    )]
  verbose: u8,

  /// Path to the configuration file. If not specified, uses the default platform-specific
  /// configuration directory.
  #[arg(long, short, global = true)]
  config: Option<PathBuf>,

  /// Path to the article store, overriding the configured one.
  #[arg(long, short, global = true)]
  path: Option<PathBuf>,

  /// Also write logs to a daily-rolling file in this directory
  #[arg(long, global = true)]
  log_dir: Option<PathBuf>,

  /// The subcommand to execute
  #[command(subcommand)]
  command: Commands,

  /// Skip all prompts and accept defaults (mostly for testing)
  #[arg(long, hide = true, global = true)]
  accept_defaults: bool,
}

/// Configures the logging system based on the verbosity level
///
/// The verbosity levels are:
/// - 0: error (default)
/// - 1: warn
/// - 2: info
/// - 3: debug
/// - 4+: trace
///
/// `RUST_LOG` takes precedence. The returned guard flushes the log file and must be held until
/// exit.
fn setup_logging(verbosity: u8, log_dir: Option<&Path>) -> Option<WorkerGuard> {
  let filter = match verbosity {
    0 => "error",
    1 => "warn",
    2 => "info",
    3 => "debug",
    _ => "trace",
  };

  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
  let terminal = fmt::layer()
    .with_writer(std::io::stderr)
    .with_file(true)
    .with_line_number(true)
    .with_target(true);

  match log_dir {
    Some(dir) => {
      let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, "triage.log"));
      let file = fmt::layer().with_writer(writer).with_ansi(false).with_target(true);
      tracing_subscriber::registry().with(filter).with(terminal).with(file).init();
      Some(guard)
    },
    None => {
      tracing_subscriber::registry().with(filter).with(terminal).init();
      None
    },
  }
}

/// Resolves the configuration every command but `init` runs with.
fn load_config(cli: &Cli) -> Result<Config> {
  let path = cli.config.clone().unwrap_or_else(Config::default_path);
  let mut config = Config::load_or_default(&path)?;
  if let Some(database_path) = &cli.path {
    config = config.with_database_path(database_path);
  }
  config.validate()?;
  debug!(config = %path.display(), database = %config.database_path.display(), "Resolved configuration");
  Ok(config)
}

/// Runs the parsed command.
fn run(cli: &Cli) -> Result<()> {
  match cli.command.clone() {
    Commands::Init(options) => init(cli, options),
    Commands::Validate(options) => validate(cli, &load_config(cli)?, options),
    Commands::Batch(options) => batch(cli, &load_config(cli)?, options),
    Commands::Collect(options) => collect(cli, options),
    Commands::Enrich(options) => enrich(cli, options),
    Commands::Store { cmd } => store(cli, &load_config(cli)?, cmd),
    Commands::Reference(options) => reference(cli, options),
    Commands::Model(options) => model(cli, &load_config(cli)?, options),
  }
}

/// Entry point for the `triage` command line.
///
/// Failures are reported on stderr and turn into a non-zero exit status, which is what the
/// driving scripts branch on to schedule the strict retry.
fn main() -> ExitCode {
  let cli = Cli::parse();
  let _guard = setup_logging(cli.verbose, cli.log_dir.as_deref());

  match run(&cli) {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      trace!(error = ?e, "Command failed");
      eprintln!("{} {}", style(ERROR_PREFIX).red(), style(&e).red());
      ExitCode::FAILURE
    },
  }
}
