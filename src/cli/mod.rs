//! CLI module for aeromodel
//!
//! Provides command-line interface for:
//! - validate: compile model definitions and print their schemas
//! - query: one-shot query over records loaded into a memory connector

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{load_registry, query, run_command, validate};
pub use errors::{CliError, CliResult};
pub use io::{read_json_file, write_json_line};

use crate::config::RuntimeConfig;
use crate::observability::init_logging;

/// Parse arguments, load configuration, install logging and run the command
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    let config = match &cli.config {
        Some(path) => RuntimeConfig::load(path)?,
        None => RuntimeConfig::default(),
    };
    init_logging(&config.log_filter)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    run_command(cli.command, &config, &mut out)
}
