//! CLI argument definitions using clap
//!
//! Commands:
//! - aeromodel validate --definitions <path>
//! - aeromodel query --definitions <path> --model <name> --data <path> [--query <json>]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// aeromodel - schema-driven data models over pluggable connectors
#[derive(Parser, Debug)]
#[command(name = "aeromodel")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to a runtime configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile model definitions and print each compiled schema
    Validate {
        /// Model definitions file; defaults to the config's `definitions`
        #[arg(long)]
        definitions: Option<PathBuf>,
    },

    /// Load records into an in-memory connector and run a query against them
    Query {
        /// Model definitions file; defaults to the config's `definitions`
        #[arg(long)]
        definitions: Option<PathBuf>,

        /// Name of the model to query
        #[arg(long)]
        model: String,

        /// JSON array of records to load
        #[arg(long)]
        data: PathBuf,

        /// Query description as JSON, e.g. '{"where": {"age": {"$gte": 30}}}'
        #[arg(long)]
        query: Option<String>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
