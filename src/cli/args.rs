//! CLI argument definitions using clap
//!
//! Commands:
//! - aerobarrier validate --config <path>
//! - aerobarrier simulate [--config <path>] [--scenario <name>|all]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// aerobarrier - write barrier and quorum read coordinator
#[derive(Parser, Debug)]
#[command(name = "aerobarrier")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load and validate a coordinator configuration file
    Validate {
        /// Path to configuration file
        #[arg(long, default_value = "./aerobarrier.json")]
        config: PathBuf,
    },

    /// Run barrier scenarios against the in-memory simulated store
    Simulate {
        /// Path to configuration file; defaults are used when omitted
        #[arg(long)]
        config: Option<PathBuf>,

        /// Scenario name, or "all"
        #[arg(long, default_value = "all")]
        scenario: String,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
