//! CLI module
//!
//! - `validate`: check a coordinator config file
//! - `simulate`: exercise the barrier against the simulated store
//!
//! All output is one JSON object on stdout; errors also end with a non-zero
//! exit code.

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{parse_scenarios, run, run_command, simulate, validate};
pub use errors::{CliError, CliResult};
