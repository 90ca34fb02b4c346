//! CLI-specific error types
//!
//! Every CLI error ends the process with a non-zero exit code.

use std::io;

use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("AERO_CLI_CONFIG_ERROR: {0}")]
    Config(#[from] ConfigError),

    #[error("AERO_CLI_UNKNOWN_SCENARIO: {0}")]
    UnknownScenario(String),

    #[error("AERO_CLI_RUNTIME_ERROR: {0}")]
    Runtime(String),

    #[error("AERO_CLI_IO_ERROR: {0}")]
    Io(#[from] io::Error),

    #[error("AERO_CLI_IO_ERROR: JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "AERO_CLI_CONFIG_ERROR",
            Self::UnknownScenario(_) => "AERO_CLI_UNKNOWN_SCENARIO",
            Self::Runtime(_) => "AERO_CLI_RUNTIME_ERROR",
            Self::Io(_) | Self::Json(_) => "AERO_CLI_IO_ERROR",
        }
    }
}

pub type CliResult<T> = Result<T, CliError>;
