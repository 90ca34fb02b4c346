//! CLI command implementations
//!
//! - validate: load a config file, report the effective values
//! - simulate: run canonical barrier scenarios against the simulated store

use std::path::Path;

use serde_json::json;

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};
use super::io::{write_error, write_response};
use crate::config::CoordinatorConfig;
use crate::observability::{Event, Logger};
use crate::sim::{run_scenario, Scenario, ScenarioReport};

/// Parse arguments and run the selected command.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(cli.command)
}

pub fn run_command(cmd: Command) -> CliResult<()> {
    let outcome = match cmd {
        Command::Validate { config } => validate(&config),
        Command::Simulate { config, scenario } => simulate(config.as_deref(), &scenario),
    };
    if let Err(ref e) = outcome {
        write_error(e.code(), &e.to_string())?;
    }
    outcome
}

fn load_config(path: &Path) -> CliResult<CoordinatorConfig> {
    let path_field = path.display().to_string();
    match CoordinatorConfig::load(path) {
        Ok(config) => {
            Logger::set_min_severity(config.log_level);
            Logger::info(Event::ConfigLoaded, &[("path", path_field.as_str())]);
            Ok(config)
        }
        Err(e) => {
            let reason = e.to_string();
            Logger::error(
                Event::ConfigRejected,
                &[("path", path_field.as_str()), ("reason", reason.as_str())],
            );
            Err(e.into())
        }
    }
}

/// Validate a configuration file.
pub fn validate(config_path: &Path) -> CliResult<()> {
    let config = load_config(config_path)?;
    write_response(json!({
        "config": serde_json::to_value(&config)?,
        "path": config_path.display().to_string(),
    }))
}

/// Resolve a scenario argument.
pub fn parse_scenarios(arg: &str) -> CliResult<Vec<Scenario>> {
    if arg == "all" {
        return Ok(Scenario::ALL.to_vec());
    }
    arg.parse::<Scenario>()
        .map(|s| vec![s])
        .map_err(CliError::UnknownScenario)
}

/// Run scenarios and print their reports.
pub fn simulate(config_path: Option<&Path>, scenario: &str) -> CliResult<()> {
    let scenarios = parse_scenarios(scenario)?;
    let config = match config_path {
        Some(path) => load_config(path)?,
        None => CoordinatorConfig::default(),
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::Runtime(e.to_string()))?;

    let reports: Vec<ScenarioReport> = runtime.block_on(async {
        let mut reports = Vec::with_capacity(scenarios.len());
        for scenario in scenarios {
            reports.push(run_scenario(scenario, &config).await);
        }
        reports
    });

    write_response(json!({ "scenarios": serde_json::to_value(&reports)? }))
}
