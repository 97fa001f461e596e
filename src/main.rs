use mapf_cbs::config::{Cli, Config};
use mapf_cbs::scenario::Scenario;
use mapf_cbs::solver::{self, SearchOutcome};

use anyhow::Context;
use clap::Parser;
use std::fs;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
    let cli = Cli::parse();

    let config = if let Some(config_file) = cli.config.as_ref() {
        let config_str = fs::read_to_string(config_file)
            .with_context(|| format!("failed to read config file: {config_file}"))?;
        Config::from_yaml_str(&config_str)
            .with_context(|| format!("error with config file: {config_file}"))?
    } else {
        info!("No config file specified, using default config");
        Config::default()
    }
    .override_from_command_line(&cli)?;

    let scenario = Scenario::load_from_file(&config.instance_path)?;
    let mut solver = solver::from_config(&config, &scenario.map, scenario.agents.clone())
        .context("invalid instance")?;

    match solver.solve() {
        SearchOutcome::Solved(solution) => {
            if !solution.verify(&scenario.map, &scenario.agents) {
                warn!("solution contains conflicts");
            }
            info!("{:?} solution with cost {}", config.solver, solution.cost());
            if let Some(output_path) = &config.output_path {
                let json = serde_json::to_string_pretty(&solution)?;
                fs::write(output_path, json)
                    .with_context(|| format!("failed to write solution to {output_path}"))?;
                info!("Solution written to {output_path}");
            }
        }
        SearchOutcome::Infeasible => error!("{:?} found no solution", config.solver),
        SearchOutcome::LimitReached => error!("{:?} ran out of budget", config.solver),
    }

    Ok(())
}
