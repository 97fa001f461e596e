use crate::common::Splitting;
use crate::solver::SearchLimits;

use anyhow::anyhow;
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SolverKind {
    #[default]
    Cbs,
    Prioritized,
    Independent,
}

#[derive(Parser, Debug, Default)]
#[command(
    name = "mapf_cbs",
    about = "Conflict-Based Search for multi-agent path finding on grids.",
    version = "0.1"
)]
pub struct Cli {
    #[arg(long, help = "Path to a YAML config file")]
    pub config: Option<String>,

    #[arg(long, help = "Path to the instance file")]
    pub instance_path: Option<String>,

    #[arg(long, help = "Path to write the JSON solution to")]
    pub output_path: Option<String>,

    #[arg(long, value_enum, help = "Solver to use")]
    pub solver: Option<SolverKind>,

    #[arg(long, value_enum, help = "Conflict splitting policy for CBS")]
    pub splitting: Option<Splitting>,

    #[arg(long, help = "Seed for the random number generator")]
    pub seed: Option<u64>,

    #[arg(long, help = "Wall-clock budget for the high-level search")]
    pub time_limit_ms: Option<u64>,

    #[arg(long, help = "Budget of high-level node expansions")]
    pub max_expansions: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub instance_path: String,
    pub output_path: Option<String>,
    pub solver: SolverKind,
    pub splitting: Splitting,
    pub seed: u64,
    pub time_limit_ms: Option<u64>,
    pub max_expansions: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            instance_path: "map_file/test/corridor.txt".to_string(),
            output_path: None,
            solver: SolverKind::Cbs,
            splitting: Splitting::Standard,
            seed: 0,
            time_limit_ms: None,
            max_expansions: None,
        }
    }
}

impl Config {
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Command-line values win over whatever the config file set.
    pub fn override_from_command_line(mut self, cli: &Cli) -> anyhow::Result<Self> {
        if let Some(instance_path) = &cli.instance_path {
            self.instance_path = instance_path.clone();
        }
        if let Some(output_path) = &cli.output_path {
            self.output_path = Some(output_path.clone());
        }
        if let Some(solver) = cli.solver {
            self.solver = solver;
        }
        if let Some(splitting) = cli.splitting {
            self.splitting = splitting;
        }
        if let Some(seed) = cli.seed {
            self.seed = seed;
        }
        if cli.time_limit_ms.is_some() {
            self.time_limit_ms = cli.time_limit_ms;
        }
        if cli.max_expansions.is_some() {
            self.max_expansions = cli.max_expansions;
        }

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.instance_path.is_empty() {
            return Err(anyhow!("Instance path must not be empty"));
        }
        if self.time_limit_ms == Some(0) {
            return Err(anyhow!("Time limit must be greater than 0 ms"));
        }
        if self.max_expansions == Some(0) {
            return Err(anyhow!("Expansion budget must be greater than 0"));
        }
        if self.solver != SolverKind::Cbs
            && (self.time_limit_ms.is_some() || self.max_expansions.is_some())
        {
            warn!("search limits only apply to the cbs solver");
        }
        Ok(())
    }

    pub fn limits(&self) -> SearchLimits {
        SearchLimits {
            time_limit: self.time_limit_ms.map(Duration::from_millis),
            max_expansions: self.max_expansions,
        }
    }
}
