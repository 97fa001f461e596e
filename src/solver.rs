mod cbs;
mod independent;
mod prioritized;

pub use cbs::{cbs_solve, CBS};
pub use independent::Independent;
pub use prioritized::Prioritized;

use crate::common::{Agent, InstanceError, Solution};
use crate::config::{Config, SolverKind};
use crate::map::{Heuristic, Map};
use crate::stat::Stats;

use std::fmt;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// A solution was found.
    Solved(Solution),
    /// Proven that no solution exists (for the complete solvers), or the
    /// solver gave up without a budget being involved.
    Infeasible,
    /// The search budget ran out before an answer was found.
    LimitReached,
}

impl SearchOutcome {
    pub fn solution(&self) -> Option<&Solution> {
        match self {
            SearchOutcome::Solved(solution) => Some(solution),
            _ => None,
        }
    }

    pub fn into_solution(self) -> Option<Solution> {
        match self {
            SearchOutcome::Solved(solution) => Some(solution),
            _ => None,
        }
    }
}

impl fmt::Display for SearchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchOutcome::Solved(solution) => write!(f, "Solved(cost={})", solution.cost()),
            SearchOutcome::Infeasible => write!(f, "Infeasible"),
            SearchOutcome::LimitReached => write!(f, "LimitReached"),
        }
    }
}

/// Budget for the high-level search loop. Unlimited by default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchLimits {
    pub time_limit: Option<Duration>,
    pub max_expansions: Option<usize>,
}

impl SearchLimits {
    pub(crate) fn exceeded(&self, started: Instant, expansions: usize) -> bool {
        self.max_expansions.is_some_and(|max| expansions >= max)
            || self
                .time_limit
                .is_some_and(|limit| started.elapsed() >= limit)
    }
}

pub trait Solver {
    fn solve(&mut self) -> SearchOutcome;

    fn stats(&self) -> &Stats;
}

pub(crate) fn compute_heuristics(map: &Map, agents: &[Agent]) -> Vec<Heuristic> {
    agents
        .iter()
        .map(|agent| map.heuristic_dji(agent.goal))
        .collect()
}

/// Picks the solver named by the configuration.
pub fn from_config(
    config: &Config,
    map: &Map,
    agents: Vec<Agent>,
) -> Result<Box<dyn Solver>, InstanceError> {
    Ok(match config.solver {
        SolverKind::Cbs => Box::new(
            CBS::new(agents, map, config.splitting, config.seed)?.with_limits(config.limits()),
        ),
        SolverKind::Prioritized => Box::new(Prioritized::new(agents, map)?),
        SolverKind::Independent => Box::new(Independent::new(agents, map)?),
    })
}
