use super::{compute_heuristics, SearchOutcome, Solver};
use crate::algorithm::a_star_search;
use crate::common::{detect_conflicts, validate_agents, Agent, InstanceError, Solution};
use crate::map::{Heuristic, Map};
use crate::stat::Stats;

use std::time::Instant;
use tracing::{debug, warn};

/// Shortest path for every agent, ignoring the others. Conflicts in the
/// result are reported, never resolved.
pub struct Independent {
    agents: Vec<Agent>,
    map: Map,
    heuristics: Vec<Heuristic>,
    stats: Stats,
}

impl Independent {
    pub fn new(agents: Vec<Agent>, map: &Map) -> Result<Self, InstanceError> {
        validate_agents(map, &agents)?;
        let heuristics = compute_heuristics(map, &agents);
        Ok(Independent {
            agents,
            map: map.clone(),
            heuristics,
            stats: Stats::default(),
        })
    }
}

impl Solver for Independent {
    fn solve(&mut self) -> SearchOutcome {
        self.stats = Stats::default();
        let total_solve_start_time = Instant::now();

        let mut paths = Vec::with_capacity(self.agents.len());
        for agent in &self.agents {
            match a_star_search(
                &self.map,
                agent,
                &self.heuristics[agent.id],
                &[],
                &mut self.stats,
            ) {
                Some(path) => paths.push(path),
                None => {
                    debug!("agent {} cannot reach its goal", agent.id);
                    self.stats.time_us = total_solve_start_time.elapsed().as_micros() as usize;
                    self.stats.print("independent");
                    return SearchOutcome::Infeasible;
                }
            }
        }

        let conflicts = detect_conflicts(&paths);
        if !conflicts.is_empty() {
            warn!("independent paths leave {} conflicting pairs", conflicts.len());
        }

        let solution = Solution { paths };
        self.stats.costs = solution.cost();
        self.stats.time_us = total_solve_start_time.elapsed().as_micros() as usize;
        self.stats.print("independent");
        SearchOutcome::Solved(solution)
    }

    fn stats(&self) -> &Stats {
        &self.stats
    }
}
