use super::{compute_heuristics, SearchOutcome, Solver};
use crate::algorithm::a_star_search;
use crate::common::{validate_agents, Agent, Constraint, InstanceError, Path, Solution};
use crate::map::{Heuristic, Map};
use crate::stat::Stats;

use std::time::Instant;
use tracing::debug;

/// Plans agents one by one in id order; each agent treats the paths of the
/// agents before it as moving obstacles. Fast but incomplete.
pub struct Prioritized {
    agents: Vec<Agent>,
    map: Map,
    heuristics: Vec<Heuristic>,
    stats: Stats,
}

impl Prioritized {
    pub fn new(agents: Vec<Agent>, map: &Map) -> Result<Self, InstanceError> {
        validate_agents(map, &agents)?;
        let heuristics = compute_heuristics(map, &agents);
        Ok(Prioritized {
            agents,
            map: map.clone(),
            heuristics,
            stats: Stats::default(),
        })
    }
}

/// Constraints keeping `agent` clear of `path` at all times, including the
/// goal the path ends on.
fn reserve_path(agent: usize, path: &Path) -> Vec<Constraint> {
    let arrival = path.len() - 1;
    let mut constraints: Vec<Constraint> = path[..arrival]
        .iter()
        .enumerate()
        .map(|(time_step, &position)| Constraint::vertex(agent, position, time_step))
        .collect();

    constraints.extend(
        path.windows(2)
            .enumerate()
            .filter(|(_, step)| step[0] != step[1])
            .map(|(time_step, step)| {
                Constraint::edge_unchecked(agent, step[1], step[0], time_step + 1)
            }),
    );
    constraints.push(Constraint::permanent(agent, path[arrival], arrival));
    constraints
}

impl Solver for Prioritized {
    fn solve(&mut self) -> SearchOutcome {
        self.stats = Stats::default();
        let total_solve_start_time = Instant::now();
        let mut constraints = Vec::new();
        let mut paths = Vec::with_capacity(self.agents.len());

        for agent in &self.agents {
            let Some(path) = a_star_search(
                &self.map,
                agent,
                &self.heuristics[agent.id],
                &constraints,
                &mut self.stats,
            ) else {
                debug!("agent {} found no path around higher priorities", agent.id);
                self.stats.time_us = total_solve_start_time.elapsed().as_micros() as usize;
                self.stats.print("prioritized");
                return SearchOutcome::Infeasible;
            };

            for lower in self.agents.iter().skip(agent.id + 1) {
                constraints.extend(reserve_path(lower.id, &path));
            }
            paths.push(path);
        }

        let solution = Solution { paths };
        self.stats.costs = solution.cost();
        self.stats.time_us = total_solve_start_time.elapsed().as_micros() as usize;
        self.stats.print("prioritized");
        SearchOutcome::Solved(solution)
    }

    fn stats(&self) -> &Stats {
        &self.stats
    }
}
