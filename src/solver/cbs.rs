use super::{compute_heuristics, SearchLimits, SearchOutcome, Solver};
use crate::common::{
    build_agents, validate_agents, Agent, HighLevelOpenNode, InstanceError, Solution, Splitting,
};
use crate::map::{Heuristic, Map};
use crate::stat::Stats;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeSet;
use std::time::Instant;
use tracing::debug;

/// Conflict-Based Search, optimal with respect to the sum of costs.
pub struct CBS {
    agents: Vec<Agent>,
    map: Map,
    heuristics: Vec<Heuristic>,
    splitting: Splitting,
    limits: SearchLimits,
    rng: StdRng,
    stats: Stats,
}

impl CBS {
    pub fn new(
        agents: Vec<Agent>,
        map: &Map,
        splitting: Splitting,
        seed: u64,
    ) -> Result<Self, InstanceError> {
        validate_agents(map, &agents)?;
        let heuristics = compute_heuristics(map, &agents);
        Ok(CBS {
            agents,
            map: map.clone(),
            heuristics,
            splitting,
            limits: SearchLimits::default(),
            rng: StdRng::seed_from_u64(seed),
            stats: Stats::default(),
        })
    }

    pub fn with_limits(mut self, limits: SearchLimits) -> Self {
        self.limits = limits;
        self
    }
}

impl Solver for CBS {
    fn solve(&mut self) -> SearchOutcome {
        self.stats = Stats::default();
        let outcome = search(
            &self.agents,
            &self.map,
            &self.heuristics,
            self.splitting,
            self.limits,
            &mut self.rng,
            &mut self.stats,
        );
        self.stats.print("cbs");
        outcome
    }

    fn stats(&self) -> &Stats {
        &self.stats
    }
}

/// Plans collision-free paths for all agents, `Ok(None)` when none exist.
///
/// The search has no budget; use [`CBS::with_limits`] to bound it.
pub fn cbs_solve<R: Rng + ?Sized>(
    map: &Map,
    starts: &[(usize, usize)],
    goals: &[(usize, usize)],
    splitting: Splitting,
    rng: &mut R,
) -> Result<Option<Solution>, InstanceError> {
    let agents = build_agents(map, starts, goals)?;
    let heuristics = compute_heuristics(map, &agents);
    let mut stats = Stats::default();
    let outcome = search(
        &agents,
        map,
        &heuristics,
        splitting,
        SearchLimits::default(),
        rng,
        &mut stats,
    );
    Ok(outcome.into_solution())
}

fn search<R: Rng + ?Sized>(
    agents: &[Agent],
    map: &Map,
    heuristics: &[Heuristic],
    splitting: Splitting,
    limits: SearchLimits,
    rng: &mut R,
    stats: &mut Stats,
) -> SearchOutcome {
    let total_solve_start_time = Instant::now();

    let Some(root) = HighLevelOpenNode::new(agents, map, heuristics, stats) else {
        debug!("root node has no solution");
        return SearchOutcome::Infeasible;
    };

    let mut open = BTreeSet::new();
    let mut global_high_level_node_id = 0;
    open.insert(root);
    stats.high_level_generate_nodes += 1;

    while let Some(current_node) = open.pop_first() {
        let Some(conflict) = current_node.conflicts.first() else {
            // No conflicts, return solution.
            stats.time_us = total_solve_start_time.elapsed().as_micros() as usize;
            stats.costs = current_node.cost;
            return SearchOutcome::Solved(Solution {
                paths: current_node.paths,
            });
        };

        if limits.exceeded(total_solve_start_time, stats.high_level_expand_nodes) {
            debug!("search budget exhausted with {} open nodes", open.len() + 1);
            stats.time_us = total_solve_start_time.elapsed().as_micros() as usize;
            return SearchOutcome::LimitReached;
        }
        stats.high_level_expand_nodes += 1;
        debug!(
            "Node Id: {:?}, cost: {:?}, conflict: {conflict:?}",
            current_node.node_id, current_node.cost
        );

        for constraint in splitting.split(conflict, rng) {
            global_high_level_node_id += 1;
            if let Some(child) = current_node.update_constraint(
                constraint,
                agents,
                map,
                heuristics,
                global_high_level_node_id,
                stats,
            ) {
                debug!(
                    "Expand Node {:?} into Node {:?}",
                    current_node.node_id, child.node_id
                );
                open.insert(child);
                stats.high_level_generate_nodes += 1;
            }
        }
    }

    stats.time_us = total_solve_start_time.elapsed().as_micros() as usize;
    SearchOutcome::Infeasible
}
