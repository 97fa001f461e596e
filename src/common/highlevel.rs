use super::{detect_conflicts, Agent, Conflict, ConflictType, Constraint, Path};
use crate::algorithm::a_star_search;
use crate::map::{Heuristic, Map};
use crate::stat::Stats;

use clap::ValueEnum;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;

/// How a conflict is turned into the two constraints of the child nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Splitting {
    /// Each child forbids one of the two agents from the conflict.
    #[default]
    Standard,
    /// One agent is picked at random; one child forces it into the conflict,
    /// the other forbids it.
    Disjoint,
}

impl Splitting {
    pub(crate) fn split<R: Rng + ?Sized>(&self, conflict: &Conflict, rng: &mut R) -> [Constraint; 2] {
        let constraint_for = |agent: usize| match conflict.conflict_type {
            ConflictType::Vertex {
                position,
                time_step,
            } => Constraint::vertex(agent, position, time_step),
            ConflictType::Edge { u, v, time_step } if agent == conflict.agent_1 => {
                Constraint::edge_unchecked(agent, u, v, time_step)
            }
            ConflictType::Edge { u, v, time_step } => {
                Constraint::edge_unchecked(agent, v, u, time_step)
            }
        };

        match self {
            Splitting::Standard => [
                constraint_for(conflict.agent_1),
                constraint_for(conflict.agent_2),
            ],
            Splitting::Disjoint => {
                let agent = if rng.gen_bool(0.5) {
                    conflict.agent_1
                } else {
                    conflict.agent_2
                };
                let constraint = constraint_for(agent);
                [constraint.with_polarity(true), constraint]
            }
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct HighLevelOpenNode {
    pub(crate) node_id: usize,
    pub(crate) constraints: Vec<Constraint>,
    pub(crate) conflicts: Vec<Conflict>,
    pub(crate) paths: Vec<Path>, // Indexed by agent id
    pub(crate) cost: usize,      // Sum of costs under current constraints
}

impl Ord for HighLevelOpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cost
            .cmp(&other.cost)
            .then_with(|| self.conflicts.len().cmp(&other.conflicts.len()))
            // Generation order keeps expansion reproducible.
            .then_with(|| self.node_id.cmp(&other.node_id))
    }
}

impl PartialOrd for HighLevelOpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for HighLevelOpenNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HighLevelOpenNode {}

fn sum_of_costs(paths: &[Path]) -> usize {
    // Notice: path include start node.
    paths.iter().map(|path| path.len() - 1).sum()
}

impl HighLevelOpenNode {
    /// Root node: every agent on its unconstrained shortest path. `None` if
    /// any agent cannot reach its goal at all.
    pub(crate) fn new(
        agents: &[Agent],
        map: &Map,
        heuristics: &[Heuristic],
        stats: &mut Stats,
    ) -> Option<Self> {
        let mut paths = Vec::with_capacity(agents.len());
        for agent in agents {
            match a_star_search(map, agent, &heuristics[agent.id], &[], stats) {
                Some(path) => paths.push(path),
                None => {
                    debug!("agent {} has no path at all", agent.id);
                    return None;
                }
            }
        }

        let mut root = HighLevelOpenNode {
            node_id: 0,
            constraints: Vec::new(),
            conflicts: Vec::new(),
            cost: sum_of_costs(&paths),
            paths,
        };
        root.detect_conflicts();
        Some(root)
    }

    pub(crate) fn detect_conflicts(&mut self) {
        self.conflicts = detect_conflicts(&self.paths);
    }

    /// Child node with `constraint` added. The constrained agent is replanned;
    /// for a positive constraint, so is every other agent whose path now
    /// breaks it. `None` when one of those replans fails.
    pub(crate) fn update_constraint(
        &self,
        constraint: Constraint,
        agents: &[Agent],
        map: &Map,
        heuristics: &[Heuristic],
        node_id: usize,
        stats: &mut Stats,
    ) -> Option<HighLevelOpenNode> {
        let mut new_constraints = self.constraints.clone();
        new_constraints.push(constraint);
        let mut new_paths = self.paths.clone();

        let agent_to_update = constraint.agent();
        new_paths[agent_to_update] = a_star_search(
            map,
            &agents[agent_to_update],
            &heuristics[agent_to_update],
            &new_constraints,
            stats,
        )?;

        if constraint.is_positive() {
            for agent in agents.iter().filter(|agent| agent.id != agent_to_update) {
                let violated = constraint
                    .compile_for(agent.id)
                    .iter()
                    .any(|implied| implied.is_violated_by(&new_paths[agent.id]));
                if violated {
                    debug!("agent {} breaks {constraint}, replanning", agent.id);
                    new_paths[agent.id] = a_star_search(
                        map,
                        agent,
                        &heuristics[agent.id],
                        &new_constraints,
                        stats,
                    )?;
                }
            }
        }

        debug!(
            "Update agent {agent_to_update:?} with path {:?} for {constraint}",
            new_paths[agent_to_update]
        );

        let mut new_node = HighLevelOpenNode {
            node_id,
            constraints: new_constraints,
            conflicts: Vec::new(),
            cost: sum_of_costs(&new_paths),
            paths: new_paths,
        };
        new_node.detect_conflicts();

        Some(new_node)
    }
}
