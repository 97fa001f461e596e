mod conflict;
mod constraint;
mod highlevel;
mod lowlevel;

pub use conflict::{detect_collision, detect_conflicts, Conflict, ConflictType};
pub use constraint::{Constraint, ConstraintError, ConstraintKind, ConstraintTable};
pub(crate) use highlevel::HighLevelOpenNode;
pub use highlevel::Splitting;
pub(crate) use lowlevel::{LowLevelNode, OpenOrderWrapper};

use crate::map::Map;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// One location per timestep; `path[0]` is the start and the last entry the goal.
pub type Path = Vec<(usize, usize)>;

/// Location of an agent at `time_step`, where an agent that has already
/// finished is considered to stay on its last cell.
pub fn position_at(path: &Path, time_step: usize) -> (usize, usize) {
    path.get(time_step)
        .copied()
        .unwrap_or_else(|| path[path.len() - 1])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Start,
    Goal,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Start => write!(f, "start"),
            Endpoint::Goal => write!(f, "goal"),
        }
    }
}

/// Malformed instances, rejected before any search starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InstanceError {
    #[error("got {starts} start locations but {goals} goal locations")]
    AgentCountMismatch { starts: usize, goals: usize },
    #[error("agent {agent} {endpoint} {position:?} lies outside the map")]
    OutOfBounds {
        agent: usize,
        endpoint: Endpoint,
        position: (usize, usize),
    },
    #[error("agent {agent} {endpoint} {position:?} lies on a blocked cell")]
    Blocked {
        agent: usize,
        endpoint: Endpoint,
        position: (usize, usize),
    },
    #[error("agent at index {index} has id {id}")]
    IdMismatch { index: usize, id: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub id: usize,
    pub start: (usize, usize),
    pub goal: (usize, usize),
}

impl Agent {
    pub fn verify(&self, map: &Map) -> Result<(), InstanceError> {
        for (endpoint, position) in [(Endpoint::Start, self.start), (Endpoint::Goal, self.goal)] {
            if !map.in_bounds(position) {
                return Err(InstanceError::OutOfBounds {
                    agent: self.id,
                    endpoint,
                    position,
                });
            }
            if !map.is_passable(position.0, position.1) {
                return Err(InstanceError::Blocked {
                    agent: self.id,
                    endpoint,
                    position,
                });
            }
        }
        Ok(())
    }
}

/// Checks every endpoint, and that agent ids match their index.
pub fn validate_agents(map: &Map, agents: &[Agent]) -> Result<(), InstanceError> {
    for (index, agent) in agents.iter().enumerate() {
        if agent.id != index {
            return Err(InstanceError::IdMismatch {
                index,
                id: agent.id,
            });
        }
        agent.verify(map)?;
    }
    Ok(())
}

/// Pairs up start and goal lists into agents and checks every endpoint.
pub fn build_agents(
    map: &Map,
    starts: &[(usize, usize)],
    goals: &[(usize, usize)],
) -> Result<Vec<Agent>, InstanceError> {
    if starts.len() != goals.len() {
        return Err(InstanceError::AgentCountMismatch {
            starts: starts.len(),
            goals: goals.len(),
        });
    }

    let agents: Vec<Agent> = starts
        .iter()
        .zip(goals)
        .enumerate()
        .map(|(id, (&start, &goal))| Agent { id, start, goal })
        .collect();
    validate_agents(map, &agents)?;
    Ok(agents)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Solution {
    pub paths: Vec<Path>,
}

impl Solution {
    /// Sum of costs: every agent pays one per timestep until it reaches its goal.
    pub fn cost(&self) -> usize {
        self.paths.iter().map(|path| path.len() - 1).sum()
    }

    pub fn verify(&self, map: &Map, agents: &[Agent]) -> bool {
        if self.paths.len() != agents.len() {
            return false;
        }

        for (agent, path) in agents.iter().zip(&self.paths) {
            if path.first() != Some(&agent.start) || path.last() != Some(&agent.goal) {
                return false;
            }
            if path.iter().any(|&(x, y)| !map.in_bounds((x, y)) || !map.is_passable(x, y)) {
                return false;
            }
            if path
                .windows(2)
                .any(|step| !map.get_neighbors(step[0].0, step[0].1).contains(&step[1]))
            {
                return false;
            }
        }

        detect_conflicts(&self.paths).is_empty()
    }
}
