use super::{position_at, Path};

use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConstraintError {
    #[error("edge constraints cannot be permanent")]
    PermanentEdge,
    #[error("permanent constraints are always negative")]
    PermanentPositive,
    #[error("edge constraints need a previous time step, got time step 0")]
    EdgeAtTimeStepZero,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConstraintKind {
    /// Occupying `position` at `time_step`, or at every step from `time_step`
    /// onwards when `is_permanent` is set.
    Vertex {
        position: (usize, usize),
        time_step: usize,
        is_permanent: bool,
    },
    /// Moving `from_position -> to_position`, arriving at `to_time_step`.
    Edge {
        from_position: (usize, usize),
        to_position: (usize, usize),
        to_time_step: usize,
    },
}

/// A restriction on a single agent. Negative constraints forbid the
/// vertex/edge, positive ones mandate it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Constraint {
    agent: usize,
    is_positive: bool,
    kind: ConstraintKind,
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.is_positive { "+" } else { "-" };
        match self.kind {
            ConstraintKind::Vertex {
                position,
                time_step,
                is_permanent: false,
            } => write!(f, "{sign}a{} {position:?}@{time_step}", self.agent),
            ConstraintKind::Vertex {
                position,
                time_step,
                is_permanent: true,
            } => write!(f, "{sign}a{} {position:?}@{time_step}..", self.agent),
            ConstraintKind::Edge {
                from_position,
                to_position,
                to_time_step,
            } => write!(
                f,
                "{sign}a{} {from_position:?}->{to_position:?}@{to_time_step}",
                self.agent
            ),
        }
    }
}

impl Constraint {
    /// Flat constructor: `next_position` turns the constraint into an edge.
    pub fn new(
        agent: usize,
        time_step: usize,
        is_positive: bool,
        position: (usize, usize),
        next_position: Option<(usize, usize)>,
        is_permanent: bool,
    ) -> Result<Self, ConstraintError> {
        let kind = match next_position {
            None => {
                if is_permanent && is_positive {
                    return Err(ConstraintError::PermanentPositive);
                }
                ConstraintKind::Vertex {
                    position,
                    time_step,
                    is_permanent,
                }
            }
            Some(to_position) => {
                if is_permanent {
                    return Err(ConstraintError::PermanentEdge);
                }
                if time_step == 0 {
                    return Err(ConstraintError::EdgeAtTimeStepZero);
                }
                ConstraintKind::Edge {
                    from_position: position,
                    to_position,
                    to_time_step: time_step,
                }
            }
        };

        Ok(Constraint {
            agent,
            is_positive,
            kind,
        })
    }

    pub fn vertex(agent: usize, position: (usize, usize), time_step: usize) -> Self {
        Constraint {
            agent,
            is_positive: false,
            kind: ConstraintKind::Vertex {
                position,
                time_step,
                is_permanent: false,
            },
        }
    }

    pub fn permanent(agent: usize, position: (usize, usize), from_time_step: usize) -> Self {
        Constraint {
            agent,
            is_positive: false,
            kind: ConstraintKind::Vertex {
                position,
                time_step: from_time_step,
                is_permanent: true,
            },
        }
    }

    pub fn edge(
        agent: usize,
        from_position: (usize, usize),
        to_position: (usize, usize),
        to_time_step: usize,
    ) -> Result<Self, ConstraintError> {
        Self::new(
            agent,
            to_time_step,
            false,
            from_position,
            Some(to_position),
            false,
        )
    }

    /// Edge constraint for a swap already known to arrive at `to_time_step >= 1`.
    pub(crate) fn edge_unchecked(
        agent: usize,
        from_position: (usize, usize),
        to_position: (usize, usize),
        to_time_step: usize,
    ) -> Self {
        debug_assert_ne!(to_time_step, 0);
        Constraint {
            agent,
            is_positive: false,
            kind: ConstraintKind::Edge {
                from_position,
                to_position,
                to_time_step,
            },
        }
    }

    pub(crate) fn with_polarity(self, is_positive: bool) -> Self {
        debug_assert!(!(is_positive && self.is_permanent()));
        Constraint {
            is_positive,
            ..self
        }
    }

    /// Turns a negative constraint into the matching positive one.
    pub fn into_positive(self) -> Result<Self, ConstraintError> {
        if self.is_permanent() {
            return Err(ConstraintError::PermanentPositive);
        }
        Ok(Constraint {
            is_positive: true,
            ..self
        })
    }

    pub fn agent(&self) -> usize {
        self.agent
    }

    pub fn is_positive(&self) -> bool {
        self.is_positive
    }

    pub fn kind(&self) -> ConstraintKind {
        self.kind
    }

    /// Time step at which the constraint (first) applies; for edges, the arrival step.
    pub fn time_step(&self) -> usize {
        match self.kind {
            ConstraintKind::Vertex { time_step, .. } => time_step,
            ConstraintKind::Edge { to_time_step, .. } => to_time_step,
        }
    }

    pub fn position(&self) -> (usize, usize) {
        match self.kind {
            ConstraintKind::Vertex { position, .. } => position,
            ConstraintKind::Edge { from_position, .. } => from_position,
        }
    }

    pub fn next_position(&self) -> Option<(usize, usize)> {
        match self.kind {
            ConstraintKind::Vertex { .. } => None,
            ConstraintKind::Edge { to_position, .. } => Some(to_position),
        }
    }

    pub fn is_permanent(&self) -> bool {
        matches!(
            self.kind,
            ConstraintKind::Vertex {
                is_permanent: true,
                ..
            }
        )
    }

    /// Whether `path` breaks this constraint, with the agent resting on its
    /// last cell once the path ends.
    pub fn is_violated_by(&self, path: &Path) -> bool {
        let matches = match self.kind {
            ConstraintKind::Vertex {
                position,
                time_step,
                is_permanent: false,
            } => position_at(path, time_step) == position,
            ConstraintKind::Vertex {
                position,
                time_step,
                is_permanent: true,
            } => (time_step..path.len().max(time_step + 1))
                .any(|step| position_at(path, step) == position),
            ConstraintKind::Edge {
                from_position,
                to_position,
                to_time_step,
            } => {
                position_at(path, to_time_step - 1) == from_position
                    && position_at(path, to_time_step) == to_position
            }
        };
        matches != self.is_positive
    }

    /// Rewrites this constraint into the constraints it implies for `agent`.
    ///
    /// A positive constraint on one agent keeps every other agent off the
    /// mandated vertex (or both ends of the mandated edge plus its reverse).
    /// Negative constraints only ever bind their own agent.
    pub fn compile_for(&self, agent: usize) -> Vec<Constraint> {
        if agent == self.agent {
            return match (self.is_positive, self.kind) {
                (
                    true,
                    ConstraintKind::Edge {
                        from_position,
                        to_position,
                        to_time_step,
                    },
                ) => vec![
                    Constraint {
                        agent,
                        is_positive: true,
                        kind: ConstraintKind::Vertex {
                            position: from_position,
                            time_step: to_time_step - 1,
                            is_permanent: false,
                        },
                    },
                    Constraint {
                        agent,
                        is_positive: true,
                        kind: ConstraintKind::Vertex {
                            position: to_position,
                            time_step: to_time_step,
                            is_permanent: false,
                        },
                    },
                ],
                _ => vec![*self],
            };
        }

        if !self.is_positive {
            return Vec::new();
        }

        match self.kind {
            ConstraintKind::Vertex {
                position,
                time_step,
                is_permanent,
            } => vec![Constraint {
                agent,
                is_positive: false,
                kind: ConstraintKind::Vertex {
                    position,
                    time_step,
                    is_permanent,
                },
            }],
            ConstraintKind::Edge {
                from_position,
                to_position,
                to_time_step,
            } => vec![
                Constraint::vertex(agent, from_position, to_time_step - 1),
                Constraint::vertex(agent, to_position, to_time_step),
                Constraint {
                    agent,
                    is_positive: false,
                    kind: ConstraintKind::Edge {
                        from_position: to_position,
                        to_position: from_position,
                        to_time_step,
                    },
                },
            ],
        }
    }
}

/// Per-agent index over the constraints of a high-level node.
#[derive(Debug, Clone, Default)]
pub struct ConstraintTable {
    finite: Vec<Constraint>,    // Sorted by time step, insertion order kept on ties
    permanent: Vec<Constraint>, // Sorted by start time step
}

impl ConstraintTable {
    pub fn build(constraints: &[Constraint], agent: usize) -> Self {
        let (mut permanent, mut finite): (Vec<Constraint>, Vec<Constraint>) = constraints
            .iter()
            .flat_map(|constraint| constraint.compile_for(agent))
            .partition(Constraint::is_permanent);

        finite.sort_by_key(Constraint::time_step);
        permanent.sort_by_key(Constraint::time_step);

        ConstraintTable { finite, permanent }
    }

    /// One past the last time step carrying a finite constraint.
    pub fn len(&self) -> usize {
        self.finite.last().map_or(0, |c| c.time_step() + 1)
    }

    pub fn is_empty(&self) -> bool {
        self.finite.is_empty() && self.permanent.is_empty()
    }

    /// First time step from which no constraint changes any more: after it,
    /// the answer of `is_constrained` only depends on the locations.
    pub fn horizon(&self) -> usize {
        let permanent_start = self.permanent.last().map_or(0, |c| c.time_step() + 1);
        self.len().max(permanent_start)
    }

    pub fn is_constrained(
        &self,
        current: (usize, usize),
        next: (usize, usize),
        next_time_step: usize,
    ) -> bool {
        let first = self
            .finite
            .partition_point(|c| c.time_step() < next_time_step);
        let finite_hit = self.finite[first..]
            .iter()
            .take_while(|c| c.time_step() == next_time_step)
            .any(|c| match (c.is_positive, c.kind) {
                (true, ConstraintKind::Vertex { position, .. }) => position != next,
                (
                    true,
                    ConstraintKind::Edge {
                        from_position,
                        to_position,
                        ..
                    },
                ) => (from_position, to_position) != (current, next),
                (false, ConstraintKind::Vertex { position, .. }) => position == next,
                (
                    false,
                    ConstraintKind::Edge {
                        from_position,
                        to_position,
                        ..
                    },
                ) => (from_position, to_position) == (current, next),
            });
        if finite_hit {
            return true;
        }

        match self.permanent.first() {
            Some(earliest) if next_time_step >= earliest.time_step() => self
                .permanent
                .iter()
                .take_while(|c| c.time_step() <= next_time_step)
                .any(|c| c.position() == next),
            _ => false,
        }
    }
}
