use super::{position_at, Path};

use tracing::trace;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConflictType {
    /// Both agents occupy `position` at `time_step`.
    Vertex {
        position: (usize, usize),
        time_step: usize,
    },
    /// The first agent moves `u -> v` while the second moves `v -> u`,
    /// both arriving at `time_step`.
    Edge {
        u: (usize, usize),
        v: (usize, usize),
        time_step: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Conflict {
    pub agent_1: usize,
    pub agent_2: usize,
    pub conflict_type: ConflictType,
}

impl Conflict {
    pub fn time_step(&self) -> usize {
        match self.conflict_type {
            ConflictType::Vertex { time_step, .. } | ConflictType::Edge { time_step, .. } => {
                time_step
            }
        }
    }
}

/// Earliest conflict between two paths. Agents that reached their goal keep
/// occupying it.
pub fn detect_collision(
    agent_1: usize,
    agent_2: usize,
    path_1: &Path,
    path_2: &Path,
) -> Option<Conflict> {
    let max_length = path_1.len().max(path_2.len());

    for step in 0..max_length {
        let pos_1 = position_at(path_1, step);
        let pos_2 = position_at(path_2, step);

        if pos_1 == pos_2 {
            return Some(Conflict {
                agent_1,
                agent_2,
                conflict_type: ConflictType::Vertex {
                    position: pos_1,
                    time_step: step,
                },
            });
        }

        let next_pos_1 = position_at(path_1, step + 1);
        let next_pos_2 = position_at(path_2, step + 1);
        if pos_1 == next_pos_2 && next_pos_1 == pos_2 {
            return Some(Conflict {
                agent_1,
                agent_2,
                conflict_type: ConflictType::Edge {
                    u: pos_1,
                    v: next_pos_1,
                    time_step: step + 1,
                },
            });
        }
    }

    None
}

/// The earliest conflict of every colliding pair `i < j`, in pair order.
pub fn detect_conflicts(paths: &[Path]) -> Vec<Conflict> {
    let mut conflicts = Vec::new();

    for i in 0..paths.len() {
        for j in (i + 1)..paths.len() {
            if let Some(conflict) = detect_collision(i, j, &paths[i], &paths[j]) {
                conflicts.push(conflict);
            }
        }
    }

    trace!("Detect conflicts: {:?}", conflicts);
    conflicts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(conflict: &Conflict) -> Vec<(usize, usize)> {
        let mut cells = match conflict.conflict_type {
            ConflictType::Vertex { position, .. } => vec![position],
            ConflictType::Edge { u, v, .. } => vec![u, v],
        };
        cells.sort();
        cells
    }

    #[test]
    fn test_vertex_conflict_at_start() {
        let paths = vec![vec![(0, 0)], vec![(0, 0)]];
        let conflicts = detect_conflicts(&paths);
        assert_eq!(
            conflicts,
            vec![Conflict {
                agent_1: 0,
                agent_2: 1,
                conflict_type: ConflictType::Vertex {
                    position: (0, 0),
                    time_step: 0
                },
            }]
        );
    }

    #[test]
    fn test_edge_conflict() {
        let paths = vec![vec![(0, 0), (1, 0)], vec![(1, 0), (0, 0)]];
        let conflicts = detect_conflicts(&paths);
        assert_eq!(
            conflicts,
            vec![Conflict {
                agent_1: 0,
                agent_2: 1,
                conflict_type: ConflictType::Edge {
                    u: (0, 0),
                    v: (1, 0),
                    time_step: 1
                },
            }]
        );
    }

    #[test]
    fn test_finished_agent_still_blocks_goal() {
        let path_1 = vec![(0, 2)];
        let path_2 = vec![(0, 0), (0, 1), (0, 2), (0, 3)];
        let conflict = detect_collision(0, 1, &path_1, &path_2).unwrap();
        assert_eq!(
            conflict.conflict_type,
            ConflictType::Vertex {
                position: (0, 2),
                time_step: 2
            }
        );
    }

    #[test]
    fn test_only_earliest_conflict_reported() {
        let path_1 = vec![(0, 0), (0, 1), (0, 2), (0, 3)];
        let path_2 = vec![(1, 0), (0, 1), (0, 2), (0, 3)];
        let conflict = detect_collision(0, 1, &path_1, &path_2).unwrap();
        assert_eq!(conflict.time_step(), 1);
    }

    #[test]
    fn test_following_is_not_a_conflict() {
        let path_1 = vec![(0, 1), (0, 2), (0, 3)];
        let path_2 = vec![(0, 0), (0, 1), (0, 2)];
        assert_eq!(detect_collision(0, 1, &path_1, &path_2), None);
    }

    #[test]
    fn test_detection_is_symmetric() {
        let cases = [
            (vec![(0, 0), (0, 1), (0, 2)], vec![(1, 1), (0, 1), (1, 1)]),
            (vec![(2, 0), (2, 1), (2, 2)], vec![(2, 3), (2, 2), (2, 1)]),
            (vec![(3, 3)], vec![(3, 1), (3, 2), (3, 3)]),
        ];

        for (path_a, path_b) in cases {
            let forward = detect_collision(0, 1, &path_a, &path_b).unwrap();
            let backward = detect_collision(1, 0, &path_b, &path_a).unwrap();
            assert_eq!(forward.time_step(), backward.time_step());
            assert_eq!(cells(&forward), cells(&backward));
            assert_eq!((backward.agent_1, backward.agent_2), (1, 0));
        }
    }

    #[test]
    fn test_pairs_reported_in_index_order() {
        let paths = vec![
            vec![(0, 0), (0, 1)],
            vec![(5, 5)],
            vec![(0, 2), (0, 1)],
            vec![(5, 4), (5, 5)],
        ];
        let conflicts = detect_conflicts(&paths);
        let pairs: Vec<_> = conflicts.iter().map(|c| (c.agent_1, c.agent_2)).collect();
        assert_eq!(pairs, vec![(0, 2), (1, 3)]);
    }
}
