use super::construct_path;
use crate::common::{Agent, Constraint, ConstraintTable, LowLevelNode, OpenOrderWrapper, Path};
use crate::map::{Heuristic, Map};
use crate::stat::Stats;

use std::collections::{BTreeSet, HashMap};
use tracing::{debug, instrument, trace};

/// Time step under which a state is recorded in the closed list. Past the
/// constraint horizon nothing depends on time any more, so all later states
/// at one location collapse into a single entry.
fn closed_time_step(time_step: usize, horizon: usize) -> usize {
    time_step.min(horizon + 1)
}

/// First time step after `arrival` at which staying on the goal is forbidden.
fn first_goal_violation(
    table: &ConstraintTable,
    goal: (usize, usize),
    arrival: usize,
    horizon: usize,
) -> Option<usize> {
    (arrival + 1..=horizon).find(|&time_step| table.is_constrained(goal, goal, time_step))
}

/// Time-expanded A* for a single agent.
///
/// Returns the shortest path from the agent's start to its goal that respects
/// every constraint compiled for `agent.id`, or `None` if no such path exists.
/// The returned path ends at the first time step from which the agent can
/// stay on its goal forever.
#[instrument(skip_all, name="a_star", fields(agent = agent.id, start = format!("{:?}", agent.start), goal = format!("{:?}", agent.goal)), level = "debug")]
pub fn a_star_search(
    map: &Map,
    agent: &Agent,
    heuristic: &Heuristic,
    constraints: &[Constraint],
    stats: &mut Stats,
) -> Option<Path> {
    let table = ConstraintTable::build(constraints, agent.id);
    let horizon = table.horizon();
    debug!("constraints: {}, horizon: {horizon}", constraints.len());

    let start_h_open_cost = heuristic[agent.start.0][agent.start.1];
    if start_h_open_cost == usize::MAX {
        debug!("goal unreachable from start");
        return None;
    }
    if table.is_constrained(agent.start, agent.start, 0) {
        debug!("start position constrained at time step 0");
        return None;
    }

    let mut arena = vec![LowLevelNode {
        position: agent.start,
        g_cost: 0,
        h_open_cost: start_h_open_cost,
        parent: None,
    }];
    let mut open_list = BTreeSet::new();
    let mut closed_list: HashMap<((usize, usize), usize), usize> = HashMap::new();
    let mut earliest_goal_time_step = 0;

    open_list.insert(OpenOrderWrapper::from_node(&arena[0], 0));
    closed_list.insert((agent.start, 0), 0);

    while let Some(current) = open_list.pop_first() {
        let (position, g_cost) = (arena[current.index].position, arena[current.index].g_cost);

        // Skip entries superseded by a cheaper node for the same state.
        if closed_list.get(&(position, closed_time_step(g_cost, horizon))) != Some(&current.index)
        {
            continue;
        }
        trace!("expand node: {:?}", arena[current.index]);
        stats.low_level_expand_nodes += 1;

        if position == agent.goal && g_cost >= earliest_goal_time_step {
            match first_goal_violation(&table, agent.goal, g_cost, horizon) {
                None => return Some(construct_path(&arena, current.index)),
                Some(time_step) => {
                    trace!("goal reached at {g_cost} but blocked at {time_step}");
                    earliest_goal_time_step = time_step;
                }
            }
        }

        let tentative_g_cost = g_cost + 1;

        for &neighbor in &map.grid[position.0][position.1].neighbors {
            let h_open_cost = heuristic[neighbor.0][neighbor.1];
            if h_open_cost == usize::MAX {
                continue;
            }

            if table.is_constrained(position, neighbor, tentative_g_cost) {
                continue; // This move is prohibited due to a constraint.
            }

            let key = (neighbor, closed_time_step(tentative_g_cost, horizon));
            if let Some(&existing) = closed_list.get(&key) {
                if arena[existing].f_open_cost() <= tentative_g_cost + h_open_cost {
                    continue;
                }
            }

            let index = arena.len();
            arena.push(LowLevelNode {
                position: neighbor,
                g_cost: tentative_g_cost,
                h_open_cost,
                parent: Some(current.index),
            });
            closed_list.insert(key, index);
            open_list.insert(OpenOrderWrapper::from_node(&arena[index], index));
        }
    }

    debug!("cannot find solution");
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::position_at;
    use crate::map::grid_from_rows;

    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    // Helper function to setup tracing
    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("debug")
            .with_test_writer()
            .try_init();
    }

    fn ring_map() -> Map {
        grid_from_rows(&["...", ".@.", "..."])
    }

    fn search(map: &Map, agent: &Agent, constraints: &[Constraint]) -> Option<Path> {
        let heuristic = map.heuristic_dji(agent.goal);
        a_star_search(map, agent, &heuristic, constraints, &mut Stats::default())
    }

    fn corner_agent() -> Agent {
        Agent {
            id: 0,
            start: (2, 2),
            goal: (0, 0),
        }
    }

    // Ideal Path
    // [(2, 2), (1, 2), (0, 2), (0, 1), (0, 0)]
    // or
    // [(2, 2), (2, 1), (2, 0), (1, 0), (0, 0)]
    #[test]
    fn test_a_star_no_constraint() {
        init_tracing();
        let map = ring_map();
        let path = search(&map, &corner_agent(), &[]).unwrap();
        debug!("{path:?}");
        assert_eq!(path.len(), 5);
        assert_eq!(path.first(), Some(&(2, 2)));
        assert_eq!(path.last(), Some(&(0, 0)));
    }

    #[test]
    fn test_a_star_in_path_vertex_constraint_alternative_path() {
        init_tracing();
        let map = ring_map();
        let constraints = [Constraint::vertex(0, (0, 2), 2)];
        let path = search(&map, &corner_agent(), &constraints).unwrap();
        debug!("{path:?}");
        assert_eq!(path.len(), 5);
        assert_ne!(path[2], (0, 2));
    }

    #[test]
    fn test_a_star_in_path_vertex_constraint() {
        init_tracing();
        let map = ring_map();
        let constraints = [
            Constraint::vertex(0, (0, 2), 2),
            Constraint::vertex(0, (2, 0), 2),
        ];
        let path = search(&map, &corner_agent(), &constraints).unwrap();
        debug!("{path:?}");
        assert_eq!(path.len(), 6);
    }

    #[test]
    fn test_a_star_constraint_for_other_agent_ignored() {
        init_tracing();
        let map = ring_map();
        let constraints = [
            Constraint::vertex(1, (0, 2), 2),
            Constraint::vertex(1, (2, 0), 2),
        ];
        let path = search(&map, &corner_agent(), &constraints).unwrap();
        assert_eq!(path.len(), 5);
    }

    #[test]
    fn test_a_star_edge_constraint_alternative_path() {
        init_tracing();
        let map = ring_map();
        let constraints = [Constraint::edge(0, (0, 2), (1, 2), 2).unwrap()];
        let path = search(&map, &corner_agent(), &constraints).unwrap();
        debug!("{path:?}");
        assert_eq!(path.len(), 5);
    }

    #[test]
    fn test_a_star_edge_constraint() {
        init_tracing();
        let map = ring_map();
        let constraints = [
            Constraint::edge(0, (1, 2), (0, 2), 2).unwrap(),
            Constraint::edge(0, (2, 0), (1, 0), 3).unwrap(),
        ];
        let path = search(&map, &corner_agent(), &constraints).unwrap();
        debug!("{path:?}");
        assert_eq!(path.len(), 6);
    }

    #[test]
    fn test_a_star_positive_vertex_constraint() {
        init_tracing();
        let map = ring_map();
        let constraints = [Constraint::vertex(0, (2, 0), 2).into_positive().unwrap()];
        let path = search(&map, &corner_agent(), &constraints).unwrap();
        assert_eq!(path, vec![(2, 2), (2, 1), (2, 0), (1, 0), (0, 0)]);
    }

    #[test]
    fn test_a_star_positive_edge_constraint() {
        init_tracing();
        let map = ring_map();
        let constraints = [Constraint::edge(0, (1, 2), (0, 2), 2)
            .unwrap()
            .into_positive()
            .unwrap()];
        let path = search(&map, &corner_agent(), &constraints).unwrap();
        assert_eq!(path, vec![(2, 2), (1, 2), (0, 2), (0, 1), (0, 0)]);
    }

    #[test]
    fn test_a_star_other_agent_positive_constraint() {
        init_tracing();
        let map = ring_map();
        // Agent 1 is forced through both corners, so agent 0 has to wait.
        let constraints = [
            Constraint::vertex(1, (0, 2), 2).into_positive().unwrap(),
            Constraint::vertex(1, (2, 0), 2).into_positive().unwrap(),
        ];
        let path = search(&map, &corner_agent(), &constraints).unwrap();
        assert_eq!(path.len(), 6);
    }

    #[test]
    fn test_a_star_goal_constraint_after_arrival() {
        init_tracing();
        let map = ring_map();
        // Natural arrival at 4; the goal is taken at 6, so the agent cannot rest before.
        let constraints = [Constraint::vertex(0, (0, 0), 6)];
        let path = search(&map, &corner_agent(), &constraints).unwrap();
        debug!("{path:?}");
        assert_eq!(path.len(), 8);
        assert_ne!(position_at(&path, 6), (0, 0));
    }

    #[test]
    fn test_a_star_goal_constraint_at_arrival() {
        init_tracing();
        let map = ring_map();
        let constraints = [Constraint::vertex(0, (0, 0), 4)];
        let path = search(&map, &corner_agent(), &constraints).unwrap();
        assert_eq!(path.len(), 6);
    }

    #[test]
    fn test_a_star_permanent_goal_constraint_after_arrival() {
        init_tracing();
        let map = ring_map();
        // The agent could arrive at 4 but can never rest there once step 6 comes.
        let constraints = [Constraint::permanent(0, (0, 0), 6)];
        assert_eq!(search(&map, &corner_agent(), &constraints), None);
    }

    #[test]
    fn test_a_star_permanent_constraint_off_goal() {
        init_tracing();
        let map = ring_map();
        let constraints = [
            Constraint::permanent(0, (0, 2), 1),
            Constraint::vertex(0, (2, 0), 2),
        ];
        let path = search(&map, &corner_agent(), &constraints).unwrap();
        assert_eq!(path.len(), 6);
        assert!(!path.contains(&(0, 2)));
    }

    #[test]
    fn test_a_star_permanent_constraint_closes_corridor() {
        init_tracing();
        let map = grid_from_rows(&["....."]);
        let agent = Agent {
            id: 0,
            start: (0, 0),
            goal: (0, 4),
        };
        let constraints = [Constraint::permanent(0, (0, 2), 3)];
        let path = search(&map, &agent, &constraints).unwrap();
        assert_eq!(path.len(), 5);

        let constraints = [Constraint::permanent(0, (0, 2), 1)];
        assert_eq!(search(&map, &agent, &constraints), None);
    }

    #[test]
    fn test_a_star_unreachable_goal() {
        init_tracing();
        let map = grid_from_rows(&[".@.", ".@."]);
        let agent = Agent {
            id: 0,
            start: (0, 0),
            goal: (1, 2),
        };
        assert_eq!(search(&map, &agent, &[]), None);
    }

    #[test]
    fn test_a_star_constrained_start() {
        init_tracing();
        let map = ring_map();
        let constraints = [Constraint::vertex(0, (2, 2), 0)];
        assert_eq!(search(&map, &corner_agent(), &constraints), None);
    }

    #[test]
    fn test_a_star_infeasible_positive_constraints() {
        init_tracing();
        let map = ring_map();
        // Cannot be in two places at once.
        let constraints = [
            Constraint::vertex(0, (0, 2), 2).into_positive().unwrap(),
            Constraint::vertex(0, (2, 0), 2).into_positive().unwrap(),
        ];
        assert_eq!(search(&map, &corner_agent(), &constraints), None);
    }

    #[test]
    fn test_a_star_unconstrained_paths_are_shortest() {
        init_tracing();
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..30 {
            let blocked: Vec<Vec<bool>> = (0..8)
                .map(|_| (0..8).map(|_| rng.gen_bool(0.2)).collect())
                .collect();
            let map = Map::from_grid(blocked).unwrap();
            let start = (rng.gen_range(0..8), rng.gen_range(0..8));
            let goal = (rng.gen_range(0..8), rng.gen_range(0..8));
            if !map.is_passable(start.0, start.1) || !map.is_passable(goal.0, goal.1) {
                continue;
            }

            let agent = Agent { id: 0, start, goal };
            let heuristic = map.heuristic_dji(goal);
            let result = a_star_search(&map, &agent, &heuristic, &[], &mut Stats::default());

            if heuristic[start.0][start.1] == usize::MAX {
                assert_eq!(result, None);
                continue;
            }
            let path = result.unwrap();
            assert_eq!(path.len(), heuristic[start.0][start.1] + 1);
            for step in path.windows(2) {
                assert!(map.get_neighbors(step[0].0, step[0].1).contains(&step[1]));
            }
        }
    }

    #[test]
    fn test_a_star_respects_random_constraints() {
        init_tracing();
        let mut rng = StdRng::seed_from_u64(11);
        let map = grid_from_rows(&[".....", ".....", ".....", ".....", "....."]);
        let agent = Agent {
            id: 0,
            start: (0, 0),
            goal: (4, 4),
        };
        let moves = [(-1, 0), (1, 0), (0, -1), (0, 1)];

        for _ in 0..40 {
            let mut constraints = Vec::new();
            for _ in 0..10 {
                let position = (rng.gen_range(0..5), rng.gen_range(0..5));
                let time_step = rng.gen_range(1..12);
                if rng.gen_bool(0.5) {
                    constraints.push(Constraint::vertex(0, position, time_step));
                } else {
                    let (dx, dy) = moves[rng.gen_range(0..4)];
                    let next = (position.0 as i64 + dx, position.1 as i64 + dy);
                    if next.0 < 0 || next.1 < 0 || next.0 >= 5 || next.1 >= 5 {
                        continue;
                    }
                    let next = (next.0 as usize, next.1 as usize);
                    constraints.push(Constraint::edge(0, position, next, time_step).unwrap());
                }
            }

            let Some(path) = search(&map, &agent, &constraints) else {
                continue;
            };
            assert_eq!(path[0], agent.start);
            assert_eq!(path.last(), Some(&agent.goal));

            for constraint in &constraints {
                let time_step = constraint.time_step();
                match constraint.next_position() {
                    None => assert_ne!(position_at(&path, time_step), constraint.position()),
                    Some(next) => assert!(
                        position_at(&path, time_step - 1) != constraint.position()
                            || position_at(&path, time_step) != next
                    ),
                }
            }
        }
    }
}
