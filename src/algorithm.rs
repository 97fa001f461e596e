mod astar;

pub use astar::a_star_search;

use crate::common::{LowLevelNode, Path};

fn construct_path(arena: &[LowLevelNode], mut index: usize) -> Path {
    let mut path = vec![arena[index].position];
    while let Some(parent) = arena[index].parent {
        path.push(arena[parent].position);
        index = parent;
    }
    path.reverse();
    path
}
