use std::cmp::Reverse;
use std::collections::BinaryHeap;

use anyhow::anyhow;

/// Distance table towards a single goal, indexed `[row][col]`.
/// Unreachable cells hold `usize::MAX`.
pub type Heuristic = Vec<Vec<usize>>;

#[derive(Debug, Clone)]
pub struct Tile {
    passable: bool,
    pub neighbors: Vec<(usize, usize)>, // Accessible neighbors, including the tile itself (wait)
}

impl Tile {
    pub fn is_passable(&self) -> bool {
        self.passable
    }
}

#[derive(Debug, Clone)]
pub struct Map {
    pub height: usize,
    pub width: usize,
    pub grid: Vec<Vec<Tile>>,
}

impl Map {
    /// Builds a map from an occupancy matrix where `true` marks a blocked cell.
    pub fn from_grid(blocked: Vec<Vec<bool>>) -> anyhow::Result<Self> {
        let height = blocked.len();
        let width = blocked.first().map_or(0, |row| row.len());

        let mut grid = Vec::with_capacity(height);
        for (row_index, row) in blocked.into_iter().enumerate() {
            if row.len() != width {
                return Err(anyhow!(
                    "Row {} has {} cells, expected {}",
                    row_index,
                    row.len(),
                    width
                ));
            }
            let tiles_row: Vec<Tile> = row
                .into_iter()
                .map(|is_blocked| Tile {
                    passable: !is_blocked,
                    neighbors: Vec::new(),
                })
                .collect();
            grid.push(tiles_row);
        }

        let mut map = Map {
            height,
            width,
            grid,
        };
        map.initialize_neighbors();
        Ok(map)
    }

    fn initialize_neighbors(&mut self) {
        for x in 0..self.height {
            for y in 0..self.width {
                if self.grid[x][y].passable {
                    self.grid[x][y].neighbors = self.get_neighbors(x, y);
                }
            }
        }
    }

    pub fn get_neighbors(&self, x: usize, y: usize) -> Vec<(usize, usize)> {
        let directions = [(-1, 0), (1, 0), (0, -1), (0, 1), (0, 0)]; // Up, down, left, right, stay
        let mut neighbors = Vec::new();

        for &(dx, dy) in &directions {
            let new_x = x as i64 + dx;
            let new_y = y as i64 + dy;
            if new_x >= 0
                && new_y >= 0
                && new_x < self.height as i64
                && new_y < self.width as i64
                && self.grid[new_x as usize][new_y as usize].passable
            {
                neighbors.push((new_x as usize, new_y as usize));
            }
        }

        neighbors
    }

    pub fn in_bounds(&self, position: (usize, usize)) -> bool {
        position.0 < self.height && position.1 < self.width
    }

    pub fn is_passable(&self, x: usize, y: usize) -> bool {
        self.grid[x][y].is_passable()
    }

    /// Uniform-cost search outwards from `goal` over the cardinal moves.
    pub fn heuristic_dji(&self, goal: (usize, usize)) -> Heuristic {
        let mut heuristic = vec![vec![usize::MAX; self.width]; self.height];
        let mut heap = BinaryHeap::new();

        heuristic[goal.0][goal.1] = 0;
        heap.push((Reverse(0), goal));

        while let Some((Reverse(cost), (x, y))) = heap.pop() {
            if cost > heuristic[x][y] {
                continue;
            }

            for &(new_x, new_y) in &self.grid[x][y].neighbors {
                let next_cost = cost + 1;
                if next_cost < heuristic[new_x][new_y] {
                    heap.push((Reverse(next_cost), (new_x, new_y)));
                    heuristic[new_x][new_y] = next_cost;
                }
            }
        }

        heuristic
    }
}

#[cfg(test)]
pub(crate) fn grid_from_rows(rows: &[&str]) -> Map {
    let blocked = rows
        .iter()
        .map(|row| row.chars().map(|ch| ch == '@').collect())
        .collect();
    Map::from_grid(blocked).unwrap()
}
