use crate::common::{build_agents, Agent};
use crate::map::Map;

use anyhow::{anyhow, Context, Result};
use std::fs;
use tracing::info;

/// A parsed instance: the grid plus one agent per start/goal pair.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub map: Map,
    pub agents: Vec<Agent>,
}

fn parse_numbers<const N: usize>(line: &str) -> Result<[usize; N]> {
    let numbers = line
        .split_whitespace()
        .map(|token| {
            token
                .parse::<usize>()
                .with_context(|| format!("invalid number {token:?}"))
        })
        .collect::<Result<Vec<_>>>()?;
    numbers
        .try_into()
        .map_err(|numbers: Vec<usize>| anyhow!("expected {N} numbers, got {}", numbers.len()))
}

impl Scenario {
    pub fn load_from_file(path: &str) -> Result<Scenario> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read instance file {path}"))?;
        let scenario = Self::parse(&content)
            .with_context(|| format!("failed to parse instance file {path}"))?;
        info!(
            "Loaded {path}: {}x{} map, {} agents",
            scenario.map.height,
            scenario.map.width,
            scenario.agents.len()
        );
        Ok(scenario)
    }

    /// Layout: `rows cols`, then `rows` lines of `@` (blocked) / `.` (free),
    /// then the agent count and one `sx sy gx gy` line per agent. Whitespace
    /// between cells is ignored.
    pub fn parse(content: &str) -> Result<Scenario> {
        let mut lines = content
            .lines()
            .enumerate()
            .map(|(index, line)| (index + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty());

        let (line_number, header) = lines.next().ok_or_else(|| anyhow!("empty instance"))?;
        let [rows, cols] =
            parse_numbers(header).with_context(|| format!("bad header on line {line_number}"))?;

        let mut blocked = Vec::with_capacity(rows);
        for row in 0..rows {
            let (line_number, line) = lines
                .next()
                .ok_or_else(|| anyhow!("expected {rows} grid rows, found {row}"))?;
            let cells = line
                .chars()
                .filter(|ch| !ch.is_whitespace())
                .map(|ch| match ch {
                    '@' => Ok(true),
                    '.' => Ok(false),
                    other => Err(anyhow!("unexpected cell {other:?} on line {line_number}")),
                })
                .collect::<Result<Vec<bool>>>()?;
            if cells.len() != cols {
                return Err(anyhow!(
                    "line {line_number} has {} cells, expected {cols}",
                    cells.len()
                ));
            }
            blocked.push(cells);
        }
        let map = Map::from_grid(blocked)?;

        let (line_number, count_line) = lines
            .next()
            .ok_or_else(|| anyhow!("missing agent count"))?;
        let [num_agents] = parse_numbers(count_line)
            .with_context(|| format!("bad agent count on line {line_number}"))?;

        let mut starts = Vec::with_capacity(num_agents);
        let mut goals = Vec::with_capacity(num_agents);
        for agent in 0..num_agents {
            let (line_number, line) = lines
                .next()
                .ok_or_else(|| anyhow!("expected {num_agents} agents, found {agent}"))?;
            let [sx, sy, gx, gy] = parse_numbers(line)
                .with_context(|| format!("bad agent line {line_number}"))?;
            starts.push((sx, sy));
            goals.push((gx, gy));
        }

        let agents = build_agents(&map, &starts, &goals)?;
        Ok(Scenario { map, agents })
    }
}
