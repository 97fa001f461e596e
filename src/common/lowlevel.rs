use std::cmp::Ordering;

/// A search state stored in the low-level arena. Parents are arena indices.
#[derive(Debug, Clone)]
pub(crate) struct LowLevelNode {
    pub(crate) position: (usize, usize),
    pub(crate) g_cost: usize, // Uniform cost, so this is also the time step
    pub(crate) h_open_cost: usize,
    pub(crate) parent: Option<usize>,
}

impl LowLevelNode {
    pub(crate) fn f_open_cost(&self) -> usize {
        self.g_cost + self.h_open_cost
    }
}

// Open List Wrapper
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct OpenOrderWrapper {
    pub(crate) f_open_cost: usize,
    pub(crate) h_open_cost: usize,
    pub(crate) position: (usize, usize),
    pub(crate) index: usize,
}

impl PartialOrd for OpenOrderWrapper {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenOrderWrapper {
    fn cmp(&self, other: &Self) -> Ordering {
        self.f_open_cost
            .cmp(&other.f_open_cost)
            // Lower h (deeper node) first
            .then_with(|| self.h_open_cost.cmp(&other.h_open_cost))
            .then_with(|| self.position.cmp(&other.position))
            // Same position and f at different time steps: older node first.
            .then_with(|| self.index.cmp(&other.index))
    }
}

impl OpenOrderWrapper {
    pub(crate) fn from_node(node: &LowLevelNode, index: usize) -> Self {
        OpenOrderWrapper {
            f_open_cost: node.f_open_cost(),
            h_open_cost: node.h_open_cost,
            position: node.position,
            index,
        }
    }
}
