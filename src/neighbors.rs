//! Neighbor queries over a flock snapshot. Agents never hold a reference to
//! their flock; each tick they get a [`NeighborQuery`] over its states.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::agent::AgentState;
use crate::neighbor_grid::NeighborGrid;

pub trait NeighborQuery {
    /// Pushes into `out` the index of every state strictly closer than
    /// `radius` to `point`, in ascending order. An agent querying around its
    /// own position finds itself.
    fn query(&self, point: Vec3, radius: f32, out: &mut Vec<usize>);

    fn all(&self) -> &[AgentState];
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexKind {
    BruteForce,
    #[default]
    Grid,
}

pub enum NeighborIndex {
    BruteForce,
    Grid(NeighborGrid),
}

impl NeighborIndex {
    pub fn new(kind: IndexKind, cell_size: f32) -> Self {
        match kind {
            IndexKind::BruteForce => Self::BruteForce,
            IndexKind::Grid => Self::Grid(NeighborGrid::new(cell_size)),
        }
    }

    pub fn rebuild(&mut self, states: &[AgentState]) {
        if let Self::Grid(grid) = self {
            grid.rebuild(states.iter().map(|s| s.position));
        }
    }

    pub fn view<'a>(&'a self, states: &'a [AgentState]) -> NeighborView<'a> {
        let grid = match self {
            Self::BruteForce => None,
            Self::Grid(grid) => Some(grid),
        };
        NeighborView { states, grid }
    }
}

pub struct NeighborView<'a> {
    states: &'a [AgentState],
    grid: Option<&'a NeighborGrid>,
}

impl<'a> NeighborView<'a> {
    pub fn brute_force(states: &'a [AgentState]) -> Self {
        Self { states, grid: None }
    }
}

impl NeighborQuery for NeighborView<'_> {
    fn query(&self, point: Vec3, radius: f32, out: &mut Vec<usize>) {
        let start = out.len();
        match self.grid {
            Some(grid) if grid.len() == self.states.len() => {
                grid.for_each_within(point, radius, |j| out.push(j));
                out[start..].sort_unstable();
            }
            _ => brute_force_within(self.states, point, radius, out),
        }
    }

    fn all(&self) -> &[AgentState] {
        self.states
    }
}

pub fn brute_force_within(states: &[AgentState], point: Vec3, radius: f32, out: &mut Vec<usize>) {
    if radius.is_nan() || radius <= 0.0 {
        return;
    }
    let radius_sq = radius * radius;
    out.extend(
        states
            .iter()
            .enumerate()
            .filter(|(_, s)| (s.position - point).length_squared() < radius_sq)
            .map(|(i, _)| i),
    );
}
