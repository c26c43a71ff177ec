use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::bounds::WorldBounds;
use crate::math::{self, MathMode, EPSILON};
use crate::neighbors::NeighborQuery;

/// Upper bound on each unweighted steering sub-force.
pub const MAX_STEERING_FORCE: f32 = 0.25;

pub type AgentId = u32;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Weights {
    pub alignment: f32,
    pub cohesion: f32,
    pub separation: f32,
    pub pathfinding: f32,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            alignment: 1.0,
            cohesion: 1.0,
            separation: 1.0,
            pathfinding: 1.0,
        }
    }
}

/// Balance between an agent's own best position and the flock's.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PsoCoefficients {
    pub cognitive: f32,
    pub social: f32,
}

impl PsoCoefficients {
    pub fn from_social(social: f32) -> Self {
        Self {
            cognitive: 1.0 - social,
            social,
        }
    }
}

impl Default for PsoCoefficients {
    fn default() -> Self {
        Self {
            cognitive: 0.8,
            social: 0.2,
        }
    }
}

/// Spawn-time parameters shared by every agent of a flock.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AgentParams {
    pub weights: Weights,
    pub pso: PsoCoefficients,
    pub perception_radius: f32,
    pub speed: f32,
}

/// What other agents may read about an agent during a tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AgentState {
    pub id: AgentId,
    pub position: Vec3,
    pub velocity: Vec3,
    pub personal_best: Vec3,
}

/// The four unweighted steering sub-forces of one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Steering {
    pub separation: Vec3,
    pub alignment: Vec3,
    pub cohesion: Vec3,
    pub pathfinding: Vec3,
}

impl Steering {
    pub fn weighted(&self, weights: &Weights) -> Vec3 {
        self.separation * weights.separation
            + self.alignment * weights.alignment
            + self.cohesion * weights.cohesion
            + self.pathfinding * weights.pathfinding
    }

    pub fn max_magnitude(&self) -> f32 {
        [
            self.separation,
            self.alignment,
            self.cohesion,
            self.pathfinding,
        ]
        .iter()
        .map(|v| v.length())
        .fold(0.0, f32::max)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Agent {
    id: AgentId,
    position: Vec3,
    velocity: Vec3,
    personal_best: Vec3,
    weights: Weights,
    pso: PsoCoefficients,
    perception_radius: f32,
    speed: f32,
}

impl Agent {
    pub fn new(id: AgentId, position: Vec3, velocity: Vec3, params: AgentParams) -> Self {
        Self {
            id,
            position,
            velocity,
            personal_best: position,
            weights: params.weights,
            pso: params.pso,
            perception_radius: params.perception_radius,
            speed: params.speed,
        }
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    pub fn personal_best(&self) -> Vec3 {
        self.personal_best
    }

    pub fn weights(&self) -> Weights {
        self.weights
    }

    pub fn pso(&self) -> PsoCoefficients {
        self.pso
    }

    pub fn perception_radius(&self) -> f32 {
        self.perception_radius
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn state(&self) -> AgentState {
        AgentState {
            id: self.id,
            position: self.position,
            velocity: self.velocity,
            personal_best: self.personal_best,
        }
    }

    /// Queries neighbors around the current position and computes this
    /// tick's sub-forces. `own_index` is this agent's slot in
    /// `neighbors.all()` and is left out of the flocking terms.
    /// `global_best` is `None` when there is no target. Also returns how many
    /// neighbor indices the query produced.
    pub fn steering<Q>(
        &self,
        own_index: usize,
        neighbors: &Q,
        global_best: Option<Vec3>,
        mode: MathMode,
        scratch: &mut Vec<usize>,
    ) -> (Steering, usize)
    where
        Q: NeighborQuery + ?Sized,
    {
        scratch.clear();
        neighbors.query(self.position, self.perception_radius, scratch);
        let states = neighbors.all();
        let others = scratch
            .iter()
            .filter(|&&j| j != own_index)
            .filter_map(|&j| states.get(j));

        let (separation, alignment, cohesion) = self.flocking_forces(others, mode);
        let steering = Steering {
            separation,
            alignment,
            cohesion,
            pathfinding: self.pathfinding_force(global_best, mode),
        };
        (steering, scratch.len())
    }

    /// Separation, alignment and cohesion against `others`, which must not
    /// contain this agent. With no one around all three are zero.
    pub fn flocking_forces<'a, I>(&self, others: I, mode: MathMode) -> (Vec3, Vec3, Vec3)
    where
        I: IntoIterator<Item = &'a AgentState>,
    {
        let mut separation = Vec3::ZERO;
        let mut alignment = Vec3::ZERO;
        let mut cohesion = Vec3::ZERO;
        let mut count = 0usize;

        for other in others {
            count += 1;

            let offset = self.position - other.position;
            let dist_sq = offset.length_squared();
            // Coincident agents push in no particular direction.
            if dist_sq > EPSILON * EPSILON {
                separation += offset / dist_sq;
            }
            alignment += other.velocity;
            cohesion += other.position;
        }

        if count == 0 {
            return (Vec3::ZERO, Vec3::ZERO, Vec3::ZERO);
        }

        let inv = 1.0 / count as f32;
        (
            self.steer(separation * inv, mode),
            self.steer(alignment * inv, mode),
            self.steer(cohesion * inv - self.position, mode),
        )
    }

    pub fn pathfinding_force(&self, global_best: Option<Vec3>, mode: MathMode) -> Vec3 {
        let Some(global_best) = global_best else {
            return Vec3::ZERO;
        };

        let personal = self.pso.cognitive * (self.personal_best - self.position);
        let social = self.pso.social * (global_best - self.position);
        let desired = personal + social - self.velocity;

        math::limit_magnitude(
            math::normalize_to_magnitude(mode, desired, self.speed),
            MAX_STEERING_FORCE,
        )
    }

    /// Integrates one tick: apply `acceleration`, cap speed, move, record a
    /// better personal best, then wrap into `bounds`.
    pub fn advance(
        &mut self,
        acceleration: Vec3,
        dt: f32,
        target: Option<Vec3>,
        bounds: &WorldBounds,
    ) {
        self.velocity = math::limit_magnitude(self.velocity + acceleration, self.speed);
        self.position += self.velocity * dt;

        if let Some(target) = target {
            if math::distance_sq(self.position, target) < math::distance_sq(self.personal_best, target)
            {
                self.personal_best = self.position;
            }
        }

        self.position = bounds.apply(self.position);
    }

    /// Full tick for one agent. Returns the neighbor count of the query.
    #[allow(clippy::too_many_arguments)]
    pub fn update<Q>(
        &mut self,
        own_index: usize,
        neighbors: &Q,
        global_best: Option<Vec3>,
        target: Option<Vec3>,
        bounds: &WorldBounds,
        dt: f32,
        mode: MathMode,
        scratch: &mut Vec<usize>,
    ) -> usize
    where
        Q: NeighborQuery + ?Sized,
    {
        let (steering, visited) = self.steering(own_index, neighbors, global_best, mode, scratch);
        self.advance(steering.weighted(&self.weights), dt, target, bounds);
        visited
    }

    // Desired direction at full speed, minus current velocity, capped.
    fn steer(&self, desired: Vec3, mode: MathMode) -> Vec3 {
        math::limit_magnitude(
            math::normalize_to_magnitude(mode, desired, self.speed) - self.velocity,
            MAX_STEERING_FORCE,
        )
    }
}
