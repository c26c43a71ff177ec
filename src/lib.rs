use glam::Vec3;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use wasm_bindgen::prelude::*;

pub mod agent;
pub mod bounds;
pub mod config;
pub mod error;
pub mod flock;
pub mod math;
pub mod neighbor_grid;
pub mod neighbors;
pub mod schedule;
pub mod simulation;
pub mod target;

pub use agent::{Agent, AgentId, AgentParams, AgentState, PsoCoefficients, Steering, Weights};
pub use bounds::{BoundsMode, WorldBounds};
pub use config::{FlockConfig, UpdateOrder};
pub use error::{ConfigError, SimError};
pub use flock::{Flock, TickReport};
pub use neighbors::{IndexKind, NeighborQuery};
pub use schedule::SocialSchedule;
pub use simulation::FlockSimulation;
pub use target::{StaticTarget, TargetProvider};

const DEFAULT_ARENA_HALF_EXTENT: f32 = 50.0;

/// Host-facing handle: one flock chasing a target the host sets.
#[wasm_bindgen]
pub struct Sim {
    simulation: FlockSimulation<StaticTarget>,
    schedule: SocialSchedule,
    rng: SmallRng,
    positions: Vec<f32>,
    velocities: Vec<f32>,
}

#[wasm_bindgen]
impl Sim {
    /// Flock with default settings in a square arena centred on the origin.
    /// A `seed` of 0 draws one from the platform.
    #[wasm_bindgen(constructor)]
    pub fn new(count: usize, seed: u32, spawn_radius: f32, speed: f32) -> Result<Sim, JsError> {
        let config = FlockConfig {
            count,
            spawn_radius,
            speed,
            ..Default::default()
        };
        Ok(Self::try_build(config, &default_markers(), seed)?)
    }

    /// Flock from a JSON [`FlockConfig`] and flat `x, y, z` boundary markers.
    pub fn from_config(json: &str, markers: &[f32], seed: u32) -> Result<Sim, JsError> {
        Ok(Self::try_from_config(json, markers, seed)?)
    }

    /// Runs one tick. Returns true when the current target was reached.
    pub fn step(&mut self, dt: f32) -> bool {
        let report = self.simulation.tick(dt);
        self.sync_render_buffers();
        report.arrived.is_some()
    }

    pub fn set_target(&mut self, x: f32, y: f32, z: f32) {
        self.simulation.provider_mut().set(Vec3::new(x, y, z));
    }

    pub fn clear_target(&mut self) {
        self.simulation.provider_mut().clear();
    }

    pub fn has_target(&self) -> bool {
        self.simulation.current_target().is_some()
    }

    pub fn targets_reached(&self) -> u32 {
        self.simulation.targets_reached()
    }

    /// Replaces the flock with a fresh, less social one.
    pub fn respawn(&mut self) -> Result<(), JsError> {
        Ok(self.try_respawn()?)
    }

    pub fn count(&self) -> usize {
        self.simulation.flock().len()
    }

    pub fn social(&self) -> f32 {
        self.simulation
            .flock()
            .get(0)
            .map_or(0.0, |agent| agent.pso().social)
    }

    /// Flat `x, y, z` positions, one triple per agent.
    pub fn positions(&self) -> Vec<f32> {
        self.positions.clone()
    }

    /// Flat `x, y, z` velocities, one triple per agent.
    pub fn velocities(&self) -> Vec<f32> {
        self.velocities.clone()
    }

    /// Mean position as `[x, y, z]`, empty for an empty flock.
    pub fn centroid(&self) -> Vec<f32> {
        self.simulation
            .flock()
            .centroid()
            .map(|c| c.to_array().to_vec())
            .unwrap_or_default()
    }
}

impl Sim {
    pub fn try_from_config(json: &str, markers: &[f32], seed: u32) -> Result<Self, SimError> {
        let config = FlockConfig::from_json(json)?;
        let markers = markers_from_flat(markers)?;
        Self::try_build(config, &markers, seed)
    }

    pub fn try_build(config: FlockConfig, markers: &[Vec3], seed: u32) -> Result<Self, SimError> {
        let seed = if seed == 0 {
            getrandom::u64()?
        } else {
            u64::from(seed)
        };
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut schedule = SocialSchedule::default();

        let bounds = WorldBounds::build(config.bounds_mode, markers.iter().copied());
        let flock = Flock::spawn(config, bounds, &mut schedule, &mut rng)?;
        let mut sim = Self {
            simulation: FlockSimulation::new(flock, StaticTarget::default()),
            schedule,
            rng,
            positions: Vec::new(),
            velocities: Vec::new(),
        };
        sim.sync_render_buffers();
        Ok(sim)
    }

    pub fn try_respawn(&mut self) -> Result<(), SimError> {
        self.simulation.respawn(&mut self.schedule, &mut self.rng)?;
        self.sync_render_buffers();
        Ok(())
    }

    pub fn simulation(&self) -> &FlockSimulation<StaticTarget> {
        &self.simulation
    }

    fn sync_render_buffers(&mut self) {
        let agents = self.simulation.flock().agents();
        self.positions.clear();
        self.velocities.clear();
        for agent in agents {
            self.positions.extend_from_slice(&agent.position().to_array());
            self.velocities.extend_from_slice(&agent.velocity().to_array());
        }
    }
}

fn default_markers() -> [Vec3; 4] {
    let e = DEFAULT_ARENA_HALF_EXTENT;
    [
        Vec3::new(e, 0.0, 0.0),
        Vec3::new(-e, 0.0, 0.0),
        Vec3::new(0.0, 0.0, e),
        Vec3::new(0.0, 0.0, -e),
    ]
}

fn markers_from_flat(flat: &[f32]) -> Result<Vec<Vec3>, SimError> {
    if flat.len() % 3 != 0 {
        return Err(SimError::MarkerBuffer(flat.len()));
    }
    Ok(flat.chunks_exact(3).map(Vec3::from_slice).collect())
}
