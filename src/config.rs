use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::agent::{AgentParams, PsoCoefficients, Weights};
use crate::bounds::BoundsMode;
use crate::error::ConfigError;
use crate::math::MathMode;
use crate::neighbors::IndexKind;

pub const MAX_AGENTS: usize = 20_000;

/// How agents of a flock see each other within one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateOrder {
    /// Every agent reads the states captured at the start of the tick.
    #[default]
    Snapshot,
    /// Agents update in order against live state, so later agents see
    /// earlier agents' new positions within the same tick.
    Sequential,
}

/// Spawn configuration supplied by the surrounding setup layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlockConfig {
    pub count: usize,
    pub spawn_point: Vec3,
    pub spawn_radius: f32,
    pub speed: f32,
    pub perception_radius: f32,
    pub weights: Weights,
    /// Distance to the target at which an agent counts as having reached it.
    pub arrival_radius: f32,
    pub update_order: UpdateOrder,
    pub neighbor_index: IndexKind,
    pub math_mode: MathMode,
    pub bounds_mode: BoundsMode,
}

impl Default for FlockConfig {
    fn default() -> Self {
        Self {
            count: 20,
            spawn_point: Vec3::new(0.0, 10.0, 0.0),
            spawn_radius: 5.0,
            speed: 5.0,
            perception_radius: 5.0,
            weights: Weights::default(),
            arrival_radius: 1.0,
            update_order: UpdateOrder::default(),
            neighbor_index: IndexKind::default(),
            math_mode: MathMode::default(),
            bounds_mode: BoundsMode::default(),
        }
    }
}

impl FlockConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.count > MAX_AGENTS {
            return Err(ConfigError::TooMany {
                requested: self.count,
                limit: MAX_AGENTS,
            });
        }

        for (field, value) in [
            ("spawn_point.x", self.spawn_point.x),
            ("spawn_point.y", self.spawn_point.y),
            ("spawn_point.z", self.spawn_point.z),
            ("weights.alignment", self.weights.alignment),
            ("weights.cohesion", self.weights.cohesion),
            ("weights.separation", self.weights.separation),
            ("weights.pathfinding", self.weights.pathfinding),
        ] {
            ensure_finite(field, value)?;
        }

        for (field, value) in [
            ("spawn_radius", self.spawn_radius),
            ("speed", self.speed),
            ("perception_radius", self.perception_radius),
            ("arrival_radius", self.arrival_radius),
        ] {
            ensure_finite(field, value)?;
            if value < 0.0 {
                return Err(ConfigError::Negative { field, value });
            }
        }

        Ok(())
    }

    pub fn agent_params(&self, pso: PsoCoefficients) -> AgentParams {
        AgentParams {
            weights: self.weights,
            pso,
            perception_radius: self.perception_radius,
            speed: self.speed,
        }
    }
}

fn ensure_finite(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NonFinite { field, value })
    }
}
