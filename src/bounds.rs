//! World volume the flock lives in.
//!
//! Each axis is the half-open interval `[min, max)`. Positions leaving the
//! volume wrap to the opposite face: one at or past an upper face lands on
//! the lower face, one below a lower face lands on the last value inside
//! the upper face.

use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

// The floor is always at y = 0.
pub const CEILING: f32 = 40.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundsMode {
    /// Single ordered walk with an `else if` between the max and min tests,
    /// starting from zero extents.
    #[default]
    Reference,
    Enclosing,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WorldBounds {
    pub x_min: f32,
    pub x_max: f32,
    pub y_max: f32,
    pub z_min: f32,
    pub z_max: f32,
}

impl Default for WorldBounds {
    fn default() -> Self {
        Self {
            x_min: 0.0,
            x_max: 0.0,
            y_max: CEILING,
            z_min: 0.0,
            z_max: 0.0,
        }
    }
}

impl WorldBounds {
    pub fn build<I>(mode: BoundsMode, markers: I) -> Self
    where
        I: IntoIterator<Item = Vec3>,
    {
        match mode {
            BoundsMode::Reference => Self::from_markers(markers),
            BoundsMode::Enclosing => Self::enclosing(markers),
        }
    }

    /// Extents start at zero, so the resulting box always contains the
    /// origin on the x and z axes. A marker that raises a max is never
    /// tested against the min.
    pub fn from_markers<I>(markers: I) -> Self
    where
        I: IntoIterator<Item = Vec3>,
    {
        let mut bounds = Self::default();
        for marker in markers {
            if marker.x > bounds.x_max {
                bounds.x_max = marker.x;
            } else if marker.x < bounds.x_min {
                bounds.x_min = marker.x;
            }

            if marker.z > bounds.z_max {
                bounds.z_max = marker.z;
            } else if marker.z < bounds.z_min {
                bounds.z_min = marker.z;
            }
        }
        bounds
    }

    /// Exact x/z bounding box of `markers`. No markers gives the zero box.
    pub fn enclosing<I>(markers: I) -> Self
    where
        I: IntoIterator<Item = Vec3>,
    {
        let mut markers = markers.into_iter();
        let Some(first) = markers.next() else {
            return Self::default();
        };

        let (min, max) = markers.fold((first, first), |(min, max), m| (min.min(m), max.max(m)));
        Self {
            x_min: min.x,
            x_max: max.x,
            y_max: CEILING,
            z_min: min.z,
            z_max: max.z,
        }
    }

    pub const fn y_min(&self) -> f32 {
        0.0
    }

    pub fn apply(&self, position: Vec3) -> Vec3 {
        Vec3::new(
            wrap_axis(position.x, self.x_min, self.x_max),
            wrap_axis(position.y, 0.0, self.y_max),
            wrap_axis(position.z, self.z_min, self.z_max),
        )
    }

    /// Half-open membership. Every output of [`Self::apply`] satisfies it
    /// and is left unchanged by a second `apply`.
    pub fn contains(&self, position: Vec3) -> bool {
        axis_contains(position.x, self.x_min, self.x_max)
            && axis_contains(position.y, 0.0, self.y_max)
            && axis_contains(position.z, self.z_min, self.z_max)
    }

    pub fn random_velocity<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec3 {
        Vec3::new(
            sample_axis(rng, self.x_min, self.x_max),
            sample_axis(rng, 0.0, self.y_max),
            sample_axis(rng, self.z_min, self.z_max),
        )
    }
}

fn wrap_axis(value: f32, min: f32, max: f32) -> f32 {
    if value >= max {
        min
    } else if value < min {
        last_inside(min, max)
    } else {
        value
    }
}

// A collapsed axis holds only `min`.
fn axis_contains(value: f32, min: f32, max: f32) -> bool {
    if min < max {
        min <= value && value < max
    } else {
        value == min
    }
}

// Largest f32 below `max`, clamped to `min`.
fn last_inside(min: f32, max: f32) -> f32 {
    if min >= max || min.is_nan() || max.is_nan() {
        return min;
    }
    let below = if max > 0.0 {
        f32::from_bits(max.to_bits() - 1)
    } else if max == 0.0 {
        -f32::from_bits(1)
    } else {
        f32::from_bits(max.to_bits() + 1)
    };
    below.max(min)
}

fn sample_axis<R: Rng + ?Sized>(rng: &mut R, min: f32, max: f32) -> f32 {
    if min < max {
        rng.random_range(min..=max)
    } else {
        min
    }
}
