use glam::Vec3;
use serde::{Deserialize, Serialize};

pub const EPSILON: f32 = 1.0e-6;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MathMode {
    #[default]
    Accurate,
    Fast,
}

pub fn distance_sq(a: Vec3, b: Vec3) -> f32 {
    (a - b).length_squared()
}

pub fn distance(a: Vec3, b: Vec3) -> f32 {
    (a - b).length()
}

/// Unit vector along `v`, or the zero vector when `v` has no direction.
pub fn normalize_or_zero(v: Vec3) -> Vec3 {
    normalize_to_magnitude(MathMode::Accurate, v, 1.0)
}

pub fn normalize_to_magnitude(mode: MathMode, v: Vec3, magnitude: f32) -> Vec3 {
    let mag_sq = v.length_squared();
    if mag_sq <= EPSILON * EPSILON || !mag_sq.is_finite() {
        return Vec3::ZERO;
    }

    v * (magnitude * inverse_sqrt(mode, mag_sq))
}

/// Clamps `v` to at most `max_magnitude`. Always exact: the result is used
/// for hard caps (sub-force limit, agent speed).
pub fn limit_magnitude(v: Vec3, max_magnitude: f32) -> Vec3 {
    if max_magnitude <= 0.0 {
        return Vec3::ZERO;
    }

    let mag_sq = v.length_squared();
    if mag_sq <= max_magnitude * max_magnitude {
        return v;
    }

    v * (max_magnitude / mag_sq.sqrt())
}

fn inverse_sqrt(mode: MathMode, value: f32) -> f32 {
    match mode {
        MathMode::Accurate => 1.0 / value.sqrt(),
        MathMode::Fast => fast_inverse_sqrt(value),
    }
}

// One Newton-Raphson refinement keeps this fast while staying stable enough
// for steering directions where small precision drift is acceptable.
fn fast_inverse_sqrt(value: f32) -> f32 {
    let half = 0.5 * value;
    let mut i = value.to_bits();
    i = 0x5f37_59df_u32.wrapping_sub(i >> 1);
    let mut y = f32::from_bits(i);
    y *= 1.5 - half * y * y;
    y.max(0.0)
}
