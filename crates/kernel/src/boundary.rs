//! Domain containment.
//!
//! Each particle is checked independently per axis against the axis-aligned
//! domain. A coordinate beyond a bound is clamped back onto the wall and its
//! velocity component along that axis is reflected and scaled by the
//! restitution coefficient. Handling axes one at a time resolves edges and
//! corners (two or three walls crossed in one step) without extra cases.

use serde::{Deserialize, Serialize};

use crate::particle::ParticleArrays;

/// Soft repulsion applied near walls, in addition to hard containment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WallPenalty {
    /// Acceleration per unit penetration into the margin
    pub stiffness: f32,
    /// Distance from a wall at which the penalty starts
    pub margin: f32,
}

/// Where a coordinate sits relative to one axis of the domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisState {
    /// Within `[min, max]` (NaN also reports `Inside`; the controller rejects it)
    Inside,
    /// Below the minimum wall
    BelowMin,
    /// Above the maximum wall
    AboveMax,
}

/// Classify a coordinate against one axis of the domain.
#[inline]
pub fn classify(coord: f32, min: f32, max: f32) -> AxisState {
    if coord < min {
        AxisState::BelowMin
    } else if coord > max {
        AxisState::AboveMax
    } else {
        AxisState::Inside
    }
}

/// Correct one coordinate/velocity pair. Returns `true` if a wall was crossed.
///
/// The velocity is reflected only while it still points out of the domain, so
/// a particle already moving back inside is not sent outward again.
#[inline]
pub fn resolve_axis(coord: &mut f32, vel: &mut f32, min: f32, max: f32, restitution: f32) -> bool {
    match classify(*coord, min, max) {
        AxisState::Inside => false,
        AxisState::BelowMin => {
            *coord = min;
            if *vel < 0.0 {
                *vel = -restitution * *vel;
            }
            true
        }
        AxisState::AboveMax => {
            *coord = max;
            if *vel > 0.0 {
                *vel = -restitution * *vel;
            }
            true
        }
    }
}

/// Enforce containment for every particle. Returns the number of wall corrections.
pub fn enforce_domain(
    particles: &mut ParticleArrays,
    domain_min: [f32; 3],
    domain_max: [f32; 3],
    restitution: f32,
) -> usize {
    let mut corrections = 0;
    let ParticleArrays {
        x, y, z, vx, vy, vz, ..
    } = particles;
    for (coords, vels, axis) in [(x, vx, 0), (y, vy, 1), (z, vz, 2)] {
        for (c, v) in coords.iter_mut().zip(vels.iter_mut()) {
            if resolve_axis(c, v, domain_min[axis], domain_max[axis], restitution) {
                corrections += 1;
            }
        }
    }
    corrections
}

/// Penalty acceleration pushing a particle away from walls it is within `margin` of.
///
/// Per axis: `stiffness * (margin - d)` toward the interior, where `d` is the
/// distance to the nearer wall (zero once outside).
pub fn wall_penalty_acceleration(
    pos: [f32; 3],
    domain_min: [f32; 3],
    domain_max: [f32; 3],
    penalty: &WallPenalty,
) -> [f32; 3] {
    let mut a = [0.0_f32; 3];
    if penalty.margin <= 0.0 || penalty.stiffness <= 0.0 {
        return a;
    }
    for axis in 0..3 {
        let d_min = (pos[axis] - domain_min[axis]).max(0.0);
        let d_max = (domain_max[axis] - pos[axis]).max(0.0);
        if d_min < penalty.margin {
            a[axis] += penalty.stiffness * (penalty.margin - d_min);
        }
        if d_max < penalty.margin {
            a[axis] -= penalty.stiffness * (penalty.margin - d_max);
        }
    }
    a
}
