//! Simulation parameters and their validation.

use serde::{Deserialize, Serialize};

use crate::boundary::WallPenalty;
use crate::eos::{EquationOfState, PressurePolicy};
use crate::error::{ConfigError, Quantity};
use crate::forces::Drag;
use crate::integrator::IntegrationScheme;
use crate::neighbor::NeighborGrid;
use crate::parallel::ExecutionMode;
use crate::particle::ParticleRecord;
use crate::sph::SmoothingKernels;

/// Largest neighbor grid (in cells) a domain may require.
pub const MAX_GRID_CELLS: u64 = 1 << 24;

/// Physical and numerical parameters of a run.
///
/// Immutable while the run steps; the host may swap them between steps via
/// [`crate::Simulation::reconfigure`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationParams {
    /// Kernel support radius h
    #[serde(default = "default_smoothing_radius")]
    pub smoothing_radius: f32,
    /// Rest density rho0
    #[serde(default = "default_rest_density")]
    pub rest_density: f32,
    /// Gas constant / stiffness k of the equation of state
    #[serde(default = "default_stiffness")]
    pub stiffness: f32,
    /// Dynamic viscosity coefficient mu
    #[serde(default = "default_viscosity")]
    pub viscosity: f32,
    /// Gravity vector
    #[serde(default = "default_gravity")]
    pub gravity: [f32; 3],
    /// Fixed time step dt
    #[serde(default = "default_time_step")]
    pub time_step: f32,
    /// Minimum corner of the simulation volume
    #[serde(default = "default_domain_min")]
    pub domain_min: [f32; 3],
    /// Maximum corner of the simulation volume
    #[serde(default = "default_domain_max")]
    pub domain_max: [f32; 3],
    /// Fraction of normal velocity kept (and reversed) at a wall
    #[serde(default = "default_restitution")]
    pub restitution: f32,
    /// Per-component velocity clamp
    #[serde(default = "default_max_speed")]
    pub max_speed: f32,
    /// Density to pressure relation
    #[serde(default)]
    pub equation_of_state: EquationOfState,
    /// Treatment of negative pressure
    #[serde(default)]
    pub pressure_policy: PressurePolicy,
    /// Optional soft repulsion near walls
    #[serde(default)]
    pub wall_penalty: Option<WallPenalty>,
    /// Optional linear drag toward an ambient flow
    #[serde(default)]
    pub drag: Option<Drag>,
    /// Run per-particle stage work on one thread or the rayon pool
    #[serde(default)]
    pub execution: ExecutionMode,
    /// Time integration scheme
    #[serde(default)]
    pub integrator: IntegrationScheme,
}

// Default values
fn default_smoothing_radius() -> f32 {
    0.1
}

fn default_rest_density() -> f32 {
    1000.0
}

fn default_stiffness() -> f32 {
    200.0
}

fn default_viscosity() -> f32 {
    0.25
}

fn default_gravity() -> [f32; 3] {
    [0.0, -9.81, 0.0]
}

fn default_time_step() -> f32 {
    0.001
}

fn default_domain_min() -> [f32; 3] {
    [0.0; 3]
}

fn default_domain_max() -> [f32; 3] {
    [1.0; 3]
}

fn default_restitution() -> f32 {
    0.5
}

fn default_max_speed() -> f32 {
    50.0
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            smoothing_radius: default_smoothing_radius(),
            rest_density: default_rest_density(),
            stiffness: default_stiffness(),
            viscosity: default_viscosity(),
            gravity: default_gravity(),
            time_step: default_time_step(),
            domain_min: default_domain_min(),
            domain_max: default_domain_max(),
            restitution: default_restitution(),
            max_speed: default_max_speed(),
            equation_of_state: EquationOfState::default(),
            pressure_policy: PressurePolicy::default(),
            wall_penalty: None,
            drag: None,
            execution: ExecutionMode::default(),
            integrator: IntegrationScheme::default(),
        }
    }
}

fn positive_finite(v: f32) -> bool {
    v.is_finite() && v > 0.0
}

impl SimulationParams {
    /// Check every parameter invariant.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !positive_finite(self.smoothing_radius) {
            return Err(ConfigError::SmoothingRadius(self.smoothing_radius));
        }
        if !SmoothingKernels::new(self.smoothing_radius).is_finite() {
            return Err(ConfigError::KernelCoefficients(self.smoothing_radius));
        }
        if !positive_finite(self.time_step) {
            return Err(ConfigError::TimeStep(self.time_step));
        }
        if !positive_finite(self.rest_density) {
            return Err(ConfigError::RestDensity(self.rest_density));
        }
        if !positive_finite(self.stiffness) {
            return Err(ConfigError::Stiffness(self.stiffness));
        }
        if !(self.viscosity.is_finite() && self.viscosity >= 0.0) {
            return Err(ConfigError::Viscosity(self.viscosity));
        }
        if !(0.0..=1.0).contains(&self.restitution) {
            return Err(ConfigError::Restitution(self.restitution));
        }
        // NaN fails the comparison; +inf disables the clamp.
        if !(self.max_speed > 0.0) {
            return Err(ConfigError::MaxSpeed(self.max_speed));
        }
        if let EquationOfState::Tait { gamma } = self.equation_of_state {
            if !positive_finite(gamma) {
                return Err(ConfigError::TaitGamma(gamma));
            }
        }
        if self.gravity.iter().any(|g| !g.is_finite()) {
            return Err(ConfigError::Gravity(self.gravity));
        }
        for axis in 0..3 {
            let min = self.domain_min[axis];
            let max = self.domain_max[axis];
            if !(min.is_finite() && max.is_finite() && min < max) {
                return Err(ConfigError::Domain { axis, min, max });
            }
        }
        let dims = NeighborGrid::dims_for(self.smoothing_radius, self.domain_min, self.domain_max);
        let cells = dims.iter().fold(1u64, |acc, &d| acc.saturating_mul(d as u64));
        if cells > MAX_GRID_CELLS {
            return Err(ConfigError::GridTooLarge {
                cells,
                limit: MAX_GRID_CELLS,
            });
        }
        if let Some(penalty) = self.wall_penalty {
            let ok = |v: f32| v.is_finite() && v >= 0.0;
            if !(ok(penalty.stiffness) && ok(penalty.margin)) {
                return Err(ConfigError::WallPenalty {
                    stiffness: penalty.stiffness,
                    margin: penalty.margin,
                });
            }
        }
        if let Some(drag) = self.drag {
            if !(drag.coefficient.is_finite() && drag.coefficient >= 0.0)
                || drag.ambient_velocity.iter().any(|v| !v.is_finite())
            {
                return Err(ConfigError::Drag {
                    coefficient: drag.coefficient,
                    ambient_velocity: drag.ambient_velocity,
                });
            }
        }
        Ok(())
    }
}

/// Check host-supplied initial particles: positive finite mass, finite state.
pub fn validate_particles(records: &[ParticleRecord]) -> Result<(), ConfigError> {
    for (index, record) in records.iter().enumerate() {
        if !positive_finite(record.mass) {
            return Err(ConfigError::Mass {
                index,
                mass: record.mass,
            });
        }
        if record.position.iter().any(|v| !v.is_finite()) {
            return Err(ConfigError::NonFiniteParticle {
                index,
                quantity: Quantity::Position,
            });
        }
        if record.velocity.iter().any(|v| !v.is_finite()) {
            return Err(ConfigError::NonFiniteParticle {
                index,
                quantity: Quantity::Velocity,
            });
        }
    }
    Ok(())
}
