//! Error taxonomy for the simulation kernel.

use thiserror::Error;

/// An invalid parameter or initial particle, reported before any step runs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Smoothing radius must be positive and finite.
    #[error("smoothing radius must be positive and finite, got {0}")]
    SmoothingRadius(f32),
    /// Smoothing radius is so small that its kernel coefficients overflow f32.
    #[error("smoothing radius {0} is too small: kernel coefficients overflow")]
    KernelCoefficients(f32),
    /// Time step must be positive and finite.
    #[error("time step must be positive and finite, got {0}")]
    TimeStep(f32),
    /// Rest density must be positive and finite.
    #[error("rest density must be positive and finite, got {0}")]
    RestDensity(f32),
    /// Stiffness must be positive and finite.
    #[error("stiffness must be positive and finite, got {0}")]
    Stiffness(f32),
    /// Viscosity must be non-negative and finite.
    #[error("viscosity must be non-negative and finite, got {0}")]
    Viscosity(f32),
    /// Restitution must lie in [0, 1].
    #[error("restitution must lie in [0, 1], got {0}")]
    Restitution(f32),
    /// Velocity clamp must be positive (infinity disables it).
    #[error("max speed must be positive, got {0}")]
    MaxSpeed(f32),
    /// Tait exponent must be positive and finite.
    #[error("equation of state exponent must be positive and finite, got {0}")]
    TaitGamma(f32),
    /// Gravity components must be finite.
    #[error("gravity must be finite, got {0:?}")]
    Gravity([f32; 3]),
    /// Domain corner is non-finite or min >= max on some axis.
    #[error("domain bounds invalid on axis {axis}: min {min} must be finite and below max {max}")]
    Domain {
        /// Offending axis (0 = x, 1 = y, 2 = z)
        axis: usize,
        /// Minimum bound on that axis
        min: f32,
        /// Maximum bound on that axis
        max: f32,
    },
    /// The neighbor grid over this domain would have too many cells.
    #[error("domain needs {cells} grid cells at this smoothing radius (limit {limit})")]
    GridTooLarge {
        /// Cells the grid would need
        cells: u64,
        /// Largest supported cell count
        limit: u64,
    },
    /// Wall penalty stiffness or margin is negative or non-finite.
    #[error("wall penalty needs non-negative finite stiffness and margin, got stiffness {stiffness}, margin {margin}")]
    WallPenalty {
        /// Penalty stiffness
        stiffness: f32,
        /// Activation distance from the wall
        margin: f32,
    },
    /// Drag coefficient is negative or non-finite, or the ambient velocity is non-finite.
    #[error("drag needs a non-negative finite coefficient and finite ambient velocity, got coefficient {coefficient}, ambient {ambient_velocity:?}")]
    Drag {
        /// Drag coefficient
        coefficient: f32,
        /// Ambient flow velocity
        ambient_velocity: [f32; 3],
    },
    /// A particle's mass is not positive and finite.
    #[error("particle {index} has invalid mass {mass}")]
    Mass {
        /// Particle index
        index: usize,
        /// Offending mass
        mass: f32,
    },
    /// A particle's initial position or velocity is not finite.
    #[error("particle {index} has a non-finite initial {quantity}")]
    NonFiniteParticle {
        /// Particle index
        index: usize,
        /// Which quantity ("position" or "velocity")
        quantity: Quantity,
    },
}

/// Per-particle vector quantity named in errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantity {
    /// Position
    Position,
    /// Velocity
    Velocity,
}

impl std::fmt::Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Quantity::Position => f.write_str("position"),
            Quantity::Velocity => f.write_str("velocity"),
        }
    }
}

/// Errors surfaced by the simulation controller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    /// Invalid parameters or initial particles. Fatal to the run.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),
    /// Non-finite state after a step. The step was rolled back.
    #[error("step {step} produced a non-finite {quantity} for particle {particle}; state rolled back")]
    Numerical {
        /// Index of the failed step (0-based count of steps attempted before it)
        step: u64,
        /// First offending particle
        particle: usize,
        /// Which quantity went non-finite
        quantity: Quantity,
    },
}

impl SimError {
    /// `true` for errors after which the host may retry (e.g. with a smaller dt).
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SimError::Numerical { .. })
    }
}
