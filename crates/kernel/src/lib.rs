//! SPH Fluid Simulation Kernel
//!
//! This crate provides the core of a Lagrangian Smoothed Particle
//! Hydrodynamics (SPH) fluid simulation. It owns no threads and no globals:
//! all state lives in a [`Simulation`], which the host drives step by step.
//!
//! # Modules
//! - [`particle`] -- Struct-of-arrays particle storage and host particle records.
//! - [`neighbor`] -- Uniform-grid spatial index for fixed-radius neighbor search.
//! - [`sph`] -- Poly6, spiky and viscosity smoothing kernels.
//! - [`eos`] -- Equations of state (linear, Tait) and the negative-pressure policy.
//! - [`density`] -- Density summation and pressure evaluation.
//! - [`forces`] -- Pressure, viscosity, gravity, drag and wall-penalty accelerations.
//! - [`integrator`] -- Euler and Runge-Kutta integration, CFL time-step selection.
//! - [`boundary`] -- Domain containment with restitution.
//! - [`parallel`] -- Sequential or rayon-parallel stage execution.
//! - [`params`] -- Simulation parameters and validation.
//! - [`simulation`] -- The step controller.
//! - [`snapshot`] -- Owned state copies, step reports and diagnostics.
//!
//! # Example
//!
//! ```
//! use fluid_kernel::{ParticleRecord, Simulation, SimulationParams};
//!
//! let records = vec![
//!     ParticleRecord::at_rest([0.50, 0.5, 0.5], 0.125),
//!     ParticleRecord::at_rest([0.55, 0.5, 0.5], 0.125),
//! ];
//! let mut sim = Simulation::initialize(SimulationParams::default(), &records).unwrap();
//! sim.step_n(10).unwrap();
//! let positions = sim.snapshot().positions_flat(3);
//! assert_eq!(positions.len(), 6);
//! ```

#![warn(missing_docs)]

pub mod boundary;
pub mod density;
pub mod eos;
pub mod error;
pub mod forces;
pub mod integrator;
pub mod neighbor;
pub mod parallel;
pub mod params;
pub mod particle;
pub mod simulation;
pub mod snapshot;
pub mod sph;

pub use boundary::WallPenalty;
pub use eos::{EquationOfState, PressurePolicy};
pub use error::{ConfigError, Quantity, SimError};
pub use forces::Drag;
pub use integrator::IntegrationScheme;
pub use neighbor::NeighborGrid;
pub use parallel::ExecutionMode;
pub use params::SimulationParams;
pub use particle::{ParticleArrays, ParticleRecord};
pub use simulation::Simulation;
pub use snapshot::{Diagnostics, Snapshot, StepReport};
pub use sph::SmoothingKernels;
