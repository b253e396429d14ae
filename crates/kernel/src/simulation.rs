//! The simulation controller: owns all state of one run and advances it.

use tracing::{debug, info, warn};

use crate::boundary::enforce_domain;
use crate::density::{compute_density, compute_pressure};
use crate::error::{Quantity, SimError};
use crate::forces::compute_accelerations;
use crate::integrator::{cfl_time_step, integrate};
use crate::neighbor::NeighborGrid;
use crate::params::{validate_particles, SimulationParams};
use crate::particle::{ParticleArrays, ParticleRecord};
use crate::snapshot::{Diagnostics, Snapshot, StepReport};
use crate::sph::SmoothingKernels;

/// One fluid run.
///
/// Each step executes, in order:
///
/// 1. Time integration from the accelerations of the current state
/// 2. Domain containment
/// 3. Neighbor grid rebuild
/// 4. Density summation and equation of state
/// 5. Force accumulation (pressure + viscosity + gravity + drag + wall penalty)
///
/// `initialize`, `reset` and `reconfigure` run stages 3 to 5 once, so every
/// step starts from evaluated fields and a snapshot's densities and
/// pressures always belong to the positions beside them. Runge-Kutta stages
/// re-run stages 3 to 5 on their intermediate states.
///
/// A step either completes with finite state everywhere or is rolled back to
/// the state it started from.
#[derive(Debug, Clone)]
pub struct Simulation {
    params: SimulationParams,
    kernels: SmoothingKernels,
    grid: NeighborGrid,
    particles: ParticleArrays,
    /// Records the run was initialized with, for `reset`.
    initial: Vec<ParticleRecord>,
    /// Pre-step state for rollback.
    checkpoint: Option<ParticleArrays>,
    time: f64,
    step: u64,
}

impl Simulation {
    /// Validate the inputs and build a run at time zero.
    ///
    /// Density and pressure are evaluated once so the first snapshot carries
    /// meaningful values.
    pub fn initialize(params: SimulationParams, records: &[ParticleRecord]) -> Result<Self, SimError> {
        params.validate()?;
        validate_particles(records)?;

        let kernels = SmoothingKernels::new(params.smoothing_radius);
        let grid = NeighborGrid::new(params.smoothing_radius, params.domain_min, params.domain_max);
        let mut sim = Self {
            kernels,
            grid,
            particles: ParticleArrays::from_records(records),
            initial: records.to_vec(),
            checkpoint: None,
            time: 0.0,
            step: 0,
            params,
        };
        sim.refresh_fields();

        let dims = sim.grid.dims();
        info!(
            "Simulation initialized: {} particles, h={}, dt={}, grid {}x{}x{}, {:?}",
            sim.particles.len(),
            sim.params.smoothing_radius,
            sim.params.time_step,
            dims[0],
            dims[1],
            dims[2],
            sim.params.execution,
        );
        Ok(sim)
    }

    /// Advance by one time step.
    ///
    /// On a non-finite position or velocity the state is restored to what it
    /// was before the call and a [`SimError::Numerical`] names the first
    /// offending particle.
    pub fn step(&mut self) -> Result<StepReport, SimError> {
        self.save_checkpoint();
        let mut report = self.advance();

        if let Some((particle, quantity)) = self.first_non_finite() {
            self.restore_checkpoint();
            warn!(
                "Step {} rolled back: particle {} has non-finite {}",
                self.step, particle, quantity
            );
            return Err(SimError::Numerical {
                step: self.step,
                particle,
                quantity,
            });
        }

        report.degenerate = self.refresh_fields();
        self.checkpoint = None;
        self.time += self.params.time_step as f64;
        self.step += 1;
        debug!(
            "Step {} t={:.6}: collisions={} clamped={} degenerate={}",
            self.step, self.time, report.collisions, report.clamped, report.degenerate
        );
        Ok(report)
    }

    /// Run up to `count` steps, stopping at the first failure.
    ///
    /// Steps completed before a failure are kept.
    pub fn step_n(&mut self, count: u64) -> Result<StepReport, SimError> {
        let mut total = StepReport::default();
        for _ in 0..count {
            total.merge(self.step()?);
        }
        Ok(total)
    }

    /// Owned copy of the current state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(&self.particles, self.time, self.step)
    }

    /// Return to the initial particle records at time zero.
    pub fn reset(&mut self) {
        self.particles = ParticleArrays::from_records(&self.initial);
        self.checkpoint = None;
        self.time = 0.0;
        self.step = 0;
        self.refresh_fields();
        info!("Simulation reset: {} particles", self.particles.len());
    }

    /// Swap parameters between steps.
    ///
    /// The new parameters are validated first; on error the run keeps its
    /// current parameters. Particles outside a shrunken domain are brought
    /// back by the next step's containment pass.
    pub fn reconfigure(&mut self, params: SimulationParams) -> Result<(), SimError> {
        params.validate()?;
        let rebuild_grid = params.smoothing_radius != self.params.smoothing_radius
            || params.domain_min != self.params.domain_min
            || params.domain_max != self.params.domain_max;
        if rebuild_grid {
            self.grid = NeighborGrid::new(params.smoothing_radius, params.domain_min, params.domain_max);
            self.kernels = SmoothingKernels::new(params.smoothing_radius);
        }
        self.params = params;
        self.refresh_fields();
        info!(
            "Simulation reconfigured at step {}: h={}, dt={}",
            self.step, self.params.smoothing_radius, self.params.time_step
        );
        Ok(())
    }

    /// Current parameters.
    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    /// Simulated time in seconds.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Number of completed steps.
    pub fn step_count(&self) -> u64 {
        self.step
    }

    /// Number of particles.
    pub fn particle_count(&self) -> usize {
        self.particles.len()
    }

    /// Conservation and health metrics of the current state.
    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics::measure(&self.particles, self.params.rest_density)
    }

    /// Stable time step for the current state, capped at the configured one.
    pub fn suggested_time_step(&self, cfl: f32) -> f32 {
        cfl_time_step(
            &self.particles,
            self.params.smoothing_radius,
            cfl,
            self.params.time_step,
        )
    }

    fn refresh_fields(&mut self) -> usize {
        evaluate_fields(&mut self.particles, &mut self.grid, &self.kernels, &self.params)
    }

    /// Integrate and contain. Fields are left for the caller to refresh once
    /// the new state is known to be finite.
    fn advance(&mut self) -> StepReport {
        let Self {
            params,
            kernels,
            grid,
            particles,
            ..
        } = self;
        let params: &SimulationParams = params;
        let kernels: &SmoothingKernels = kernels;

        let clamped = integrate(
            particles,
            params.time_step,
            params.max_speed,
            params.integrator,
            params.execution,
            |stage| {
                evaluate_fields(stage, grid, kernels, params);
            },
        );
        let collisions = enforce_domain(particles, params.domain_min, params.domain_max, params.restitution);
        StepReport {
            steps: 1,
            collisions,
            clamped,
            degenerate: 0,
        }
    }

    fn first_non_finite(&self) -> Option<(usize, Quantity)> {
        (0..self.particles.len()).find_map(|i| {
            if self.particles.position(i).iter().any(|v| !v.is_finite()) {
                Some((i, Quantity::Position))
            } else if self.particles.velocity(i).iter().any(|v| !v.is_finite()) {
                Some((i, Quantity::Velocity))
            } else {
                None
            }
        })
    }

    fn save_checkpoint(&mut self) {
        self.checkpoint = Some(self.particles.clone());
    }

    fn restore_checkpoint(&mut self) {
        if let Some(cp) = self.checkpoint.take() {
            self.particles = cp;
        }
    }
}

/// Rebuild the grid and evaluate density, pressure and accelerations for the
/// current positions and velocities. Returns the degenerate particle count.
fn evaluate_fields(
    particles: &mut ParticleArrays,
    grid: &mut NeighborGrid,
    kernels: &SmoothingKernels,
    params: &SimulationParams,
) -> usize {
    let mode = params.execution;
    grid.update(&particles.x, &particles.y, &particles.z);
    compute_density(particles, grid, kernels, mode);
    let degenerate = compute_pressure(
        particles,
        params.equation_of_state,
        params.rest_density,
        params.stiffness,
        params.pressure_policy,
        mode,
    );
    compute_accelerations(particles, grid, kernels, params, mode);
    degenerate
}
