//! Density summation and pressure evaluation.
//!
//! ```text
//! rho_i = sum_j m_j * W_poly6(|x_i - x_j|, h)     (j includes i)
//! P_i   = EOS(rho_i)
//! ```

use crate::eos::{EquationOfState, PressurePolicy};
use crate::neighbor::NeighborGrid;
use crate::parallel::ExecutionMode;
use crate::particle::ParticleArrays;
use crate::sph::SmoothingKernels;

/// Compute density for all particles using SPH summation.
///
/// Includes the self-contribution `m_i * W(0, h)`, so any particle with
/// positive mass has positive density. The grid must already be rebuilt for
/// the current positions.
pub fn compute_density(
    particles: &mut ParticleArrays,
    grid: &NeighborGrid,
    kernels: &SmoothingKernels,
    mode: ExecutionMode,
) {
    let h = kernels.radius();
    let p = &*particles;
    let density = mode.map_particles(p.len(), |i| {
        let mut rho = 0.0_f32;
        grid.for_each_within(p.position(i), &p.x, &p.y, &p.z, h, |j, _, _, _, r_sq| {
            rho += p.mass[j] * kernels.poly6(r_sq);
        });
        rho
    });
    particles.density = density;
}

/// Compute pressure from density through the equation of state.
///
/// Returns the number of degenerate particles (zero density). Their pressure
/// is forced to zero so they contribute no pressure force this step.
pub fn compute_pressure(
    particles: &mut ParticleArrays,
    eos: EquationOfState,
    rest_density: f32,
    stiffness: f32,
    policy: PressurePolicy,
    mode: ExecutionMode,
) -> usize {
    let density = &particles.density;
    let pressure = mode.map_particles(density.len(), |i| {
        let rho = density[i];
        if rho > 0.0 {
            eos.pressure(rho, rest_density, stiffness, policy)
        } else {
            0.0
        }
    });
    let degenerate = density.iter().filter(|&&rho| rho <= 0.0).count();
    particles.pressure = pressure;
    if degenerate > 0 {
        tracing::debug!("{} particles with zero density skipped for pressure", degenerate);
    }
    degenerate
}
