//! Force accumulation: pressure gradient, viscosity, gravity, drag and wall penalty.
//!
//! For particle i and each neighbor j != i within h:
//!
//! ```text
//! F_press_i = -V_i * sum_j m_j * (P_i + P_j) / (2 rho_j) * grad W_spiky(x_i - x_j)
//! F_visc_i  =  V_i * mu * sum_j m_j * (v_j - v_i) / rho_j * lap W_visc(|x_i - x_j|)
//! a_drag_i  = -b / m_i * (v_i - u_ambient)
//! a_i       = (F_press_i + F_visc_i) / m_i + g + a_drag_i + a_wall_i
//! ```
//!
//! with `V_i = m_i / rho_i`. Each pair term is antisymmetric under i <-> j,
//! so the pair forces cancel and total momentum is conserved.

use serde::{Deserialize, Serialize};

use crate::boundary::wall_penalty_acceleration;
use crate::neighbor::NeighborGrid;
use crate::params::SimulationParams;
use crate::parallel::ExecutionMode;
use crate::particle::ParticleArrays;
use crate::sph::SmoothingKernels;

/// Smallest density used as a divisor.
///
/// Densities below this are clamped before dividing. The stored density is
/// never modified.
pub const MIN_DENSITY: f32 = 1.0e-6;

/// Linear drag toward an ambient flow velocity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Drag {
    /// Drag coefficient `b` (force per unit relative velocity)
    pub coefficient: f32,
    /// Velocity of the surrounding medium
    #[serde(default)]
    pub ambient_velocity: [f32; 3],
}

impl Drag {
    /// Drag acceleration on a particle of mass `mass` moving at `velocity`.
    #[inline]
    pub fn acceleration(&self, velocity: [f32; 3], mass: f32) -> [f32; 3] {
        let k = self.coefficient / mass;
        [0, 1, 2].map(|a| -k * (velocity[a] - self.ambient_velocity[a]))
    }
}

/// Compute accelerations for all particles, overwriting `ax/ay/az`.
///
/// Density and pressure must be complete for every particle before this runs.
/// Particles with zero density take no pair forces (only gravity, drag and
/// the wall penalty).
pub fn compute_accelerations(
    particles: &mut ParticleArrays,
    grid: &NeighborGrid,
    kernels: &SmoothingKernels,
    params: &SimulationParams,
    mode: ExecutionMode,
) {
    let h = kernels.radius();
    let mu = params.viscosity;
    let gravity = params.gravity;
    let penalty = params.wall_penalty;
    let drag = params.drag;
    let (domain_min, domain_max) = (params.domain_min, params.domain_max);

    let p = &*particles;
    let accel = mode.map_particles(p.len(), |i| {
        let mut a = gravity;
        if let Some(penalty) = penalty {
            let wall = wall_penalty_acceleration(p.position(i), domain_min, domain_max, &penalty);
            a[0] += wall[0];
            a[1] += wall[1];
            a[2] += wall[2];
        }

        if let Some(drag) = drag {
            let d = drag.acceleration(p.velocity(i), p.mass[i]);
            a[0] += d[0];
            a[1] += d[1];
            a[2] += d[2];
        }

        let rho_i = p.density[i];
        if rho_i <= 0.0 {
            return a;
        }

        let pressure_i = p.pressure[i];
        let (vxi, vyi, vzi) = (p.vx[i], p.vy[i], p.vz[i]);
        let mut f = [0.0_f32; 3];

        grid.for_each_neighbor(i, &p.x, &p.y, &p.z, h, |j, dx, dy, dz, r_sq| {
            let r = r_sq.sqrt();
            let rho_j = p.density[j].max(MIN_DENSITY);
            let m_j = p.mass[j];

            // Pressure (symmetrized)
            let (gx, gy, gz) = kernels.spiky_gradient(dx, dy, dz, r);
            let press = -m_j * (pressure_i + p.pressure[j]) / (2.0 * rho_j);
            f[0] += press * gx;
            f[1] += press * gy;
            f[2] += press * gz;

            // Viscosity
            if mu > 0.0 {
                let visc = mu * m_j * kernels.viscosity_laplacian(r) / rho_j;
                f[0] += visc * (p.vx[j] - vxi);
                f[1] += visc * (p.vy[j] - vyi);
                f[2] += visc * (p.vz[j] - vzi);
            }
        });

        // F = V_i * f with V_i = m_i / rho_i, then a = F / m_i
        let m_i = p.mass[i];
        let volume = m_i / rho_i.max(MIN_DENSITY);
        for axis in 0..3 {
            a[axis] += volume * f[axis] / m_i;
        }
        a
    });

    for (i, a) in accel.into_iter().enumerate() {
        particles.ax[i] = a[0];
        particles.ay[i] = a[1];
        particles.az[i] = a[2];
    }
}
