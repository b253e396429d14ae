//! Owned views of simulation state handed to the host.

use serde::Serialize;

use crate::particle::ParticleArrays;

/// Copy of particle state at one instant.
///
/// Owns its data, so later steps never change a snapshot already taken.
/// Densities and pressures are evaluated at the captured positions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    /// Simulated time in seconds
    pub time: f64,
    /// Number of completed steps
    pub step: u64,
    /// Particle positions
    pub positions: Vec<[f32; 3]>,
    /// Particle velocities
    pub velocities: Vec<[f32; 3]>,
    /// Densities at `positions`
    pub densities: Vec<f32>,
    /// Pressures at `positions`
    pub pressures: Vec<f32>,
}

impl Snapshot {
    pub(crate) fn capture(particles: &ParticleArrays, time: f64, step: u64) -> Self {
        let n = particles.len();
        Self {
            time,
            step,
            positions: (0..n).map(|i| particles.position(i)).collect(),
            velocities: (0..n).map(|i| particles.velocity(i)).collect(),
            densities: particles.density.clone(),
            pressures: particles.pressure.clone(),
        }
    }

    /// Number of particles captured.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// `true` when no particles were captured.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Positions packed into one flat buffer for upload to a renderer.
    ///
    /// `stride` 3 gives `x y z` per particle; stride 4 appends density as the
    /// fourth lane. Any other stride is treated as 3.
    pub fn positions_flat(&self, stride: usize) -> Vec<f32> {
        let with_density = stride == 4;
        let lanes = if with_density { 4 } else { 3 };
        let mut out = Vec::with_capacity(self.len() * lanes);
        for (i, p) in self.positions.iter().enumerate() {
            out.extend_from_slice(p);
            if with_density {
                out.push(self.densities.get(i).copied().unwrap_or(0.0));
            }
        }
        out
    }
}

/// Counters produced by one or more steps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StepReport {
    /// Steps covered by this report
    pub steps: u64,
    /// Wall corrections (one per particle per axis)
    pub collisions: usize,
    /// Particles whose velocity hit the speed clamp
    pub clamped: usize,
    /// Particles with zero density skipped for pressure
    pub degenerate: usize,
}

impl StepReport {
    /// Accumulate another report into this one.
    pub fn merge(&mut self, other: StepReport) {
        self.steps += other.steps;
        self.collisions += other.collisions;
        self.clamped += other.clamped;
        self.degenerate += other.degenerate;
    }
}

/// Conservation and health metrics of the current state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Diagnostics {
    /// Total linear momentum
    pub momentum: [f64; 3],
    /// Total kinetic energy
    pub kinetic_energy: f64,
    /// Total mass
    pub total_mass: f64,
    /// Largest `|rho - rho0| / rho0` over all particles
    pub max_density_variation: f32,
    /// Largest speed over all particles
    pub max_speed: f32,
}

impl Diagnostics {
    pub(crate) fn measure(particles: &ParticleArrays, rest_density: f32) -> Self {
        let max_density_variation = particles
            .density
            .iter()
            .map(|&rho| (rho - rest_density).abs() / rest_density)
            .fold(0.0_f32, f32::max);
        let max_speed = (0..particles.len())
            .map(|i| {
                let [vx, vy, vz] = particles.velocity(i);
                (vx * vx + vy * vy + vz * vz).sqrt()
            })
            .fold(0.0_f32, f32::max);
        Self {
            momentum: particles.total_momentum(),
            kinetic_energy: particles.kinetic_energy(),
            total_mass: particles.total_mass(),
            max_density_variation,
            max_speed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_particles() -> ParticleArrays {
        let mut p = ParticleArrays::new();
        p.push_particle([0.1, 0.2, 0.3], [1.0, 0.0, 0.0], 1.0);
        p.push_particle([0.4, 0.5, 0.6], [0.0, -2.0, 0.0], 3.0);
        p.density = vec![900.0, 1100.0];
        p
    }

    #[test]
    fn flat_positions_by_stride() {
        let snap = Snapshot::capture(&two_particles(), 0.5, 10);
        assert_eq!(snap.positions_flat(3), vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6]);
        assert_eq!(
            snap.positions_flat(4),
            vec![0.1, 0.2, 0.3, 900.0, 0.4, 0.5, 0.6, 1100.0]
        );
    }

    #[test]
    fn snapshot_is_detached() {
        let mut p = two_particles();
        let snap = Snapshot::capture(&p, 0.0, 0);
        p.x[0] = 9.0;
        assert_eq!(snap.positions[0], [0.1, 0.2, 0.3]);
    }

    #[test]
    fn reports_merge() {
        let mut total = StepReport::default();
        total.merge(StepReport {
            steps: 1,
            collisions: 2,
            clamped: 0,
            degenerate: 1,
        });
        total.merge(StepReport {
            steps: 1,
            collisions: 1,
            clamped: 3,
            degenerate: 0,
        });
        assert_eq!(
            total,
            StepReport {
                steps: 2,
                collisions: 3,
                clamped: 3,
                degenerate: 1
            }
        );
    }

    #[test]
    fn diagnostics_measure() {
        let d = Diagnostics::measure(&two_particles(), 1000.0);
        assert!((d.momentum[0] - 1.0).abs() < 1.0e-9);
        assert!((d.momentum[1] + 6.0).abs() < 1.0e-9);
        assert!((d.kinetic_energy - 6.5).abs() < 1.0e-9);
        assert!((d.max_density_variation - 0.1).abs() < 1.0e-5);
        assert_eq!(d.max_speed, 2.0);
        assert_eq!(d.total_mass, 4.0);
    }
}
