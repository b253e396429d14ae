//! Particle data structures using struct-of-arrays layout.

use serde::{Deserialize, Serialize};

/// Initial state of one particle, as supplied by the host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParticleRecord {
    /// Position [x, y, z]
    pub position: [f32; 3],
    /// Velocity [vx, vy, vz]
    #[serde(default)]
    pub velocity: [f32; 3],
    /// Particle mass, must be > 0
    pub mass: f32,
}

impl ParticleRecord {
    /// A particle at rest at `position`.
    pub fn at_rest(position: [f32; 3], mass: f32) -> Self {
        Self {
            position,
            velocity: [0.0; 3],
            mass,
        }
    }
}

/// Struct-of-arrays particle storage.
///
/// All arrays are parallel: index `i` across every array refers to the same particle.
/// Separate x/y/z arrays (rather than a vector type) keep each stage a tight loop
/// over contiguous memory.
#[derive(Debug, Clone, Default)]
pub struct ParticleArrays {
    // ---- Positions ----
    /// X positions
    pub x: Vec<f32>,
    /// Y positions
    pub y: Vec<f32>,
    /// Z positions
    pub z: Vec<f32>,

    // ---- Velocities ----
    /// X velocities
    pub vx: Vec<f32>,
    /// Y velocities
    pub vy: Vec<f32>,
    /// Z velocities
    pub vz: Vec<f32>,

    // ---- Accelerations ----
    /// X accelerations, reset every step
    pub ax: Vec<f32>,
    /// Y accelerations, reset every step
    pub ay: Vec<f32>,
    /// Z accelerations, reset every step
    pub az: Vec<f32>,

    // ---- Scalar fields ----
    /// Density, recomputed every step
    pub density: Vec<f32>,
    /// Pressure, derived from density
    pub pressure: Vec<f32>,
    /// Particle mass
    pub mass: Vec<f32>,
}

impl ParticleArrays {
    /// Create an empty particle collection with no particles allocated.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty collection with room for `n` particles.
    pub fn with_capacity(n: usize) -> Self {
        Self {
            x: Vec::with_capacity(n),
            y: Vec::with_capacity(n),
            z: Vec::with_capacity(n),
            vx: Vec::with_capacity(n),
            vy: Vec::with_capacity(n),
            vz: Vec::with_capacity(n),
            ax: Vec::with_capacity(n),
            ay: Vec::with_capacity(n),
            az: Vec::with_capacity(n),
            density: Vec::with_capacity(n),
            pressure: Vec::with_capacity(n),
            mass: Vec::with_capacity(n),
        }
    }

    /// Build the store from host-supplied records, preserving their order as identity.
    pub fn from_records(records: &[ParticleRecord]) -> Self {
        let mut particles = Self::with_capacity(records.len());
        for record in records {
            particles.push_particle(record.position, record.velocity, record.mass);
        }
        particles
    }

    /// Return the number of particles currently stored.
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// Return `true` if there are no particles.
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Append a single particle.
    ///
    /// Acceleration, density, and pressure start at zero.
    pub fn push_particle(&mut self, position: [f32; 3], velocity: [f32; 3], mass: f32) {
        self.x.push(position[0]);
        self.y.push(position[1]);
        self.z.push(position[2]);
        self.vx.push(velocity[0]);
        self.vy.push(velocity[1]);
        self.vz.push(velocity[2]);
        self.ax.push(0.0);
        self.ay.push(0.0);
        self.az.push(0.0);
        self.density.push(0.0);
        self.pressure.push(0.0);
        self.mass.push(mass);
    }

    /// Position of particle `i`.
    #[inline]
    pub fn position(&self, i: usize) -> [f32; 3] {
        [self.x[i], self.y[i], self.z[i]]
    }

    /// Velocity of particle `i`.
    #[inline]
    pub fn velocity(&self, i: usize) -> [f32; 3] {
        [self.vx[i], self.vy[i], self.vz[i]]
    }

    /// Acceleration of particle `i`.
    #[inline]
    pub fn acceleration(&self, i: usize) -> [f32; 3] {
        [self.ax[i], self.ay[i], self.az[i]]
    }

    /// Overwrite the position of particle `i`.
    #[inline]
    pub fn set_position(&mut self, i: usize, p: [f32; 3]) {
        self.x[i] = p[0];
        self.y[i] = p[1];
        self.z[i] = p[2];
    }

    /// Overwrite the velocity of particle `i`.
    #[inline]
    pub fn set_velocity(&mut self, i: usize, v: [f32; 3]) {
        self.vx[i] = v[0];
        self.vy[i] = v[1];
        self.vz[i] = v[2];
    }

    /// Total linear momentum, accumulated in f64.
    pub fn total_momentum(&self) -> [f64; 3] {
        let mut p = [0.0_f64; 3];
        for i in 0..self.len() {
            let m = self.mass[i] as f64;
            p[0] += m * self.vx[i] as f64;
            p[1] += m * self.vy[i] as f64;
            p[2] += m * self.vz[i] as f64;
        }
        p
    }

    /// Total kinetic energy, accumulated in f64.
    pub fn kinetic_energy(&self) -> f64 {
        let mut energy = 0.0_f64;
        for i in 0..self.len() {
            let vx = self.vx[i] as f64;
            let vy = self.vy[i] as f64;
            let vz = self.vz[i] as f64;
            energy += 0.5 * self.mass[i] as f64 * (vx * vx + vy * vy + vz * vz);
        }
        energy
    }

    /// Total mass, accumulated in f64.
    pub fn total_mass(&self) -> f64 {
        self.mass.iter().map(|&m| m as f64).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_particle_arrays() {
        let pa = ParticleArrays::new();
        assert_eq!(pa.len(), 0);
        assert!(pa.is_empty());
    }

    #[test]
    fn push_and_len() {
        let mut pa = ParticleArrays::new();
        pa.push_particle([1.0, 2.0, 3.0], [0.5, 0.0, -0.5], 0.001);
        assert_eq!(pa.len(), 1);
        assert!(!pa.is_empty());
        assert_eq!(pa.position(0), [1.0, 2.0, 3.0]);
        assert_eq!(pa.velocity(0), [0.5, 0.0, -0.5]);
        assert_eq!(pa.mass[0], 0.001);
        // Derived fields start at zero
        assert_eq!(pa.ax[0], 0.0);
        assert_eq!(pa.density[0], 0.0);
        assert_eq!(pa.pressure[0], 0.0);
    }

    #[test]
    fn records_keep_order() {
        let records = [
            ParticleRecord::at_rest([0.0, 0.0, 0.0], 1.0),
            ParticleRecord {
                position: [1.0, 0.0, 0.0],
                velocity: [0.0, 2.0, 0.0],
                mass: 2.0,
            },
        ];
        let pa = ParticleArrays::from_records(&records);
        assert_eq!(pa.len(), 2);
        assert_eq!(pa.x[1], 1.0);
        assert_eq!(pa.vy[1], 2.0);
        assert_eq!(pa.mass[1], 2.0);
    }

    #[test]
    fn momentum_and_energy() {
        let mut pa = ParticleArrays::new();
        pa.push_particle([0.0; 3], [1.0, 0.0, 0.0], 2.0);
        pa.push_particle([1.0, 0.0, 0.0], [-1.0, 0.0, 0.0], 2.0);
        let p = pa.total_momentum();
        assert!(p[0].abs() < 1.0e-12);
        assert!((pa.kinetic_energy() - 2.0).abs() < 1.0e-12);
        assert!((pa.total_mass() - 4.0).abs() < 1.0e-12);
    }

    #[test]
    fn record_velocity_defaults_to_zero() {
        let record: ParticleRecord =
            serde_json::from_str(r#"{ "position": [1.0, 2.0, 3.0], "mass": 0.5 }"#).unwrap();
        assert_eq!(record.velocity, [0.0; 3]);
        assert_eq!(record.mass, 0.5);
    }
}
