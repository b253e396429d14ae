//! Initial particle layouts.
//!
//! A [`Scene`] expands into the particle records a run starts from. Layouts
//! are placed relative to the run's domain, so the same scene description
//! works for any domain size.

use std::f32::consts::TAU;

use fluid_kernel::ParticleRecord;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Largest number of particles a scene may generate.
pub const MAX_SCENE_PARTICLES: usize = 1 << 24;

fn default_seed() -> u64 {
    112_358
}

/// Initial particle layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Scene {
    /// Regular lattice filling an axis-aligned box (dam break setup)
    Block {
        /// Minimum corner of the filled box
        min: [f32; 3],
        /// Maximum corner of the filled box
        max: [f32; 3],
        /// Lattice spacing
        spacing: f32,
        /// Fluid density used to derive particle mass (`density * spacing^3`)
        density: f32,
    },
    /// Particles at rest along the domain diagonal
    Line {
        /// Number of particles
        count: usize,
        /// Mass of each particle
        mass: f32,
    },
    /// Two mirrored half-diagonals, particles alternating between them
    TwoLines {
        /// Number of particles
        count: usize,
        /// Mass of each particle
        mass: f32,
    },
    /// All particles at one point with random outward velocities
    Explosion {
        /// Number of particles
        count: usize,
        /// Mass of each particle
        mass: f32,
        /// Starting point (domain center when absent)
        #[serde(default)]
        center: Option<[f32; 3]>,
        /// Largest initial speed
        max_speed: f32,
        /// Random seed
        #[serde(default = "default_seed")]
        seed: u64,
    },
    /// Particles at rest, uniformly random over the domain
    Uniform {
        /// Number of particles
        count: usize,
        /// Mass of each particle
        mass: f32,
        /// Random seed
        #[serde(default = "default_seed")]
        seed: u64,
    },
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

impl Scene {
    /// Number of particles [`Scene::generate`] produces, or `None` if a
    /// block lattice is too fine to count in a `usize`.
    pub fn particle_count(&self) -> Option<usize> {
        match *self {
            Scene::Block { min, max, spacing, .. } => {
                let [nx, ny, nz] = lattice_dims(min, max, spacing);
                nx.checked_mul(ny)?.checked_mul(nz)
            }
            Scene::Line { count, .. }
            | Scene::TwoLines { count, .. }
            | Scene::Explosion { count, .. }
            | Scene::Uniform { count, .. } => Some(count),
        }
    }

    /// Generate the particle records for a domain.
    pub fn generate(&self, domain_min: [f32; 3], domain_max: [f32; 3]) -> Vec<ParticleRecord> {
        let center = [
            0.5 * (domain_min[0] + domain_max[0]),
            0.5 * (domain_min[1] + domain_max[1]),
            0.5 * (domain_min[2] + domain_max[2]),
        ];

        let records = match *self {
            Scene::Block {
                min,
                max,
                spacing,
                density,
            } => block(min, max, spacing, density),

            Scene::Line { count, mass } => (0..count)
                .map(|i| {
                    let t = i as f32 / count as f32;
                    let position = [0usize, 1, 2].map(|a| lerp(domain_min[a], domain_max[a], t));
                    ParticleRecord::at_rest(position, mass)
                })
                .collect(),

            Scene::TwoLines { count, mass } => (0..count)
                .map(|i| {
                    let t = i as f32 / count as f32;
                    // Odd particles climb the lower half in x, even ones descend the upper half
                    let x = if i % 2 == 1 {
                        lerp(domain_min[0], center[0], t)
                    } else {
                        lerp(domain_max[0], center[0], t)
                    };
                    let y = lerp(domain_min[1], domain_max[1], t);
                    let z = lerp(domain_min[2], domain_max[2], t);
                    ParticleRecord::at_rest([x, y, z], mass)
                })
                .collect(),

            Scene::Explosion {
                count,
                mass,
                center: origin,
                max_speed,
                seed,
            } => {
                let origin = origin.unwrap_or(center);
                let mut rng = StdRng::seed_from_u64(seed);
                (0..count)
                    .map(|i| {
                        let angle = rng.random_range(0.0..TAU);
                        let speed = rng.random_range(0.0..=max_speed);
                        let t = i as f32 / count as f32;
                        ParticleRecord {
                            position: origin,
                            velocity: [
                                speed * angle.cos(),
                                speed * angle.sin(),
                                max_speed * (2.0 * t - 1.0),
                            ],
                            mass,
                        }
                    })
                    .collect()
            }

            Scene::Uniform { count, mass, seed } => {
                let mut rng = StdRng::seed_from_u64(seed);
                (0..count)
                    .map(|_| {
                        let position = [0usize, 1, 2].map(|a| lerp(domain_min[a], domain_max[a], rng.random::<f32>()));
                        ParticleRecord::at_rest(position, mass)
                    })
                    .collect()
            }
        };

        tracing::info!("Scene generated: {} particles", records.len());
        records
    }
}

/// Lattice points per axis for a block fill.
fn lattice_dims(min: [f32; 3], max: [f32; 3], spacing: f32) -> [usize; 3] {
    if spacing.is_nan() || spacing <= 0.0 {
        return [0; 3];
    }
    [0, 1, 2].map(|a| ((max[a] - min[a]) / spacing + 1.0e-4).floor().max(0.0) as usize)
}

/// Lattice fill of `[min, max]`, first particle half a spacing in from `min`.
///
/// Lattices over [`MAX_SCENE_PARTICLES`] generate nothing; run configuration
/// validation rejects them first.
fn block(min: [f32; 3], max: [f32; 3], spacing: f32, density: f32) -> Vec<ParticleRecord> {
    let [nx, ny, nz] = lattice_dims(min, max, spacing);
    let total = match nx.checked_mul(ny).and_then(|n| n.checked_mul(nz)) {
        Some(total) if total <= MAX_SCENE_PARTICLES => total,
        _ => {
            tracing::warn!("Block lattice {}x{}x{} exceeds the particle limit", nx, ny, nz);
            return Vec::new();
        }
    };
    let mass = density * spacing * spacing * spacing;

    let mut records = Vec::with_capacity(total);
    for i in 0..nx {
        for j in 0..ny {
            for k in 0..nz {
                let x = min[0] + (i as f32 + 0.5) * spacing;
                let y = min[1] + (j as f32 + 0.5) * spacing;
                let z = min[2] + (k as f32 + 0.5) * spacing;
                records.push(ParticleRecord::at_rest([x, y, z], mass));
            }
        }
    }
    records
}
