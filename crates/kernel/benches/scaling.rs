//! Step throughput, sequential vs parallel, at growing particle counts.
//!
//! Run with: cargo bench -p fluid_kernel --bench scaling

use std::time::Instant;

use fluid_kernel::{ExecutionMode, ParticleRecord, Simulation, SimulationParams};

fn create_particle_cube(target_count: usize) -> (Vec<ParticleRecord>, f32) {
    let domain_size = 1.0_f32;
    let n_per_axis = (target_count as f32).cbrt().ceil() as usize;
    let spacing = 0.5 * domain_size / n_per_axis as f32;
    let h = 2.0 * spacing;
    let rest_density = 1000.0_f32;
    let particle_mass = rest_density * spacing * spacing * spacing;

    let mut records = Vec::with_capacity(n_per_axis.pow(3));
    for ix in 0..n_per_axis {
        for iy in 0..n_per_axis {
            for iz in 0..n_per_axis {
                let x = 0.25 + (ix as f32 + 0.5) * spacing;
                let y = (iy as f32 + 0.5) * spacing;
                let z = 0.25 + (iz as f32 + 0.5) * spacing;
                records.push(ParticleRecord::at_rest([x, y, z], particle_mass));
            }
        }
    }
    (records, h)
}

fn main() {
    println!("=== CPU Scaling Test ===\n");

    // (target particles, steps) -- fewer steps at larger counts
    let configs = [(1_000, 50), (8_000, 20), (27_000, 10), (64_000, 5)];

    println!(
        "{:>10} {:>12} {:>10} {:>10} {:>12} {:>12}",
        "Particles", "Mode", "Steps", "Time (s)", "steps/s", "ms/step"
    );

    for &(n, steps) in &configs {
        let (records, h) = create_particle_cube(n);

        for mode in [ExecutionMode::Sequential, ExecutionMode::Parallel] {
            let params = SimulationParams {
                smoothing_radius: h,
                time_step: 1.0e-4,
                execution: mode,
                ..Default::default()
            };
            let mut sim = match Simulation::initialize(params, &records) {
                Ok(sim) => sim,
                Err(err) => {
                    println!("{:>10} {:>12?} skipped: {err}", records.len(), mode);
                    continue;
                }
            };

            // Warmup
            if let Err(err) = sim.step_n(2) {
                println!("{:>10} {:>12?} warmup failed: {err}", records.len(), mode);
                continue;
            }

            let start = Instant::now();
            let result = sim.step_n(steps);
            let elapsed = start.elapsed().as_secs_f64();
            if let Err(err) = result {
                println!("{:>10} {:>12?} failed: {err}", records.len(), mode);
                continue;
            }
            let sps = steps as f64 / elapsed;
            let ms_per_step = elapsed * 1000.0 / steps as f64;

            println!(
                "{:>10} {:>12?} {:>10} {:>10.3} {:>12.1} {:>12.2}",
                records.len(),
                mode,
                steps,
                elapsed,
                sps,
                ms_per_step
            );
        }
    }
}
