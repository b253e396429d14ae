//! Dam break: a block of fluid collapses inside a closed box.
//!
//! Runs the same scene sequentially and on the rayon pool and checks that
//! both stay contained, finite, and agree exactly.

use fluid_kernel::{ExecutionMode, ParticleRecord, Simulation, SimulationParams};

fn dam(spacing: f32, rest_density: f32) -> Vec<ParticleRecord> {
    let mass = rest_density * spacing * spacing * spacing;
    let mut records = Vec::new();
    let mut x = 0.5 * spacing;
    while x < 0.4 {
        let mut y = 0.5 * spacing;
        while y < 0.6 {
            let mut z = 0.5 * spacing;
            while z < 0.4 {
                records.push(ParticleRecord::at_rest([x, y, z], mass));
                z += spacing;
            }
            y += spacing;
        }
        x += spacing;
    }
    records
}

fn params(execution: ExecutionMode) -> SimulationParams {
    SimulationParams {
        smoothing_radius: 0.1,
        time_step: 0.0005,
        execution,
        ..Default::default()
    }
}

#[test]
fn collapse_stays_contained() {
    let records = dam(0.05, 1000.0);
    eprintln!("Fluid particles: {}", records.len());
    let mut sim = Simulation::initialize(params(ExecutionMode::Sequential), &records).unwrap();
    let start = sim.diagnostics();

    let mut collisions = 0;
    for _ in 0..10 {
        collisions += sim.step_n(40).unwrap().collisions;
        let snap = sim.snapshot();
        for (i, p) in snap.positions.iter().enumerate() {
            assert!(
                p.iter().all(|&v| (0.0..=1.0).contains(&v)),
                "particle {i} left the box at step {}: {p:?}",
                snap.step
            );
            assert!(snap.densities[i] >= 0.0 && snap.densities[i].is_finite());
        }
    }

    let end = sim.diagnostics();
    eprintln!(
        "after {} steps: collisions {collisions}, max density variation {:.3}, max speed {:.3}",
        sim.step_count(),
        end.max_density_variation,
        end.max_speed
    );
    assert!(collisions > 0, "fluid should have reached a wall");
    assert_eq!(start.total_mass, end.total_mass);
    assert!(end.max_speed.is_finite());
}

#[test]
fn parallel_matches_sequential() {
    let records = dam(0.05, 1000.0);
    let mut seq = Simulation::initialize(params(ExecutionMode::Sequential), &records).unwrap();
    let mut par = Simulation::initialize(params(ExecutionMode::Parallel), &records).unwrap();

    let seq_report = seq.step_n(100).unwrap();
    let par_report = par.step_n(100).unwrap();

    assert_eq!(seq_report, par_report);
    assert_eq!(seq.snapshot(), par.snapshot());
}
