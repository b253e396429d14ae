//! Single particle free fall and rebound.
//!
//! An isolated particle feels only gravity, so semi-implicit Euler gives the
//! closed form
//!
//! ```text
//! v_n = v0 + g n dt
//! y_n = y0 + v0 n dt + g dt^2 n (n + 1) / 2
//! ```
//!
//! which approaches `y0 + v0 t + g t^2 / 2` as dt -> 0. At the floor the
//! vertical velocity is reversed and scaled by the restitution coefficient.

use fluid_kernel::{ParticleRecord, Simulation, SimulationParams};

const G: f32 = -9.81;

fn params() -> SimulationParams {
    SimulationParams {
        gravity: [0.0, G, 0.0],
        time_step: 0.001,
        restitution: 0.5,
        ..Default::default()
    }
}

#[test]
fn trajectory_matches_closed_form() {
    let y0 = 0.9_f32;
    let v0 = 0.5_f32;
    let records = [ParticleRecord {
        position: [0.5, y0, 0.5],
        velocity: [0.0, v0, 0.0],
        mass: 0.1,
    }];
    let mut sim = Simulation::initialize(params(), &records).unwrap();
    let dt = sim.params().time_step as f64;

    let n = 100_u64;
    let report = sim.step_n(n).unwrap();
    assert_eq!(report.collisions, 0);

    let snap = sim.snapshot();
    let nf = n as f64;
    let (g, y0, v0) = (G as f64, y0 as f64, v0 as f64);
    let discrete_y = y0 + v0 * nf * dt + g * dt * dt * nf * (nf + 1.0) / 2.0;
    let discrete_v = v0 + g * nf * dt;
    let t = nf * dt;
    let analytic_y = y0 + v0 * t + 0.5 * g * t * t;

    let y = snap.positions[0][1] as f64;
    let v = snap.velocities[0][1] as f64;
    eprintln!("t = {t}: y = {y} (discrete {discrete_y}, analytic {analytic_y}), v = {v} (discrete {discrete_v})");

    assert!((y - discrete_y).abs() < 1.0e-4, "y = {y}, expected {discrete_y}");
    assert!((v - discrete_v).abs() < 1.0e-4, "v = {v}, expected {discrete_v}");
    // First-order scheme: O(dt) deviation from the continuous solution
    assert!((y - analytic_y).abs() < 1.0e-3, "y = {y}, analytic {analytic_y}");
    assert_eq!(snap.positions[0][0], 0.5);
    assert_eq!(snap.positions[0][2], 0.5);
}

#[test]
fn rebound_scales_by_restitution() {
    let records = [ParticleRecord::at_rest([0.5, 0.2, 0.5], 0.1)];
    let mut sim = Simulation::initialize(params(), &records).unwrap();
    let dt = sim.params().time_step;
    let restitution = sim.params().restitution;

    let mut steps = 0;
    loop {
        let before = sim.snapshot().velocities[0][1];
        let report = sim.step().unwrap();
        steps += 1;
        if report.collisions > 0 {
            let snap = sim.snapshot();
            let impact = before + G * dt;
            let expected = -restitution * impact;
            eprintln!("contact after {steps} steps: impact {impact}, rebound {}", snap.velocities[0][1]);
            assert_eq!(snap.positions[0][1], 0.0);
            assert!(snap.velocities[0][1] > 0.0);
            assert!((snap.velocities[0][1] - expected).abs() < 1.0e-5);
            break;
        }
        assert!(steps < 1000, "particle never reached the floor");
    }

    // Next step moves it back up into the domain
    sim.step().unwrap();
    assert!(sim.snapshot().positions[0][1] > 0.0);
}
