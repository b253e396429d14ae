//! Reference scenarios with analytically known outcomes.
//!
//! Each constructor returns a ready-to-run [`ReferenceTest`]; the binary runs
//! them at full length and the unit tests run shortened variants.

use fluid_kernel::{SimulationParams, SmoothingKernels};
use fluid_orchestrator::{RunConfig, Scene};

use crate::analytical::{pair_equilibrium_rest_density, FreeFall};
use crate::{
    ConservationCheck, ExpectedResult, MaxSpeedCheck, PositionBoundsCheck, ReboundCheck, ReferenceTest,
    TrajectoryCheck,
};

const SINGLE_SPACING: f32 = 0.1;

/// A block scene holding exactly one particle centred on `at`.
fn single_particle(at: [f32; 3], mass: f32) -> Scene {
    let half = 0.5 * SINGLE_SPACING;
    Scene::Block {
        min: at.map(|v| v - half),
        max: at.map(|v| v + half),
        spacing: SINGLE_SPACING,
        density: mass / (SINGLE_SPACING * SINGLE_SPACING * SINGLE_SPACING),
    }
}

fn config(name: &str, params: SimulationParams, scene: Scene) -> RunConfig {
    RunConfig {
        name: name.to_string(),
        params,
        scene,
        max_steps: None,
        max_time: None,
        retry_halvings: 0,
    }
}

/// Height of the first generated particle, which may differ from the
/// requested one by rounding in the lattice fill.
fn generated_height(config: &RunConfig) -> f32 {
    config
        .scene
        .generate(config.params.domain_min, config.params.domain_max)
        .first()
        .map_or(0.0, |r| r.position[1])
}

/// Isolated particle in free fall, compared with the closed-form discrete
/// trajectory of semi-implicit Euler.
pub fn free_fall(steps: u64) -> ReferenceTest {
    let params = SimulationParams::default();
    let config = config("Free Fall", params.clone(), single_particle([0.5, 0.8, 0.5], 0.01));
    let y0 = generated_height(&config);

    let fall = FreeFall {
        initial_height: f64::from(y0),
        initial_velocity: 0.0,
        gravity: f64::from(params.gravity[1]),
        floor: f64::from(params.domain_min[1]),
        restitution: f64::from(params.restitution),
    };
    let expected_y = fall.discrete_height(steps, f64::from(params.time_step)) as f32;

    ReferenceTest {
        name: config.name.clone(),
        config,
        timesteps: steps,
        expected: ExpectedResult {
            trajectory: Some(TrajectoryCheck {
                particle: 0,
                expected: [0.5, expected_y, 0.5],
                tolerance: 1.0e-4,
            }),
            conservation: Some(ConservationCheck {
                max_mass_error: 0.0,
                max_momentum_drift: None,
            }),
            ..Default::default()
        },
    }
}

/// Particle dropped onto the floor; the first rebound apex is `r^2` times
/// the drop height.
pub fn rebound(steps: u64) -> ReferenceTest {
    let params = SimulationParams::default();
    let config = config("Floor Rebound", params.clone(), single_particle([0.5, 0.8, 0.5], 0.01));
    let y0 = generated_height(&config);

    let fall = FreeFall {
        initial_height: f64::from(y0),
        initial_velocity: 0.0,
        gravity: f64::from(params.gravity[1]),
        floor: f64::from(params.domain_min[1]),
        restitution: f64::from(params.restitution),
    };
    let expected_apex = fall.rebound_apex().unwrap_or(0.0) as f32;

    ReferenceTest {
        name: config.name.clone(),
        config,
        timesteps: steps,
        expected: ExpectedResult {
            rebound: Some(ReboundCheck {
                particle: 0,
                floor_y: params.domain_min[1],
                expected_apex,
                tolerance: 0.05,
            }),
            position_bounds: Some(PositionBoundsCheck {
                min: params.domain_min,
                max: params.domain_max,
            }),
            ..Default::default()
        },
    }
}

/// Two particles half a smoothing radius apart whose rest density matches
/// their summed density, so they feel no pressure and stay put.
pub fn pair_equilibrium(steps: u64) -> ReferenceTest {
    let h = 0.1;
    let spacing = 0.5 * h;
    let fluid_density = 1000.0_f32;
    let scene = Scene::Block {
        min: [0.45, 0.5 - 0.5 * spacing, 0.5 - 0.5 * spacing],
        max: [0.55, 0.5 + 0.5 * spacing, 0.5 + 0.5 * spacing],
        spacing,
        density: fluid_density,
    };
    let mut params = SimulationParams {
        smoothing_radius: h,
        gravity: [0.0; 3],
        ..Default::default()
    };
    let records = scene.generate(params.domain_min, params.domain_max);
    let (first, mass, separation) = match records.as_slice() {
        [a, b] => (a.position, a.mass, b.position[0] - a.position[0]),
        _ => ([0.0; 3], 0.0, spacing),
    };
    params.rest_density = pair_equilibrium_rest_density(&SmoothingKernels::new(h), separation, mass);

    ReferenceTest {
        name: "Pair Equilibrium".to_string(),
        config: config("Pair Equilibrium", params, scene),
        timesteps: steps,
        expected: ExpectedResult {
            trajectory: Some(TrajectoryCheck {
                particle: 0,
                expected: first,
                tolerance: 1.0e-5,
            }),
            conservation: Some(ConservationCheck {
                max_mass_error: 0.0,
                max_momentum_drift: Some(1.0e-6),
            }),
            ..Default::default()
        },
    }
}

/// Collapsing water block: every particle stays inside the box and the run
/// stays finite and below the speed limit.
pub fn dam_break(spacing: f32, steps: u64) -> ReferenceTest {
    let params = SimulationParams {
        smoothing_radius: 2.0 * spacing,
        time_step: 0.0005,
        execution: fluid_kernel::ExecutionMode::Parallel,
        ..Default::default()
    };
    let scene = Scene::Block {
        min: [0.0; 3],
        max: [0.4, 0.6, 0.4],
        spacing,
        density: params.rest_density,
    };

    ReferenceTest {
        name: "Dam Break Containment".to_string(),
        expected: ExpectedResult {
            position_bounds: Some(PositionBoundsCheck {
                min: params.domain_min,
                max: params.domain_max,
            }),
            conservation: Some(ConservationCheck {
                max_mass_error: 0.0,
                max_momentum_drift: None,
            }),
            max_speed: Some(MaxSpeedCheck {
                limit: params.max_speed * 3.0_f32.sqrt(),
            }),
            ..Default::default()
        },
        config: config("Dam Break Containment", params, scene),
        timesteps: steps,
    }
}

/// All scenarios at full length.
pub fn all() -> Vec<ReferenceTest> {
    vec![
        free_fall(300),
        rebound(750),
        pair_equilibrium(500),
        dam_break(0.05, 1000),
    ]
}
