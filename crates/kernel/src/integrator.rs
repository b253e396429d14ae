//! Time integration and time-step selection.

use serde::{Deserialize, Serialize};

use crate::parallel::ExecutionMode;
use crate::particle::ParticleArrays;

/// Time integration scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IntegrationScheme {
    /// `v += a dt; x += v dt` (symplectic, the default)
    #[default]
    SemiImplicitEuler,
    /// `x += v dt; v += a dt`, kept for comparison runs
    ExplicitEuler,
    /// Classical fourth-order Runge-Kutta; accelerations are re-evaluated at
    /// every intermediate stage
    RungeKutta4,
}

/// Advance velocities and positions by `dt`.
///
/// The particles' accelerations must already be evaluated for their current
/// state. `evaluate` recomputes accelerations in place for an intermediate
/// state; only [`IntegrationScheme::RungeKutta4`] calls it.
///
/// Velocity components are clamped to `[-max_speed, max_speed]` after the
/// velocity update so that one extreme step cannot push a particle to a
/// non-finite position. Returns the number of particles that were clamped.
/// A NaN velocity passes through unchanged and is caught by the controller.
pub fn integrate<F>(
    particles: &mut ParticleArrays,
    dt: f32,
    max_speed: f32,
    scheme: IntegrationScheme,
    mode: ExecutionMode,
    evaluate: F,
) -> usize
where
    F: FnMut(&mut ParticleArrays),
{
    let next = match scheme {
        IntegrationScheme::SemiImplicitEuler | IntegrationScheme::ExplicitEuler => {
            euler(particles, dt, max_speed, scheme, mode)
        }
        IntegrationScheme::RungeKutta4 => runge_kutta4(particles, dt, max_speed, mode, evaluate),
    };
    store(particles, next)
}

type Advanced = ([f32; 3], [f32; 3], bool);

/// Clamp one velocity component, flagging real clamps (not NaN).
#[inline]
fn clamp_component(v: f32, max_speed: f32, clamped: &mut bool) -> f32 {
    let c = v.clamp(-max_speed, max_speed);
    *clamped |= c != v && !v.is_nan();
    c
}

fn euler(
    particles: &ParticleArrays,
    dt: f32,
    max_speed: f32,
    scheme: IntegrationScheme,
    mode: ExecutionMode,
) -> Vec<Advanced> {
    let p = particles;
    mode.map_particles(p.len(), |i| {
        let pos = p.position(i);
        let vel = p.velocity(i);
        let acc = p.acceleration(i);
        let mut clamped = false;
        let mut new_pos = pos;
        let mut new_vel = vel;
        for axis in 0..3 {
            let v = clamp_component(vel[axis] + acc[axis] * dt, max_speed, &mut clamped);
            new_vel[axis] = v;
            new_pos[axis] = match scheme {
                IntegrationScheme::ExplicitEuler => pos[axis] + vel[axis] * dt,
                _ => pos[axis] + v * dt,
            };
        }
        (new_pos, new_vel, clamped)
    })
}

/// Derivative samples of one Runge-Kutta stage: velocity and acceleration
/// per particle.
struct Stage {
    vel: Vec<[f32; 3]>,
    acc: Vec<[f32; 3]>,
}

impl Stage {
    fn sample(p: &ParticleArrays) -> Self {
        Self {
            vel: (0..p.len()).map(|i| p.velocity(i)).collect(),
            acc: (0..p.len()).map(|i| p.acceleration(i)).collect(),
        }
    }
}

fn runge_kutta4<F>(
    particles: &ParticleArrays,
    dt: f32,
    max_speed: f32,
    mode: ExecutionMode,
    mut evaluate: F,
) -> Vec<Advanced>
where
    F: FnMut(&mut ParticleArrays),
{
    let n = particles.len();
    let x0: Vec<[f32; 3]> = (0..n).map(|i| particles.position(i)).collect();
    let v0: Vec<[f32; 3]> = (0..n).map(|i| particles.velocity(i)).collect();

    let k1 = Stage::sample(particles);
    let mut state = particles.clone();
    let mut next_stage = |from: &Stage, scale: f32| {
        for i in 0..n {
            let x = [0, 1, 2].map(|a| x0[i][a] + scale * dt * from.vel[i][a]);
            let v = [0, 1, 2].map(|a| v0[i][a] + scale * dt * from.acc[i][a]);
            state.set_position(i, x);
            state.set_velocity(i, v);
        }
        evaluate(&mut state);
        Stage::sample(&state)
    };
    let k2 = next_stage(&k1, 0.5);
    let k3 = next_stage(&k2, 0.5);
    let k4 = next_stage(&k3, 1.0);

    let sixth = dt / 6.0;
    mode.map_particles(n, |i| {
        let mut clamped = false;
        let mut new_pos = x0[i];
        let mut new_vel = v0[i];
        for axis in 0..3 {
            let dv = k1.acc[i][axis] + 2.0 * k2.acc[i][axis] + 2.0 * k3.acc[i][axis] + k4.acc[i][axis];
            let dx = k1.vel[i][axis] + 2.0 * k2.vel[i][axis] + 2.0 * k3.vel[i][axis] + k4.vel[i][axis];
            new_vel[axis] = clamp_component(v0[i][axis] + sixth * dv, max_speed, &mut clamped);
            new_pos[axis] = x0[i][axis] + sixth * dx;
        }
        (new_pos, new_vel, clamped)
    })
}

fn store(particles: &mut ParticleArrays, next: Vec<Advanced>) -> usize {
    let mut clamped_count = 0;
    for (i, (pos, vel, clamped)) in next.into_iter().enumerate() {
        particles.set_position(i, pos);
        particles.set_velocity(i, vel);
        clamped_count += clamped as usize;
    }
    clamped_count
}

/// Minimum suggested timestep.
const MIN_DT: f32 = 1.0e-8;

/// Suggest a stable timestep from the current state.
///
/// Two criteria are combined (minimum is used):
/// 1. Velocity CFL: `cfl * h / v_max`
/// 2. Force-based:  `0.25 * sqrt(h / a_max)`
///
/// Returns `fallback` when the system is at rest with no acceleration.
pub fn cfl_time_step(particles: &ParticleArrays, h: f32, cfl: f32, fallback: f32) -> f32 {
    let mut max_speed = 0.0_f32;
    let mut max_accel = 0.0_f32;
    for i in 0..particles.len() {
        let v = (particles.vx[i] * particles.vx[i]
            + particles.vy[i] * particles.vy[i]
            + particles.vz[i] * particles.vz[i])
            .sqrt();
        max_speed = max_speed.max(v);
        let a = (particles.ax[i] * particles.ax[i]
            + particles.ay[i] * particles.ay[i]
            + particles.az[i] * particles.az[i])
            .sqrt();
        max_accel = max_accel.max(a);
    }

    let dt_cfl = if max_speed > 1.0e-12 {
        cfl * h / max_speed
    } else {
        fallback
    };
    let dt_force = if max_accel > 1.0e-12 {
        0.25 * (h / max_accel).sqrt()
    } else {
        fallback
    };
    dt_cfl.min(dt_force).min(fallback).max(MIN_DT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(vel: [f32; 3], acc: [f32; 3]) -> ParticleArrays {
        let mut p = ParticleArrays::new();
        p.push_particle([0.0; 3], vel, 1.0);
        p.ax[0] = acc[0];
        p.ay[0] = acc[1];
        p.az[0] = acc[2];
        p
    }

    /// Stage evaluation for a fixed acceleration field.
    fn hold(_: &mut ParticleArrays) {}

    /// Linear drag `a = -k v` with `k = 2`.
    fn drag(p: &mut ParticleArrays) {
        for i in 0..p.len() {
            p.ax[i] = -2.0 * p.vx[i];
            p.ay[i] = -2.0 * p.vy[i];
            p.az[i] = -2.0 * p.vz[i];
        }
    }

    #[test]
    fn semi_implicit_uses_updated_velocity() {
        let mut p = single([1.0, 0.0, 0.0], [0.0, -10.0, 0.0]);
        let clamped = integrate(&mut p, 0.1, 100.0, IntegrationScheme::SemiImplicitEuler, ExecutionMode::Sequential, hold);
        assert_eq!(clamped, 0);
        assert!((p.vy[0] + 1.0).abs() < 1.0e-6);
        assert!((p.y[0] + 0.1).abs() < 1.0e-6, "y = {}", p.y[0]);
        assert!((p.x[0] - 0.1).abs() < 1.0e-6);
    }

    #[test]
    fn explicit_uses_old_velocity() {
        let mut p = single([0.0; 3], [0.0, -10.0, 0.0]);
        integrate(&mut p, 0.1, 100.0, IntegrationScheme::ExplicitEuler, ExecutionMode::Sequential, hold);
        assert_eq!(p.y[0], 0.0);
        assert!((p.vy[0] + 1.0).abs() < 1.0e-6);
    }

    #[test]
    fn velocity_clamped_per_component() {
        let mut p = single([0.0; 3], [1.0e6, -1.0e6, 1.0]);
        let clamped = integrate(&mut p, 1.0, 5.0, IntegrationScheme::SemiImplicitEuler, ExecutionMode::Sequential, hold);
        assert_eq!(clamped, 1);
        assert_eq!(p.vx[0], 5.0);
        assert_eq!(p.vy[0], -5.0);
        assert_eq!(p.vz[0], 1.0);
        assert_eq!(p.x[0], 5.0);
    }

    #[test]
    fn infinite_max_speed_never_clamps() {
        let mut p = single([0.0; 3], [1.0e6, 0.0, 0.0]);
        let clamped = integrate(&mut p, 1.0, f32::INFINITY, IntegrationScheme::SemiImplicitEuler, ExecutionMode::Sequential, hold);
        assert_eq!(clamped, 0);
        assert_eq!(p.vx[0], 1.0e6);
    }

    #[test]
    fn runge_kutta_exact_for_constant_acceleration() {
        let mut p = single([1.0, 2.0, 0.0], [0.0, -10.0, 4.0]);
        let clamped = integrate(&mut p, 0.1, 100.0, IntegrationScheme::RungeKutta4, ExecutionMode::Sequential, hold);
        assert_eq!(clamped, 0);
        assert!((p.x[0] - 0.1).abs() < 1.0e-6, "x = {}", p.x[0]);
        assert!((p.y[0] - (0.2 - 0.05)).abs() < 1.0e-6, "y = {}", p.y[0]);
        assert!((p.z[0] - 0.02).abs() < 1.0e-6, "z = {}", p.z[0]);
        assert!((p.vy[0] - 1.0).abs() < 1.0e-6);
        assert!((p.vz[0] - 0.4).abs() < 1.0e-6);
    }

    #[test]
    fn runge_kutta_tracks_drag_decay() {
        let dt = 0.01;
        let steps = 100;
        let exact_v = (-2.0_f64).exp();
        let exact_x = 0.5 * (1.0 - exact_v);

        let mut rk = single([1.0, 0.0, 0.0], [-2.0, 0.0, 0.0]);
        let mut euler = rk.clone();
        for _ in 0..steps {
            integrate(&mut rk, dt, 100.0, IntegrationScheme::RungeKutta4, ExecutionMode::Sequential, drag);
            drag(&mut rk);
            integrate(&mut euler, dt, 100.0, IntegrationScheme::SemiImplicitEuler, ExecutionMode::Sequential, hold);
            drag(&mut euler);
        }
        let rk_err = (rk.vx[0] as f64 - exact_v).abs();
        let euler_err = (euler.vx[0] as f64 - exact_v).abs();
        eprintln!("v error after {steps} steps: rk4 {rk_err:.3e}, euler {euler_err:.3e}");
        assert!(rk_err < 1.0e-5);
        assert!(euler_err > 1.0e-3);
        assert!((rk.x[0] as f64 - exact_x).abs() < 1.0e-5, "x = {}", rk.x[0]);
    }

    #[test]
    fn runge_kutta_clamps_final_velocity() {
        let mut p = single([0.0; 3], [1.0e6, 0.0, 0.0]);
        let clamped = integrate(&mut p, 1.0, 5.0, IntegrationScheme::RungeKutta4, ExecutionMode::Parallel, hold);
        assert_eq!(clamped, 1);
        assert_eq!(p.vx[0], 5.0);
    }

    #[test]
    fn cfl_shrinks_with_speed() {
        let slow = single([0.1, 0.0, 0.0], [0.0; 3]);
        let fast = single([10.0, 0.0, 0.0], [0.0; 3]);
        let dt_slow = cfl_time_step(&slow, 0.1, 0.4, 0.01);
        let dt_fast = cfl_time_step(&fast, 0.1, 0.4, 0.01);
        assert_eq!(dt_slow, 0.01);
        assert!((dt_fast - 0.004).abs() < 1.0e-6, "dt_fast = {dt_fast}");
    }

    #[test]
    fn cfl_at_rest_returns_fallback() {
        let rest = single([0.0; 3], [0.0; 3]);
        assert_eq!(cfl_time_step(&rest, 0.1, 0.4, 0.002), 0.002);
    }
}
