//! Analytical reference solutions for fluid kernel validation.
//!
//! Provides closed-form solutions against which simulation results can be
//! compared for quantitative accuracy assessment.

use fluid_kernel::SmoothingKernels;

/// Ballistic motion of an isolated particle under uniform gravity, with an
/// inelastic floor.
///
/// The continuous solution is
///
/// ```text
/// y(t) = y0 + v0 t + g t^2 / 2
/// ```
///
/// Semi-implicit Euler with step `dt` reproduces it exactly at the sample
/// times up to an `O(dt)` offset:
///
/// ```text
/// y_n = y0 + v0 n dt + g dt^2 n (n + 1) / 2
/// ```
///
/// At the floor the vertical velocity is reversed and scaled by the
/// restitution coefficient `r`, so each rebound apex is `r^2` times the
/// previous drop height.
#[derive(Debug, Clone, Copy)]
pub struct FreeFall {
    /// Initial height y0 (m)
    pub initial_height: f64,
    /// Initial vertical velocity v0 (m/s)
    pub initial_velocity: f64,
    /// Vertical gravity component g (m/s^2, negative downward)
    pub gravity: f64,
    /// Floor height (m)
    pub floor: f64,
    /// Restitution coefficient r
    pub restitution: f64,
}

impl FreeFall {
    /// Height at time `t` before the first floor contact.
    pub fn height_at(&self, t: f64) -> f64 {
        self.initial_height + self.initial_velocity * t + 0.5 * self.gravity * t * t
    }

    /// Velocity at time `t` before the first floor contact.
    pub fn velocity_at(&self, t: f64) -> f64 {
        self.initial_velocity + self.gravity * t
    }

    /// Height after `n` semi-implicit Euler steps of size `dt`.
    pub fn discrete_height(&self, n: u64, dt: f64) -> f64 {
        let n = n as f64;
        self.initial_height + self.initial_velocity * n * dt + self.gravity * dt * dt * n * (n + 1.0) / 2.0
    }

    /// Time of first floor contact, if the particle ever reaches it.
    pub fn contact_time(&self) -> Option<f64> {
        // Solve floor = y0 + v0 t + g t^2 / 2 for the positive root
        let a = 0.5 * self.gravity;
        let b = self.initial_velocity;
        let c = self.initial_height - self.floor;
        if a == 0.0 {
            return if b < 0.0 { Some(-c / b) } else { None };
        }
        let disc = b * b - 4.0 * a * c;
        if disc < 0.0 {
            return None;
        }
        let sqrt_disc = disc.sqrt();
        [(-b - sqrt_disc) / (2.0 * a), (-b + sqrt_disc) / (2.0 * a)]
            .into_iter()
            .filter(|&t| t >= 0.0)
            .reduce(f64::min)
    }

    /// Speed at first floor contact.
    pub fn impact_speed(&self) -> Option<f64> {
        self.contact_time().map(|t| self.velocity_at(t).abs())
    }

    /// Peak height above the floor after the first rebound.
    pub fn rebound_apex(&self) -> Option<f64> {
        let v = self.restitution * self.impact_speed()?;
        Some(v * v / (2.0 * self.gravity.abs()))
    }
}

/// Rest density at which two particles of mass `mass` at distance
/// `separation` feel zero pressure.
///
/// Each particle's summed density is `m (W(0) + W(separation))`; choosing
/// that as the rest density puts the pair in exact equilibrium.
pub fn pair_equilibrium_rest_density(kernels: &SmoothingKernels, separation: f32, mass: f32) -> f32 {
    mass * (kernels.poly6_at_zero() + kernels.poly6(separation * separation))
}
