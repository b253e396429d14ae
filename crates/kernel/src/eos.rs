//! Equations of state: density deviation to pressure.

use serde::{Deserialize, Serialize};

/// Pressure/density relation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum EquationOfState {
    /// `P = k * (rho - rho0)`
    #[default]
    Linear,
    /// Tait (weakly compressible) form, `P = (k * rho0 / gamma) * ((rho / rho0)^gamma - 1)`.
    ///
    /// Linearizes to the `Linear` law around rest density.
    Tait {
        /// Tait exponent, 7 for water
        gamma: f32,
    },
}

/// What to do with pressure below zero (density under rest density).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PressurePolicy {
    /// Clamp to `>= 0`; under-dense regions exert no attraction.
    #[default]
    ClampNonNegative,
    /// Keep negative pressure (tension).
    Signed,
}

impl EquationOfState {
    /// Evaluate pressure for `density` under this law and `policy`.
    ///
    /// # Arguments
    /// * `density` - Current density rho.
    /// * `rest_density` - Reference rest density rho0.
    /// * `stiffness` - Gas constant / stiffness k.
    /// * `policy` - Sign policy applied to the raw pressure.
    #[inline]
    pub fn pressure(&self, density: f32, rest_density: f32, stiffness: f32, policy: PressurePolicy) -> f32 {
        let raw = match *self {
            EquationOfState::Linear => linear_eos(density, rest_density, stiffness),
            EquationOfState::Tait { gamma } => tait_eos(density, rest_density, stiffness, gamma),
        };
        match policy {
            PressurePolicy::ClampNonNegative => raw.max(0.0),
            PressurePolicy::Signed => raw,
        }
    }
}

/// Linear equation of state, `P = k * (rho - rho0)`.
///
/// Negative (tension) when `density < rest_density`.
pub fn linear_eos(density: f32, rest_density: f32, stiffness: f32) -> f32 {
    stiffness * (density - rest_density)
}

/// Tait equation of state.
///
/// ```text
/// P = B * ((rho / rho0)^gamma - 1),   B = k * rho0 / gamma
/// ```
///
/// Negative (tension) when `density < rest_density`.
pub fn tait_eos(density: f32, rest_density: f32, stiffness: f32, gamma: f32) -> f32 {
    let b = stiffness * rest_density / gamma;
    let ratio = density / rest_density;
    b * (ratio.powf(gamma) - 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_at_rest_density() {
        assert_eq!(linear_eos(1000.0, 1000.0, 3.0), 0.0);
        let p = tait_eos(1000.0, 1000.0, 3.0, 7.0);
        assert!(p.abs() < 1.0e-3, "pressure at rest density should be ~0, got {p}");
    }

    #[test]
    fn positive_when_compressed() {
        assert!(linear_eos(1010.0, 1000.0, 3.0) > 0.0);
        assert!(tait_eos(1010.0, 1000.0, 3.0, 7.0) > 0.0);
    }

    #[test]
    fn clamp_policy_removes_tension() {
        let eos = EquationOfState::Linear;
        let clamped = eos.pressure(990.0, 1000.0, 3.0, PressurePolicy::ClampNonNegative);
        let signed = eos.pressure(990.0, 1000.0, 3.0, PressurePolicy::Signed);
        assert_eq!(clamped, 0.0);
        assert!((signed + 30.0).abs() < 1.0e-3, "signed pressure = {signed}");
    }

    #[test]
    fn tait_matches_linear_near_rest() {
        let rho0 = 1000.0;
        let k = 2.0;
        let tait = tait_eos(1000.5, rho0, k, 7.0);
        let linear = linear_eos(1000.5, rho0, k);
        assert!((tait - linear).abs() / linear < 0.01, "tait={tait}, linear={linear}");
    }

    #[test]
    fn serde_tagged_form() {
        let eos: EquationOfState = serde_json::from_str(r#"{ "kind": "Tait", "gamma": 7.0 }"#).unwrap();
        assert_eq!(eos, EquationOfState::Tait { gamma: 7.0 });
        let linear: EquationOfState = serde_json::from_str(r#"{ "kind": "Linear" }"#).unwrap();
        assert_eq!(linear, EquationOfState::Linear);
    }
}
