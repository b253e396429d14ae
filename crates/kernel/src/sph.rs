//! SPH smoothing kernels.
//!
//! Three kernels with compact support radius `h` (the smoothing radius), each
//! normalized in 3D:
//!
//! ```text
//! W_poly6(r, h)        = 315 / (64 pi h^9) * (h^2 - r^2)^3        (density)
//! grad W_spiky(r, h)   = -45 / (pi h^6) * (h - r)^2 * r_vec / r   (pressure)
//! lap W_visc(r, h)     =  45 / (pi h^6) * (h - r)                 (viscosity)
//! ```
//!
//! All three vanish for `r >= h`. The spiky gradient is used for pressure
//! because the poly6 gradient goes to zero as particles approach, which lets
//! them clump.

use std::f64::consts::PI as PI64;

/// Kernel set for one smoothing radius with coefficients precomputed.
///
/// Recomputing `h^9` per pair dominates the inner loop otherwise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothingKernels {
    h: f32,
    h_sq: f32,
    poly6_coeff: f32,
    spiky_coeff: f32,
    visc_coeff: f32,
}

impl SmoothingKernels {
    /// Build the kernel set for smoothing radius `h` (must be > 0).
    ///
    /// Powers of `h` are taken in f64 and only the coefficients are narrowed.
    /// For very small `h` the poly6 coefficient exceeds `f32::MAX`; check
    /// [`SmoothingKernels::is_finite`] before using such a set.
    pub fn new(h: f32) -> Self {
        let hd = f64::from(h);
        let h6 = hd.powi(6);
        let h9 = hd.powi(9);
        Self {
            h,
            h_sq: h * h,
            poly6_coeff: (315.0 / (64.0 * PI64 * h9)) as f32,
            spiky_coeff: (-45.0 / (PI64 * h6)) as f32,
            visc_coeff: (45.0 / (PI64 * h6)) as f32,
        }
    }

    /// `true` when every coefficient is representable in f32.
    pub fn is_finite(&self) -> bool {
        self.poly6_coeff.is_finite() && self.spiky_coeff.is_finite() && self.visc_coeff.is_finite()
    }

    /// Smoothing radius.
    #[inline]
    pub fn radius(&self) -> f32 {
        self.h
    }

    /// Poly6 kernel value for squared distance `r_sq`.
    #[inline]
    pub fn poly6(&self, r_sq: f32) -> f32 {
        if r_sq >= self.h_sq {
            return 0.0;
        }
        let diff = self.h_sq - r_sq;
        self.poly6_coeff * diff * diff * diff
    }

    /// Peak poly6 value, the self-contribution weight.
    #[inline]
    pub fn poly6_at_zero(&self) -> f32 {
        self.poly6(0.0)
    }

    /// Gradient of the spiky kernel for displacement `(dx, dy, dz) = x_i - x_j`
    /// with pre-computed distance `r`.
    ///
    /// Coincident particles (`r` near zero) have no defined direction and get a
    /// zero gradient.
    #[inline]
    pub fn spiky_gradient(&self, dx: f32, dy: f32, dz: f32, r: f32) -> (f32, f32, f32) {
        if r >= self.h || r < 1.0e-12 {
            return (0.0, 0.0, 0.0);
        }
        let diff = self.h - r;
        let scale = self.spiky_coeff * diff * diff / r;
        (scale * dx, scale * dy, scale * dz)
    }

    /// Laplacian of the viscosity kernel at distance `r`.
    #[inline]
    pub fn viscosity_laplacian(&self, r: f32) -> f32 {
        if r >= self.h {
            return 0.0;
        }
        self.visc_coeff * (self.h - r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poly6_peak_at_zero_distance() {
        let h = 0.1_f32;
        let k = SmoothingKernels::new(h);
        let expected = 315.0 / (64.0 * std::f32::consts::PI * h.powi(3));
        let w = k.poly6_at_zero();
        assert!((w - expected).abs() / expected < 1.0e-5, "w={w}, expected={expected}");
    }

    #[test]
    fn small_radius_keeps_finite_coefficients() {
        let k = SmoothingKernels::new(1.0e-4);
        assert!(k.is_finite());
        let w = k.poly6_at_zero();
        let expected = 315.0 / (64.0 * PI64 * 1.0e-12);
        assert!(w.is_finite() && ((w as f64 - expected) / expected).abs() < 1.0e-5, "w = {w}");

        let k = SmoothingKernels::new(5.0e-5);
        assert!(!k.is_finite());
        assert!(k.poly6_at_zero().is_infinite());
    }

    #[test]
    fn kernels_vanish_at_support_radius() {
        let h = 0.1;
        let k = SmoothingKernels::new(h);
        assert_eq!(k.poly6(h * h), 0.0);
        assert_eq!(k.spiky_gradient(h, 0.0, 0.0, h), (0.0, 0.0, 0.0));
        assert_eq!(k.viscosity_laplacian(h), 0.0);
        assert_eq!(k.poly6(0.25), 0.0);
    }

    #[test]
    fn poly6_positive_and_decreasing_inside_support() {
        let k = SmoothingKernels::new(1.0);
        let mut previous = f32::INFINITY;
        for i in 0..10 {
            let r = i as f32 * 0.1;
            let w = k.poly6(r * r);
            assert!(w > 0.0, "kernel should be positive at r={r}");
            assert!(w < previous, "kernel should decrease with r");
            previous = w;
        }
    }

    #[test]
    fn gradient_at_zero_is_zero() {
        let k = SmoothingKernels::new(0.1);
        assert_eq!(k.spiky_gradient(0.0, 0.0, 0.0, 0.0), (0.0, 0.0, 0.0));
    }

    #[test]
    fn gradient_points_toward_neighbor() {
        // Displacement x_i - x_j along +x: the kernel decreases away from j,
        // so the gradient w.r.t. x_i points along -x.
        let k = SmoothingKernels::new(0.1);
        let (gx, gy, gz) = k.spiky_gradient(0.05, 0.0, 0.0, 0.05);
        assert!(gx < 0.0, "gradient x should be negative, got {gx}");
        assert_eq!(gy, 0.0);
        assert_eq!(gz, 0.0);
    }

    #[test]
    fn gradient_is_antisymmetric() {
        let k = SmoothingKernels::new(1.0);
        let (dx, dy, dz) = (0.3_f32, -0.2_f32, 0.1_f32);
        let r = (dx * dx + dy * dy + dz * dz).sqrt();
        let a = k.spiky_gradient(dx, dy, dz, r);
        let b = k.spiky_gradient(-dx, -dy, -dz, r);
        assert_eq!(a.0, -b.0);
        assert_eq!(a.1, -b.1);
        assert_eq!(a.2, -b.2);
    }

    #[test]
    fn viscosity_laplacian_positive_inside_support() {
        let k = SmoothingKernels::new(0.5);
        assert!(k.viscosity_laplacian(0.0) > k.viscosity_laplacian(0.25));
        assert!(k.viscosity_laplacian(0.49) > 0.0);
    }

    #[test]
    fn poly6_normalization_numerical() {
        // Riemann sum over the cube [-h, h]^3 should integrate to ~1.
        let h = 0.1_f32;
        let k = SmoothingKernels::new(h);
        let n = 100;
        let cell = 2.0 * h / (n as f32);
        let dv = (cell * cell * cell) as f64;
        let mut integral = 0.0_f64;
        for ix in 0..n {
            let x = -h + (ix as f32 + 0.5) * cell;
            for iy in 0..n {
                let y = -h + (iy as f32 + 0.5) * cell;
                for iz in 0..n {
                    let z = -h + (iz as f32 + 0.5) * cell;
                    integral += k.poly6(x * x + y * y + z * z) as f64 * dv;
                }
            }
        }
        assert!(
            (integral - 1.0).abs() < 0.02,
            "kernel integral = {integral}, expected ~1.0"
        );
    }
}
