//! Linear algebra helpers for the calibration pipeline
//!
//! Thin aliases over nalgebra plus the guarded normalization used wherever a
//! learned vector may still be near zero.

use nalgebra::Vector3;

pub type Vec3 = Vector3<f64>;

// ===== Identity directions (phone frame) =====
pub const IDENTITY_FORWARD: [f64; 3] = [1.0, 0.0, 0.0];
pub const IDENTITY_DOWN: [f64; 3] = [0.0, 0.0, 1.0];

// ===== Minimum magnitudes before a vector is trusted as a direction =====
pub const MIN_DIRECTION_NORM: f64 = 0.1;
pub const MIN_RENORMALIZE_NORM: f64 = 0.01;

/// Unit vector along `v`, or `fallback` when `|v| <= min_norm`.
pub fn unit_or(v: &Vec3, min_norm: f64, fallback: [f64; 3]) -> Vec3 {
    let n = v.norm();
    if n > min_norm {
        v / n
    } else {
        Vec3::from(fallback)
    }
}

/// Remove the component of `v` along the unit vector `axis`.
pub fn reject_from(v: &Vec3, axis: &Vec3) -> Vec3 {
    v - axis * v.dot(axis)
}

/// `s = alpha*s + (1-alpha)*x` on a vector.
pub fn ema3(state: &Vec3, sample: &Vec3, alpha: f64) -> Vec3 {
    state * alpha + sample * (1.0 - alpha)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_unit_or_falls_back_on_small_vectors() {
        let v = Vec3::new(0.05, 0.0, 0.0);
        assert_eq!(unit_or(&v, MIN_DIRECTION_NORM, IDENTITY_DOWN), Vec3::new(0.0, 0.0, 1.0));
        let u = unit_or(&Vec3::new(0.0, 3.0, 4.0), MIN_DIRECTION_NORM, IDENTITY_DOWN);
        assert_relative_eq!(u.norm(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(u.y, 0.6, epsilon = 1e-12);
    }

    #[test]
    fn test_reject_from_is_orthogonal() {
        let axis = Vec3::new(1.0, 1.0, 1.0).normalize();
        let r = reject_from(&Vec3::new(2.0, -1.0, 0.5), &axis);
        assert!(r.dot(&axis).abs() < 1e-12);
    }
}
