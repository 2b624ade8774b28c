use crate::smoothing::SecondOrderEma;
use crate::types::{unit_or, Vec3, IDENTITY_DOWN, IDENTITY_FORWARD, MIN_DIRECTION_NORM};

/// Vehicle axes expressed in the phone frame.
///
/// `lateral = forward × down`, so with the standard phone-flat basis
/// (forward `+x`, down `+z`) lateral is `-y`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VehicleFrame {
    pub forward: Vec3,
    pub lateral: Vec3,
    pub down: Vec3,
}

impl VehicleFrame {
    /// Build the basis from the tracker's gravity and learned forward vectors.
    pub fn from_estimates(gravity: &Vec3, forward: &Vec3) -> Self {
        let down = unit_or(gravity, MIN_DIRECTION_NORM, IDENTITY_DOWN);
        let forward = unit_or(forward, MIN_DIRECTION_NORM, IDENTITY_FORWARD);
        let lateral = forward.cross(&down);
        Self { forward, lateral, down }
    }

    /// Components of a phone-frame vector along (forward, lateral, down).
    pub fn project(&self, v: &Vec3) -> Vec3 {
        Vec3::new(v.dot(&self.forward), v.dot(&self.lateral), v.dot(&self.down))
    }
}

/// Per-sample projection plus the display-only smoothed copy.
pub struct FrameTransformer {
    display: SecondOrderEma,
}

#[derive(Clone, Copy, Debug)]
pub struct Transformed {
    pub frame: VehicleFrame,
    pub raw: Vec3,
    pub filtered: Vec3,
}

impl FrameTransformer {
    pub fn new(alpha: f64) -> Self {
        Self { display: SecondOrderEma::new(alpha) }
    }

    pub fn transform(&mut self, gravity: &Vec3, forward: &Vec3, linear_accel: &Vec3) -> Transformed {
        let frame = VehicleFrame::from_estimates(gravity, forward);
        let raw = frame.project(linear_accel);
        let filtered = self.display.update(&raw);
        Transformed { frame, raw, filtered }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_identity_fallbacks_before_learning() {
        let frame = VehicleFrame::from_estimates(&Vec3::zeros(), &Vec3::zeros());
        assert_eq!(frame.forward, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(frame.down, Vec3::new(0.0, 0.0, 1.0));
        assert_eq!(frame.lateral, Vec3::new(0.0, -1.0, 0.0));
    }

    #[test]
    fn test_projection_on_learned_frame() {
        // phone mounted with +y toward the nose, flat
        let frame = VehicleFrame::from_estimates(&Vec3::new(0.0, 0.0, 9.8), &Vec3::new(0.0, 0.8, 0.0));
        let p = frame.project(&Vec3::new(0.0, 2.0, 0.0));
        assert_relative_eq!(p.x, 2.0, epsilon = 1e-12);
        assert_relative_eq!(p.y, 0.0, epsilon = 1e-12);
        assert_relative_eq!(p.z, 0.0, epsilon = 1e-12);
        assert_relative_eq!(frame.lateral, Vec3::new(1.0, 0.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_basis_is_orthonormal_for_orthogonal_inputs() {
        let g = Vec3::new(1.0, 2.0, 9.5);
        let down = g.normalize();
        let f = Vec3::new(1.0, 0.0, 0.0);
        let f = f - down * f.dot(&down);
        let frame = VehicleFrame::from_estimates(&g, &f);
        assert_relative_eq!(frame.lateral.norm(), 1.0, epsilon = 1e-12);
        assert!(frame.forward.dot(&frame.lateral).abs() < 1e-12);
        assert!(frame.lateral.dot(&frame.down).abs() < 1e-12);
    }

    #[test]
    fn test_filtered_channel_lags_raw() {
        let mut t = FrameTransformer::new(0.9);
        let out = t.transform(&Vec3::new(0.0, 0.0, 9.8), &Vec3::new(1.0, 0.0, 0.0), &Vec3::new(3.0, 0.0, 0.0));
        assert_relative_eq!(out.raw.x, 3.0, epsilon = 1e-12);
        assert!(out.filtered.x > 0.0 && out.filtered.x < 0.1);
    }
}
