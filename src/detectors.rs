use serde::Serialize;

use crate::smoothing::ScalarEma;
use crate::types::{Vec3, MIN_DIRECTION_NORM};

/// Per-sample boolean detector outputs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectorFlags {
    pub gps_accel_detected: bool,
    pub turning_detected: bool,
    pub phone_stable: bool,
    pub vehicle_stationary: bool,
    pub vehicle_moving: bool,
    pub gravity_updating: bool,
}

/// Flags whether the phone is rotating inside the vehicle.
///
/// Tracks the angular rate of the low-passed accelerometer direction and
/// smooths it with `orientation_alpha` as the new-sample weight.
#[derive(Clone, Debug)]
pub struct OrientationChangeDetector {
    rate: ScalarEma,
    previous: Option<Vec3>,
    sample_rate_hz: f64,
    threshold: f64,
}

impl OrientationChangeDetector {
    /// `threshold` in rad/s.
    pub fn new(orientation_alpha: f64, sample_rate_hz: f64, threshold: f64) -> Self {
        Self {
            rate: ScalarEma::new(orientation_alpha),
            previous: None,
            sample_rate_hz,
            threshold,
        }
    }

    /// Smoothed orientation change rate, rad/s.
    pub fn rate(&self) -> f64 {
        self.rate.value
    }

    /// Feed the filtered accelerometer vector; returns `true` while the phone is stable.
    pub fn update(&mut self, accel_filtered: &Vec3) -> bool {
        let norm = accel_filtered.norm();
        if norm > MIN_DIRECTION_NORM {
            let unit = accel_filtered / norm;
            let angle = match self.previous {
                Some(prev) => prev.dot(&unit).clamp(-1.0, 1.0).acos(),
                None => 0.0,
            };
            self.rate.update(angle * self.sample_rate_hz);
            self.previous = Some(unit);
        }
        self.rate.value < self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_orientation_is_stable() {
        let mut det = OrientationChangeDetector::new(0.1, 60.0, 0.1);
        for _ in 0..120 {
            assert!(det.update(&Vec3::new(0.5, 0.0, 9.8)));
        }
        assert_eq!(det.rate(), 0.0);
    }

    #[test]
    fn test_rotation_is_flagged() {
        let mut det = OrientationChangeDetector::new(0.1, 60.0, 0.1);
        let mut stable = true;
        // 1 rad/s about x
        for i in 0..120 {
            let a = i as f64 / 60.0;
            stable = det.update(&(Vec3::new(0.0, a.sin(), a.cos()) * 9.8));
        }
        assert!(!stable);
        assert!((det.rate() - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_tiny_vectors_are_ignored() {
        let mut det = OrientationChangeDetector::new(0.5, 60.0, 0.1);
        det.update(&Vec3::new(0.0, 0.0, 9.8));
        assert!(det.update(&Vec3::new(0.01, 0.0, 0.0)));
        assert_eq!(det.rate(), 0.0);
    }
}
