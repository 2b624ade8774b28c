//! Adaptive gravity / orientation tracker.
//!
//! A single accelerometer stream is time-multiplexed between two low-pass
//! estimators. While GPS reports no significant acceleration the sample feeds
//! the gravity estimate; while it does, gravity is frozen and the linear
//! acceleration feeds the learned forward direction instead.

use crate::resampler::SIGNIFICANT_ACCEL_MPS2;
use crate::types::{
    ema3, reject_from, unit_or, Vec3, IDENTITY_DOWN, MIN_DIRECTION_NORM, MIN_RENORMALIZE_NORM,
};

pub const STANDARD_GRAVITY: f64 = 9.8;
/// Forward magnitude counted as fully learned by the confidence score.
const FORWARD_CONFIDENCE_NORM: f64 = 0.5;

#[derive(Clone, Copy, Debug)]
pub struct TrackerParams {
    /// Gravity / forward time constant (new-sample weight is `1 - alpha`).
    pub alpha: f64,
    /// Pre-filter on raw accel and gyro feeding gravity and the roughness baseline.
    pub filter_alpha: f64,
}

/// Loop-carried tracker state. Zeroed at session start.
#[derive(Clone, Debug, Default)]
pub struct TrackerState {
    pub gravity: Vec3,
    pub forward: Vec3,
    pub accel_filtered: Vec3,
    pub gyro_filtered: Vec3,
    pub total_forward_updates: u64,
}

/// What one tracker step produced for the rest of the sample's pipeline.
#[derive(Clone, Copy, Debug)]
pub struct TrackerStep {
    pub linear_accel: Vec3,
    pub down: Vec3,
    pub significant_accel: bool,
    pub gravity_updated: bool,
    pub forward_learned: bool,
    pub confidence: f64,
}

impl TrackerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance by one sample. `gps_accel` is the resampled virtual forward accel.
    pub fn step(&mut self, accel: &Vec3, gyro: &Vec3, gps_accel: f64, params: &TrackerParams) -> TrackerStep {
        let significant_accel = gps_accel.abs() > SIGNIFICANT_ACCEL_MPS2;

        self.accel_filtered = ema3(&self.accel_filtered, accel, params.filter_alpha);
        self.gyro_filtered = ema3(&self.gyro_filtered, gyro, params.filter_alpha);

        // Gravity only learns while the vehicle is not accelerating.
        if !significant_accel {
            self.gravity = ema3(&self.gravity, &self.accel_filtered, params.alpha);
        }

        let linear_accel = accel - self.gravity;

        // Signed so braking also pulls toward the nose.
        // NOTE: assumes GPS acceleration sign tracks the nose decelerating vs accelerating.
        if significant_accel {
            let sign = if gps_accel > 0.0 { 1.0 } else { -1.0 };
            self.forward = ema3(&self.forward, &(linear_accel * sign), params.alpha);
            let norm = self.forward.norm();
            if norm > MIN_RENORMALIZE_NORM {
                self.forward /= norm;
            }
            self.total_forward_updates += 1;
        }

        let down = self.down();
        self.forward = reject_from(&self.forward, &down);

        TrackerStep {
            linear_accel,
            down,
            significant_accel,
            gravity_updated: !significant_accel,
            forward_learned: significant_accel,
            confidence: self.confidence(),
        }
    }

    /// Normalized gravity, `{0,0,1}` until gravity is large enough to trust.
    pub fn down(&self) -> Vec3 {
        unit_or(&self.gravity, MIN_DIRECTION_NORM, IDENTITY_DOWN)
    }

    /// Mean of the gravity and forward convergence ratios. Diagnostic only.
    pub fn confidence(&self) -> f64 {
        let gravity_conf = (self.gravity.norm() / STANDARD_GRAVITY).min(1.0);
        let forward_conf = (self.forward.norm() / FORWARD_CONFIDENCE_NORM).min(1.0);
        (gravity_conf + forward_conf) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const PARAMS: TrackerParams = TrackerParams { alpha: 0.97, filter_alpha: 0.9 };

    #[test]
    fn test_gravity_converges_on_tilted_phone() {
        let g = Vec3::new(3.0, -4.0, 8.0).normalize() * STANDARD_GRAVITY;
        let mut state = TrackerState::new();
        for _ in 0..300 {
            state.step(&g, &Vec3::zeros(), 0.0, &PARAMS);
        }
        assert!((state.gravity.norm() - STANDARD_GRAVITY).abs() < 0.1);
        assert_relative_eq!(state.down(), g.normalize(), epsilon = 1e-2);
        assert_eq!(state.total_forward_updates, 0);
        assert_relative_eq!(state.forward.norm(), 0.0);
    }

    #[test]
    fn test_gravity_frozen_during_acceleration() {
        let mut state = TrackerState::new();
        let rest = Vec3::new(0.0, 0.0, STANDARD_GRAVITY);
        for _ in 0..300 {
            state.step(&rest, &Vec3::zeros(), 0.0, &PARAMS);
        }
        let frozen = state.gravity;
        let pushing = Vec3::new(3.0, 0.0, STANDARD_GRAVITY);
        for _ in 0..100 {
            let step = state.step(&pushing, &Vec3::zeros(), 3.0, &PARAMS);
            assert!(step.significant_accel);
            assert!(!step.gravity_updated);
        }
        assert_eq!(state.gravity, frozen);
        assert!(state.forward.x > 0.99);
        assert_eq!(state.total_forward_updates, 100);
    }

    #[test]
    fn test_braking_learns_the_same_forward() {
        let mut state = TrackerState::new();
        for _ in 0..300 {
            state.step(&Vec3::new(0.0, 0.0, STANDARD_GRAVITY), &Vec3::zeros(), 0.0, &PARAMS);
        }
        // phone +y points at the nose; braking pushes the reading toward -y
        let braking = Vec3::new(0.0, -4.0, STANDARD_GRAVITY);
        for _ in 0..100 {
            state.step(&braking, &Vec3::zeros(), -4.0, &PARAMS);
        }
        assert!(state.forward.y > 0.99);
    }

    #[test]
    fn test_forward_stays_orthogonal_to_down() {
        let mut state = TrackerState::new();
        let tilted = Vec3::new(0.0, 2.0, 9.59);
        for _ in 0..200 {
            state.step(&tilted, &Vec3::zeros(), 0.0, &PARAMS);
        }
        for i in 0..200 {
            let push = tilted + Vec3::new(2.0, 0.5 * (i as f64 * 0.1).sin(), 0.3);
            let step = state.step(&push, &Vec3::zeros(), 2.0, &PARAMS);
            assert!(state.forward.dot(&step.down).abs() < 1e-6);
        }
    }

    #[test]
    fn test_confidence_ramps_from_zero() {
        let mut state = TrackerState::new();
        assert_relative_eq!(state.confidence(), 0.0);
        for _ in 0..400 {
            state.step(&Vec3::new(0.0, 0.0, STANDARD_GRAVITY), &Vec3::zeros(), 0.0, &PARAMS);
        }
        // gravity converged, forward never learned
        assert!((state.confidence() - 0.5).abs() < 0.01);
    }
}
