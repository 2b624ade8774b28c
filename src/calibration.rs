// calibration.rs — single-pass floating calibration over one session
//
// Everything in this module is independent of:
//   - file formats and the CLI
//   - histogram persistence
//   - Rerun logging
//
// It takes one session's sensor arrays in and produces per-sample
// vehicle-frame channels, roughness segments and a session histogram out.
// Calls share no state, so sessions can be calibrated concurrently.

use serde::{Deserialize, Serialize};

use crate::detectors::{DetectorFlags, OrientationChangeDetector};
use crate::error::{CalibrationError, Result};
use crate::frame::FrameTransformer;
use crate::histogram::DanHistogram;
use crate::observers::{ObserverSample, ObserverState};
use crate::resampler::{resample, ResampledGps};
use crate::roughness::{RoadDanSegment, RoughnessEstimator};
use crate::tracker::{TrackerParams, TrackerState};
use crate::types::{GpsFix, SessionInput, Vec3, Vector3D};

// ─── Configuration ───────────────────────────────────────────────────────────

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    // ── Gravity / forward tracker ──
    pub alpha: f64,
    pub filter_alpha: f64,

    // ── Observer bank ──
    pub observer_alpha: f64,

    // ── Detectors ──
    pub orientation_alpha: f64,
    /// rad/s of accelerometer-direction change above which the phone is "moving in the mount".
    pub orientation_rate_threshold: f64,
    /// rad/s of vehicle-frame yaw.
    pub turn_rate_threshold: f64,
    pub stationary_speed_mps: f64,
    pub moving_speed_mps: f64,

    // ── Roughness ──
    pub dan_decay: f64,
    pub segment_len: usize,

    // ── Sampling ──
    pub sample_rate_hz: f64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            alpha: 0.97,
            filter_alpha: 0.90,
            observer_alpha: 0.05,
            orientation_alpha: 0.10,
            orientation_rate_threshold: 0.10,
            turn_rate_threshold: 0.10,
            stationary_speed_mps: 0.5,
            moving_speed_mps: 1.0,
            dan_decay: 0.95,
            segment_len: 60,
            sample_rate_hz: 60.0,
        }
    }
}

/// `(name, value, recommended range)` for each smoothing coefficient.
fn coefficients(config: &CalibrationConfig) -> [(&'static str, f64, (f64, f64)); 5] {
    [
        ("alpha", config.alpha, (0.90, 0.99)),
        ("observer_alpha", config.observer_alpha, (0.01, 0.20)),
        ("filter_alpha", config.filter_alpha, (0.50, 0.99)),
        ("orientation_alpha", config.orientation_alpha, (0.01, 0.95)),
        ("dan_decay", config.dan_decay, (0.80, 0.99)),
    ]
}

impl CalibrationConfig {
    /// Reject coefficients outside [0, 1]; warn outside the recommended bounds.
    pub fn validate(&self) -> Result<()> {
        for (name, value, (lo, hi)) in coefficients(self) {
            if !value.is_finite() {
                return Err(CalibrationError::InvalidParameter { name, value, reason: "must be finite" });
            }
            if !(0.0..=1.0).contains(&value) {
                return Err(CalibrationError::InvalidParameter { name, value, reason: "must lie in [0, 1]" });
            }
            if value < lo || value > hi {
                log::warn!("{} = {} is outside the recommended range [{}, {}]", name, value, lo, hi);
            }
        }

        if !self.sample_rate_hz.is_finite() || self.sample_rate_hz <= 0.0 {
            return Err(CalibrationError::InvalidParameter {
                name: "sample_rate_hz",
                value: self.sample_rate_hz,
                reason: "must be positive",
            });
        }
        if self.segment_len == 0 {
            return Err(CalibrationError::InvalidParameter {
                name: "segment_len",
                value: 0.0,
                reason: "must be at least one sample",
            });
        }
        let thresholds = [
            ("orientation_rate_threshold", self.orientation_rate_threshold),
            ("turn_rate_threshold", self.turn_rate_threshold),
            ("stationary_speed_mps", self.stationary_speed_mps),
            ("moving_speed_mps", self.moving_speed_mps),
        ];
        for (name, value) in thresholds {
            if !value.is_finite() || value < 0.0 {
                return Err(CalibrationError::InvalidParameter { name, value, reason: "must be finite and non-negative" });
            }
        }
        Ok(())
    }

    fn tracker_params(&self) -> TrackerParams {
        TrackerParams { alpha: self.alpha, filter_alpha: self.filter_alpha }
    }
}

// ─── Output ──────────────────────────────────────────────────────────────────

/// Parallel per-sample channels plus the session's segments and histogram.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationOutput {
    /// Linear acceleration in (forward, lateral, down).
    pub transformed: Vec<Vector3D>,
    pub transformed_filtered: Vec<Vector3D>,
    pub linear_accel: Vec<Vector3D>,
    pub gravity: Vec<Vector3D>,
    pub forward: Vec<Vector3D>,
    pub confidence: Vec<f64>,
    pub flags: Vec<DetectorFlags>,
    pub observers: Vec<ObserverSample>,
    pub gps: ResampledGps,
    pub dan_x: Vec<f64>,
    pub road_dan: Vec<f64>,
    pub don_x: Vec<f64>,
    pub road_don: Vec<f64>,
    pub segments: Vec<RoadDanSegment>,
    pub session_histogram: DanHistogram,
    pub total_forward_updates: u64,
    /// Samples whose accel or gyro reading was not finite.
    pub skipped_samples: usize,
}

impl CalibrationOutput {
    fn with_capacity(n: usize) -> Self {
        Self {
            transformed: Vec::with_capacity(n),
            transformed_filtered: Vec::with_capacity(n),
            linear_accel: Vec::with_capacity(n),
            gravity: Vec::with_capacity(n),
            forward: Vec::with_capacity(n),
            confidence: Vec::with_capacity(n),
            flags: Vec::with_capacity(n),
            observers: Vec::with_capacity(n),
            dan_x: Vec::with_capacity(n),
            road_dan: Vec::with_capacity(n),
            don_x: Vec::with_capacity(n),
            road_don: Vec::with_capacity(n),
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.transformed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transformed.is_empty()
    }

    pub fn final_confidence(&self) -> f64 {
        self.confidence.last().copied().unwrap_or(0.0)
    }
}

// ─── Pipeline ────────────────────────────────────────────────────────────────

fn is_finite(v: &Vec3) -> bool {
    v.iter().all(|c| c.is_finite())
}

/// Run the full calibration pipeline over one session.
pub fn calibrate(input: &SessionInput, config: &CalibrationConfig) -> Result<CalibrationOutput> {
    input.validate()?;
    config.validate()?;

    let n = input.len();
    let dt = 1.0 / config.sample_rate_hz;
    log::debug!(
        "calibrating {} samples ({} gps fixes, mag {})",
        n,
        input.gps.len(),
        if input.mag.is_empty() { "absent" } else { "present" }
    );

    let gps = resample(&input.gps, n, config.sample_rate_hz);
    let params = config.tracker_params();

    let mut tracker = TrackerState::new();
    let mut transformer = FrameTransformer::new(config.alpha);
    let mut observers = ObserverState::new(config.observer_alpha, dt);
    let mut roughness = RoughnessEstimator::new(config.dan_decay, config.segment_len);
    let mut orientation = OrientationChangeDetector::new(
        config.orientation_alpha,
        config.sample_rate_hz,
        config.orientation_rate_threshold,
    );

    let mut out = CalibrationOutput::with_capacity(n);
    let mut last_heading = 0.0;

    for i in 0..n {
        let mut accel = input.accel[i].to_vec3();
        let mut gyro = input.gyro[i].to_vec3();
        if !is_finite(&accel) || !is_finite(&gyro) {
            // stand in the current baseline so no NaN reaches the state
            accel = tracker.accel_filtered;
            gyro = tracker.gyro_filtered;
            out.skipped_samples += 1;
        }
        let heading = input.mag_at(i).x;
        if heading.is_finite() {
            last_heading = heading;
        }

        let gps_accel = gps.accel[i];
        let speed = gps.smoothed_mps[i];

        let step = tracker.step(&accel, &gyro, gps_accel, &params);
        let t = transformer.transform(&tracker.gravity, &tracker.forward, &step.linear_accel);
        let vehicle_gyro = t.frame.project(&gyro);
        let observed = observers.update(&t.raw, &vehicle_gyro, last_heading, speed);
        let phone_stable = orientation.update(&tracker.accel_filtered);

        let fix: Option<&GpsFix> = if gps.fix_valid[i] { Some(&gps.interpolated[i]) } else { None };
        let rough = roughness.update(&accel, &tracker.accel_filtered, &gyro, &tracker.gyro_filtered, fix);

        out.transformed.push(Vector3D::from_vec3(&t.raw));
        out.transformed_filtered.push(Vector3D::from_vec3(&t.filtered));
        out.linear_accel.push(Vector3D::from_vec3(&step.linear_accel));
        out.gravity.push(Vector3D::from_vec3(&tracker.gravity));
        out.forward.push(Vector3D::from_vec3(&tracker.forward));
        out.confidence.push(step.confidence);
        out.flags.push(DetectorFlags {
            gps_accel_detected: step.significant_accel,
            turning_detected: observers.filtered_gyro.z.abs() > config.turn_rate_threshold,
            phone_stable,
            vehicle_stationary: speed < config.stationary_speed_mps,
            vehicle_moving: speed > config.moving_speed_mps,
            gravity_updating: step.gravity_updated,
        });
        out.observers.push(observed);
        out.dan_x.push(rough.dan);
        out.road_dan.push(rough.road_dan);
        out.don_x.push(rough.don);
        out.road_don.push(rough.road_don);
        out.segments.extend(rough.segment);
    }

    if out.skipped_samples > 0 {
        log::warn!("{} samples had non-finite accel/gyro readings and were held", out.skipped_samples);
    }

    // second pass: session histogram over the emitted segments
    out.session_histogram = DanHistogram::from_values(out.segments.iter().map(|s| s.road_dan));
    out.total_forward_updates = tracker.total_forward_updates;
    out.gps = gps;

    let (boundaries, without_fix) = roughness.boundary_counts();
    log::debug!(
        "calibrated {} samples: {} forward updates, {} segments ({} blocks without a fix), final confidence {:.2}",
        n,
        out.total_forward_updates,
        out.segments.len(),
        without_fix,
        out.final_confidence()
    );
    debug_assert!(out.segments.len() + without_fix == boundaries);

    Ok(out)
}

/// Positional form of [`calibrate`] taking the raw arrays and the five tuning coefficients.
#[allow(clippy::too_many_arguments)]
pub fn calibrate_arrays(
    accel: &[Vector3D],
    gyro: &[Vector3D],
    mag: &[Vector3D],
    gps: &[GpsFix],
    alpha: f64,
    observer_alpha: f64,
    filter_alpha: f64,
    orientation_alpha: f64,
    dan_decay: f64,
) -> Result<CalibrationOutput> {
    let input = SessionInput {
        accel: accel.to_vec(),
        gyro: gyro.to_vec(),
        mag: mag.to_vec(),
        gps: gps.to_vec(),
    };
    let config = CalibrationConfig {
        alpha,
        observer_alpha,
        filter_alpha,
        orientation_alpha,
        dan_decay,
        ..CalibrationConfig::default()
    };
    calibrate(&input, &config)
}
