// resampler.rs — GPS ground truth at sensor rate
//
// Turns the ~1 Hz GPS fixes into per-sample arrays aligned with the 60 Hz
// accelerometer stream: interpolated fixes, a recursively smoothed speed
// track, and the clamped GPS acceleration that gates the tracker.

use serde::Serialize;

use crate::smoothing::recursive_halving;
use crate::types::GpsFix;

/// Hardest plausible braking (1.1 g), m/s².
pub const MAX_BRAKING_MPS2: f64 = -10.8;
/// Hardest plausible acceleration (0.5 g), m/s².
pub const MAX_ACCEL_MPS2: f64 = 4.9;
/// |GPS acceleration| above which a sample counts as an acceleration event.
pub const SIGNIFICANT_ACCEL_MPS2: f64 = 0.2;

/// GPS channels resampled to the sensor sample rate.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResampledGps {
    /// Linearly interpolated fixes (raw speeds, positions, timestamps).
    pub interpolated: Vec<GpsFix>,
    /// Smoothed speed (m/s), smoothed at 1 Hz then interpolated.
    pub smoothed_mps: Vec<f64>,
    /// Clamped, smoothed GPS acceleration (m/s²). This is the virtual forward accel.
    pub accel: Vec<f64>,
    /// Zero-order-held raw speed of the source fix (m/s).
    pub stepped_mps: Vec<f64>,
    /// Zero-order-held per-fix change of the smoothed speed (m/s per fix).
    pub stepped_accel: Vec<f64>,
    /// Both source fixes blended into this sample carry a real position.
    pub fix_valid: Vec<bool>,
    /// Source fixes with a non-finite field that were replaced by the previous fix.
    pub held_fixes: usize,
}

impl ResampledGps {
    pub fn len(&self) -> usize {
        self.accel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accel.is_empty()
    }
}

/// Fractional source position for target index `i`: `r = (i/n) * len`.
fn source_position(i: usize, n: usize, len: usize) -> (usize, usize, f64) {
    let r = i as f64 / n as f64 * len as f64;
    let lo = (r.floor() as usize).min(len - 1);
    let hi = (lo + 1).min(len - 1);
    (lo, hi, r - lo as f64)
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

fn blend_fix(a: &GpsFix, b: &GpsFix, t: f64) -> GpsFix {
    GpsFix {
        mph: lerp(a.mph, b.mph, t),
        kph: lerp(a.kph, b.kph, t),
        mps: lerp(a.mps, b.mps, t),
        lat: lerp(a.lat, b.lat, t),
        lng: lerp(a.lng, b.lng, t),
        timestamp: lerp(a.timestamp, b.timestamp, t),
    }
}

/// Central difference of `speed` over ±`half_window` samples. Where the
/// window runs off either end, a backward difference over at most
/// `half_window` samples is used instead.
fn windowed_derivative(speed: &[f64], half_window: usize, sample_rate_hz: f64) -> Vec<f64> {
    let n = speed.len();
    (0..n)
        .map(|i| {
            let (lo, hi) = if i >= half_window && i + half_window < n {
                (i - half_window, i + half_window)
            } else {
                (i.saturating_sub(half_window), i)
            };
            if hi == lo {
                return 0.0;
            }
            let duration = (hi - lo) as f64 / sample_rate_hz;
            (speed[hi] - speed[lo]) / duration
        })
        .collect()
}

fn fix_is_finite(f: &GpsFix) -> bool {
    [f.mph, f.kph, f.mps, f.lat, f.lng, f.timestamp].iter().all(|v| v.is_finite())
}

/// Replace each non-finite field with the previous fix's value. On the first
/// fix that value is zero, so a bad first position reads as "no fix".
fn hold_non_finite(gps: &[GpsFix]) -> (Vec<GpsFix>, usize) {
    let mut held = 0;
    let mut prev = GpsFix::default();
    let fixes = gps
        .iter()
        .map(|f| {
            if fix_is_finite(f) {
                prev = *f;
                return *f;
            }
            held += 1;
            let pick = |v: f64, last: f64| if v.is_finite() { v } else { last };
            prev = GpsFix::from_mps(
                pick(f.mps, prev.mps),
                pick(f.lat, prev.lat),
                pick(f.lng, prev.lng),
                pick(f.timestamp, prev.timestamp),
            );
            prev
        })
        .collect();
    (fixes, held)
}

/// Resample `gps` onto `n` sensor samples at `sample_rate_hz`.
///
/// An empty `gps` yields all-zero channels and no valid fixes.
pub fn resample(gps: &[GpsFix], n: usize, sample_rate_hz: f64) -> ResampledGps {
    if gps.is_empty() || n == 0 {
        return ResampledGps {
            interpolated: vec![GpsFix::default(); n],
            smoothed_mps: vec![0.0; n],
            accel: vec![0.0; n],
            stepped_mps: vec![0.0; n],
            stepped_accel: vec![0.0; n],
            fix_valid: vec![false; n],
            held_fixes: 0,
        };
    }

    let (gps, held_fixes) = hold_non_finite(gps);
    if held_fixes > 0 {
        log::warn!("{} gps fixes had non-finite fields and were held at the previous fix", held_fixes);
    }
    let gps = gps.as_slice();
    let len = gps.len();
    let raw_mps: Vec<f64> = gps.iter().map(|f| f.mps).collect();
    let smoothed_1hz = recursive_halving(&raw_mps);
    let step_1hz: Vec<f64> = (0..len)
        .map(|k| if k == 0 { 0.0 } else { smoothed_1hz[k] - smoothed_1hz[k - 1] })
        .collect();

    let mut out = ResampledGps {
        interpolated: Vec::with_capacity(n),
        smoothed_mps: Vec::with_capacity(n),
        accel: Vec::new(),
        stepped_mps: Vec::with_capacity(n),
        stepped_accel: Vec::with_capacity(n),
        fix_valid: Vec::with_capacity(n),
        held_fixes,
    };

    for i in 0..n {
        let (lo, hi, t) = source_position(i, n, len);
        out.interpolated.push(blend_fix(&gps[lo], &gps[hi], t));
        out.smoothed_mps.push(lerp(smoothed_1hz[lo], smoothed_1hz[hi], t));
        out.stepped_mps.push(gps[lo].mps);
        out.stepped_accel.push(step_1hz[lo]);
        out.fix_valid.push(gps[lo].has_fix() && gps[hi].has_fix());
    }

    let half_window = (sample_rate_hz / 2.0).round().max(1.0) as usize;
    let clamped: Vec<f64> = windowed_derivative(&out.smoothed_mps, half_window, sample_rate_hz)
        .into_iter()
        .map(|a| a.clamp(MAX_BRAKING_MPS2, MAX_ACCEL_MPS2))
        .collect();
    out.accel = recursive_halving(&clamped);

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn fixes(speeds: &[f64]) -> Vec<GpsFix> {
        speeds
            .iter()
            .enumerate()
            .map(|(k, &s)| GpsFix::from_mps(s, 32.2 + k as f64 * 1e-4, -110.9, k as f64 * 1000.0))
            .collect()
    }

    #[test]
    fn test_empty_gps_is_all_zero() {
        let r = resample(&[], 120, 60.0);
        assert_eq!(r.len(), 120);
        assert!(r.accel.iter().all(|&a| a == 0.0));
        assert!(r.interpolated.iter().all(|f| !f.has_fix()));
        assert!(r.fix_valid.iter().all(|v| !v));
        assert_eq!(r.held_fixes, 0);
    }

    #[test]
    fn test_linear_interpolation_between_fixes() {
        let r = resample(&fixes(&[0.0, 10.0]), 120, 60.0);
        // r = i/120*2: sample 15 sits a quarter of the way from fix 0 to fix 1
        assert_relative_eq!(r.interpolated[15].mps, 2.5, epsilon = 1e-12);
        assert_relative_eq!(r.interpolated[15].timestamp, 250.0, epsilon = 1e-9);
        // second half holds the last fix
        assert_relative_eq!(r.interpolated[90].mps, 10.0, epsilon = 1e-12);
        assert_eq!(r.stepped_mps[59], 0.0);
        assert_eq!(r.stepped_mps[60], 10.0);
    }

    #[test]
    fn test_speed_is_smoothed_before_interpolation() {
        let r = resample(&fixes(&[0.0, 4.0, 4.0]), 180, 60.0);
        assert_relative_eq!(r.smoothed_mps[60], 2.0, epsilon = 1e-12);
        assert_relative_eq!(r.smoothed_mps[120], 3.0, epsilon = 1e-12);
        assert_relative_eq!(r.stepped_accel[60], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_acceleration_is_clamped_to_vehicle_limits() {
        // 0 -> 40 m/s in one second, then a stop
        let r = resample(&fixes(&[0.0, 80.0, 80.0, 0.0, 0.0]), 300, 60.0);
        let max = r.accel.iter().cloned().fold(f64::MIN, f64::max);
        let min = r.accel.iter().cloned().fold(f64::MAX, f64::min);
        assert!(max <= MAX_ACCEL_MPS2 + 1e-12);
        assert!(min >= MAX_BRAKING_MPS2 - 1e-12);
        assert!(max > 4.0);
        assert!(min < -10.0);
    }

    #[test]
    fn test_steady_ramp_recovers_slope() {
        // smoothed speeds of a long ramp approach a constant slope
        let speeds: Vec<f64> = (0..20).map(|k| k as f64 * 2.0).collect();
        let r = resample(&fixes(&speeds), 1200, 60.0);
        assert_relative_eq!(r.accel[900], 2.0, epsilon = 1e-3);
        assert!(r.accel[900].abs() > SIGNIFICANT_ACCEL_MPS2);
    }

    #[test]
    fn test_no_fix_neighbours_invalidate_samples() {
        let mut gps = fixes(&[5.0, 5.0, 5.0]);
        gps[1].lat = 0.0;
        gps[1].lng = 0.0;
        let r = resample(&gps, 180, 60.0);
        assert!(!r.fix_valid[10]); // blends fix 0 with the no-fix
        assert!(!r.fix_valid[70]);
        assert!(r.fix_valid[150]); // last fix blended with itself
    }

    #[test]
    fn test_edges_use_backward_difference() {
        let speed = [0.0, 0.0, 0.0, 5.0, 5.0];
        let d = windowed_derivative(&speed, 2, 1.0);
        assert_eq!(d[0], 0.0);
        // no look-ahead to the step at index 3
        assert_eq!(d[1], 0.0);
        assert_relative_eq!(d[2], 1.25, epsilon = 1e-12);
        assert_relative_eq!(d[3], 2.5, epsilon = 1e-12);
        assert_relative_eq!(d[4], 2.5, epsilon = 1e-12);
    }

    #[test]
    fn test_first_sample_has_no_acceleration() {
        let r = resample(&fixes(&[10.0, 12.0, 14.0]), 180, 60.0);
        assert_eq!(r.accel[0], 0.0);
        assert!(r.accel[1] > 0.0);
    }

    #[test]
    fn test_non_finite_fix_is_held() {
        let mut gps = fixes(&[4.0, 6.0, 8.0, 10.0]);
        gps[2].mps = f64::NAN;
        gps[2].lat = f64::INFINITY;
        let r = resample(&gps, 240, 60.0);
        assert_eq!(r.held_fixes, 1);
        assert!(r.smoothed_mps.iter().all(|v| v.is_finite()));
        assert!(r.accel.iter().all(|v| v.is_finite()));
        // fix 2 takes fix 1's speed and latitude but keeps its own longitude
        assert_relative_eq!(r.interpolated[120].mps, 6.0, epsilon = 1e-12);
        assert_relative_eq!(r.interpolated[120].lat, gps[1].lat, epsilon = 1e-12);
        assert!(r.fix_valid[120]);
    }

    #[test]
    fn test_non_finite_first_fix_becomes_no_fix() {
        let mut gps = fixes(&[4.0, 6.0]);
        gps[0].mps = f64::NAN;
        gps[0].lat = f64::NAN;
        gps[0].lng = f64::NAN;
        let r = resample(&gps, 120, 60.0);
        assert_eq!(r.held_fixes, 1);
        assert_eq!(r.interpolated[0].mps, 0.0);
        assert!(!r.fix_valid[0]);
    }
}
