use geo::{point, HaversineDistance};
use serde::Serialize;

use crate::calibration::CalibrationOutput;
use crate::histogram::HistogramStats;
use crate::types::{GpsFix, SessionInput};

/// Per-session statistics for display and batch reports.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub samples: usize,
    pub duration_seconds: f64,
    pub gps_fix_count: usize,
    pub total_distance_meters: f64,
    pub peak_speed_mps: f64,
    pub mean_dan: f64,
    pub max_dan: f64,
    pub mean_don: f64,
    pub max_don: f64,
    pub segment_count: usize,
    pub road_dan_stats: Option<HistogramStats>,
    pub final_confidence: f64,
    pub forward_updates: u64,
    pub skipped_samples: usize,
}

/// Great-circle length of the track through fixes that carry a position.
pub fn track_distance_meters(gps: &[GpsFix]) -> f64 {
    let points: Vec<_> = gps
        .iter()
        .filter(|f| f.has_fix())
        .map(|f| point!(x: f.lng, y: f.lat))
        .collect();
    points.windows(2).map(|w| w[0].haversine_distance(&w[1])).sum()
}

fn mean_max(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let sum: f64 = values.iter().sum();
    let max = values.iter().cloned().fold(f64::MIN, f64::max);
    (sum / values.len() as f64, max)
}

impl SessionSummary {
    pub fn new(input: &SessionInput, output: &CalibrationOutput, sample_rate_hz: f64) -> Self {
        // prefer recorded timestamps (ms) when both ends carry one
        let duration_seconds = match (
            input.accel.first().and_then(|s| s.timestamp),
            input.accel.last().and_then(|s| s.timestamp),
        ) {
            (Some(start), Some(end)) if end > start => (end - start) / 1000.0,
            _ => input.len() as f64 / sample_rate_hz,
        };

        let (mean_dan, max_dan) = mean_max(&output.dan_x);
        let (mean_don, max_don) = mean_max(&output.don_x);

        Self {
            samples: input.len(),
            duration_seconds,
            gps_fix_count: input.gps.iter().filter(|f| f.has_fix()).count(),
            total_distance_meters: track_distance_meters(&input.gps),
            peak_speed_mps: input.gps.iter().map(|f| f.mps).fold(0.0, f64::max),
            mean_dan,
            max_dan,
            mean_don,
            max_don,
            segment_count: output.segments.len(),
            road_dan_stats: output.session_histogram.stats(),
            final_confidence: output.final_confidence(),
            forward_updates: output.total_forward_updates,
            skipped_samples: output.skipped_samples,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::{calibrate, CalibrationConfig};
    use crate::synthetic::stationary_then_accelerate;
    use approx::assert_relative_eq;

    #[test]
    fn test_distance_skips_missing_fixes() {
        // 0.001° of latitude is ~111 m
        let gps = vec![
            GpsFix::from_mps(5.0, 32.000, -110.9, 0.0),
            GpsFix::from_mps(5.0, 0.0, 0.0, 1000.0),
            GpsFix::from_mps(5.0, 32.001, -110.9, 2000.0),
        ];
        assert_relative_eq!(track_distance_meters(&gps), 111.2, epsilon = 0.5);
        assert_eq!(track_distance_meters(&[]), 0.0);
    }

    #[test]
    fn test_summary_of_synthetic_drive() {
        let input = stationary_then_accelerate();
        let output = calibrate(&input, &CalibrationConfig::default()).unwrap();
        let summary = SessionSummary::new(&input, &output, 60.0);

        assert_eq!(summary.samples, 600);
        assert_relative_eq!(summary.duration_seconds, 599.0 / 60.0, epsilon = 1e-9);
        assert_eq!(summary.gps_fix_count, 10);
        assert_relative_eq!(summary.peak_speed_mps, 12.0);
        // 3 + 6 + 9 + 12 m travelled east
        assert_relative_eq!(summary.total_distance_meters, 30.0, epsilon = 0.5);
        assert_eq!(summary.segment_count, 10);
        assert!(summary.road_dan_stats.is_some());
        assert!(summary.max_dan >= summary.mean_dan);
        assert_eq!(summary.forward_updates, output.total_forward_updates);
    }
}
