pub mod linalg;

pub use linalg::*;

use serde::{Deserialize, Serialize};

use crate::error::{CalibrationError, Result};

/// One 3-axis sample in the phone's native coordinate frame.
///
/// Accelerometer: m/s² including gravity. Gyroscope: rad/s.
/// Magnetometer: `x` is the compass heading in degrees (0–360), `y`/`z` tilt.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
}

impl Vector3D {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z, timestamp: None }
    }

    pub fn with_timestamp(mut self, timestamp: f64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn to_vec3(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }

    pub fn from_vec3(v: &Vec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

/// One ~1 Hz GPS fix. `lat == 0 && lng == 0` means "no fix".
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GpsFix {
    pub mph: f64,
    pub kph: f64,
    pub mps: f64,
    pub lat: f64,
    pub lng: f64,
    pub timestamp: f64,
}

impl GpsFix {
    /// Build a fix from a speed in m/s, filling the mph/kph fields.
    pub fn from_mps(mps: f64, lat: f64, lng: f64, timestamp: f64) -> Self {
        Self {
            mph: mps * MPS_TO_MPH,
            kph: mps * 3.6,
            mps,
            lat,
            lng,
            timestamp,
        }
    }

    pub fn has_fix(&self) -> bool {
        self.lat != 0.0 || self.lng != 0.0
    }
}

pub const MPS_TO_MPH: f64 = 2.236_936_292_054_402;

/// Parallel per-sample arrays for one recording session.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SessionInput {
    pub accel: Vec<Vector3D>,
    pub gyro: Vec<Vector3D>,
    #[serde(default)]
    pub mag: Vec<Vector3D>,
    #[serde(default)]
    pub gps: Vec<GpsFix>,
}

impl SessionInput {
    pub fn len(&self) -> usize {
        self.accel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accel.is_empty()
    }

    /// Fail fast on length mismatches instead of silently truncating.
    ///
    /// `mag` may be empty (sensor absent); otherwise it must match `accel`.
    pub fn validate(&self) -> Result<()> {
        if self.gyro.len() != self.accel.len() {
            return Err(CalibrationError::LengthMismatch {
                stream: "gyro",
                expected: self.accel.len(),
                actual: self.gyro.len(),
            });
        }
        if !self.mag.is_empty() && self.mag.len() != self.accel.len() {
            return Err(CalibrationError::LengthMismatch {
                stream: "mag",
                expected: self.accel.len(),
                actual: self.mag.len(),
            });
        }
        Ok(())
    }

    /// Magnetometer sample at `i`, or a zero vector when the sensor is absent.
    pub fn mag_at(&self, i: usize) -> Vector3D {
        self.mag.get(i).copied().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples(n: usize) -> Vec<Vector3D> {
        (0..n).map(|_| Vector3D::new(0.0, 0.0, 9.8)).collect()
    }

    #[test]
    fn test_validate_accepts_missing_mag() {
        let input = SessionInput { accel: samples(10), gyro: samples(10), mag: vec![], gps: vec![] };
        assert!(input.validate().is_ok());
        assert_eq!(input.mag_at(3), Vector3D::default());
    }

    #[test]
    fn test_validate_rejects_short_gyro() {
        let input = SessionInput { accel: samples(10), gyro: samples(9), mag: vec![], gps: vec![] };
        match input.validate() {
            Err(CalibrationError::LengthMismatch { stream, expected, actual }) => {
                assert_eq!(stream, "gyro");
                assert_eq!(expected, 10);
                assert_eq!(actual, 9);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_partial_mag() {
        let input = SessionInput { accel: samples(10), gyro: samples(10), mag: samples(4), gps: vec![] };
        assert!(matches!(input.validate(), Err(CalibrationError::LengthMismatch { stream: "mag", .. })));
    }

    #[test]
    fn test_gps_fix_validity() {
        assert!(!GpsFix::default().has_fix());
        assert!(GpsFix::from_mps(1.0, 0.0, -110.9, 0.0).has_fix());
        let fix = GpsFix::from_mps(10.0, 32.2, -110.9, 0.0);
        assert!((fix.kph - 36.0).abs() < 1e-9);
        assert!((fix.mph - 22.369).abs() < 1e-3);
    }

    #[test]
    fn test_vector_timestamp_is_optional_in_json() {
        let v: Vector3D = serde_json::from_str(r#"{"x":1.0,"y":2.0,"z":3.0}"#).unwrap();
        assert_eq!(v.timestamp, None);
        let json = serde_json::to_string(&v.with_timestamp(5.0)).unwrap();
        assert!(json.contains("timestamp"));
    }
}
