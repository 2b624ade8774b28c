//! Deterministic synthetic sessions for tests and the `synth_session` tool.

use crate::types::{GpsFix, SessionInput, Vector3D};

const DEFAULT_SEED: u64 = 0x9E37_79B9_7F4A_7C15;
const BASE_LAT: f64 = 32.2319;
const BASE_LNG: f64 = -110.9501;
/// Degrees of latitude per metre.
const DEG_PER_M: f64 = 1.0 / 111_320.0;

/// xorshift64 so generated sessions are identical on every platform.
#[derive(Clone, Debug)]
pub struct NoiseSource {
    state: u64,
}

impl NoiseSource {
    pub fn new(seed: u64) -> Self {
        Self { state: if seed == 0 { DEFAULT_SEED } else { seed } }
    }

    /// Uniform in [0, 1).
    pub fn next_unit(&mut self) -> f64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        (x >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform in [-amplitude, amplitude).
    pub fn symmetric(&mut self, amplitude: f64) -> f64 {
        (self.next_unit() * 2.0 - 1.0) * amplitude
    }
}

/// Phone lying flat, nose along `+x`: parked, then a constant-acceleration pull-away.
#[derive(Clone, Debug)]
pub struct DriveScenario {
    pub sample_rate_hz: f64,
    pub rest_samples: usize,
    pub accel_samples: usize,
    /// m/s² along the phone's `+x` during the second phase.
    pub accel_mps2: f64,
    /// Accelerometer noise amplitude, m/s².
    pub accel_noise: f64,
    pub gyro_noise: f64,
    pub include_gps: bool,
    pub include_mag: bool,
    pub seed: u64,
}

impl Default for DriveScenario {
    fn default() -> Self {
        Self {
            sample_rate_hz: 60.0,
            rest_samples: 300,
            accel_samples: 300,
            accel_mps2: 3.0,
            accel_noise: 0.05,
            gyro_noise: 0.01,
            include_gps: true,
            include_mag: true,
            seed: DEFAULT_SEED,
        }
    }
}

impl DriveScenario {
    pub fn total_samples(&self) -> usize {
        self.rest_samples + self.accel_samples
    }

    fn sample_timestamp_ms(&self, i: usize) -> f64 {
        i as f64 * 1000.0 / self.sample_rate_hz
    }

    /// One fix per second; speed ramps once the rest phase is over.
    fn gps_track(&self) -> Vec<GpsFix> {
        let per_fix = self.sample_rate_hz.round().max(1.0) as usize;
        let fixes = self.total_samples() / per_fix;
        let rest_fixes = self.rest_samples as f64 / per_fix as f64;
        let lng_per_m = DEG_PER_M / BASE_LAT.to_radians().cos();
        let mut travelled = 0.0;
        (0..fixes)
            .map(|k| {
                let mps = (self.accel_mps2 * (k as f64 - rest_fixes)).max(0.0);
                travelled += mps;
                GpsFix::from_mps(mps, BASE_LAT, BASE_LNG + travelled * lng_per_m, k as f64 * 1000.0)
            })
            .collect()
    }

    pub fn generate(&self) -> SessionInput {
        let n = self.total_samples();
        let mut accel_noise = NoiseSource::new(self.seed);
        let mut gyro_noise = NoiseSource::new(self.seed.rotate_left(17));

        let accel = (0..n)
            .map(|i| {
                let ax = if i >= self.rest_samples { self.accel_mps2 } else { 0.0 };
                Vector3D::new(
                    ax + accel_noise.symmetric(self.accel_noise),
                    accel_noise.symmetric(self.accel_noise),
                    9.8 + accel_noise.symmetric(self.accel_noise),
                )
                .with_timestamp(self.sample_timestamp_ms(i))
            })
            .collect();

        let gyro = (0..n)
            .map(|i| {
                Vector3D::new(
                    gyro_noise.symmetric(self.gyro_noise),
                    gyro_noise.symmetric(self.gyro_noise),
                    gyro_noise.symmetric(self.gyro_noise),
                )
                .with_timestamp(self.sample_timestamp_ms(i))
            })
            .collect();

        let mag = if self.include_mag {
            let mut mag_noise = NoiseSource::new(self.seed.rotate_left(31));
            (0..n)
                .map(|i| {
                    // heading east, the direction of travel
                    Vector3D::new(90.0 + mag_noise.symmetric(0.5), 0.0, 0.0)
                        .with_timestamp(self.sample_timestamp_ms(i))
                })
                .collect()
        } else {
            Vec::new()
        };

        let gps = if self.include_gps { self.gps_track() } else { Vec::new() };

        SessionInput { accel, gyro, mag, gps }
    }
}

/// Stationary phone with fixed GPS position for `n` samples.
pub fn idle(n: usize, sample_rate_hz: f64) -> SessionInput {
    DriveScenario {
        sample_rate_hz,
        rest_samples: n,
        accel_samples: 0,
        ..DriveScenario::default()
    }
    .generate()
}

/// The standard 300-rest / 300-at-3 m/s² session.
pub fn stationary_then_accelerate() -> SessionInput {
    DriveScenario::default().generate()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_is_deterministic() {
        let a = stationary_then_accelerate();
        let b = stationary_then_accelerate();
        assert_eq!(a.accel, b.accel);
        assert_eq!(a.gps, b.gps);
    }

    #[test]
    fn test_noise_stays_in_amplitude() {
        let mut rng = NoiseSource::new(7);
        for _ in 0..10_000 {
            let v = rng.symmetric(0.05);
            assert!((-0.05..0.05).contains(&v));
        }
    }

    #[test]
    fn test_default_scenario_shape() {
        let s = stationary_then_accelerate();
        assert_eq!(s.len(), 600);
        assert_eq!(s.gyro.len(), 600);
        assert_eq!(s.mag.len(), 600);
        assert_eq!(s.gps.len(), 10);
        assert!(s.validate().is_ok());
        let speeds: Vec<f64> = s.gps.iter().map(|f| f.mps).collect();
        assert_eq!(speeds, vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 3.0, 6.0, 9.0, 12.0]);
        assert!(s.gps.iter().all(|f| f.has_fix()));
        assert!(s.accel[450].x > 2.9 && s.accel[10].x.abs() < 0.05);
    }

    #[test]
    fn test_gps_can_be_omitted() {
        let s = DriveScenario { include_gps: false, include_mag: false, ..DriveScenario::default() }.generate();
        assert!(s.gps.is_empty());
        assert!(s.mag.is_empty());
        assert!(s.validate().is_ok());
    }
}
