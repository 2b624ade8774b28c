//! Cross-verification observer bank.
//!
//! Lateral acceleration, yaw rate and heading are each estimated three ways,
//! once per sensor. Nothing here feeds back into the tracker; the trifectas
//! exist so a reviewer can see whether the sensors agree.

use serde::Serialize;

use crate::types::Vec3;

/// Yaw-from-accel is meaningless at walking pace.
pub const MIN_OBSERVER_SPEED_MPS: f64 = 1.0;

/// One physical quantity as seen by each sensor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Trifecta {
    pub accel: f64,
    pub gyro: f64,
    pub mag: f64,
}

#[derive(Clone, Copy, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObserverSample {
    /// m/s²
    pub lateral_accel: Trifecta,
    /// rad/s
    pub yaw_rate: Trifecta,
    /// degrees
    pub heading: Trifecta,
}

/// Loop-carried observer filters and integrators.
#[derive(Clone, Debug)]
pub struct ObserverState {
    weight: f64,
    dt: f64,
    pub filtered_linear_accel: Vec3,
    pub filtered_gyro: Vec3,
    /// Unwrapped compass heading, degrees.
    pub mag_heading_unwrapped: f64,
    /// Filtered unwrapped heading, radians.
    pub filtered_mag_heading: f64,
    pub integrated_heading_accel: f64,
    pub integrated_heading_gyro: f64,
    last_raw_heading: Option<f64>,
}

/// Wrap an angle difference in degrees into (-180, 180].
fn wrap_degrees(delta: f64) -> f64 {
    let mut d = delta % 360.0;
    if d > 180.0 {
        d -= 360.0;
    } else if d <= -180.0 {
        d += 360.0;
    }
    d
}

impl ObserverState {
    /// `observer_alpha` is the new-sample weight; `dt` the sample period in seconds.
    pub fn new(observer_alpha: f64, dt: f64) -> Self {
        Self {
            weight: observer_alpha,
            dt,
            filtered_linear_accel: Vec3::zeros(),
            filtered_gyro: Vec3::zeros(),
            mag_heading_unwrapped: 0.0,
            filtered_mag_heading: 0.0,
            integrated_heading_accel: 0.0,
            integrated_heading_gyro: 0.0,
            last_raw_heading: None,
        }
    }

    /// Advance one sample.
    ///
    /// `vehicle_linear` and `vehicle_gyro` are already projected into the
    /// (forward, lateral, down) frame; `mag_heading_deg` is the raw compass
    /// heading; `speed` is the GPS speed in m/s.
    pub fn update(&mut self, vehicle_linear: &Vec3, vehicle_gyro: &Vec3, mag_heading_deg: f64, speed: f64) -> ObserverSample {
        self.filtered_linear_accel += (vehicle_linear - self.filtered_linear_accel) * self.weight;
        self.filtered_gyro += (vehicle_gyro - self.filtered_gyro) * self.weight;

        let previous_heading = self.filtered_mag_heading;
        match self.last_raw_heading {
            None => {
                // seed instead of ramping up from 0°
                self.mag_heading_unwrapped = mag_heading_deg;
                self.filtered_mag_heading = mag_heading_deg.to_radians();
            }
            Some(last) => {
                self.mag_heading_unwrapped += wrap_degrees(mag_heading_deg - last);
                self.filtered_mag_heading +=
                    (self.mag_heading_unwrapped.to_radians() - self.filtered_mag_heading) * self.weight;
            }
        }
        let mag_rate = if self.last_raw_heading.is_some() {
            (self.filtered_mag_heading - previous_heading) / self.dt
        } else {
            0.0
        };
        self.last_raw_heading = Some(mag_heading_deg);

        let lateral_measured = self.filtered_linear_accel.y;
        let yaw_measured = self.filtered_gyro.z;
        let yaw_from_accel = if speed > MIN_OBSERVER_SPEED_MPS { lateral_measured / speed } else { 0.0 };

        self.integrated_heading_accel += yaw_from_accel * self.dt;
        self.integrated_heading_gyro += yaw_measured * self.dt;

        ObserverSample {
            lateral_accel: Trifecta {
                accel: lateral_measured,
                gyro: speed * yaw_measured,
                mag: speed * mag_rate,
            },
            yaw_rate: Trifecta {
                accel: yaw_from_accel,
                gyro: yaw_measured,
                mag: mag_rate,
            },
            heading: Trifecta {
                accel: self.integrated_heading_accel.to_degrees(),
                gyro: self.integrated_heading_gyro.to_degrees(),
                mag: self.filtered_mag_heading.to_degrees(),
            },
        }
    }
}
