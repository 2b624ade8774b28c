use std::path::Path;

use anyhow::Result;
use rerun::{archetypes::Scalar, RecordingStreamBuilder};

use crate::calibration::CalibrationOutput;
use crate::types::Vector3D;

/// Writes a calibrated session's diagnostic channels to a Rerun `.rrd` file.
/// Supports Rerun v0.15+ API with archetype-based logging
pub struct RerunLogger {
    rec: rerun::RecordingStream,
}

impl RerunLogger {
    /// Initialize Rerun recording to file
    pub fn new(output_path: &Path) -> Result<Self> {
        let rec = RecordingStreamBuilder::new("floating_calibration")
            .save(output_path)
            .map_err(|e| anyhow::anyhow!("Failed to create Rerun recording: {}", e))?;

        log::info!("Rerun recording initialized to: {}", output_path.display());

        Ok(RerunLogger { rec })
    }

    /// Set the current time for all subsequent logs
    pub fn set_time(&self, elapsed_secs: f64) {
        self.rec.set_time_seconds("stable_time", elapsed_secs);
    }

    pub fn log_scalar(&self, path: &str, value: f64) {
        let _ = self.rec.log(path, &Scalar::new(value));
    }

    fn log_axes(&self, prefix: &str, v: &Vector3D) {
        self.log_scalar(&format!("{}/x", prefix), v.x);
        self.log_scalar(&format!("{}/y", prefix), v.y);
        self.log_scalar(&format!("{}/z", prefix), v.z);
    }

    fn log_flag(&self, path: &str, on: bool) {
        self.log_scalar(path, if on { 1.0 } else { 0.0 });
    }

    /// Log every per-sample channel of `output` on a `1/sample_rate_hz` timeline.
    pub fn log_session(&self, output: &CalibrationOutput, sample_rate_hz: f64) {
        for i in 0..output.len() {
            self.set_time(i as f64 / sample_rate_hz);

            self.log_axes("vehicle/transformed", &output.transformed[i]);
            self.log_axes("vehicle/transformed_filtered", &output.transformed_filtered[i]);
            self.log_axes("tracker/gravity", &output.gravity[i]);
            self.log_axes("tracker/forward", &output.forward[i]);
            self.log_scalar("tracker/confidence", output.confidence[i]);

            let flags = &output.flags[i];
            self.log_flag("detectors/gps_accel", flags.gps_accel_detected);
            self.log_flag("detectors/turning", flags.turning_detected);
            self.log_flag("detectors/phone_stable", flags.phone_stable);
            self.log_flag("detectors/gravity_updating", flags.gravity_updating);

            let obs = &output.observers[i];
            self.log_scalar("observers/lateral_accel/accel", obs.lateral_accel.accel);
            self.log_scalar("observers/lateral_accel/gyro", obs.lateral_accel.gyro);
            self.log_scalar("observers/lateral_accel/mag", obs.lateral_accel.mag);
            self.log_scalar("observers/yaw_rate/accel", obs.yaw_rate.accel);
            self.log_scalar("observers/yaw_rate/gyro", obs.yaw_rate.gyro);
            self.log_scalar("observers/yaw_rate/mag", obs.yaw_rate.mag);
            self.log_scalar("observers/heading/accel", obs.heading.accel);
            self.log_scalar("observers/heading/gyro", obs.heading.gyro);
            self.log_scalar("observers/heading/mag", obs.heading.mag);

            self.log_scalar("gps/speed_mps", output.gps.smoothed_mps[i]);
            self.log_scalar("gps/accel", output.gps.accel[i]);

            self.log_scalar("roughness/dan", output.dan_x[i]);
            self.log_scalar("roughness/road_dan", output.road_dan[i]);
            self.log_scalar("roughness/don", output.don_x[i]);
            self.log_scalar("roughness/road_don", output.road_don[i]);
        }
        log::debug!("logged {} samples to rerun", output.len());
    }
}
