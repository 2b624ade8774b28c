//! Floating calibration of phone sensors into a vehicle frame, plus DAN/DON
//! road roughness mapped to geohash cells and normalized against a
//! cross-session histogram.

pub mod calibration;
pub mod detectors;
pub mod error;
pub mod frame;
pub mod geohash;
pub mod histogram;
pub mod observers;
pub mod rerun_logger;
pub mod resampler;
pub mod roughness;
pub mod session;
pub mod smoothing;
pub mod store;
pub mod summary;
pub mod synthetic;
pub mod tracker;
pub mod types;

pub use calibration::{calibrate, calibrate_arrays, CalibrationConfig, CalibrationOutput};
pub use error::{CalibrationError, Result};
pub use histogram::{DanHistogram, PersistentHistogram};
pub use roughness::RoadDanSegment;
pub use types::{GpsFix, SessionInput, Vector3D};
