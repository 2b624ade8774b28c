use thiserror::Error;

/// Calibration pipeline error types
#[derive(Error, Debug)]
pub enum CalibrationError {
    #[error("{stream} has {actual} samples, expected {expected} (same as accel)")]
    LengthMismatch {
        stream: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid parameter {name}={value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("Invalid histogram: {0}")]
    InvalidHistogram(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for calibration operations
pub type Result<T> = std::result::Result<T, CalibrationError>;
