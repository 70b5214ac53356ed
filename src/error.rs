//! Error type shared by the tracking pipelines.

use thiserror::Error;

/// Errors produced while configuring or running the trackers.
///
/// Per-tick conditions such as "no sample available yet" are not errors; they
/// are reported through [`crate::TickOutcome`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The 8x8 homography system has no unique solution for this cycle.
    #[error("homography system is singular")]
    SingularHomography,

    /// The complementary blend factor is outside `[0, 1]`.
    #[error("filter blend factor must lie in [0, 1], got {0}")]
    InvalidAlpha(f64),

    /// A configuration value is out of range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Replay data must be a non-empty multiple of six scalars.
    #[error("replay data must be a non-empty multiple of 6 values, got {0}")]
    InvalidReplay(usize),

    /// Bias estimation was asked to average zero samples.
    #[error("calibration requires at least one sample")]
    EmptyCalibration,

    /// The IMU failed to initialize.
    #[error("sensor failed: {0}")]
    Sensor(String),
}

/// Result type used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
