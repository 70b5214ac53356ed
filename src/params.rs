//! Session configuration for the orientation and pose trackers.

use crate::error::{Error, Result};

/// Parameters for an [`crate::OrientationTracker`] session.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrackerParameters {
    /// Complementary blend factor $\alpha \in [0, 1]$.
    ///
    /// High values trust the integrated gyroscope and reject accelerometer
    /// noise, low values follow the accelerometer tilt more closely. At
    /// `1.0` the complementary estimates equal the gyro-only estimates.
    pub alpha: f64,
    /// Number of stationary samples averaged by the bias and variance
    /// calibration.
    pub calibration_samples: usize,
}

impl Default for TrackerParameters {
    fn default() -> Self {
        Self {
            alpha: 0.9,
            calibration_samples: 1000,
        }
    }
}

impl TrackerParameters {
    /// Check that every parameter is in range.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAlpha`] when `alpha` is outside `[0, 1]` and
    /// [`Error::InvalidParameter`] for an empty calibration window.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.alpha) {
            return Err(Error::InvalidAlpha(self.alpha));
        }

        if self.calibration_samples == 0 {
            return Err(Error::InvalidParameter(
                "calibration_samples must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

/// Timing of the rotating beacon and the layout of the tracked photodiodes.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PoseParameters {
    /// Frequency of the clock that timestamps the sweeps, in ticks per second.
    pub ticks_per_second: f64,
    /// Rotation rate of the beacon's sweeping laser, in revolutions per
    /// second.
    pub sweep_rate_hz: f64,
    /// Planar coordinates of the four photodiodes on the tracked device, as
    /// `[x0, y0, x1, y1, x2, y2, x3, y3]`.
    ///
    /// The unit of these coordinates is the unit of the recovered translation.
    pub reference_points: [f64; 8],
}

impl Default for PoseParameters {
    fn default() -> Self {
        Self {
            ticks_per_second: 48_000_000.0,
            sweep_rate_hz: 60.0,
            // millimetres
            reference_points: [-42.0, 25.0, 42.0, 25.0, 42.0, -25.0, -42.0, -25.0],
        }
    }
}

impl PoseParameters {
    /// Check that the timing constants and the reference geometry are usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] for non-positive or non-finite
    /// timing constants and non-finite reference coordinates.
    pub fn validate(&self) -> Result<()> {
        if !(self.ticks_per_second.is_finite() && self.ticks_per_second > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "ticks_per_second must be positive, got {}",
                self.ticks_per_second
            )));
        }

        if !(self.sweep_rate_hz.is_finite() && self.sweep_rate_hz > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "sweep_rate_hz must be positive, got {}",
                self.sweep_rate_hz
            )));
        }

        if self.reference_points.iter().any(|x| !x.is_finite()) {
            return Err(Error::InvalidParameter(
                "reference_points must be finite".to_string(),
            ));
        }

        Ok(())
    }
}
