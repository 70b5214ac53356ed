//! Decoding of rotating-beacon sweep timings into normalized image-plane
//! coordinates.
//!
//! The beacon sweeps a horizontal and a vertical laser plane across the
//! room. The time between the sync flash and the moment a plane hits a
//! photodiode gives the sweep angle, and its tangent is the photodiode's
//! coordinate on a plane at unit distance in front of the beacon.

use nalgebra::SVector;

use crate::params::PoseParameters;

/// Raw sweep timings, `[h0, v0, h1, v1, h2, v2, h3, v3]` for the four
/// photodiodes.
pub type SweepTicks = [u32; 8];

/// Normalized image-plane coordinates, `[x0, y0, x1, y1, x2, y2, x3, y3]`.
pub type ImagePositions = SVector<f64, 8>;

/// Sweep angle in degrees for the timing at `index`.
///
/// Even indices are horizontal sweeps, odd indices vertical ones.
#[must_use]
pub fn sweep_angle(ticks: u32, index: usize, parameters: &PoseParameters) -> f64 {
    let elapsed = f64::from(ticks) / parameters.ticks_per_second;
    let swept = elapsed * 360.0 * parameters.sweep_rate_hz;

    if index % 2 == 0 {
        -swept + 90.0
    } else {
        swept - 90.0
    }
}

/// Convert the timings of one sweep cycle into image-plane coordinates.
///
/// # Example
///
/// ```
/// use posetrack::beacon::ticks_to_positions;
/// use posetrack::PoseParameters;
///
/// // a quarter rotation at 60 Hz puts the photodiode on the optical axis
/// let parameters = PoseParameters::default();
/// let quarter = (parameters.ticks_per_second / 240.0) as u32;
///
/// let positions = ticks_to_positions(&[quarter; 8], &parameters);
/// assert!(positions.iter().all(|p| p.abs() < 1e-12));
/// ```
#[must_use]
pub fn ticks_to_positions(ticks: &SweepTicks, parameters: &PoseParameters) -> ImagePositions {
    ImagePositions::from_fn(|index, _| {
        sweep_angle(ticks[index], index, parameters)
            .to_radians()
            .tan()
    })
}
