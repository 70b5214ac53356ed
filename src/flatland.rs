//! Single-axis ("flatland") roll estimators.
//!
//! The device is assumed to rotate only about its z axis, with x pointing
//! right and y pointing up. Three estimates are kept side by side: integrated
//! gyroscope rate, the accelerometer gravity angle, and a complementary blend
//! of the two. All angles are in degrees.

use nalgebra::Vector3;

/// Integrate the z angular velocity (rad/s) over `delta_t` seconds.
#[inline]
#[must_use]
pub fn gyro_roll(previous: f64, gyro: &Vector3<f64>, delta_t: f64) -> f64 {
    previous + gyro.z.to_degrees() * delta_t
}

/// Roll angle of the gravity vector measured by the accelerometer.
///
/// Only valid while the device is not linearly accelerating.
#[inline]
#[must_use]
pub fn accel_roll(accel: &Vector3<f64>) -> f64 {
    accel.x.atan2(accel.y).to_degrees()
}

/// Blend the integrated gyroscope roll with the accelerometer roll.
///
/// `alpha = 1` reduces to [`gyro_roll`], `alpha = 0` to the accelerometer
/// roll.
#[inline]
#[must_use]
pub fn complementary_roll(
    previous: f64,
    gyro: &Vector3<f64>,
    accel_roll: f64,
    delta_t: f64,
    alpha: f64,
) -> f64 {
    alpha * gyro_roll(previous, gyro, delta_t) + (1.0 - alpha) * accel_roll
}

/// The three flatland roll estimates of a tracking session.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FlatlandRoll {
    /// Integrated gyroscope roll, drifts without bound.
    pub gyro: f64,
    /// Accelerometer roll of the latest sample.
    pub accel: f64,
    /// Complementary roll.
    pub complementary: f64,
}

impl FlatlandRoll {
    /// Advance all three estimates with one bias-corrected sample.
    pub fn update(
        &mut self,
        gyro: &Vector3<f64>,
        accel: &Vector3<f64>,
        delta_t: f64,
        alpha: f64,
    ) {
        self.gyro = gyro_roll(self.gyro, gyro, delta_t);
        self.accel = accel_roll(accel);
        self.complementary =
            complementary_roll(self.complementary, gyro, self.accel, delta_t, alpha);
    }
}
