//! Quaternion orientation estimation from gyroscope and accelerometer
//! readings.
//!
//! Two estimates are propagated from the same samples. The gyro-only estimate
//! integrates angular velocity and drifts without bound. The complementary
//! estimate integrates the same way and then rotates a fraction
//! $(1 - \alpha)$ of the tilt error toward the gravity direction measured by
//! the accelerometer.
//!
//! The world frame is y-up: a device at rest in its reference orientation
//! measures a specific force along $+y$. Heading (rotation about $y$) is not
//! observable from gravity and is never corrected.

use nalgebra::{Quaternion, Vector3};

use crate::quaternion::{from_angle_axis, multiply, normalize, rotate};

/// Angular speed in rad/s below which a sample is treated as no rotation.
pub const ANGULAR_SPEED_THRESHOLD: f64 = 1e-8;

/// Vector lengths below this are treated as zero when building correction
/// axes.
const AXIS_EPSILON: f64 = 1e-12;

/// Pitch of the gravity vector measured by the accelerometer, in degrees.
///
/// The sign of the horizontal term follows the y component, so the result
/// flips when the device is turned upside down.
#[must_use]
pub fn accel_pitch(accel: &Vector3<f64>) -> f64 {
    let horizontal = sign(accel.y) * accel.x.hypot(accel.y);
    -accel.z.atan2(horizontal).to_degrees()
}

/// Roll of the gravity vector measured by the accelerometer, in degrees.
#[must_use]
pub fn accel_roll(accel: &Vector3<f64>) -> f64 {
    -(-accel.x).atan2(accel.y).to_degrees()
}

fn sign(value: f64) -> f64 {
    if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// The rotation over `delta_t` seconds at angular velocity `gyro` (rad/s),
/// or `None` when the angular speed is below [`ANGULAR_SPEED_THRESHOLD`].
fn delta_rotation(gyro: &Vector3<f64>, delta_t: f64) -> Option<Quaternion<f64>> {
    let speed = gyro.norm();
    if speed < ANGULAR_SPEED_THRESHOLD {
        return None;
    }

    let angle = (speed * delta_t).to_degrees();
    Some(from_angle_axis(angle, &(gyro / speed)))
}

/// Advance the gyro-only orientation `q` by one sample.
///
/// `q` is left untouched when the angular speed is below
/// [`ANGULAR_SPEED_THRESHOLD`].
pub fn update_quaternion_gyro(q: &mut Quaternion<f64>, gyro: &Vector3<f64>, delta_t: f64) {
    if let Some(delta) = delta_rotation(gyro, delta_t) {
        *q = normalize(&multiply(q, &delta));
    }
}

/// Advance the complementary orientation `q` by one sample.
///
/// The gyroscope step is applied first, then the accelerometer reading is
/// rotated into the world frame and the orientation is tilted by
/// $(1 - \alpha) \varphi$ toward vertical, where $\varphi$ is the angle
/// between the measured and the true up direction.
///
/// `q` is left untouched when the angular speed is below
/// [`ANGULAR_SPEED_THRESHOLD`].
///
/// # Example
///
/// ```
/// use nalgebra::{Quaternion, Vector3};
/// use posetrack::orientation::update_quaternion_comp;
///
/// let mut q = Quaternion::identity();
/// let gyro = Vector3::new(0.0, 0.0, 0.5);
/// let accel = Vector3::new(0.0, 9.81, 0.0);
///
/// update_quaternion_comp(&mut q, &gyro, &accel, 0.01, 0.98);
/// assert!((q.norm() - 1.0).abs() < 1e-12);
/// ```
pub fn update_quaternion_comp(
    q: &mut Quaternion<f64>,
    gyro: &Vector3<f64>,
    accel: &Vector3<f64>,
    delta_t: f64,
    alpha: f64,
) {
    let Some(delta) = delta_rotation(gyro, delta_t) else {
        return;
    };

    let current = multiply(q, &delta);
    let correction = tilt_correction(&current, accel, alpha);
    *q = normalize(&multiply(&correction, &current));
}

/// The world-frame rotation that removes a fraction `1 - alpha` of the tilt
/// between `accel` seen through `current` and the world up axis.
fn tilt_correction(current: &Quaternion<f64>, accel: &Vector3<f64>, alpha: f64) -> Quaternion<f64> {
    if accel.norm() < AXIS_EPSILON {
        return Quaternion::identity();
    }

    let up = normalize(&rotate(&Quaternion::from_imag(*accel), current)).imag();
    let phi = up.y.clamp(-1.0, 1.0).acos();

    // up x (0, 1, 0)
    let axis = Vector3::new(-up.z, 0.0, up.x);
    let length = axis.norm();
    let axis = if length > AXIS_EPSILON {
        axis / length
    } else if up.y > 0.0 {
        return Quaternion::identity();
    } else {
        Vector3::x()
    };

    from_angle_axis(((1.0 - alpha) * phi).to_degrees(), &axis)
}

/// The gyro-only and complementary orientation estimates of a session.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OrientationState {
    /// Gyroscope strapdown integration.
    pub gyro: Quaternion<f64>,
    /// Gyroscope integration with accelerometer tilt correction.
    pub complementary: Quaternion<f64>,
}

impl Default for OrientationState {
    fn default() -> Self {
        Self {
            gyro: Quaternion::identity(),
            complementary: Quaternion::identity(),
        }
    }
}

impl OrientationState {
    /// Advance both estimates with one bias-corrected sample.
    pub fn update(
        &mut self,
        gyro: &Vector3<f64>,
        accel: &Vector3<f64>,
        delta_t: f64,
        alpha: f64,
    ) {
        update_quaternion_gyro(&mut self.gyro, gyro, delta_t);
        update_quaternion_comp(&mut self.complementary, gyro, accel, delta_t, alpha);
    }
}
