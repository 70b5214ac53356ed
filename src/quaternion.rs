//! Quaternion algebra used by the orientation and pose estimators.
//!
//! Quaternions are stored as [`nalgebra::Quaternion<f64>`], written
//! $q = w + i x + j y + k z$: `w` is the scalar part and `imag()` returns the
//! vector part. Vectors are rotated by embedding them as pure quaternions
//! (zero scalar part) and conjugating with a rotation quaternion.

use nalgebra::{Quaternion, Vector3};

/// The Hamilton product `a * b`.
///
/// When both operands are read as rotations, the product applies `b` first and
/// `a` second.
#[inline]
#[must_use]
pub fn multiply(a: &Quaternion<f64>, b: &Quaternion<f64>) -> Quaternion<f64> {
    a * b
}

/// Scale `q` to unit length.
///
/// A zero quaternion has no direction; normalizing it yields NaN components,
/// so callers must never pass one.
#[inline]
#[must_use]
pub fn normalize(q: &Quaternion<f64>) -> Quaternion<f64> {
    q / q.norm()
}

/// The multiplicative inverse, the conjugate scaled by $1 / |q|^2$.
///
/// For a unit quaternion this equals the conjugate.
#[inline]
#[must_use]
pub fn inverse(q: &Quaternion<f64>) -> Quaternion<f64> {
    q.conjugate() / q.norm_squared()
}

/// Conjugate `q` by `r`, returning $r q r^{-1}$.
///
/// With `q` a pure quaternion this rotates the embedded vector by `r`. The
/// norm of `q` is preserved whenever `r` is non-zero.
///
/// # Example
///
/// ```
/// use nalgebra::{Quaternion, Vector3};
/// use posetrack::quaternion::{from_angle_axis, rotate};
///
/// let quarter_turn = from_angle_axis(90.0, &Vector3::y());
/// let rotated = rotate(&Quaternion::from_imag(Vector3::x()), &quarter_turn);
///
/// assert!((rotated.imag() - Vector3::new(0.0, 0.0, -1.0)).norm() < 1e-12);
/// ```
#[inline]
#[must_use]
pub fn rotate(q: &Quaternion<f64>, r: &Quaternion<f64>) -> Quaternion<f64> {
    multiply(&multiply(r, q), &inverse(r))
}

/// Build the rotation of `angle` degrees about `axis`.
///
/// The axis is used as given. It has to be unit length for the result to be a
/// unit quaternion.
#[inline]
#[must_use]
pub fn from_angle_axis(angle: f64, axis: &Vector3<f64>) -> Quaternion<f64> {
    let half = angle.to_radians() / 2.0;
    Quaternion::from_parts(half.cos(), axis * half.sin())
}
