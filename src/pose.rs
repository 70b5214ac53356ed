//! Recovery of the device pose from a homography, and the per-cycle pose
//! tracking pipeline.
//!
//! The beacon looks down its negative z axis, so a photodiode at $(x, y, 0)$
//! on the device maps to the image plane as
//! $(p_x / -p_z, p_y / -p_z)$ with $p = R (x, y, 0)^T + t$.

use log::{debug, warn};
use nalgebra::{Matrix3, Quaternion, Vector3};

use crate::beacon::{ticks_to_positions, SweepTicks};
use crate::error::Result;
use crate::homography::Homography;
use crate::params::PoseParameters;

/// Position and orientation of the device relative to the beacon.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pose {
    /// Rotation from the device frame into the beacon frame.
    pub rotation: Matrix3<f64>,
    /// Device origin in the beacon frame, in the unit of the reference
    /// points.
    pub translation: Vector3<f64>,
    /// Factor that scales the homography back to metric units.
    pub scale: f64,
    /// [`Self::rotation`] as a unit quaternion with a non-negative scalar
    /// part.
    pub quaternion: Quaternion<f64>,
}

impl Pose {
    /// Decompose a homography into rotation and translation.
    ///
    /// The first two rotation columns are taken from the first two
    /// homography columns, made orthonormal by Gram-Schmidt, and the third is
    /// their cross product. Under noise this is an approximation of the
    /// closest rotation.
    #[must_use]
    pub fn from_homography(homography: &Homography) -> Self {
        let h = homography.vector();

        // the third row carries the sign flip of the -z viewing direction
        let first = Vector3::new(h[0], h[3], -h[6]);
        let second = Vector3::new(h[1], h[4], -h[7]);

        let scale = 2.0 / (first.norm() + second.norm());
        let translation = Vector3::new(scale * h[2], scale * h[5], -scale);

        let r1 = first.normalize();
        let r2 = (second - r1 * r1.dot(&second)).normalize();
        let r3 = r1.cross(&r2);
        let rotation = Matrix3::from_columns(&[r1, r2, r3]);

        Self {
            rotation,
            translation,
            scale,
            quaternion: quaternion_from_rotation_matrix(&rotation),
        }
    }
}

/// Convert a rotation matrix into a unit quaternion with `w >= 0`.
///
/// The trace formula is used whenever the trace is positive. Rotations close
/// to half a turn, where it loses precision, switch to the branch of the
/// largest diagonal element.
#[must_use]
pub fn quaternion_from_rotation_matrix(r: &Matrix3<f64>) -> Quaternion<f64> {
    let trace = r.trace();

    let q = if trace > 0.0 {
        let s = (1.0 + trace).sqrt() * 2.0;
        Quaternion::new(
            s / 4.0,
            (r[(2, 1)] - r[(1, 2)]) / s,
            (r[(0, 2)] - r[(2, 0)]) / s,
            (r[(1, 0)] - r[(0, 1)]) / s,
        )
    } else if r[(0, 0)] > r[(1, 1)] && r[(0, 0)] > r[(2, 2)] {
        let s = (1.0 + r[(0, 0)] - r[(1, 1)] - r[(2, 2)]).sqrt() * 2.0;
        Quaternion::new(
            (r[(2, 1)] - r[(1, 2)]) / s,
            s / 4.0,
            (r[(0, 1)] + r[(1, 0)]) / s,
            (r[(0, 2)] + r[(2, 0)]) / s,
        )
    } else if r[(1, 1)] > r[(2, 2)] {
        let s = (1.0 + r[(1, 1)] - r[(0, 0)] - r[(2, 2)]).sqrt() * 2.0;
        Quaternion::new(
            (r[(0, 2)] - r[(2, 0)]) / s,
            (r[(0, 1)] + r[(1, 0)]) / s,
            s / 4.0,
            (r[(1, 2)] + r[(2, 1)]) / s,
        )
    } else {
        let s = (1.0 + r[(2, 2)] - r[(0, 0)] - r[(1, 1)]).sqrt() * 2.0;
        Quaternion::new(
            (r[(1, 0)] - r[(0, 1)]) / s,
            (r[(0, 2)] + r[(2, 0)]) / s,
            (r[(1, 2)] + r[(2, 1)]) / s,
            s / 4.0,
        )
    };

    let q = if q.w < 0.0 { -q } else { q };
    q.normalize()
}

/// Runs sweep decoding, homography estimation and pose recovery once per
/// beacon cycle, holding on to the last pose that could be recovered.
///
/// # Example
///
/// ```
/// use posetrack::{Error, PoseParameters, PoseTracker};
///
/// let mut tracker = PoseTracker::new(PoseParameters::default())?;
///
/// // every photodiode reporting the same timing has no unique solution
/// assert_eq!(tracker.update(&[200_000; 8]).err(), Some(Error::SingularHomography));
/// assert!(tracker.last_pose().is_none());
/// assert_eq!(tracker.consecutive_failures(), 1);
/// # Ok::<(), Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct PoseTracker {
    parameters: PoseParameters,
    last_pose: Option<Pose>,
    consecutive_failures: u32,
}

impl PoseTracker {
    /// Create a tracker for the given beacon timing and photodiode layout.
    ///
    /// # Errors
    ///
    /// Returns an error if `parameters` fail [`PoseParameters::validate`].
    pub fn new(parameters: PoseParameters) -> Result<Self> {
        parameters.validate()?;

        Ok(Self {
            parameters,
            last_pose: None,
            consecutive_failures: 0,
        })
    }

    /// Process the timings of one sweep cycle.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::SingularHomography`] when the observations
    /// are degenerate. The previous pose is kept and stays available through
    /// [`Self::last_pose`].
    pub fn update(&mut self, ticks: &SweepTicks) -> Result<&Pose> {
        let positions = ticks_to_positions(ticks, &self.parameters);

        match Homography::estimate(&positions, &self.parameters.reference_points) {
            Ok(homography) => {
                if self.consecutive_failures > 0 {
                    debug!(
                        "pose recovered after {} failed cycles",
                        self.consecutive_failures
                    );
                }
                self.consecutive_failures = 0;
                Ok(&*self.last_pose.insert(Pose::from_homography(&homography)))
            }
            Err(err) => {
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                warn!("{err}, keeping last pose");
                Err(err)
            }
        }
    }

    /// The most recent successfully recovered pose.
    #[must_use]
    pub fn last_pose(&self) -> Option<&Pose> {
        self.last_pose.as_ref()
    }

    /// Number of cycles since the last successful update.
    #[must_use]
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// The beacon timing and photodiode layout.
    #[must_use]
    pub fn parameters(&self) -> &PoseParameters {
        &self.parameters
    }
}
