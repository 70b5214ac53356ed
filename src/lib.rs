//! Orientation and pose tracking for a head-mounted IMU and photodiode
//! board.
//!
//! The crate has two independent pipelines.
//!
//! * Orientation: gyroscope and accelerometer samples drive a flatland roll
//!   estimator, accelerometer tilt angles and two quaternion estimators, one
//!   integrating the gyroscope alone and one complementary filter that pulls
//!   the gyroscope estimate towards the measured gravity direction. See
//!   [`OrientationTracker`].
//! * Pose: sweep timings from a rotating laser beacon are turned into image
//!   plane positions of four photodiodes, a homography to their known layout
//!   and finally rotation and translation of the board. See [`PoseTracker`].
//!
//! The world frame is y-up. A device at rest measures an accelerometer
//! reading pointing along positive y.
//!
//! # Example
//!
//! ```
//! use nalgebra::{Quaternion, Vector3};
//! use posetrack::{ImuReplay, OrientationTracker, TrackerParameters};
//!
//! // a barely moving device, tilted by 30 degrees about z
//! let tilt = 30_f64.to_radians();
//! let accel = Vector3::new(tilt.sin(), tilt.cos(), 0.0);
//! let replay = ImuReplay::new(vec![0.0, 1e-6, 0.0, accel.x, accel.y, accel.z])?;
//!
//! let mut tracker = OrientationTracker::new(TrackerParameters::default(), replay)?;
//! for _ in 0..200 {
//!     tracker.process_imu();
//! }
//!
//! let world_up = |q: Quaternion<f64>| (q * Quaternion::from_imag(accel) * q.conjugate()).imag();
//!
//! // the complementary filter has levelled the device, the gyroscope alone has not
//! assert!((world_up(tracker.quaternion_comp()) - Vector3::y()).norm() < 1e-6);
//! assert!(world_up(tracker.quaternion_gyro()).x > 0.49);
//! # Ok::<(), posetrack::Error>(())
//! ```

pub mod beacon;
pub mod calibration;
pub mod error;
pub mod flatland;
pub mod homography;
pub mod orientation;
pub mod params;
pub mod pose;
pub mod quaternion;
pub mod sensor;
pub mod tracker;

pub use calibration::BiasVariance;
pub use error::{Error, Result};
pub use flatland::FlatlandRoll;
pub use homography::Homography;
pub use orientation::OrientationState;
pub use params::{PoseParameters, TrackerParameters};
pub use pose::{Pose, PoseTracker};
pub use sensor::{
    Clock, ImuFeed, ImuReplay, ImuSample, ImuSensor, LiveFeed, MonotonicClock, TimedSample,
};
pub use tracker::{OrientationTracker, TickOutcome};
