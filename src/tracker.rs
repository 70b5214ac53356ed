//! The per-tick orientation tracking loop.

use log::{debug, info, trace};
use nalgebra::{Quaternion, Vector3};

use crate::calibration::BiasVariance;
use crate::error::Result;
use crate::flatland::FlatlandRoll;
use crate::orientation::{accel_pitch, accel_roll, OrientationState};
use crate::params::TrackerParameters;
use crate::sensor::{ImuFeed, ImuSample};

/// What a call to [`OrientationTracker::process_imu`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No sample was available, nothing changed.
    NoData,
    /// A sample was read but no positive time step exists yet, so the
    /// estimators were not advanced.
    WarmUp,
    /// All estimators were advanced by one sample.
    Updated,
}

impl TickOutcome {
    /// Returns `true` if the estimators were advanced.
    #[must_use]
    pub fn is_updated(self) -> bool {
        self == Self::Updated
    }
}

/// Owns every piece of mutable state of an orientation tracking session.
///
/// Each tick pulls one sample from the feed, removes the calibrated gyroscope
/// bias and advances the flatland, accelerometer and quaternion estimators in
/// sequence.
///
/// # Example
///
/// ```
/// use posetrack::{ImuReplay, OrientationTracker, TickOutcome, TrackerParameters};
///
/// // turning at 0.5 rad/s about z while level
/// let replay = ImuReplay::new(vec![0.0, 0.0, 0.5, 0.0, 9.81, 0.0])?;
/// let mut tracker = OrientationTracker::new(TrackerParameters::default(), replay)?;
///
/// for _ in 0..500 {
///     assert_eq!(tracker.process_imu(), TickOutcome::Updated);
/// }
///
/// // 500 samples at 2 ms are one second, half a radian
/// assert!((tracker.flatland().gyro - 0.5_f64.to_degrees()).abs() < 1e-9);
/// # Ok::<(), posetrack::Error>(())
/// ```
#[derive(Debug)]
pub struct OrientationTracker<F> {
    feed: F,
    parameters: TrackerParameters,
    calibration: BiasVariance,
    /// Bias-corrected angular velocity of the latest sample.
    gyro: Vector3<f64>,
    /// Accelerometer reading of the latest sample.
    accel: Vector3<f64>,
    delta_t: f64,
    flatland: FlatlandRoll,
    /// Accelerometer pitch, roll and (always zero) yaw in degrees.
    accel_euler: Vector3<f64>,
    orientation: OrientationState,
}

impl<F: ImuFeed> OrientationTracker<F> {
    /// Start a session reading from `feed`.
    ///
    /// # Errors
    ///
    /// Returns an error if `parameters` fail [`TrackerParameters::validate`].
    pub fn new(parameters: TrackerParameters, feed: F) -> Result<Self> {
        parameters.validate()?;

        Ok(Self {
            feed,
            parameters,
            calibration: BiasVariance::default(),
            gyro: Vector3::zeros(),
            accel: Vector3::zeros(),
            delta_t: 0.0,
            flatland: FlatlandRoll::default(),
            accel_euler: Vector3::zeros(),
            orientation: OrientationState::default(),
        })
    }

    /// Initialize the sensor behind the feed.
    ///
    /// # Errors
    ///
    /// Forwards the sensor's initialization failure.
    pub fn init_imu(&mut self) -> Result<()> {
        self.feed.init()?;
        info!("IMU initialized");
        Ok(())
    }

    /// Measure gyroscope and accelerometer bias and variance.
    ///
    /// Polls the feed until [`TrackerParameters::calibration_samples`]
    /// samples were read. The device must be at rest the whole time; motion
    /// is not detected.
    ///
    /// # Errors
    ///
    /// Returns an error only if the calibration window is empty, which
    /// validated parameters rule out.
    pub fn measure_bias_variance(&mut self) -> Result<&BiasVariance> {
        let window = self.parameters.calibration_samples;
        let mut samples = Vec::with_capacity(window);

        while samples.len() < window {
            match self.feed.next_sample() {
                Some(timed) => samples.push(timed.sample),
                None => std::hint::spin_loop(),
            }
        }

        self.calibration = BiasVariance::from_samples(samples)?;
        info!(
            "calibrated over {window} samples, gyro bias = [{:.6}, {:.6}, {:.6}]",
            self.calibration.gyro_bias.x,
            self.calibration.gyro_bias.y,
            self.calibration.gyro_bias.z,
        );

        Ok(&self.calibration)
    }

    /// Replace the gyroscope bias, keeping the other calibration values.
    pub fn set_gyro_bias(&mut self, bias: Vector3<f64>) {
        debug!("gyro bias set to {bias:?}");
        self.calibration.gyro_bias = bias;
    }

    /// Return every estimate to its initial value.
    pub fn reset_orientation(&mut self) {
        debug!("orientation reset");
        self.flatland = FlatlandRoll::default();
        self.accel_euler = Vector3::zeros();
        self.orientation = OrientationState::default();
    }

    /// Run one tick of the tracking loop.
    pub fn process_imu(&mut self) -> TickOutcome {
        let Some(timed) = self.feed.next_sample() else {
            return TickOutcome::NoData;
        };

        let delta_t = match timed.delta_t {
            Some(delta_t) if delta_t > 0.0 => delta_t,
            Some(delta_t) => {
                trace!("skipping sample with non-positive time step {delta_t}");
                return TickOutcome::WarmUp;
            }
            None => {
                trace!("first sample, establishing time baseline");
                return TickOutcome::WarmUp;
            }
        };

        self.apply_sample(&timed.sample, delta_t);
        self.update_orientation();
        TickOutcome::Updated
    }

    fn apply_sample(&mut self, sample: &ImuSample, delta_t: f64) {
        self.delta_t = delta_t;
        self.gyro = sample.gyro - self.calibration.gyro_bias;
        self.accel = sample.accel;
    }

    /// Advance all estimators with the current sample.
    fn update_orientation(&mut self) {
        let alpha = self.parameters.alpha;

        self.flatland
            .update(&self.gyro, &self.accel, self.delta_t, alpha);
        self.accel_euler = Vector3::new(accel_pitch(&self.accel), accel_roll(&self.accel), 0.0);
        self.orientation
            .update(&self.gyro, &self.accel, self.delta_t, alpha);
    }

    /// The session parameters.
    #[must_use]
    pub fn parameters(&self) -> &TrackerParameters {
        &self.parameters
    }

    /// The current bias and variance estimate.
    #[must_use]
    pub fn calibration(&self) -> &BiasVariance {
        &self.calibration
    }

    /// Bias-corrected angular velocity of the latest sample, in rad/s.
    #[must_use]
    pub fn gyro(&self) -> Vector3<f64> {
        self.gyro
    }

    /// Accelerometer reading of the latest sample.
    #[must_use]
    pub fn accel(&self) -> Vector3<f64> {
        self.accel
    }

    /// Seconds between the two latest samples.
    #[must_use]
    pub fn delta_t(&self) -> f64 {
        self.delta_t
    }

    /// The flatland roll estimates.
    #[must_use]
    pub fn flatland(&self) -> &FlatlandRoll {
        &self.flatland
    }

    /// Accelerometer pitch, roll and yaw in degrees. Yaw is always zero.
    #[must_use]
    pub fn accel_euler(&self) -> Vector3<f64> {
        self.accel_euler
    }

    /// The gyro-only orientation.
    #[must_use]
    pub fn quaternion_gyro(&self) -> Quaternion<f64> {
        self.orientation.gyro
    }

    /// The complementary orientation.
    #[must_use]
    pub fn quaternion_comp(&self) -> Quaternion<f64> {
        self.orientation.complementary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::sensor::tests::{ScriptedSensor, SteppingClock};
    use crate::sensor::{ImuReplay, LiveFeed};
    use approx::assert_relative_eq;

    fn level(gyro_z: f64) -> ImuSample {
        ImuSample::new(Vector3::new(0.0, 0.0, gyro_z), Vector3::new(0.0, 9.81, 0.0))
    }

    fn live(
        polls: impl IntoIterator<Item = Option<ImuSample>>,
        step_micros: u64,
    ) -> OrientationTracker<LiveFeed<ScriptedSensor, SteppingClock>> {
        let feed = LiveFeed::new(ScriptedSensor::new(polls), SteppingClock::new(step_micros));
        OrientationTracker::new(TrackerParameters::default(), feed).unwrap()
    }

    #[test]
    fn invalid_alpha_is_rejected() {
        let replay = ImuReplay::new(vec![0.0; 6]).unwrap();
        let parameters = TrackerParameters {
            alpha: 1.5,
            ..TrackerParameters::default()
        };

        assert!(matches!(
            OrientationTracker::new(parameters, replay),
            Err(Error::InvalidAlpha(_))
        ));
    }

    #[test]
    fn missing_sample_changes_nothing() {
        let mut tracker = live([None::<ImuSample>], 1_000);

        assert_eq!(tracker.process_imu(), TickOutcome::NoData);
        assert_eq!(tracker.quaternion_comp(), Quaternion::identity());
        assert_eq!(tracker.flatland(), &FlatlandRoll::default());
    }

    #[test]
    fn first_live_sample_is_warm_up() {
        let mut tracker = live([Some(level(1.0)), Some(level(1.0))], 10_000);

        assert_eq!(tracker.process_imu(), TickOutcome::WarmUp);
        assert_eq!(tracker.flatland().gyro, 0.0);

        assert_eq!(tracker.process_imu(), TickOutcome::Updated);
        assert_relative_eq!(tracker.delta_t(), 0.01, epsilon = 1e-12);
        assert_relative_eq!(tracker.flatland().gyro, 0.01_f64.to_degrees(), epsilon = 1e-9);
    }

    #[test]
    fn stalled_clock_skips_update() {
        let mut tracker = live([Some(level(1.0)), Some(level(1.0))], 0);

        assert_eq!(tracker.process_imu(), TickOutcome::WarmUp);
        assert_eq!(tracker.process_imu(), TickOutcome::WarmUp);
        assert_eq!(tracker.quaternion_gyro(), Quaternion::identity());
    }

    #[test]
    fn calibration_bias_is_removed_from_gyro() {
        let bias = Vector3::new(0.01, -0.02, 0.005);
        let still = ImuSample::new(bias, Vector3::new(0.0, 9.81, 0.0));
        let polls = std::iter::repeat(Some(still))
            .take(1000)
            .chain([None, Some(still), Some(still)]);

        let mut tracker = live(polls, 2_000);
        let calibration = *tracker.measure_bias_variance().unwrap();
        assert_relative_eq!(calibration.gyro_bias, bias, epsilon = 1e-12);
        assert_relative_eq!(calibration.gyro_variance, Vector3::zeros(), epsilon = 1e-12);

        assert_eq!(tracker.process_imu(), TickOutcome::NoData);
        assert_eq!(tracker.process_imu(), TickOutcome::Updated);
        assert_relative_eq!(tracker.gyro(), Vector3::zeros(), epsilon = 1e-12);
        assert_eq!(tracker.quaternion_gyro(), Quaternion::identity());
    }

    #[test]
    fn calibration_waits_for_samples() {
        let still = level(0.0);
        let polls = [None, Some(still), None, None, Some(still)];
        let feed = LiveFeed::new(ScriptedSensor::new(polls), SteppingClock::new(1));
        let parameters = TrackerParameters {
            calibration_samples: 2,
            ..TrackerParameters::default()
        };

        let mut tracker = OrientationTracker::new(parameters, feed).unwrap();
        let calibration = tracker.measure_bias_variance().unwrap();

        assert_relative_eq!(calibration.accel_bias, still.accel);
    }

    #[test]
    fn accelerometer_is_not_bias_corrected() {
        let replay = ImuReplay::new(vec![0.0, 0.0, 0.2, 1.0, 9.0, 0.5]).unwrap();
        let mut tracker = OrientationTracker::new(TrackerParameters::default(), replay).unwrap();
        tracker.measure_bias_variance().unwrap();

        tracker.process_imu();

        assert_eq!(tracker.accel(), Vector3::new(1.0, 9.0, 0.5));
        assert_relative_eq!(tracker.gyro(), Vector3::zeros(), epsilon = 1e-12);
    }

    #[test]
    fn set_gyro_bias_overrides_calibration() {
        let replay = ImuReplay::new(vec![0.1, 0.2, 0.3, 0.0, 1.0, 0.0]).unwrap();
        let mut tracker = OrientationTracker::new(TrackerParameters::default(), replay).unwrap();

        tracker.set_gyro_bias(Vector3::new(0.1, 0.2, 0.0));
        tracker.process_imu();

        assert_relative_eq!(tracker.gyro(), Vector3::new(0.0, 0.0, 0.3));
    }

    #[test]
    fn replay_advances_all_estimators() {
        let tilt = 20_f64.to_radians();
        let replay = ImuReplay::new(vec![0.0, 0.0, 0.1, tilt.sin(), tilt.cos(), 0.0]).unwrap();
        let mut tracker = OrientationTracker::new(TrackerParameters::default(), replay).unwrap();

        for _ in 0..10 {
            assert!(tracker.process_imu().is_updated());
        }

        assert_relative_eq!(tracker.delta_t(), ImuReplay::DEFAULT_DELTA_T);
        assert_relative_eq!(tracker.flatland().accel, 20.0, epsilon = 1e-9);
        assert_relative_eq!(tracker.accel_euler().y, 20.0, epsilon = 1e-9);
        assert_relative_eq!(tracker.quaternion_gyro().norm(), 1.0, epsilon = 1e-9);
        assert_relative_eq!(tracker.quaternion_comp().norm(), 1.0, epsilon = 1e-9);
        assert!((tracker.quaternion_comp() - tracker.quaternion_gyro()).norm() > 1e-6);
    }

    #[test]
    fn reset_restores_initial_state() {
        let replay = ImuReplay::new(vec![0.3, -0.2, 0.1, 0.5, 9.0, 0.2]).unwrap();
        let mut tracker = OrientationTracker::new(TrackerParameters::default(), replay).unwrap();
        for _ in 0..20 {
            tracker.process_imu();
        }

        tracker.reset_orientation();

        assert_eq!(tracker.flatland(), &FlatlandRoll::default());
        assert_eq!(tracker.accel_euler(), Vector3::zeros());
        assert_eq!(tracker.quaternion_gyro(), Quaternion::identity());
        assert_eq!(tracker.quaternion_comp(), Quaternion::identity());
    }

    #[test]
    fn init_reaches_sensor() {
        let mut tracker = live(std::iter::empty::<Option<ImuSample>>(), 1);

        tracker.init_imu().unwrap();

        assert!(tracker.feed.sensor().initialized);
    }
}
