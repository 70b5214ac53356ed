//! Sources of IMU samples: a live sensor paired with a clock, or a replay of
//! recorded data.

use std::time::Instant;

use nalgebra::Vector3;

use crate::error::{Error, Result};

/// One gyroscope and accelerometer reading.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ImuSample {
    /// Angular velocity in rad/s.
    pub gyro: Vector3<f64>,
    /// Specific force, in the sensor's native unit.
    pub accel: Vector3<f64>,
}

impl ImuSample {
    /// Create a sample from its two vectors.
    #[must_use]
    pub fn new(gyro: Vector3<f64>, accel: Vector3<f64>) -> Self {
        Self { gyro, accel }
    }
}

/// A 6-axis inertial sensor.
pub trait ImuSensor {
    /// One-time initialization of the device.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Sensor`] when the device cannot be brought up.
    fn init(&mut self) -> Result<()>;

    /// Poll for a new sample, returning `None` when none is available yet.
    fn read(&mut self) -> Option<ImuSample>;
}

/// A monotonic time source.
pub trait Clock {
    /// Microseconds elapsed since an arbitrary, fixed epoch.
    fn micros(&self) -> u64;
}

/// [`Clock`] backed by [`std::time::Instant`], with the epoch at creation.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    epoch: Instant,
}

impl MonotonicClock {
    /// Start a clock at zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn micros(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_micros()).unwrap_or(u64::MAX)
    }
}

/// A sample together with the time elapsed since the previous one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedSample {
    /// The raw reading.
    pub sample: ImuSample,
    /// Seconds since the previous sample, `None` for the first sample of a
    /// live feed where no baseline exists yet.
    pub delta_t: Option<f64>,
}

/// Where an [`crate::OrientationTracker`] gets its samples from.
pub trait ImuFeed {
    /// One-time initialization of the underlying source.
    ///
    /// # Errors
    ///
    /// Forwards the failure of the underlying sensor.
    fn init(&mut self) -> Result<()>;

    /// Poll for the next sample.
    fn next_sample(&mut self) -> Option<TimedSample>;
}

impl<F: ImuFeed + ?Sized> ImuFeed for Box<F> {
    fn init(&mut self) -> Result<()> {
        (**self).init()
    }

    fn next_sample(&mut self) -> Option<TimedSample> {
        (**self).next_sample()
    }
}

/// A live sensor, timestamped with a [`Clock`] as samples arrive.
#[derive(Debug)]
pub struct LiveFeed<S, C> {
    sensor: S,
    clock: C,
    /// Time of the previous sample in seconds.
    previous_time: Option<f64>,
}

impl<S: ImuSensor, C: Clock> LiveFeed<S, C> {
    /// Pair a sensor with a clock.
    pub fn new(sensor: S, clock: C) -> Self {
        Self {
            sensor,
            clock,
            previous_time: None,
        }
    }

    /// The underlying sensor.
    pub fn sensor(&self) -> &S {
        &self.sensor
    }
}

impl<S: ImuSensor, C: Clock> ImuFeed for LiveFeed<S, C> {
    fn init(&mut self) -> Result<()> {
        self.sensor.init()
    }

    #[allow(clippy::cast_precision_loss)]
    fn next_sample(&mut self) -> Option<TimedSample> {
        let sample = self.sensor.read()?;

        let now = self.clock.micros() as f64 / 1_000_000.0;
        let delta_t = self.previous_time.map(|previous| now - previous);
        self.previous_time = Some(now);

        Some(TimedSample { sample, delta_t })
    }
}

/// Cyclic playback of recorded samples at a fixed rate.
///
/// The data is a flat list of `[gyro.x, gyro.y, gyro.z, accel.x, accel.y,
/// accel.z]` groups. Playback wraps around to the first sample after the
/// last one.
///
/// # Example
///
/// ```
/// use posetrack::sensor::{ImuFeed, ImuReplay};
///
/// let mut replay = ImuReplay::new(vec![0.0, 0.0, 0.1, 0.0, 9.81, 0.0]).unwrap();
///
/// let first = replay.next_sample().unwrap();
/// let second = replay.next_sample().unwrap();
///
/// assert_eq!(first, second);
/// assert_eq!(first.delta_t, Some(0.002));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ImuReplay {
    data: Vec<f64>,
    cursor: usize,
    delta_t: f64,
}

impl ImuReplay {
    /// Time between replayed samples in seconds.
    pub const DEFAULT_DELTA_T: f64 = 0.002;

    /// Replay `data` at [`Self::DEFAULT_DELTA_T`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidReplay`] if `data` is empty or its length is
    /// not a multiple of six.
    pub fn new(data: Vec<f64>) -> Result<Self> {
        Self::with_delta_t(data, Self::DEFAULT_DELTA_T)
    }

    /// Replay `data` with a custom fixed time step.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidReplay`] if `data` is empty or its length is
    /// not a multiple of six, and [`Error::InvalidParameter`] for a
    /// non-positive time step.
    pub fn with_delta_t(data: Vec<f64>, delta_t: f64) -> Result<Self> {
        if data.is_empty() || data.len() % 6 != 0 {
            return Err(Error::InvalidReplay(data.len()));
        }

        if !(delta_t.is_finite() && delta_t > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "replay delta_t must be positive, got {delta_t}"
            )));
        }

        Ok(Self {
            data,
            cursor: 0,
            delta_t,
        })
    }

    /// Number of recorded samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len() / 6
    }

    /// Always `false`, construction rejects empty recordings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl ImuFeed for ImuReplay {
    fn init(&mut self) -> Result<()> {
        Ok(())
    }

    fn next_sample(&mut self) -> Option<TimedSample> {
        let values = &self.data[self.cursor..self.cursor + 6];
        let sample = ImuSample::new(
            Vector3::new(values[0], values[1], values[2]),
            Vector3::new(values[3], values[4], values[5]),
        );
        self.cursor = (self.cursor + 6) % self.data.len();

        Some(TimedSample {
            sample,
            delta_t: Some(self.delta_t),
        })
    }
}
