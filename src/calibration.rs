//! Per-axis bias and variance of a stationary IMU.

use nalgebra::Vector3;

use crate::error::{Error, Result};
use crate::sensor::ImuSample;

/// Mean and population variance of each gyroscope and accelerometer axis.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BiasVariance {
    /// Gyroscope offset in rad/s, subtracted from every sample.
    pub gyro_bias: Vector3<f64>,
    /// Gyroscope noise variance.
    pub gyro_variance: Vector3<f64>,
    /// Mean accelerometer reading. Kept for reference, the accelerometer is
    /// used uncorrected since its mean contains gravity.
    pub accel_bias: Vector3<f64>,
    /// Accelerometer noise variance.
    pub accel_variance: Vector3<f64>,
}

impl BiasVariance {
    /// Estimate bias and variance from samples of a device at rest.
    ///
    /// The variance is computed as $E[x^2] - E[x]^2$.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyCalibration`] when `samples` is empty.
    #[allow(clippy::cast_precision_loss)]
    pub fn from_samples<I>(samples: I) -> Result<Self>
    where
        I: IntoIterator<Item = ImuSample>,
    {
        let mut count = 0_usize;
        let mut gyro_sum = Vector3::zeros();
        let mut gyro_square_sum = Vector3::zeros();
        let mut accel_sum = Vector3::zeros();
        let mut accel_square_sum = Vector3::zeros();

        for sample in samples {
            count += 1;
            gyro_sum += sample.gyro;
            gyro_square_sum += sample.gyro.component_mul(&sample.gyro);
            accel_sum += sample.accel;
            accel_square_sum += sample.accel.component_mul(&sample.accel);
        }

        if count == 0 {
            return Err(Error::EmptyCalibration);
        }

        let n = count as f64;
        let gyro_bias = gyro_sum / n;
        let accel_bias = accel_sum / n;

        Ok(Self {
            gyro_bias,
            gyro_variance: gyro_square_sum / n - gyro_bias.component_mul(&gyro_bias),
            accel_bias,
            accel_variance: accel_square_sum / n - accel_bias.component_mul(&accel_bias),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn constant_samples_have_no_variance() {
        let sample = ImuSample::new(Vector3::new(0.01, -0.02, 0.03), Vector3::new(0.0, 9.81, 0.1));

        let calibration = BiasVariance::from_samples(std::iter::repeat(sample).take(1000)).unwrap();

        assert_relative_eq!(calibration.gyro_bias, sample.gyro, epsilon = 1e-12);
        assert_relative_eq!(calibration.accel_bias, sample.accel, epsilon = 1e-12);
        assert_relative_eq!(calibration.gyro_variance, Vector3::zeros(), epsilon = 1e-12);
        assert_relative_eq!(calibration.accel_variance, Vector3::zeros(), epsilon = 1e-9);
    }

    #[test]
    fn alternating_samples_have_population_variance() {
        let low = ImuSample::new(Vector3::new(1.0, 0.0, -2.0), Vector3::new(0.0, 8.0, 0.0));
        let high = ImuSample::new(Vector3::new(3.0, 0.0, 2.0), Vector3::new(0.0, 10.0, 0.0));

        let calibration = BiasVariance::from_samples([low, high, low, high]).unwrap();

        assert_relative_eq!(calibration.gyro_bias, Vector3::new(2.0, 0.0, 0.0));
        assert_relative_eq!(calibration.gyro_variance, Vector3::new(1.0, 0.0, 4.0));
        assert_relative_eq!(calibration.accel_bias, Vector3::new(0.0, 9.0, 0.0));
        assert_relative_eq!(calibration.accel_variance, Vector3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn no_samples_is_an_error() {
        assert_eq!(
            BiasVariance::from_samples(std::iter::empty()),
            Err(Error::EmptyCalibration)
        );
    }
}
