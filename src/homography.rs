//! Estimation of the planar homography between the photodiode layout and
//! its observed image-plane positions.
//!
//! With the ninth element fixed to one the homography has eight unknowns,
//!
//! $$H = \begin{bmatrix} h_0 & h_1 & h_2 \\\\ h_3 & h_4 & h_5 \\\\ h_6 & h_7 & 1 \end{bmatrix},$$
//!
//! and each of the four point correspondences contributes one equation per
//! image axis.

use nalgebra::{Matrix3, SMatrix, SVector, Vector2, Vector3};

use crate::beacon::ImagePositions;
use crate::error::{Error, Result};

/// The 8x8 design matrix of the homography system.
pub type HomographySystem = SMatrix<f64, 8, 8>;

/// Ratio of smallest to largest singular value below which the system is
/// treated as singular.
const SINGULARITY_TOLERANCE: f64 = 1e-12;

/// Build the design matrix `A` of `A h = b`, where `b` are the observed
/// `positions` and `reference` the planar photodiode coordinates.
#[must_use]
pub fn form_a(positions: &ImagePositions, reference: &[f64; 8]) -> HomographySystem {
    let mut a = HomographySystem::zeros();

    for point in 0..4 {
        let row = 2 * point;
        let (x, y) = (reference[row], reference[row + 1]);
        let (u, v) = (positions[row], positions[row + 1]);

        a[(row, 0)] = x;
        a[(row, 1)] = y;
        a[(row, 2)] = 1.0;
        a[(row, 6)] = -x * u;
        a[(row, 7)] = -y * u;

        a[(row + 1, 3)] = x;
        a[(row + 1, 4)] = y;
        a[(row + 1, 5)] = 1.0;
        a[(row + 1, 6)] = -x * v;
        a[(row + 1, 7)] = -y * v;
    }

    a
}

/// Solve `A h = b` for the eight homography parameters.
///
/// # Errors
///
/// Returns [`Error::SingularHomography`] when `a` is singular or too badly
/// conditioned to give a meaningful solution, e.g. for collinear photodiodes
/// or when every observation coincides.
pub fn solve_for_h(a: &HomographySystem, b: &SVector<f64, 8>) -> Result<SVector<f64, 8>> {
    if a.iter().chain(b.iter()).any(|x| !x.is_finite()) {
        return Err(Error::SingularHomography);
    }

    let singular_values = a.singular_values();
    let largest = singular_values.max();
    let smallest = singular_values.min();

    if smallest <= largest * SINGULARITY_TOLERANCE {
        return Err(Error::SingularHomography);
    }

    let inverse = a.try_inverse().ok_or(Error::SingularHomography)?;
    Ok(inverse * b)
}

/// A planar homography with its last element fixed to one.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Homography {
    h: SVector<f64, 8>,
}

impl Homography {
    /// Wrap the eight free parameters `[h0, ..., h7]`.
    #[must_use]
    pub fn from_vector(h: SVector<f64, 8>) -> Self {
        Self { h }
    }

    /// Estimate the homography mapping `reference` onto `positions`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SingularHomography`] if the correspondences are
    /// degenerate.
    pub fn estimate(positions: &ImagePositions, reference: &[f64; 8]) -> Result<Self> {
        let a = form_a(positions, reference);
        solve_for_h(&a, positions).map(Self::from_vector)
    }

    /// The eight free parameters.
    #[must_use]
    pub fn vector(&self) -> &SVector<f64, 8> {
        &self.h
    }

    /// The full 3x3 matrix.
    #[must_use]
    pub fn matrix(&self) -> Matrix3<f64> {
        let h = &self.h;
        Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], 1.0)
    }

    /// Map a reference-plane point to the image plane.
    #[must_use]
    pub fn project(&self, x: f64, y: f64) -> Vector2<f64> {
        let p = self.matrix() * Vector3::new(x, y, 1.0);
        Vector2::new(p.x / p.z, p.y / p.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const REFERENCE: [f64; 8] = [-42.0, 25.0, 42.0, 25.0, 42.0, -25.0, -42.0, -25.0];

    fn observe(homography: &Homography, reference: &[f64; 8]) -> ImagePositions {
        let mut positions = ImagePositions::zeros();
        for point in 0..4 {
            let p = homography.project(reference[2 * point], reference[2 * point + 1]);
            positions[2 * point] = p.x;
            positions[2 * point + 1] = p.y;
        }
        positions
    }

    #[test]
    fn design_matrix_layout() {
        let positions = ImagePositions::from([0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8]);
        let a = form_a(&positions, &REFERENCE);

        let expected_even = [-42.0, 25.0, 1.0, 0.0, 0.0, 0.0, 42.0 * 0.1, -25.0 * 0.1];
        let expected_odd = [0.0, 0.0, 0.0, -42.0, 25.0, 1.0, 42.0 * 0.2, -25.0 * 0.2];
        for col in 0..8 {
            assert_relative_eq!(a[(0, col)], expected_even[col]);
            assert_relative_eq!(a[(1, col)], expected_odd[col]);
        }
    }

    #[test]
    fn recovers_exact_homography() {
        let truth = Homography::from_vector(SVector::from([
            0.9, -0.05, 0.1, 0.08, 1.1, -0.2, 0.001, -0.002,
        ]));

        let positions = observe(&truth, &REFERENCE);
        let estimate = Homography::estimate(&positions, &REFERENCE).unwrap();

        assert_relative_eq!(estimate.vector(), truth.vector(), epsilon = 1e-9);
    }

    #[test]
    fn identical_observations_are_singular() {
        let positions = ImagePositions::from_element(0.25);

        assert_eq!(
            Homography::estimate(&positions, &REFERENCE),
            Err(Error::SingularHomography)
        );
    }

    #[test]
    fn zero_observations_are_singular() {
        assert_eq!(
            Homography::estimate(&ImagePositions::zeros(), &REFERENCE),
            Err(Error::SingularHomography)
        );
    }

    #[test]
    fn collinear_reference_points_are_singular() {
        let collinear = [0.0, 0.0, 10.0, 10.0, 20.0, 20.0, 30.0, 30.0];
        let positions = ImagePositions::from([0.0, 0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7]);

        assert_eq!(
            Homography::estimate(&positions, &collinear),
            Err(Error::SingularHomography)
        );
    }

    #[test]
    fn non_finite_observations_are_singular() {
        let mut positions = ImagePositions::from_element(0.1);
        positions[3] = f64::NAN;

        assert!(solve_for_h(&form_a(&positions, &REFERENCE), &positions).is_err());
    }

    #[test]
    fn matrix_fixes_last_element() {
        let homography = Homography::from_vector(SVector::from([1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]));

        let m = homography.matrix();

        assert_eq!(m[(0, 2)], 3.0);
        assert_eq!(m[(2, 1)], 8.0);
        assert_eq!(m[(2, 2)], 1.0);
    }
}
