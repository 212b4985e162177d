//! Random linear maps with a prescribed condition number.
//!
//! Used to build test instances with a known ground-truth transform.

use nalgebra::DMatrix;
use rand::Rng;
use rand_distr::StandardNormal;

use crate::{
    error::LinalgError,
    linalg::{check_finite, singular_values},
};

/// Draw a random orthogonal matrix (Haar distributed).
///
/// QR of a Gaussian matrix, with the signs of `Q`'s columns fixed by the diagonal of `R`.
pub fn random_orthogonal<R: Rng + ?Sized>(dim: usize, rng: &mut R) -> DMatrix<f64> {
    let gaussian = DMatrix::from_fn(dim, dim, |_, _| rng.sample::<f64, _>(StandardNormal));
    let qr = gaussian.qr();
    let r = qr.r();
    let mut q = qr.q();
    for (j, mut col) in q.column_iter_mut().enumerate() {
        if r[(j, j)] < 0.0 {
            col.neg_mut();
        }
    }
    q
}

/// Draw a random dxd matrix whose condition number is exactly `cond`.
///
/// `L = U·diag(s)·Vᵗ` with `U`, `V` random orthogonal and singular values spaced
/// geometrically from `1` to `cond`.
///
/// # Arguments
///
/// * `dim` - The ambient dimension d.
/// * `cond` - The condition number, at least 1.
/// * `rng` - The random generator.
///
/// Example:
///
/// ```
/// use granni_3d::synthetic::{condition_number, random_linear_map};
/// use rand::{rngs::StdRng, SeedableRng};
///
/// let mut rng = StdRng::seed_from_u64(7);
/// let l = random_linear_map(3, 3.0, &mut rng).unwrap();
/// assert!((condition_number(&l) - 3.0).abs() < 1e-9);
/// ```
pub fn random_linear_map<R: Rng + ?Sized>(
    dim: usize,
    cond: f64,
    rng: &mut R,
) -> Result<DMatrix<f64>, LinalgError> {
    if dim == 0 {
        return Err(LinalgError::InvalidDimension(dim));
    }
    if cond.is_nan() || cond < 1.0 {
        return Err(LinalgError::InvalidConditionNumber(cond));
    }

    let singular_values = nalgebra::DVector::from_fn(dim, |i, _| {
        if dim == 1 {
            1.0
        } else {
            cond.powf(i as f64 / (dim - 1) as f64)
        }
    });

    let u = random_orthogonal(dim, &mut *rng);
    let v = random_orthogonal(dim, rng);

    Ok(u * DMatrix::from_diagonal(&singular_values) * v.transpose())
}

/// Ratio of the largest to the smallest singular value.
///
/// NaN when the singular values cannot be computed (non-finite entries).
pub fn condition_number(mat: &DMatrix<f64>) -> f64 {
    if check_finite(mat).is_err() {
        return f64::NAN;
    }
    match singular_values(mat) {
        Ok(sv) => sv.max() / sv.min(),
        Err(_) => f64::NAN,
    }
}
