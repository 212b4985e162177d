//! Correspondence-free affine fit between covariance ellipsoids.
//!
//! Maps the covariance ellipsoid of one point set onto the covariance
//! ellipsoid of another: `L = Cy^{1/2} · Cx^{-1/2}`, so that `L·Cx·Lᵗ = Cy`.
//! The fit only sees second moments, so it is exact up to an orthogonal factor
//! `Cy^{1/2}·R·Cx^{-1/2}`; the symmetric choice `R = I` is returned. It is not
//! used by the permutation-based matcher.

use nalgebra::{DMatrix, SymmetricEigen};

use crate::{
    error::LinalgError,
    linalg::{centered, MAX_DECOMPOSITION_ITERATIONS},
};

/// Sample covariance `X·Xᵗ / n` of a point set after centering.
pub fn covariance(points: &DMatrix<f64>) -> Result<DMatrix<f64>, LinalgError> {
    let x = centered(points)?;
    Ok(&x * x.transpose() / points.ncols() as f64)
}

// V·diag(f(λ))·Vᵗ for a symmetric positive definite matrix
fn spd_function(
    mat: &DMatrix<f64>,
    f: impl Fn(f64) -> f64,
) -> Result<DMatrix<f64>, LinalgError> {
    let eig = SymmetricEigen::try_new(mat.clone(), f64::EPSILON, MAX_DECOMPOSITION_ITERATIONS)
        .ok_or_else(|| {
            LinalgError::SvdFailed("eigen decomposition did not converge".to_string())
        })?;
    let l_max = eig.eigenvalues.max();
    if l_max <= 0.0 || eig.eigenvalues.min() <= l_max * crate::linalg::MIN_RCOND {
        return Err(LinalgError::DegenerateGeometry(
            "covariance is not positive definite".to_string(),
        ));
    }
    let diag = DMatrix::from_diagonal(&eig.eigenvalues.map(f));
    Ok(&eig.eigenvectors * diag * eig.eigenvectors.transpose())
}

/// Fit the symmetric linear map sending the covariance ellipsoid of `points_src`
/// onto the covariance ellipsoid of `points_dst`.
///
/// The two point sets may have different cardinalities; no correspondence is used.
///
/// # Arguments
///
/// * `points_src` - dxn source points.
/// * `points_dst` - dxm destination points.
///
/// # Returns
///
/// The dxd map `L` with `L·Cx·Lᵗ = Cy`.
pub fn fit_covariance_ellipsoid(
    points_src: &DMatrix<f64>,
    points_dst: &DMatrix<f64>,
) -> Result<DMatrix<f64>, LinalgError> {
    if points_src.nrows() != points_dst.nrows() {
        return Err(LinalgError::DimensionMismatch {
            expected: points_src.nrows(),
            actual: points_dst.nrows(),
        });
    }
    let cov_src = covariance(points_src)?;
    let cov_dst = covariance(points_dst)?;

    let src_inv_sqrt = spd_function(&cov_src, |l| 1.0 / l.sqrt())?;
    let dst_sqrt = spd_function(&cov_dst, f64::sqrt)?;

    Ok(dst_sqrt * src_inv_sqrt)
}
