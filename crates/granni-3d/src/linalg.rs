use nalgebra::{DMatrix, DVector, SVD};

use crate::error::LinalgError;

/// Smallest accepted reciprocal condition number of the Gram matrix `X·Xᵗ`.
pub const MIN_RCOND: f64 = 1e-12;

/// Iteration cap of the SVD and eigen decompositions.
pub const MAX_DECOMPOSITION_ITERATIONS: usize = 10_000;

/// Reject point sets with a NaN or infinite coordinate.
///
/// The decompositions used downstream do not terminate on such input.
pub fn check_finite(points: &DMatrix<f64>) -> Result<(), LinalgError> {
    let nrows = points.nrows().max(1);
    match points.iter().position(|v| !v.is_finite()) {
        Some(k) => Err(LinalgError::NonFiniteCoordinate {
            row: k % nrows,
            col: k / nrows,
        }),
        None => Ok(()),
    }
}

/// Singular values of a matrix, or [`LinalgError::SvdFailed`] when the
/// decomposition does not converge within [`MAX_DECOMPOSITION_ITERATIONS`].
pub fn singular_values(mat: &DMatrix<f64>) -> Result<DVector<f64>, LinalgError> {
    SVD::try_new(
        mat.clone(),
        false,
        false,
        f64::EPSILON,
        MAX_DECOMPOSITION_ITERATIONS,
    )
    .map(|svd| svd.singular_values)
    .ok_or_else(|| LinalgError::SvdFailed("singular values did not converge".to_string()))
}

/// Compute the barycenter (column mean) of a point set.
///
/// # Arguments
///
/// * `points` - A dxN coordinate matrix, one point per column.
///
/// # Returns
///
/// The d-dimensional mean of the columns.
///
/// Example:
///
/// ```
/// use granni_3d::linalg::barycenter;
/// use nalgebra::DMatrix;
///
/// let points = DMatrix::from_row_slice(3, 2, &[0.0, 2.0, 1.0, 3.0, 4.0, 4.0]);
/// let c = barycenter(&points).unwrap();
/// assert_eq!(c.as_slice(), &[1.0, 2.0, 4.0]);
/// ```
pub fn barycenter(points: &DMatrix<f64>) -> Result<DVector<f64>, LinalgError> {
    if points.ncols() == 0 {
        return Err(LinalgError::EmptyPointSet);
    }
    check_finite(points)?;
    Ok(points.column_sum() / points.ncols() as f64)
}

/// Return a copy of the point set with its barycenter subtracted from every column.
///
/// The input is not modified.
pub fn centered(points: &DMatrix<f64>) -> Result<DMatrix<f64>, LinalgError> {
    let c = barycenter(points)?;
    Ok(DMatrix::from_fn(points.nrows(), points.ncols(), |i, j| {
        points[(i, j)] - c[i]
    }))
}

/// Build the kernel-projection operator of a centered point set.
///
/// With `X = U Σ Vᵗ`, the first `r = min(d, k)` rows of `Vᵗ` form an orthonormal
/// basis `ker` and the operator is `P = kerᵗ·ker`. The result is a symmetric,
/// idempotent kxk matrix of rank `r`, unchanged by any invertible linear map
/// applied to the ambient coordinates.
///
/// # Arguments
///
/// * `points` - A centered dxk coordinate matrix.
///
/// # Returns
///
/// The kxk projector.
pub fn kernel_projector(points: &DMatrix<f64>) -> Result<DMatrix<f64>, LinalgError> {
    if points.ncols() == 0 {
        return Err(LinalgError::EmptyPointSet);
    }
    if points.nrows() == 0 {
        return Err(LinalgError::InvalidDimension(0));
    }
    check_finite(points)?;

    let svd = points
        .clone()
        .try_svd(false, true, f64::EPSILON, MAX_DECOMPOSITION_ITERATIONS)
        .ok_or_else(|| LinalgError::SvdFailed("did not converge".to_string()))?;
    let ker = svd
        .v_t
        .ok_or_else(|| LinalgError::SvdFailed("right singular vectors missing".to_string()))?;

    Ok(ker.tr_mul(&ker))
}

/// Embed a square projector into the top-left block of a `size`x`size` zero matrix.
///
/// Padding to the projector's own size returns an identical matrix.
pub fn pad_projector(projector: &DMatrix<f64>, size: usize) -> Result<DMatrix<f64>, LinalgError> {
    let n = projector.nrows();
    if projector.ncols() != n {
        return Err(LinalgError::DimensionMismatch {
            expected: n,
            actual: projector.ncols(),
        });
    }
    if n > size {
        return Err(LinalgError::PaddingOverflow { size: n, target: size });
    }
    Ok(DMatrix::from_fn(size, size, |i, j| {
        if i < n && j < n {
            projector[(i, j)]
        } else {
            0.0
        }
    }))
}

/// Check that a centered point set spans its ambient space.
///
/// Fails with [`LinalgError::DegenerateGeometry`] when there are fewer points than
/// dimensions or when `X·Xᵗ` is numerically singular (coplanar or collinear
/// samples).
pub fn check_spread(points: &DMatrix<f64>) -> Result<(), LinalgError> {
    let (dim, num_points) = points.shape();
    if dim == 0 {
        return Err(LinalgError::InvalidDimension(0));
    }
    if num_points < dim {
        return Err(LinalgError::DegenerateGeometry(format!(
            "{num_points} points cannot span a {dim}-dimensional space"
        )));
    }
    check_finite(points)?;

    let gram = points * points.transpose();
    let sv = singular_values(&gram)?;
    let (s_max, s_min) = (sv.max(), sv.min());
    if s_max.is_nan() || s_max <= 0.0 || s_min / s_max < MIN_RCOND {
        return Err(LinalgError::DegenerateGeometry(format!(
            "point spread is singular (singular values of X·Xᵗ in [{s_min:e}, {s_max:e}])"
        )));
    }
    Ok(())
}

/// Estimate the linear map `L` minimizing `‖Y_matched − L·X‖` in the least squares sense.
///
/// `L = Y_matched · Xᵗ · (X·Xᵗ)⁻¹`, where `Y_matched` gathers the columns of
/// `points_dst` selected by `correspondence`.
///
/// # Arguments
///
/// * `points_src` - The centered dxn source points `X`.
/// * `points_dst` - The centered dxm destination points `Y`.
/// * `correspondence` - For each source point, the index of its match in `points_dst`.
///
/// # Returns
///
/// The dxd linear map from source to destination.
pub fn estimate_linear_map(
    points_src: &DMatrix<f64>,
    points_dst: &DMatrix<f64>,
    correspondence: &[usize],
) -> Result<DMatrix<f64>, LinalgError> {
    let dim = points_src.nrows();
    if points_dst.nrows() != dim {
        return Err(LinalgError::DimensionMismatch {
            expected: dim,
            actual: points_dst.nrows(),
        });
    }
    if correspondence.len() != points_src.ncols() {
        return Err(LinalgError::DimensionMismatch {
            expected: points_src.ncols(),
            actual: correspondence.len(),
        });
    }
    if let Some(&index) = correspondence.iter().find(|&&j| j >= points_dst.ncols()) {
        return Err(LinalgError::IndexOutOfBounds {
            index,
            len: points_dst.ncols(),
        });
    }

    check_spread(points_src)?;
    check_finite(points_dst)?;

    let dst_matched = points_dst.select_columns(correspondence);
    let gram = points_src * points_src.transpose();
    let gram_inv = gram.try_inverse().ok_or_else(|| {
        LinalgError::DegenerateGeometry("X·Xᵗ is not invertible".to_string())
    })?;

    Ok(dst_matched * points_src.transpose() * gram_inv)
}

/// Apply a linear map to every point (column) of a point set.
pub fn transform_points(
    points: &DMatrix<f64>,
    map: &DMatrix<f64>,
) -> Result<DMatrix<f64>, LinalgError> {
    if map.ncols() != points.nrows() {
        return Err(LinalgError::DimensionMismatch {
            expected: points.nrows(),
            actual: map.ncols(),
        });
    }
    Ok(map * points)
}

/// Relative Frobenius error `‖reference − estimate‖ / ‖reference‖`.
pub fn relative_error(reference: &DMatrix<f64>, estimate: &DMatrix<f64>) -> f64 {
    (reference - estimate).norm() / reference.norm()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample_points() -> DMatrix<f64> {
        DMatrix::from_row_slice(
            3,
            7,
            &[
                0.3, -1.2, 2.0, 0.7, -0.4, 1.5, -2.1, //
                1.1, 0.4, -0.9, 2.2, -1.7, 0.2, 0.8, //
                -0.5, 1.9, 0.6, -1.1, 0.9, 2.4, -0.3,
            ],
        )
    }

    fn assert_matrix_eq(a: &DMatrix<f64>, b: &DMatrix<f64>, epsilon: f64) {
        assert_eq!(a.shape(), b.shape());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_relative_eq!(x, y, epsilon = epsilon);
        }
    }

    #[test]
    fn test_barycenter() -> Result<(), LinalgError> {
        let points = DMatrix::from_row_slice(3, 2, &[1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
        let c = barycenter(&points)?;
        assert_eq!(c.as_slice(), &[2.5, 3.5, 4.5]);
        assert_eq!(
            barycenter(&DMatrix::zeros(3, 0)),
            Err(LinalgError::EmptyPointSet)
        );
        Ok(())
    }

    #[test]
    fn test_centered_zero_mean_and_idempotent() -> Result<(), LinalgError> {
        let points = sample_points().add_scalar(10.0);
        let once = centered(&points)?;
        for v in barycenter(&once)?.iter() {
            assert_relative_eq!(*v, 0.0, epsilon = 1e-12);
        }
        let twice = centered(&once)?;
        assert_matrix_eq(&once, &twice, 1e-12);

        // the input is copied, not mutated
        assert_relative_eq!(points[(0, 0)], 10.3, epsilon = 1e-12);
        Ok(())
    }

    #[test]
    fn test_kernel_projector_properties() -> Result<(), LinalgError> {
        let x = centered(&sample_points())?;
        let p = kernel_projector(&x)?;
        assert_eq!(p.shape(), (7, 7));

        // symmetric
        assert_matrix_eq(&p, &p.transpose(), 1e-12);
        // idempotent
        assert_matrix_eq(&(&p * &p), &p, 1e-10);
        // rank (== trace for a projector) equals the ambient dimension
        assert_relative_eq!(p.trace(), 3.0, epsilon = 1e-10);
        // the rows of X lie in the range of P
        assert_matrix_eq(&(&x * &p), &x, 1e-10);
        Ok(())
    }

    #[test]
    fn test_kernel_projector_linear_invariance() -> Result<(), LinalgError> {
        let x = centered(&sample_points())?;
        let l = DMatrix::from_row_slice(3, 3, &[2.0, 0.5, 0.0, -1.0, 1.0, 0.3, 0.2, 0.0, 3.0]);
        let y = transform_points(&x, &l)?;

        let px = kernel_projector(&x)?;
        let py = kernel_projector(&y)?;
        assert_matrix_eq(&px, &py, 1e-9);
        Ok(())
    }

    #[test]
    fn test_kernel_projector_too_few_points() -> Result<(), LinalgError> {
        let x = centered(&DMatrix::from_row_slice(3, 2, &[1.0, -1.0, 2.0, 0.0, 0.5, 0.1]))?;
        let p = kernel_projector(&x)?;
        assert_eq!(p.shape(), (2, 2));
        assert!(p.trace() <= 2.0 + 1e-10);
        Ok(())
    }

    #[test]
    fn test_pad_projector() -> Result<(), LinalgError> {
        let p = DMatrix::from_row_slice(2, 2, &[0.5, 0.5, 0.5, 0.5]);
        let padded = pad_projector(&p, 4)?;
        assert_eq!(padded.shape(), (4, 4));
        assert_eq!(padded[(1, 0)], 0.5);
        assert_eq!(padded[(2, 2)], 0.0);
        assert_eq!(padded[(0, 3)], 0.0);

        // equal sizes: no-op
        assert_eq!(pad_projector(&p, 2)?, p);

        assert_eq!(
            pad_projector(&p, 1),
            Err(LinalgError::PaddingOverflow { size: 2, target: 1 })
        );
        Ok(())
    }

    #[test]
    fn test_check_spread() -> Result<(), LinalgError> {
        assert!(check_spread(&centered(&sample_points())?).is_ok());

        // coplanar points: z = 0 everywhere
        let planar = DMatrix::from_row_slice(
            3,
            4,
            &[1.0, -1.0, 0.0, 0.0, 0.0, 0.0, 1.0, -1.0, 0.0, 0.0, 0.0, 0.0],
        );
        assert!(matches!(
            check_spread(&planar),
            Err(LinalgError::DegenerateGeometry(_))
        ));

        let too_few = DMatrix::from_row_slice(3, 2, &[1.0, -1.0, 0.0, 0.0, 2.0, -2.0]);
        assert!(matches!(
            check_spread(&too_few),
            Err(LinalgError::DegenerateGeometry(_))
        ));
        Ok(())
    }

    #[test]
    fn test_non_finite_coordinates_are_rejected() -> Result<(), LinalgError> {
        let x = centered(&sample_points())?;
        let mut bad = sample_points();
        bad[(1, 4)] = f64::NAN;
        let expected = Err(LinalgError::NonFiniteCoordinate { row: 1, col: 4 });

        assert_eq!(check_finite(&bad), expected);
        assert_eq!(barycenter(&bad).map(|_| ()), expected);
        assert_eq!(kernel_projector(&bad).map(|_| ()), expected);
        assert_eq!(check_spread(&bad), expected);

        let identity = (0..7).collect::<Vec<_>>();
        assert_eq!(
            estimate_linear_map(&x, &bad, &identity).map(|_| ()),
            expected
        );

        bad[(1, 4)] = f64::NEG_INFINITY;
        assert_eq!(check_spread(&bad), expected);
        Ok(())
    }

    #[test]
    fn test_estimate_linear_map_exact() -> Result<(), LinalgError> {
        let x = centered(&sample_points())?;
        let l = DMatrix::from_row_slice(3, 3, &[1.0, 2.0, 0.0, 0.0, 1.0, -1.0, 0.5, 0.0, 2.0]);
        let y = transform_points(&x, &l)?;

        // shuffle the destination and hand the estimator the matching indices
        let order = [4, 0, 6, 2, 5, 1, 3];
        let y_shuffled = y.select_columns(&order);
        let mut correspondence = vec![0; order.len()];
        for (dst_idx, &src_idx) in order.iter().enumerate() {
            correspondence[src_idx] = dst_idx;
        }

        let l_est = estimate_linear_map(&x, &y_shuffled, &correspondence)?;
        assert_matrix_eq(&l_est, &l, 1e-9);
        assert!(relative_error(&l, &l_est) < 1e-9);
        Ok(())
    }

    #[test]
    fn test_estimate_linear_map_errors() -> Result<(), LinalgError> {
        let x = centered(&sample_points())?;
        assert_eq!(
            estimate_linear_map(&x, &x, &[0, 1, 2]),
            Err(LinalgError::DimensionMismatch {
                expected: 7,
                actual: 3
            })
        );
        assert_eq!(
            estimate_linear_map(&x, &x, &[0, 1, 2, 3, 4, 5, 9]),
            Err(LinalgError::IndexOutOfBounds { index: 9, len: 7 })
        );
        Ok(())
    }
}
