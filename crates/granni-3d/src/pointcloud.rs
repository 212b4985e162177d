use nalgebra::DMatrix;

use crate::error::LinalgError;

/// A 3D point cloud.
#[derive(Debug, Clone, PartialEq)]
pub struct PointCloud {
    // The points in the point cloud.
    points: Vec<[f64; 3]>,
}

impl PointCloud {
    /// Create a new point cloud from a list of points.
    pub fn new(points: Vec<[f64; 3]>) -> Self {
        Self { points }
    }

    /// Create a point cloud from a 3xN coordinate matrix, one point per column.
    pub fn from_matrix(coords: &DMatrix<f64>) -> Result<Self, LinalgError> {
        if coords.nrows() != 3 {
            return Err(LinalgError::DimensionMismatch {
                expected: 3,
                actual: coords.nrows(),
            });
        }
        let points = coords
            .column_iter()
            .map(|col| [col[0], col[1], col[2]])
            .collect();
        Ok(Self { points })
    }

    /// Get the number of points in the point cloud.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the point cloud is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Get as reference the points in the point cloud.
    pub fn points(&self) -> &[[f64; 3]] {
        &self.points
    }

    /// The 3xN coordinate matrix of the cloud, one point per column.
    pub fn to_matrix(&self) -> DMatrix<f64> {
        DMatrix::from_fn(3, self.points.len(), |i, j| self.points[j][i])
    }

    /// Mean of the points. Returns `None` for an empty cloud.
    pub fn barycenter(&self) -> Option<[f64; 3]> {
        if self.points.is_empty() {
            return None;
        }
        let inv_n = 1.0 / self.points.len() as f64;
        let sum = self.points.iter().fold([0.0; 3], |acc, p| {
            [acc[0] + p[0], acc[1] + p[1], acc[2] + p[2]]
        });
        Some([sum[0] * inv_n, sum[1] * inv_n, sum[2] * inv_n])
    }

    /// A copy of the cloud translated so that its barycenter is the origin.
    pub fn centered(&self) -> Self {
        let Some(c) = self.barycenter() else {
            return self.clone();
        };
        let points = self
            .points
            .iter()
            .map(|p| [p[0] - c[0], p[1] - c[1], p[2] - c[2]])
            .collect();
        Self { points }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_pointcloud() {
        let pointcloud = PointCloud::new(vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]]);

        assert_eq!(pointcloud.len(), 2);
        assert_eq!(pointcloud.points().len(), 2);

        if let Some(p1) = pointcloud.points().last() {
            assert_eq!(p1[0], 1.0);
            assert_eq!(p1[1], 0.0);
            assert_eq!(p1[2], 0.0);
        }
    }

    #[test]
    fn test_matrix_layout() -> Result<(), Box<dyn std::error::Error>> {
        let pointcloud = PointCloud::new(vec![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        let coords = pointcloud.to_matrix();
        assert_eq!(coords.shape(), (3, 2));
        assert_eq!(coords[(0, 1)], 4.0);
        assert_eq!(coords[(2, 0)], 3.0);

        let back = PointCloud::from_matrix(&coords)?;
        assert_eq!(back, pointcloud);
        Ok(())
    }

    #[test]
    fn test_from_matrix_wrong_rows() {
        let coords = DMatrix::<f64>::zeros(2, 4);
        assert_eq!(
            PointCloud::from_matrix(&coords),
            Err(LinalgError::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        );
    }

    #[test]
    fn test_centered_cloud() {
        let pointcloud = PointCloud::new(vec![[1.0, 2.0, 3.0], [3.0, 4.0, 5.0]]);
        assert_eq!(pointcloud.barycenter(), Some([2.0, 3.0, 4.0]));

        let centered = pointcloud.centered();
        let c = centered.barycenter().unwrap_or([f64::NAN; 3]);
        for v in c {
            assert_relative_eq!(v, 0.0, epsilon = 1e-12);
        }
        // the source cloud is left untouched
        assert_eq!(pointcloud.points()[0], [1.0, 2.0, 3.0]);
        assert!(PointCloud::new(vec![]).barycenter().is_none());
    }
}
