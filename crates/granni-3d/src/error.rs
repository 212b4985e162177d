use thiserror::Error;

/// Errors raised by the geometry and linear algebra routines.
#[derive(Debug, Error, PartialEq)]
pub enum LinalgError {
    /// The point set has no points.
    #[error("point set is empty")]
    EmptyPointSet,

    /// A coordinate is NaN or infinite.
    #[error("point {col} has a non-finite coordinate on axis {row}")]
    NonFiniteCoordinate {
        /// Axis of the offending coordinate.
        row: usize,
        /// Index of the offending point.
        col: usize,
    },

    /// The ambient dimension is not supported by the operation.
    #[error("invalid dimension: {0}")]
    InvalidDimension(usize),

    /// Two inputs that must agree in size do not.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Size required by the operation.
        expected: usize,
        /// Size that was provided.
        actual: usize,
    },

    /// A projector cannot be embedded into a smaller matrix.
    #[error("cannot pad a {size}x{size} projector into a {target}x{target} matrix")]
    PaddingOverflow {
        /// Side of the projector.
        size: usize,
        /// Requested side after padding.
        target: usize,
    },

    /// The point spread does not determine a unique linear map.
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),

    /// The singular value decomposition did not produce the requested factors.
    #[error("SVD computation failed: {0}")]
    SvdFailed(String),

    /// A condition number below one was requested.
    #[error("condition number must be >= 1, got {0}")]
    InvalidConditionNumber(f64),

    /// A correspondence refers to a point that does not exist.
    #[error("index {index} out of bounds for a point set of {len} points")]
    IndexOutOfBounds {
        /// Offending index.
        index: usize,
        /// Number of points in the indexed set.
        len: usize,
    },
}
