use granni_3d::LinalgError;
use thiserror::Error;

/// Errors of the linear assignment solver.
#[derive(Debug, Error, PartialEq)]
pub enum AssignmentError {
    /// A cost entry is NaN or infinite.
    #[error("cost matrix has a non-finite entry at ({row}, {col})")]
    NonFiniteCost {
        /// Row of the offending entry.
        row: usize,
        /// Column of the offending entry.
        col: usize,
    },

    /// There are more rows than columns, so not every row can be assigned.
    #[error("cannot assign {rows} rows to {cols} columns")]
    TooManyRows {
        /// Number of rows.
        rows: usize,
        /// Number of columns.
        cols: usize,
    },
}

/// Errors of the quadratic assignment solver.
#[derive(Debug, Error, PartialEq)]
pub enum QapError {
    /// The problem has no vertices.
    #[error("quadratic assignment problem is empty")]
    Empty,

    /// The two matrices are not square or do not have the same size.
    #[error("matrices must be square and of equal size, got {a:?} and {b:?}")]
    DimensionMismatch {
        /// Shape of the first matrix.
        a: (usize, usize),
        /// Shape of the second matrix.
        b: (usize, usize),
    },

    /// An inner linear assignment failed.
    #[error(transparent)]
    Assignment(#[from] AssignmentError),
}

/// Errors of the matching pipeline.
///
/// All of them are detected before any trial is dispatched, except the thread
/// pool and solver failures.
#[derive(Debug, Error)]
pub enum MatchError {
    /// The smaller sample must be passed first.
    #[error("source has {n} points but target only {m}: |X| must not exceed |Y|")]
    InputCardinality {
        /// Number of source points.
        n: usize,
        /// Number of target points.
        m: usize,
    },

    /// The two point sets live in spaces of different dimension.
    #[error("source points are {src}-dimensional but target points are {dst}-dimensional")]
    DimensionMismatch {
        /// Dimension of the source points.
        src: usize,
        /// Dimension of the target points.
        dst: usize,
    },

    /// A parameter is out of its valid range.
    #[error("invalid parameter: {0}")]
    InvalidParams(String),

    /// Degenerate geometry or another linear algebra failure.
    #[error(transparent)]
    Linalg(#[from] LinalgError),

    /// The worker pool could not be created.
    #[error("failed to build thread pool: {0}")]
    ThreadPool(String),

    /// The correspondence extraction failed.
    #[error(transparent)]
    Assignment(#[from] AssignmentError),

    /// A trial's optimizer failed on malformed input.
    #[error(transparent)]
    Qap(#[from] QapError),
}

impl MatchError {
    /// Whether the error reports degenerate input geometry.
    pub fn is_degenerate_geometry(&self) -> bool {
        matches!(self, Self::Linalg(LinalgError::DegenerateGeometry(_)))
    }
}
