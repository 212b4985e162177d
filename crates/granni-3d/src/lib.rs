#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Covariance ellipsoid fitting.
pub mod ellipsoid;

mod error;
pub use error::LinalgError;

/// Linear algebra utilities on dxN coordinate matrices.
pub mod linalg;

/// Point cloud container.
pub mod pointcloud;

/// Synthetic transform generation for tests and demos.
pub mod synthetic;
