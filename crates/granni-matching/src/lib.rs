#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! # GraNNI matching
//!
//! Recovers an invertible linear map `L` between two point sets `X` (n points)
//! and `Y` (m ≥ n points) without known correspondences:
//!
//! 1. both sets are centered and turned into kernel-projection operators,
//!    which do not change under linear maps of the ambient space;
//! 2. many seeded quadratic-assignment trials search for the permutation
//!    aligning the two operators, each weighted by how close it gets to the
//!    exact alignment;
//! 3. the weighted permutations are summed and a linear assignment extracts
//!    the hard correspondence;
//! 4. `L` is fitted by least squares on the matched points.
//!
//! ```no_run
//! use granni_matching::{match_point_sets, MatchParams};
//! use nalgebra::DMatrix;
//!
//! # let x = DMatrix::<f64>::zeros(3, 200);
//! # let y = DMatrix::<f64>::zeros(3, 200);
//! let result = match_point_sets(&x, &y, &MatchParams::default())?;
//! println!("L = {}", result.linear_map);
//! println!("consensus = {:.3}", result.consensus);
//! # Ok::<(), granni_matching::MatchError>(())
//! ```

/// Randomized trials, weighting, aggregation and correspondence extraction.
pub mod engine;

mod error;
pub use error::{AssignmentError, MatchError, QapError};

/// Exact linear assignment.
pub mod linear_assignment;

mod matcher;
pub use matcher::{match_point_clouds, match_point_sets, MatchParams, MatchResult};

/// Worker pool running the trials.
pub mod pool;

/// Approximate quadratic assignment.
pub mod qap;
