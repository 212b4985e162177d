//! Correspondence-free recovery of linear maps between point clouds.
//!
//! Re-exports the geometry crate as [`k3d`] and the matcher as [`matching`].

#[doc(inline)]
pub use granni_3d as k3d;

#[doc(inline)]
pub use granni_matching as matching;

pub use granni_matching::{
    match_point_clouds, match_point_sets, MatchError, MatchParams, MatchResult,
};
