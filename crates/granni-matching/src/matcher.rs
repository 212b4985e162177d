use nalgebra::DMatrix;

use granni_3d::{
    linalg::{centered, check_spread, estimate_linear_map, kernel_projector, pad_projector},
    pointcloud::PointCloud,
};

use crate::{
    engine::{aggregate, extract_correspondence, run_trials, TrialParams, TrialSummary},
    error::MatchError,
    pool::WorkerPool,
    qap::{FaqInit, FaqParams},
};

/// Parameters of the correspondence-free matcher.
#[derive(Debug, Clone)]
pub struct MatchParams {
    /// Number of randomized restarts. Trades runtime for robustness.
    pub num_trials: usize,
    /// Convergence tolerance of the quadratic assignment solver.
    pub tolerance: f64,
    /// Iteration cap of the quadratic assignment solver.
    pub max_iterations: usize,
    /// Base seed; trial `i` draws from a generator seeded with `seed + i`.
    pub seed: u64,
    /// Precision of the confidence weight `exp(−sharpness·(score − d)²)`.
    pub weight_sharpness: f64,
    /// Number of worker threads, `None` for the available parallelism.
    pub num_threads: Option<usize>,
    /// Recycle the workers after this many trials each, `None` to never recycle.
    pub max_trials_per_worker: Option<usize>,
    /// Consensus under which the aggregate is reported as degenerate.
    pub consensus_threshold: f64,
}

impl Default for MatchParams {
    fn default() -> Self {
        Self {
            num_trials: 1024,
            tolerance: 1e-3,
            max_iterations: 30,
            seed: 0,
            weight_sharpness: 1000.0,
            num_threads: None,
            max_trials_per_worker: None,
            consensus_threshold: 0.5,
        }
    }
}

impl MatchParams {
    fn validate(&self) -> Result<(), MatchError> {
        if self.num_trials == 0 {
            return Err(MatchError::InvalidParams("num_trials must be > 0".to_string()));
        }
        if self.max_iterations == 0 {
            return Err(MatchError::InvalidParams(
                "max_iterations must be > 0".to_string(),
            ));
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(MatchError::InvalidParams(format!(
                "tolerance must be finite and >= 0, got {}",
                self.tolerance
            )));
        }
        if !self.weight_sharpness.is_finite() || self.weight_sharpness < 0.0 {
            return Err(MatchError::InvalidParams(format!(
                "weight_sharpness must be finite and >= 0, got {}",
                self.weight_sharpness
            )));
        }
        if !(0.0..=1.0).contains(&self.consensus_threshold) {
            return Err(MatchError::InvalidParams(format!(
                "consensus_threshold must be in [0, 1], got {}",
                self.consensus_threshold
            )));
        }
        Ok(())
    }

    fn trial_params(&self) -> TrialParams {
        TrialParams {
            faq: FaqParams {
                max_iterations: self.max_iterations,
                tolerance: self.tolerance,
                init: FaqInit::Randomized,
            },
            weight_sharpness: self.weight_sharpness,
            seed: self.seed,
        }
    }
}

/// Result of the correspondence-free matcher.
#[derive(Debug, Clone)]
pub struct MatchResult {
    /// `correspondence[i]` is the index in the target set matched to source point `i`.
    pub correspondence: Vec<usize>,
    /// Recovered dxd linear map, target ≈ map · source after centering.
    pub linear_map: DMatrix<f64>,
    /// Weighted sum of the candidate permutations (mxm soft assignment).
    pub aggregate: DMatrix<f64>,
    /// Agreement of the weighted trials with the extracted assignment, in `[0, 1]`.
    pub consensus: f64,
    /// Whether the consensus fell under the configured threshold.
    pub degenerate: bool,
    /// Statistics over the trials.
    pub trials: TrialSummary,
}

/// Recover the correspondence and the linear map relating two point sets.
///
/// Both sets are centered internally; the inputs are not modified.
///
/// # Arguments
///
/// * `points_src` - The smaller set `X` as a dxn matrix, one point per column.
/// * `points_dst` - The larger set `Y` as a dxm matrix, `m >= n`.
/// * `params` - Matcher parameters.
///
/// # Returns
///
/// The correspondence from `X` into `Y` and the map `L` with `Y ≈ L·X`.
///
/// # Errors
///
/// Precondition violations are reported before any trial runs:
/// [`MatchError::InputCardinality`] when `n > m`, a non-finite coordinate error
/// for NaN or infinite input, degenerate geometry when a set has fewer points
/// than dimensions or a singular spread.
pub fn match_point_sets(
    points_src: &DMatrix<f64>,
    points_dst: &DMatrix<f64>,
    params: &MatchParams,
) -> Result<MatchResult, MatchError> {
    params.validate()?;

    let (dim, num_src) = points_src.shape();
    let (dim_dst, num_dst) = points_dst.shape();
    if dim != dim_dst {
        return Err(MatchError::DimensionMismatch {
            src: dim,
            dst: dim_dst,
        });
    }
    if num_src > num_dst {
        return Err(MatchError::InputCardinality {
            n: num_src,
            m: num_dst,
        });
    }

    let src = centered(points_src)?;
    let dst = centered(points_dst)?;
    check_spread(&src)?;
    check_spread(&dst)?;

    let px = pad_projector(&kernel_projector(&src)?, num_dst)?;
    let py = kernel_projector(&dst)?;

    let pool = WorkerPool::new(params.num_threads, params.max_trials_per_worker)?;
    log::info!(
        "matching {num_src} against {num_dst} points in {dim}D: {} trials on {} workers",
        params.num_trials,
        pool.num_threads()
    );

    let now = std::time::Instant::now();
    let outcomes = run_trials(
        &px,
        &py,
        dim,
        params.num_trials,
        &params.trial_params(),
        &pool,
    )?;
    let trials = TrialSummary::from_outcomes(&outcomes);
    log::debug!(
        "trials done in {:?}: {}/{} converged, total weight {:.4}, best score {:.6}",
        now.elapsed(),
        trials.num_converged,
        trials.num_trials,
        trials.total_weight,
        trials.best_score
    );

    let aggregate = aggregate(&outcomes, num_dst);
    let extraction = extract_correspondence(&aggregate, num_src)?;

    let degenerate = extraction.consensus < params.consensus_threshold;
    if degenerate {
        log::warn!(
            "weak consensus {:.3} (max weight {:.3e}): the sets may not be linearly related, \
             consider more trials",
            extraction.consensus,
            trials.max_weight
        );
    }

    let linear_map = estimate_linear_map(&src, &dst, &extraction.correspondence)?;

    Ok(MatchResult {
        correspondence: extraction.correspondence,
        linear_map,
        aggregate,
        consensus: extraction.consensus,
        degenerate,
        trials,
    })
}

/// [`match_point_sets`] on 3D point clouds.
pub fn match_point_clouds(
    source: &PointCloud,
    target: &PointCloud,
    params: &MatchParams,
) -> Result<MatchResult, MatchError> {
    match_point_sets(&source.to_matrix(), &target.to_matrix(), params)
}
