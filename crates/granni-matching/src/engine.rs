use nalgebra::DMatrix;
use rand::{rngs::StdRng, SeedableRng};

use crate::{
    error::{AssignmentError, MatchError, QapError},
    linear_assignment::{assignment_cost, linear_sum_assignment},
    pool::WorkerPool,
    qap::{solve_faq, FaqParams},
};

/// Parameters shared by every randomized trial.
#[derive(Debug, Clone)]
pub struct TrialParams {
    /// Settings of the quadratic assignment solver.
    pub faq: FaqParams,
    /// Precision of the confidence weight, see [`confidence_weight`].
    pub weight_sharpness: f64,
    /// Base seed; trial `i` is seeded with [`trial_seed`]`(seed, i)`.
    pub seed: u64,
}

impl Default for TrialParams {
    fn default() -> Self {
        Self {
            faq: FaqParams::default(),
            weight_sharpness: 1000.0,
            seed: 0,
        }
    }
}

/// Outcome of one randomized trial.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialOutcome {
    /// Index of the trial.
    pub trial: usize,
    /// Candidate permutation, `permutation[i] = j` for `S[i][j] = 1`.
    pub permutation: Vec<usize>,
    /// Objective `tr(Px·S·Py·Sᵗ)` of the candidate.
    pub score: f64,
    /// Confidence weight of the candidate.
    pub weight: f64,
    /// Iterations used by the solver.
    pub num_iterations: usize,
    /// Whether the solver met its tolerance.
    pub converged: bool,
}

/// Aggregate statistics over a batch of trials.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialSummary {
    /// Number of trials run.
    pub num_trials: usize,
    /// Number of trials whose solver met the tolerance.
    pub num_converged: usize,
    /// Sum of the confidence weights.
    pub total_weight: f64,
    /// Largest confidence weight.
    pub max_weight: f64,
    /// Largest objective reached.
    pub best_score: f64,
}

impl TrialSummary {
    /// Summarize a batch of outcomes.
    pub fn from_outcomes(outcomes: &[TrialOutcome]) -> Self {
        outcomes.iter().fold(
            Self {
                num_trials: 0,
                num_converged: 0,
                total_weight: 0.0,
                max_weight: 0.0,
                best_score: f64::NEG_INFINITY,
            },
            |acc, o| Self {
                num_trials: acc.num_trials + 1,
                num_converged: acc.num_converged + o.converged as usize,
                total_weight: acc.total_weight + o.weight,
                max_weight: acc.max_weight.max(o.weight),
                best_score: acc.best_score.max(o.score),
            },
        )
    }
}

/// Result of the hard correspondence extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    /// Full assignment of the `m` padded source indices to target indices.
    pub assignment: Vec<usize>,
    /// Target index of each of the first `n` (real) source points.
    pub correspondence: Vec<usize>,
    /// Assigned mass over `m · Σw`, in `[0, 1]`; `0` when every weight vanished.
    pub consensus: f64,
}

/// Seed of the random generator of trial `trial`.
#[inline]
pub fn trial_seed(seed: u64, trial: usize) -> u64 {
    seed.wrapping_add(trial as u64)
}

/// Confidence weight `exp(−sharpness·(score − dim)²)`.
///
/// The objective of two rank-`dim` projectors peaks at `dim`, reached only by an
/// exact structural alignment, which therefore gets weight 1.
pub fn confidence_weight(score: f64, dim: usize, sharpness: f64) -> f64 {
    let delta = score - dim as f64;
    (-sharpness * delta * delta).exp()
}

/// Run a single randomized trial on the padded projectors.
///
/// # Arguments
///
/// * `px` - Padded mxm projector of the source set.
/// * `py` - mxm projector of the target set.
/// * `dim` - Ambient dimension, the peak of the objective.
/// * `trial` - Index of the trial, used for seeding.
/// * `params` - Shared trial parameters.
pub fn run_trial(
    px: &DMatrix<f64>,
    py: &DMatrix<f64>,
    dim: usize,
    trial: usize,
    params: &TrialParams,
) -> Result<TrialOutcome, QapError> {
    let mut rng = StdRng::seed_from_u64(trial_seed(params.seed, trial));
    let solution = solve_faq(px, py, &params.faq, &mut rng)?;

    if !solution.converged {
        log::debug!(
            "trial {trial} did not converge in {} iterations (score {:.6})",
            solution.num_iterations,
            solution.score
        );
    }

    Ok(TrialOutcome {
        trial,
        weight: confidence_weight(solution.score, dim, params.weight_sharpness),
        permutation: solution.permutation,
        score: solution.score,
        num_iterations: solution.num_iterations,
        converged: solution.converged,
    })
}

/// Run `num_trials` independent trials on the worker pool.
///
/// The outcomes are returned in trial order.
pub fn run_trials(
    px: &DMatrix<f64>,
    py: &DMatrix<f64>,
    dim: usize,
    num_trials: usize,
    params: &TrialParams,
    pool: &WorkerPool,
) -> Result<Vec<TrialOutcome>, MatchError> {
    let outcomes = pool.map(num_trials, |trial| run_trial(px, py, dim, trial, params))?;
    outcomes
        .into_iter()
        .collect::<Result<Vec<_>, _>>()
        .map_err(MatchError::from)
}

/// Weighted sum of the candidate permutation matrices, `Σ w_i·S_i`.
///
/// Summed in the order of `outcomes`, so equal inputs give bit-identical output.
pub fn aggregate(outcomes: &[TrialOutcome], size: usize) -> DMatrix<f64> {
    let mut mat = DMatrix::zeros(size, size);
    for outcome in outcomes {
        for (i, &j) in outcome.permutation.iter().enumerate() {
            mat[(i, j)] += outcome.weight;
        }
    }
    mat
}

/// Extract a hard correspondence from the aggregated matrix.
///
/// Solves the maximum-weight linear assignment on the mxm aggregate; the first
/// `num_src` rows are the real source points.
pub fn extract_correspondence(
    aggregate: &DMatrix<f64>,
    num_src: usize,
) -> Result<Extraction, AssignmentError> {
    let size = aggregate.nrows();
    if num_src > size {
        return Err(AssignmentError::TooManyRows {
            rows: num_src,
            cols: size,
        });
    }
    let assignment = linear_sum_assignment(aggregate, true)?;

    let total_weight = aggregate.sum() / size.max(1) as f64;
    let consensus = if total_weight > 0.0 {
        (assignment_cost(aggregate, &assignment) / (size as f64 * total_weight)).clamp(0.0, 1.0)
    } else {
        0.0
    };

    Ok(Extraction {
        correspondence: assignment[..num_src].to_vec(),
        assignment,
        consensus,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn outcome(trial: usize, permutation: Vec<usize>, weight: f64) -> TrialOutcome {
        TrialOutcome {
            trial,
            permutation,
            score: 0.0,
            weight,
            num_iterations: 1,
            converged: true,
        }
    }

    #[test]
    fn test_confidence_weight() {
        assert_relative_eq!(confidence_weight(3.0, 3, 1000.0), 1.0);
        for delta in [1e-3, 1e-2, 0.05, 0.1, 1.0] {
            let score = 3.0 - delta;
            // the distance actually represented after rounding
            let d = score - 3.0;
            let w = confidence_weight(score, 3, 1000.0);
            assert_relative_eq!(w, (-1000.0 * d * d).exp(), max_relative = 1e-12);
            assert_relative_eq!(w, (-1000.0 * delta * delta).exp(), max_relative = 1e-9);
            assert!(w < 1.0);
        }
        // sharply peaked: a tenth off is already negligible
        assert!(confidence_weight(2.9, 3, 1000.0) < 1e-4);
    }

    #[test]
    fn test_trial_seed_distinct() {
        let seeds = (0..64).map(|i| trial_seed(7, i)).collect::<Vec<_>>();
        let mut unique = seeds.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), seeds.len());
        assert_eq!(trial_seed(u64::MAX, 1), 0);
    }

    #[test]
    fn test_aggregate() {
        let outcomes = vec![
            outcome(0, vec![0, 1, 2], 1.0),
            outcome(1, vec![1, 0, 2], 0.5),
            outcome(2, vec![0, 1, 2], 0.25),
        ];
        let mat = aggregate(&outcomes, 3);
        assert_relative_eq!(mat[(0, 0)], 1.25);
        assert_relative_eq!(mat[(0, 1)], 0.5);
        assert_relative_eq!(mat[(2, 2)], 1.75);
        assert_relative_eq!(mat[(2, 0)], 0.0);
        // every row carries the total weight
        for row in mat.row_iter() {
            assert_relative_eq!(row.sum(), 1.75);
        }
    }

    #[test]
    fn test_extract_correspondence() -> Result<(), AssignmentError> {
        let outcomes = vec![
            outcome(0, vec![2, 0, 1, 3], 1.0),
            outcome(1, vec![2, 0, 1, 3], 1.0),
            outcome(2, vec![0, 1, 2, 3], 0.1),
        ];
        let mat = aggregate(&outcomes, 4);
        let extraction = extract_correspondence(&mat, 2)?;
        assert_eq!(extraction.assignment, vec![2, 0, 1, 3]);
        assert_eq!(extraction.correspondence, vec![2, 0]);
        assert!(extraction.consensus > 0.9);
        Ok(())
    }

    #[test]
    fn test_extract_all_zero() -> Result<(), AssignmentError> {
        let extraction = extract_correspondence(&DMatrix::zeros(5, 5), 3)?;
        let mut sorted = extraction.assignment.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![0, 1, 2, 3, 4]);
        assert_eq!(extraction.correspondence.len(), 3);
        assert_eq!(extraction.consensus, 0.0);
        Ok(())
    }

    #[test]
    fn test_extract_uniform_has_low_consensus() -> Result<(), AssignmentError> {
        let mat = DMatrix::from_element(6, 6, 1.0);
        let extraction = extract_correspondence(&mat, 6)?;
        assert_relative_eq!(extraction.consensus, 1.0 / 6.0, epsilon = 1e-12);
        Ok(())
    }

    #[test]
    fn test_run_trial_identical_projectors() -> Result<(), QapError> {
        // projector onto span{(1,1,1,1)/2, (1,-1,1,-1)/2}
        let ker = DMatrix::from_row_slice(2, 4, &[0.5, 0.5, 0.5, 0.5, 0.5, -0.5, 0.5, -0.5]);
        let p = ker.tr_mul(&ker);
        let params = TrialParams::default();
        let out = run_trial(&p, &p, 2, 3, &params)?;
        assert_eq!(out.trial, 3);
        assert!(out.score <= 2.0 + 1e-9);
        assert!(out.weight <= 1.0);
        assert_relative_eq!(
            out.weight,
            confidence_weight(out.score, 2, 1000.0),
            epsilon = 1e-15
        );

        // same trial index, same result
        assert_eq!(run_trial(&p, &p, 2, 3, &params)?, out);
        Ok(())
    }

    #[test]
    fn test_summary() {
        let mut outcomes = vec![outcome(0, vec![0], 0.5), outcome(1, vec![0], 0.25)];
        outcomes[1].converged = false;
        outcomes[1].score = 2.5;
        let summary = TrialSummary::from_outcomes(&outcomes);
        assert_eq!(summary.num_trials, 2);
        assert_eq!(summary.num_converged, 1);
        assert_relative_eq!(summary.total_weight, 0.75);
        assert_relative_eq!(summary.max_weight, 0.5);
        assert_relative_eq!(summary.best_score, 2.5);
    }
}
