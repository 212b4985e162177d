//! Fast Approximate Quadratic assignment (FAQ).
//!
//! Frank–Wolfe ascent of the relaxed objective `f(P) = tr(Aᵗ·P·B·Pᵗ)` over the
//! doubly stochastic matrices, followed by a projection of the final iterate onto
//! the permutation matrices. Reference: Vogelstein et al., "Fast Approximate
//! Quadratic Programming for Graph Matching", PLOS ONE 2015.

use nalgebra::DMatrix;
use rand::Rng;

use crate::{error::QapError, linear_assignment::linear_sum_assignment};

/// Starting point of the relaxed iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FaqInit {
    /// The barycenter of the Birkhoff polytope, every entry `1/n`.
    Barycenter,
    /// Midpoint between the barycenter and a random doubly stochastic matrix.
    #[default]
    Randomized,
}

/// Parameters of the FAQ solver.
#[derive(Debug, Clone)]
pub struct FaqParams {
    /// Maximum number of Frank–Wolfe iterations.
    pub max_iterations: usize,
    /// Stop when `‖P_k − P_{k+1}‖_F / √n` falls below this value.
    pub tolerance: f64,
    /// Initialization of the relaxed iterate.
    pub init: FaqInit,
}

impl Default for FaqParams {
    fn default() -> Self {
        Self {
            max_iterations: 30,
            tolerance: 1e-3,
            init: FaqInit::Randomized,
        }
    }
}

/// Result of one FAQ run.
#[derive(Debug, Clone)]
pub struct QapSolution {
    /// `permutation[i] = j` means `S[i][j] = 1`.
    pub permutation: Vec<usize>,
    /// Objective `tr(Aᵗ·S·B·Sᵗ)` of the returned permutation.
    pub score: f64,
    /// Number of Frank–Wolfe iterations performed.
    pub num_iterations: usize,
    /// Whether the relaxed iterate met the tolerance.
    pub converged: bool,
}

/// Objective `tr(Aᵗ·S·B·Sᵗ) = Σ_ij A[i][j]·B[π(i)][π(j)]` of a permutation.
pub fn qap_score(a: &DMatrix<f64>, b: &DMatrix<f64>, permutation: &[usize]) -> f64 {
    let n = permutation.len();
    let mut score = 0.0;
    for j in 0..n {
        let pj = permutation[j];
        for i in 0..n {
            score += a[(i, j)] * b[(permutation[i], pj)];
        }
    }
    score
}

/// Balance a positive matrix into a doubly stochastic one by alternating row and
/// column normalization (Sinkhorn–Knopp).
pub fn doubly_stochastic(
    mat: &DMatrix<f64>,
    tolerance: f64,
    max_iterations: usize,
) -> DMatrix<f64> {
    let mut p = mat.clone();
    for _ in 0..max_iterations {
        let row_sums = p.column_sum();
        let col_sums = p.row_sum();
        let balanced = row_sums
            .iter()
            .chain(col_sums.iter())
            .all(|s| (s - 1.0).abs() < tolerance);
        if balanced {
            break;
        }
        for (i, mut row) in p.row_iter_mut().enumerate() {
            row /= row_sums[i];
        }
        let col_sums = p.row_sum();
        for (j, mut col) in p.column_iter_mut().enumerate() {
            col /= col_sums[j];
        }
    }
    p
}

fn initial_iterate<R: Rng + ?Sized>(n: usize, init: FaqInit, rng: &mut R) -> DMatrix<f64> {
    let barycenter = DMatrix::from_element(n, n, 1.0 / n as f64);
    match init {
        FaqInit::Barycenter => barycenter,
        FaqInit::Randomized => {
            let uniform = DMatrix::from_fn(n, n, |_, _| rng.random::<f64>());
            let k = doubly_stochastic(&uniform, 1e-3, 1000);
            (barycenter + k) * 0.5
        }
    }
}

fn permutation_matrix(permutation: &[usize]) -> DMatrix<f64> {
    let n = permutation.len();
    let mut q = DMatrix::zeros(n, n);
    for (i, &j) in permutation.iter().enumerate() {
        q[(i, j)] = 1.0;
    }
    q
}

/// Approximately maximize `tr(Aᵗ·S·B·Sᵗ)` over permutation matrices `S`.
///
/// # Arguments
///
/// * `a` - An nxn matrix.
/// * `b` - An nxn matrix.
/// * `params` - Iteration limits and initialization.
/// * `rng` - Source of randomness for [`FaqInit::Randomized`].
///
/// # Returns
///
/// The projected permutation with its score. Running out of iterations is not
/// an error: the projection of the last iterate is returned with
/// `converged = false`.
pub fn solve_faq<R: Rng + ?Sized>(
    a: &DMatrix<f64>,
    b: &DMatrix<f64>,
    params: &FaqParams,
    rng: &mut R,
) -> Result<QapSolution, QapError> {
    let n = a.nrows();
    if n == 0 {
        return Err(QapError::Empty);
    }
    if !a.is_square() || b.shape() != a.shape() {
        return Err(QapError::DimensionMismatch {
            a: a.shape(),
            b: b.shape(),
        });
    }

    let a_t = a.transpose();
    let b_t = b.transpose();
    let sqrt_n = (n as f64).sqrt();

    let mut p = initial_iterate(n, params.init, rng);
    let mut converged = false;
    let mut num_iterations = 0;

    while num_iterations < params.max_iterations {
        num_iterations += 1;

        // ∇f(P) = A·P·Bᵗ + Aᵗ·P·B
        let grad = a * &p * &b_t + &a_t * &p * b;

        // Frank–Wolfe direction: the vertex maximizing <∇f, Q>
        let cols = linear_sum_assignment(&grad, true)?;
        let q = permutation_matrix(&cols);

        // f(Q + αR) = f(Q) + α·lin + α²·quad with R = P − Q
        let r = &p - &q;
        let rb = &r * b;
        let quad = a.dot(&(&rb * r.transpose()));
        let qb = DMatrix::from_fn(n, n, |i, j| b[(cols[i], j)]);
        let lin = a.dot(&DMatrix::from_fn(n, n, |i, j| rb[(i, cols[j])]))
            + a.dot(&(qb * r.transpose()));

        let alpha = if quad < 0.0 && (0.0..=1.0).contains(&(-lin / (2.0 * quad))) {
            -lin / (2.0 * quad)
        } else if quad + lin > 0.0 {
            1.0
        } else {
            0.0
        };

        let p_next = &q + &r * alpha;
        let step = (&p - &p_next).norm() / sqrt_n;
        p = p_next;

        log::trace!("faq iteration {num_iterations}: alpha {alpha:.4}, step {step:.3e}");

        if step < params.tolerance {
            converged = true;
            break;
        }
    }

    let permutation = linear_sum_assignment(&p, true)?;
    let score = qap_score(a, b, &permutation);

    Ok(QapSolution {
        permutation,
        score,
        num_iterations,
        converged,
    })
}
