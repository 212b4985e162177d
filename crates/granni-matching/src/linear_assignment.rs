//! Exact linear assignment by shortest augmenting paths with dual potentials.
//!
//! O(rows² · cols). Rows are assigned one at a time; every augmentation keeps the
//! reduced costs `c[i][j] - u[i] - v[j]` nonnegative, so the final matching is
//! optimal.

use nalgebra::DMatrix;

use crate::error::AssignmentError;

/// Solve the rectangular linear assignment problem.
///
/// Assigns every row to a distinct column, minimizing (or maximizing when
/// `maximize` is set) the sum of the selected entries.
///
/// # Arguments
///
/// * `cost` - A `rows x cols` matrix with `rows <= cols` and finite entries.
/// * `maximize` - Whether to maximize instead of minimize the total.
///
/// # Returns
///
/// `cols_of_rows` where row `i` is assigned to column `cols_of_rows[i]`.
///
/// Example:
///
/// ```
/// use granni_matching::linear_assignment::linear_sum_assignment;
/// use nalgebra::DMatrix;
///
/// let cost = DMatrix::from_row_slice(3, 3, &[4.0, 1.0, 3.0, 2.0, 0.0, 5.0, 3.0, 2.0, 2.0]);
/// let cols = linear_sum_assignment(&cost, false).unwrap();
/// assert_eq!(cols, vec![1, 0, 2]);
/// ```
pub fn linear_sum_assignment(
    cost: &DMatrix<f64>,
    maximize: bool,
) -> Result<Vec<usize>, AssignmentError> {
    let (rows, cols) = cost.shape();
    if rows > cols {
        return Err(AssignmentError::TooManyRows { rows, cols });
    }
    if let Some(((i, j), _)) = cost
        .iter()
        .enumerate()
        .map(|(k, v)| ((k % rows.max(1), k / rows.max(1)), v))
        .find(|(_, v)| !v.is_finite())
    {
        return Err(AssignmentError::NonFiniteCost { row: i, col: j });
    }
    if rows == 0 {
        return Ok(Vec::new());
    }

    let sign = if maximize { -1.0 } else { 1.0 };
    let c = |i: usize, j: usize| sign * cost[(i, j)];

    // 1-based bookkeeping: index 0 is the virtual column/row the augmenting
    // path starts from.
    let mut u = vec![0.0; rows + 1];
    let mut v = vec![0.0; cols + 1];
    let mut row_of_col = vec![0usize; cols + 1];
    let mut way = vec![0usize; cols + 1];

    for i in 1..=rows {
        row_of_col[0] = i;
        let mut j0 = 0usize;
        let mut minv = vec![f64::INFINITY; cols + 1];
        let mut used = vec![false; cols + 1];

        loop {
            used[j0] = true;
            let i0 = row_of_col[j0];
            let mut delta = f64::INFINITY;
            let mut j1 = 0usize;

            for j in 1..=cols {
                if used[j] {
                    continue;
                }
                let cur = c(i0 - 1, j - 1) - u[i0] - v[j];
                if cur < minv[j] {
                    minv[j] = cur;
                    way[j] = j0;
                }
                if minv[j] < delta {
                    delta = minv[j];
                    j1 = j;
                }
            }

            for j in 0..=cols {
                if used[j] {
                    u[row_of_col[j]] += delta;
                    v[j] -= delta;
                } else {
                    minv[j] -= delta;
                }
            }

            j0 = j1;
            if row_of_col[j0] == 0 {
                break;
            }
        }

        // flip the augmenting path
        loop {
            let j1 = way[j0];
            row_of_col[j0] = row_of_col[j1];
            j0 = j1;
            if j0 == 0 {
                break;
            }
        }
    }

    let mut cols_of_rows = vec![0usize; rows];
    for j in 1..=cols {
        if row_of_col[j] != 0 {
            cols_of_rows[row_of_col[j] - 1] = j - 1;
        }
    }

    Ok(cols_of_rows)
}

/// Sum of the entries selected by an assignment.
pub fn assignment_cost(cost: &DMatrix<f64>, cols_of_rows: &[usize]) -> f64 {
    cols_of_rows
        .iter()
        .enumerate()
        .map(|(i, &j)| cost[(i, j)])
        .sum()
}
