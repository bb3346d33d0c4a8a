//! Greedy aggregation and tentative prolongation.
//!
//! [`aggregate`] partitions the rows of a strength graph into disjoint
//! aggregates and returns the aggregation operator. [`fit_candidates`] then
//! orthonormalises near-null-space candidates over each aggregate to build
//! the tentative prolongator `Q` and the coarse candidates `R`.

use tracing::{debug, warn};

use crate::csr::CsrMatrix;
use crate::error::{Result, SparseError};
use crate::traits::Matrix;
use crate::validation::{check_len, check_range};

const UNASSIGNED: usize = usize::MAX;

/// Greedy aggregation of a strength graph.
///
/// Off-diagonal stored entries of row `i` are its strong neighbours. Rows are
/// visited in ascending order; a row not yet aggregated seeds a new aggregate
/// and pulls in every strong neighbour that is still unaggregated. Rows with
/// no free neighbours become singletons, so every row lands in exactly one
/// aggregate.
///
/// Returns the `n_rows x n_aggregates` operator with a single `1.0` per row.
///
/// # Errors
///
/// Returns [`SparseError::InvalidInput`] for a non-square graph.
pub fn aggregate(s: &CsrMatrix) -> Result<CsrMatrix> {
    if s.n_rows != s.n_cols {
        return Err(SparseError::dims(format!(
            "aggregation requires a square strength matrix, got {}x{}",
            s.n_rows, s.n_cols
        )));
    }
    let n = s.n_rows;

    let mut agg = vec![UNASSIGNED; n];
    let mut n_aggs = 0usize;
    let mut singletons = 0usize;
    for i in 0..n {
        if agg[i] != UNASSIGNED {
            continue;
        }
        agg[i] = n_aggs;
        let mut size = 1;
        for (j, _) in s.row_entries(i) {
            if agg[j] == UNASSIGNED {
                agg[j] = n_aggs;
                size += 1;
            }
        }
        if size == 1 {
            singletons += 1;
        }
        n_aggs += 1;
    }

    debug!(
        rows = n,
        aggregates = n_aggs,
        singletons,
        "aggregation complete"
    );

    Ok(CsrMatrix {
        n_rows: n,
        n_cols: n_aggs,
        row_ptr: (0..=n).collect(),
        col_indices: agg,
        values: vec![1.0; n],
        sorted: true,
        diag_first: false,
    })
}

/// Tentative prolongator and coarse candidates produced by [`fit_candidates`].
#[derive(Debug, Clone, PartialEq)]
pub struct FitCandidates {
    /// `n_rows x (n_aggregates * num_candidates)` prolongator whose columns
    /// are orthonormal within each aggregate.
    pub q: CsrMatrix,
    /// Upper-triangular `num_candidates x num_candidates` factor per
    /// aggregate, row-major, concatenated in aggregate order.
    pub r: Vec<f64>,
}

/// Fit `num_candidates` near-null-space vectors to an aggregation operator.
///
/// `candidates` is `n_rows x num_candidates` row-major. For each aggregate
/// the candidate values on its rows are factored `B_agg = Q_agg R_agg` by
/// modified Gram-Schmidt. A column whose norm after orthogonalisation is
/// below `tol` is zeroed in `Q` (and its `R` diagonal set to zero).
///
/// # Errors
///
/// Shape mismatches, a row of `aggop` with more than one entry, or a
/// negative `tol`.
pub fn fit_candidates(
    aggop: &CsrMatrix,
    candidates: &[f64],
    num_candidates: usize,
    tol: f64,
) -> Result<FitCandidates> {
    let (n, n_aggs, k) = (aggop.n_rows, aggop.n_cols, num_candidates);
    check_len("candidates", candidates.len(), n * k)?;
    check_range("tol", tol, 0.0, f64::MAX)?;

    let mut members: Vec<Vec<usize>> = vec![Vec::new(); n_aggs];
    for row in 0..n {
        match aggop.row_degree(row) {
            0 => {}
            1 => members[aggop.col_indices[aggop.row_ptr[row]]].push(row),
            d => {
                return Err(SparseError::dims(format!(
                    "aggregation operator row {row} has {d} entries (expected at most 1)"
                )))
            }
        }
    }

    // Q is stored densely per row: k consecutive columns a*k..(a+1)*k.
    let mut q_vals = vec![0.0f64; n * k];
    let mut r = vec![0.0f64; n_aggs * k * k];
    let mut dropped = 0usize;

    for (a, rows) in members.iter().enumerate() {
        let r_agg = &mut r[a * k * k..(a + 1) * k * k];
        for c in 0..k {
            for &row in rows {
                q_vals[row * k + c] = candidates[row * k + c];
            }
            for prev in 0..c {
                let proj: f64 = rows
                    .iter()
                    .map(|&row| q_vals[row * k + prev] * q_vals[row * k + c])
                    .sum();
                r_agg[prev * k + c] = proj;
                for &row in rows {
                    q_vals[row * k + c] -= proj * q_vals[row * k + prev];
                }
            }
            let norm = rows
                .iter()
                .map(|&row| q_vals[row * k + c] * q_vals[row * k + c])
                .sum::<f64>()
                .sqrt();
            if norm < tol || norm == 0.0 {
                dropped += 1;
                for &row in rows {
                    q_vals[row * k + c] = 0.0;
                }
                r_agg[c * k + c] = 0.0;
            } else {
                for &row in rows {
                    q_vals[row * k + c] /= norm;
                }
                r_agg[c * k + c] = norm;
            }
        }
    }

    if dropped > 0 {
        warn!(
            dropped,
            aggregates = n_aggs,
            "fit_candidates zeroed dependent candidate columns"
        );
    }

    let mut q = CsrMatrix::with_capacity(n, n_aggs * k, n * k);
    for row in 0..n {
        if let Some((a, _)) = aggop.row_entries(row).next() {
            for c in 0..k {
                q.col_indices.push(a * k + c);
                q.values.push(q_vals[row * k + c]);
            }
        }
        q.row_ptr[row + 1] = q.values.len();
    }

    debug!(
        rows = n,
        aggregates = n_aggs,
        candidates = k,
        nnz = q.nnz(),
        "fit_candidates complete"
    );
    Ok(FitCandidates { q, r })
}
