//! Sparse-sparse matrix products.
//!
//! Both products use a row-at-a-time sparse accumulator: a marker array
//! indexed by output column remembers where that column was placed in the
//! current output row, so each contribution is either a fresh push or an
//! in-place add. Work is proportional to the number of scalar multiplies,
//! not to the dense output size. Output columns appear in first-touch order;
//! the result is flagged unsorted.

use tracing::debug;

use crate::csc::CscMatrix;
use crate::csr::CsrMatrix;
use crate::error::{Result, SparseError};
use crate::traits::Matrix;

/// Accumulates one output row at a time into a growing CSR matrix.
struct RowAccumulator {
    out: CsrMatrix,
    marker: Vec<usize>,
    row_start: usize,
}

impl RowAccumulator {
    fn new(n_rows: usize, n_cols: usize, nnz_hint: usize) -> Self {
        Self {
            out: CsrMatrix::with_capacity(n_rows, n_cols, nnz_hint),
            marker: vec![usize::MAX; n_cols],
            row_start: 0,
        }
    }

    #[inline]
    fn add(&mut self, col: usize, val: f64) {
        let slot = self.marker[col];
        if slot != usize::MAX && slot >= self.row_start {
            self.out.values[slot] += val;
        } else {
            self.marker[col] = self.out.values.len();
            self.out.col_indices.push(col);
            self.out.values.push(val);
        }
    }

    fn finish_row(&mut self, row: usize) {
        self.row_start = self.out.values.len();
        self.out.row_ptr[row + 1] = self.row_start;
    }

    fn finish(mut self) -> CsrMatrix {
        self.out.sorted = false;
        self.out
    }
}

/// `A B` for CSR operands.
///
/// # Errors
///
/// Returns [`SparseError::InvalidInput`] when `a.n_cols != b.n_rows`.
pub fn spgemm(a: &CsrMatrix, b: &CsrMatrix) -> Result<CsrMatrix> {
    if a.n_cols != b.n_rows {
        return Err(SparseError::dims(format!(
            "spgemm: {}x{} times {}x{}",
            a.n_rows, a.n_cols, b.n_rows, b.n_cols
        )));
    }

    let mut acc = RowAccumulator::new(a.n_rows, b.n_cols, a.nnz() + b.nnz());
    for i in 0..a.n_rows {
        for (p, a_ip) in a.row_entries(i) {
            for (j, b_pj) in b.row_entries(p) {
                acc.add(j, a_ip * b_pj);
            }
        }
        acc.finish_row(i);
    }
    let c = acc.finish();

    debug!(
        rows = c.n_rows,
        cols = c.n_cols,
        nnz_a = a.nnz(),
        nnz_b = b.nnz(),
        nnz = c.nnz(),
        "spgemm complete"
    );
    Ok(c)
}

/// `A^T B` where `A` is stored column-wise: column `i` of `A` is row `i` of
/// `A^T`, so no transpose is formed.
///
/// # Errors
///
/// Returns [`SparseError::InvalidInput`] when `a.n_rows != b.n_rows`.
pub fn spgemm_t(a: &CscMatrix, b: &CsrMatrix) -> Result<CsrMatrix> {
    if a.n_rows != b.n_rows {
        return Err(SparseError::dims(format!(
            "spgemm_t: ({}x{})^T times {}x{}",
            a.n_rows, a.n_cols, b.n_rows, b.n_cols
        )));
    }

    let mut acc = RowAccumulator::new(a.n_cols, b.n_cols, a.nnz() + b.nnz());
    for i in 0..a.n_cols {
        for (p, a_pi) in a.col_entries(i) {
            for (j, b_pj) in b.row_entries(p) {
                acc.add(j, a_pi * b_pj);
            }
        }
        acc.finish_row(i);
    }
    let c = acc.finish();

    debug!(
        rows = c.n_rows,
        cols = c.n_cols,
        nnz_a = a.nnz(),
        nnz_b = b.nnz(),
        nnz = c.nnz(),
        "spgemm_t complete"
    );
    Ok(c)
}

/// Galerkin product `P^T A P`.
///
/// `A P` is formed first, then `P^T (A P)` through [`spgemm_t`] with `P`
/// still in column storage.
pub fn rap(a: &CsrMatrix, p: &CscMatrix) -> Result<CsrMatrix> {
    let ap = spgemm(a, &p.to_csr())?;
    spgemm_t(p, &ap)
}
