//! Point relaxation sweeps on CSR matrices.
//!
//! Each call performs one sweep over the rows in ascending order. Rows whose
//! diagonal is missing or zero cannot be relaxed; they keep their current
//! value and are counted in a single `warn!` per sweep.

use tracing::warn;

use crate::csr::CsrMatrix;
use crate::error::{Result, SparseError};
use crate::validation::{check_len, check_range};

fn check_system(a: &CsrMatrix, x: &[f64], b: &[f64]) -> Result<()> {
    if a.n_rows != a.n_cols {
        return Err(SparseError::dims(format!(
            "relaxation requires a square matrix, got {}x{}",
            a.n_rows, a.n_cols
        )));
    }
    check_len("x", x.len(), a.n_rows)?;
    check_len("b", b.len(), a.n_rows)?;
    Ok(())
}

/// Diagonal and `sum_{j != i} a_ij * v_j` for row `i`. Duplicate diagonal
/// entries are summed.
#[inline]
fn split_row(a: &CsrMatrix, i: usize, v: &[f64]) -> (f64, f64) {
    let mut diag = 0.0f64;
    let mut off = 0.0f64;
    for (j, aij) in a.row_entries(i) {
        if j == i {
            diag += aij;
        } else {
            off += aij * v[j];
        }
    }
    (diag, off)
}

/// One weighted-Jacobi sweep.
///
/// `tmp` receives a snapshot of `x`, then
/// `x_i = omega * (b_i - sum_{j != i} a_ij tmp_j) / a_ii + (1 - omega) * tmp_i`.
///
/// # Errors
///
/// Non-square `a`, length mismatches, or `omega` outside `[0, 2]`.
pub fn jacobi(a: &CsrMatrix, x: &mut [f64], b: &[f64], tmp: &mut [f64], omega: f64) -> Result<()> {
    check_system(a, x, b)?;
    check_len("tmp", tmp.len(), a.n_rows)?;
    check_range("omega", omega, 0.0, 2.0)?;

    tmp.copy_from_slice(x);
    let mut skipped = 0usize;
    for i in 0..a.n_rows {
        let (diag, off) = split_row(a, i, tmp);
        if diag == 0.0 {
            skipped += 1;
            continue;
        }
        x[i] = omega * (b[i] - off) / diag + (1.0 - omega) * tmp[i];
    }
    if skipped > 0 {
        warn!(skipped, rows = a.n_rows, "jacobi skipped rows with zero diagonal");
    }
    Ok(())
}

/// One forward Gauss-Seidel sweep, using updated values as soon as they
/// are available.
pub fn gauss_seidel(a: &CsrMatrix, x: &mut [f64], b: &[f64]) -> Result<()> {
    check_system(a, x, b)?;

    let mut skipped = 0usize;
    for i in 0..a.n_rows {
        let (diag, off) = split_row(a, i, x);
        if diag == 0.0 {
            skipped += 1;
            continue;
        }
        x[i] = (b[i] - off) / diag;
    }
    if skipped > 0 {
        warn!(skipped, rows = a.n_rows, "gauss-seidel skipped rows with zero diagonal");
    }
    Ok(())
}

/// One forward successive over-relaxation sweep:
/// `x_i = omega * (b_i - sum_{j != i} a_ij x_j) / a_ii + (1 - omega) * x_i`.
///
/// # Errors
///
/// Non-square `a`, length mismatches, or `omega` outside `[0, 2]`.
pub fn sor(a: &CsrMatrix, x: &mut [f64], b: &[f64], omega: f64) -> Result<()> {
    check_system(a, x, b)?;
    check_range("omega", omega, 0.0, 2.0)?;

    let mut skipped = 0usize;
    for i in 0..a.n_rows {
        let (diag, off) = split_row(a, i, x);
        if diag == 0.0 {
            skipped += 1;
            continue;
        }
        x[i] = omega * (b[i] - off) / diag + (1.0 - omega) * x[i];
    }
    if skipped > 0 {
        warn!(skipped, rows = a.n_rows, "sor skipped rows with zero diagonal");
    }
    Ok(())
}
