//! Structural validation for raw sparse inputs.
//!
//! All validation functions run eagerly before any computation begins, so
//! callers get clear diagnostics instead of out-of-bounds panics deep inside a
//! kernel. Every function returns [`ValidationError`] on failure, which
//! converts into [`SparseError::InvalidInput`](crate::error::SparseError) via
//! `From`.

use crate::error::ValidationError;

// ---------------------------------------------------------------------------
// Compressed (CSR / CSC / BSR) arrays
// ---------------------------------------------------------------------------

/// Validate a compressed pointer/index/value triple.
///
/// `n_outer` is the number of compressed slices (rows for CSR, columns for
/// CSC, block rows for BSR) and `n_inner` bounds the stored indices.
/// `vals_per_entry` is 1 for scalar formats and the block size for BSR.
///
/// Checks, in order:
///
/// 1. `ptr.len() == n_outer + 1`.
/// 2. `ptr[0] == 0` and `ptr` is monotonically non-decreasing.
/// 3. `ptr[n_outer] == idx.len()`.
/// 4. `vals.len() == idx.len() * vals_per_entry`.
/// 5. Every index is `< n_inner`.
/// 6. Every value is finite.
///
/// Returns `true` when indices are ascending within every slice, which the
/// caller uses to initialise its `sorted` flag.
///
/// # Errors
///
/// Returns [`ValidationError`] describing the first violation found.
pub fn validate_compressed(
    ptr: &[usize],
    idx: &[usize],
    vals: &[f64],
    n_outer: usize,
    n_inner: usize,
    vals_per_entry: usize,
) -> Result<bool, ValidationError> {
    if ptr.len() != n_outer + 1 {
        return Err(ValidationError::DimensionMismatch(format!(
            "pointer length {} does not equal {} + 1",
            ptr.len(),
            n_outer,
        )));
    }
    if ptr[0] != 0 {
        return Err(ValidationError::DimensionMismatch(format!(
            "pointer[0] = {} (expected 0)",
            ptr[0],
        )));
    }
    for i in 1..ptr.len() {
        if ptr[i] < ptr[i - 1] {
            return Err(ValidationError::NonMonotonicPointer { position: i });
        }
    }
    if ptr[n_outer] != idx.len() {
        return Err(ValidationError::DimensionMismatch(format!(
            "index length {} does not match pointer[{}] = {}",
            idx.len(),
            n_outer,
            ptr[n_outer],
        )));
    }
    if vals.len() != idx.len() * vals_per_entry {
        return Err(ValidationError::DimensionMismatch(format!(
            "values length {} does not match {} entries x {}",
            vals.len(),
            idx.len(),
            vals_per_entry,
        )));
    }

    let mut sorted = true;
    for outer in 0..n_outer {
        let mut prev: Option<usize> = None;
        for pos in ptr[outer]..ptr[outer + 1] {
            let index = idx[pos];
            if index >= n_inner {
                return Err(ValidationError::IndexOutOfBounds {
                    index,
                    position: pos,
                    bound: n_inner,
                });
            }
            if let Some(p) = prev {
                if index < p {
                    sorted = false;
                }
            }
            prev = Some(index);
        }
    }

    check_finite(vals)?;
    Ok(sorted)
}

// ---------------------------------------------------------------------------
// Triplets
// ---------------------------------------------------------------------------

/// Validate COO triplet arrays against the declared shape.
///
/// Duplicates are permitted. Returns `true` when the triplets are already in
/// `(row, col)` lexicographic order.
///
/// # Errors
///
/// Returns [`ValidationError`] on length mismatch, out-of-range indices or
/// non-finite values.
pub fn validate_triplets(
    rows: &[usize],
    cols: &[usize],
    vals: &[f64],
    n_rows: usize,
    n_cols: usize,
) -> Result<bool, ValidationError> {
    if rows.len() != cols.len() || rows.len() != vals.len() {
        return Err(ValidationError::DimensionMismatch(format!(
            "triplet lengths differ: rows={}, cols={}, vals={}",
            rows.len(),
            cols.len(),
            vals.len(),
        )));
    }

    let mut sorted = true;
    for k in 0..rows.len() {
        if rows[k] >= n_rows {
            return Err(ValidationError::IndexOutOfBounds {
                index: rows[k],
                position: k,
                bound: n_rows,
            });
        }
        if cols[k] >= n_cols {
            return Err(ValidationError::IndexOutOfBounds {
                index: cols[k],
                position: k,
                bound: n_cols,
            });
        }
        if k > 0 && (rows[k - 1], cols[k - 1]) > (rows[k], cols[k]) {
            sorted = false;
        }
    }

    check_finite(vals)?;
    Ok(sorted)
}

// ---------------------------------------------------------------------------
// Vectors and parameters
// ---------------------------------------------------------------------------

/// Check that a kernel operand has exactly the expected length.
#[inline]
pub fn check_len(name: &str, actual: usize, expected: usize) -> Result<(), ValidationError> {
    if actual != expected {
        return Err(ValidationError::DimensionMismatch(format!(
            "{} length {} does not match expected {}",
            name, actual, expected,
        )));
    }
    Ok(())
}

/// Reject NaN and infinite entries.
pub fn check_finite(vals: &[f64]) -> Result<(), ValidationError> {
    for (i, &v) in vals.iter().enumerate() {
        if !v.is_finite() {
            return Err(ValidationError::NonFiniteValue(format!(
                "values[{}] = {}",
                i, v,
            )));
        }
    }
    Ok(())
}

/// Validate a relaxation weight or strength threshold lying in `[lo, hi]`.
pub fn check_range(name: &str, value: f64, lo: f64, hi: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || value < lo || value > hi {
        return Err(ValidationError::ParameterOutOfRange {
            name: name.into(),
            value: value.to_string(),
            expected: format!("[{}, {}]", lo, hi),
        });
    }
    Ok(())
}
