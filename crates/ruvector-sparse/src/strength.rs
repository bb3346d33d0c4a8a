//! Strength of connection.
//!
//! Selects, row by row, the off-diagonal couplings large enough to matter for
//! coarsening. The result keeps the diagonal (when stored) first in each row,
//! followed by the strong off-diagonals in ascending column order, with their
//! original values.

use tracing::debug;

use crate::csr::CsrMatrix;
use crate::error::{Result, SparseError, ValidationError};
use crate::traits::Matrix;
use crate::types::StrengthType;
use crate::validation::{check_len, check_range};

/// Strength-of-connection matrix of `a`.
///
/// * [`StrengthType::Classical`]: `(i, j)` is strong when
///   `|a_ij| >= theta * max_{k != i} |a_ik|`. A row whose off-diagonal maximum
///   is zero has no strong connections.
/// * [`StrengthType::Symmetric`]: `(i, j)` is strong when
///   `|a_ij| >= theta * sqrt(|a_ii| * |a_jj|)`.
///
/// For systems problems, `variables[i] < num_variables` tags the unknown type
/// of row `i`; couplings between different types are never strong and do not
/// enter the classical row maximum. `None` treats every row as one variable.
///
/// # Errors
///
/// Non-square `a`, `theta` outside `[0, 1]`, a `variables` slice of the
/// wrong length, or a tag `>= num_variables`.
pub fn strength(
    a: &CsrMatrix,
    strength_type: StrengthType,
    theta: f64,
    num_variables: usize,
    variables: Option<&[usize]>,
) -> Result<CsrMatrix> {
    if a.n_rows != a.n_cols {
        return Err(SparseError::dims(format!(
            "strength requires a square matrix, got {}x{}",
            a.n_rows, a.n_cols
        )));
    }
    check_range("theta", theta, 0.0, 1.0)?;
    if let Some(vars) = variables {
        check_len("variables", vars.len(), a.n_rows)?;
        if let Some(&bad) = vars.iter().find(|&&v| v >= num_variables) {
            return Err(ValidationError::ParameterOutOfRange {
                name: "variables".into(),
                value: bad.to_string(),
                expected: format!("< num_variables = {num_variables}"),
            }
            .into());
        }
    }
    let same_var = |i: usize, j: usize| variables.map_or(true, |v| v[i] == v[j]);

    let mut a = a.clone();
    a.remove_duplicates();
    let n = a.n_rows;

    let diag: Vec<f64> = (0..n)
        .map(|i| a.row_entries(i).find(|&(j, _)| j == i).map_or(0.0, |(_, v)| v))
        .collect();

    let mut s = CsrMatrix::with_capacity(n, n, a.nnz());
    for i in 0..n {
        let row_max = match strength_type {
            StrengthType::Classical => a
                .row_entries(i)
                .filter(|&(j, _)| j != i && same_var(i, j))
                .fold(0.0f64, |m, (_, v)| m.max(v.abs())),
            StrengthType::Symmetric => 0.0,
        };
        let is_strong = |j: usize, v: f64| -> bool {
            if j == i || !same_var(i, j) {
                return false;
            }
            match strength_type {
                StrengthType::Classical => row_max > 0.0 && v.abs() >= theta * row_max,
                StrengthType::Symmetric => {
                    let scale = (diag[i] * diag[j]).abs().sqrt();
                    v.abs() >= theta * scale
                }
            }
        };

        if let Some((_, d)) = a.row_entries(i).find(|&(j, _)| j == i) {
            s.col_indices.push(i);
            s.values.push(d);
        }
        for (j, v) in a.row_entries(i) {
            if is_strong(j, v) {
                s.col_indices.push(j);
                s.values.push(v);
            }
        }
        s.row_ptr[i + 1] = s.values.len();
    }
    s.sorted = true;
    s.diag_first = true;

    debug!(
        rows = n,
        nnz = a.nnz(),
        strong = s.nnz(),
        theta,
        kind = ?strength_type,
        "strength of connection"
    );
    Ok(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anisotropic() -> CsrMatrix {
        CsrMatrix::from_dense(
            3,
            3,
            &[
                4.0, -2.0, -0.1, //
                -2.0, 4.0, -1.0, //
                -0.1, -1.0, 4.0, //
            ],
        )
        .unwrap()
    }

    #[test]
    fn classical_keeps_large_couplings() {
        let s = strength(&anisotropic(), StrengthType::Classical, 0.25, 1, None).unwrap();
        assert!(s.is_diag_first());
        assert_eq!(s.row_ptr, vec![0, 2, 5, 7]);
        assert_eq!(s.col_indices, vec![0, 1, 1, 0, 2, 2, 1]);
        assert_eq!(s.values[1], -2.0);
    }

    #[test]
    fn symmetric_scales_by_diagonal() {
        let s = strength(&anisotropic(), StrengthType::Symmetric, 0.3, 1, None).unwrap();
        // threshold is 0.3 * 4 = 1.2
        assert_eq!(s.col_indices, vec![0, 1, 1, 0, 2]);
    }

    #[test]
    fn variables_block_cross_couplings() {
        let vars: [usize; 3] = [0, 1, 0];
        let s =
            strength(&anisotropic(), StrengthType::Classical, 0.25, 2, Some(&vars[..])).unwrap();
        assert_eq!(s.col_indices, vec![0, 2, 1, 2, 0]);
    }

    #[test]
    fn zero_off_diagonal_row_has_no_strong_entries() {
        let a = CsrMatrix::from_dense(2, 2, &[1.0, 0.0, -1.0, 2.0]).unwrap();
        let s = strength(&a, StrengthType::Classical, 0.0, 1, None).unwrap();
        assert_eq!(s.row_ptr, vec![0, 1, 3]);
        assert_eq!(s.col_indices, vec![0, 1, 0]);
    }

    #[test]
    fn rejects_bad_parameters() {
        let a = anisotropic();
        assert!(strength(&a, StrengthType::Classical, 1.5, 1, None).is_err());
        assert!(strength(&a, StrengthType::Classical, 0.5, 1, Some(&[0, 0][..])).is_err());
        assert!(strength(&a, StrengthType::Classical, 0.5, 1, Some(&[0, 1, 0][..])).is_err());
        let rect = CsrMatrix::new(2, 3);
        assert!(strength(&rect, StrengthType::Classical, 0.5, 1, None).is_err());
    }
}
