//! Coordinate (triplet) storage.
//!
//! [`CooMatrix`] is the construction format: entries may be appended in any
//! order and duplicates are allowed until
//! [`remove_duplicates`](Matrix::remove_duplicates) collapses them. Kernels
//! traverse entries in storage order.

use serde::{Deserialize, Serialize};

use crate::convert;
use crate::csc::CscMatrix;
use crate::csr::CsrMatrix;
use crate::error::Result;
use crate::traits::{check_position, fmt_entries, Matrix, Op};
use crate::types::{Format, SparseConfig};
use crate::validation::{check_finite, check_len, validate_triplets};

/// Sparse matrix stored as `(row, col, value)` triplets.
///
/// When `sorted`, entries are grouped by ascending row with ascending columns
/// inside each row (the diagonal leads its row when `diag_first`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CooMatrix {
    /// Number of rows.
    pub n_rows: usize,
    /// Number of columns.
    pub n_cols: usize,
    /// Row index of each entry.
    pub rows: Vec<usize>,
    /// Column index of each entry.
    pub cols: Vec<usize>,
    /// Value of each entry.
    pub vals: Vec<f64>,
    pub(crate) sorted: bool,
    pub(crate) diag_first: bool,
}

impl CooMatrix {
    /// Empty `n_rows x n_cols` matrix.
    pub fn new(n_rows: usize, n_cols: usize) -> Self {
        Self::with_capacity(n_rows, n_cols, 0)
    }

    /// Empty matrix with room for roughly `nnz_per_row` entries per row.
    pub fn with_capacity(n_rows: usize, n_cols: usize, nnz_per_row: usize) -> Self {
        let cap = nnz_per_row * n_rows;
        Self {
            n_rows,
            n_cols,
            rows: Vec::with_capacity(cap),
            cols: Vec::with_capacity(cap),
            vals: Vec::with_capacity(cap),
            sorted: true,
            diag_first: false,
        }
    }

    /// Sparsify a row-major dense array with the default zero tolerance.
    pub fn from_dense(n_rows: usize, n_cols: usize, data: &[f64]) -> Result<Self> {
        Self::from_dense_with(n_rows, n_cols, data, &SparseConfig::default())
    }

    /// Sparsify a row-major dense array, keeping entries with
    /// `|v| > config.zero_tol`.
    pub fn from_dense_with(
        n_rows: usize,
        n_cols: usize,
        data: &[f64],
        config: &SparseConfig,
    ) -> Result<Self> {
        check_len("dense data", data.len(), n_rows * n_cols)?;
        check_finite(data)?;
        let mut m = Self::new(n_rows, n_cols);
        for i in 0..n_rows {
            for j in 0..n_cols {
                let v = data[i * n_cols + j];
                if config.is_nonzero(v) {
                    m.rows.push(i);
                    m.cols.push(j);
                    m.vals.push(v);
                }
            }
        }
        Ok(m)
    }

    /// Build from triplet arrays. Duplicates are kept.
    pub fn from_triplets(
        n_rows: usize,
        n_cols: usize,
        rows: Vec<usize>,
        cols: Vec<usize>,
        vals: Vec<f64>,
    ) -> Result<Self> {
        let sorted = validate_triplets(&rows, &cols, &vals, n_rows, n_cols)?;
        Ok(Self {
            n_rows,
            n_cols,
            rows,
            cols,
            vals,
            sorted,
            diag_first: false,
        })
    }

    /// Build from an iterator of triplets. Duplicates are kept.
    pub fn from_entries(
        n_rows: usize,
        n_cols: usize,
        entries: impl IntoIterator<Item = (usize, usize, f64)>,
    ) -> Result<Self> {
        let mut m = Self::new(n_rows, n_cols);
        for (r, c, v) in entries {
            m.add_value(r, c, v)?;
        }
        Ok(m)
    }

    /// Change the logical shape. Entries falling outside are dropped.
    pub fn resize(&mut self, n_rows: usize, n_cols: usize) {
        if n_rows < self.n_rows || n_cols < self.n_cols {
            let mut w = 0;
            for k in 0..self.vals.len() {
                if self.rows[k] < n_rows && self.cols[k] < n_cols {
                    self.rows[w] = self.rows[k];
                    self.cols[w] = self.cols[k];
                    self.vals[w] = self.vals[k];
                    w += 1;
                }
            }
            self.rows.truncate(w);
            self.cols.truncate(w);
            self.vals.truncate(w);
        }
        self.n_rows = n_rows;
        self.n_cols = n_cols;
    }

    /// Iterate `(row, col, value)` in storage order.
    pub fn entries(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.rows
            .iter()
            .zip(&self.cols)
            .zip(&self.vals)
            .map(|((&r, &c), &v)| (r, c, v))
    }

    fn permute(&mut self, perm: &[usize]) {
        self.rows = perm.iter().map(|&k| self.rows[k]).collect();
        self.cols = perm.iter().map(|&k| self.cols[k]).collect();
        self.vals = perm.iter().map(|&k| self.vals[k]).collect();
    }

    fn row_runs(&self) -> Vec<(usize, usize)> {
        let mut runs = Vec::new();
        let mut start = 0;
        for k in 1..=self.rows.len() {
            if k == self.rows.len() || self.rows[k] != self.rows[start] {
                runs.push((start, k));
                start = k;
            }
        }
        runs
    }
}

impl Matrix for CooMatrix {
    fn format(&self) -> Format {
        Format::Coo
    }

    fn n_rows(&self) -> usize {
        self.n_rows
    }

    fn n_cols(&self) -> usize {
        self.n_cols
    }

    fn nnz(&self) -> usize {
        self.vals.len()
    }

    fn is_sorted(&self) -> bool {
        self.sorted
    }

    fn is_diag_first(&self) -> bool {
        self.diag_first
    }

    /// Stable sort by `(row, col)`.
    fn sort(&mut self) {
        if self.sorted && !self.diag_first {
            return;
        }
        let mut perm: Vec<usize> = (0..self.vals.len()).collect();
        perm.sort_by_key(|&k| (self.rows[k], self.cols[k]));
        self.permute(&perm);
        self.sorted = true;
        self.diag_first = false;
    }

    fn move_diag(&mut self) {
        if !self.sorted {
            self.sort();
        }
        if self.diag_first {
            return;
        }
        for (start, end) in self.row_runs() {
            let row = self.rows[start];
            if let Some(off) = self.cols[start..end].iter().position(|&c| c == row) {
                let p = start + off;
                self.cols[start..=p].rotate_right(1);
                self.vals[start..=p].rotate_right(1);
            }
        }
        self.diag_first = true;
    }

    fn remove_duplicates(&mut self) {
        let diag_first = self.diag_first;
        if !self.sorted || diag_first {
            self.sort();
        }
        let n = self.vals.len();
        if n == 0 {
            return;
        }
        let mut w = 0;
        for k in 1..n {
            if self.rows[k] == self.rows[w] && self.cols[k] == self.cols[w] {
                self.vals[w] += self.vals[k];
            } else {
                w += 1;
                self.rows[w] = self.rows[k];
                self.cols[w] = self.cols[k];
                self.vals[w] = self.vals[k];
            }
        }
        self.rows.truncate(w + 1);
        self.cols.truncate(w + 1);
        self.vals.truncate(w + 1);
        if diag_first {
            self.move_diag();
        }
    }

    /// Append a triplet. Duplicates are resolved later by
    /// [`remove_duplicates`](Matrix::remove_duplicates).
    fn add_value(&mut self, row: usize, col: usize, val: f64) -> Result<()> {
        check_position(&*self, row, col)?;
        if let (Some(&r), Some(&c)) = (self.rows.last(), self.cols.last()) {
            if (r, c) >= (row, col) || self.diag_first {
                self.sorted = false;
                self.diag_first = false;
            }
        }
        self.rows.push(row);
        self.cols.push(col);
        self.vals.push(val);
        Ok(())
    }

    fn spmv_kernel(&self, x: &[f64], b: &mut [f64], op: Op, sign: f64) {
        match op {
            Op::NoTrans => {
                for k in 0..self.vals.len() {
                    b[self.rows[k]] += sign * (self.vals[k] * x[self.cols[k]]);
                }
            }
            Op::Trans => {
                for k in 0..self.vals.len() {
                    b[self.cols[k]] += sign * (self.vals[k] * x[self.rows[k]]);
                }
            }
        }
    }

    fn to_coo(&self) -> CooMatrix {
        self.clone()
    }

    fn to_csr(&self) -> CsrMatrix {
        convert::coo_to_csr(self)
    }

    fn to_csc(&self) -> CscMatrix {
        convert::coo_to_csc(self)
    }

    fn transpose(&self) -> Self {
        Self {
            n_rows: self.n_cols,
            n_cols: self.n_rows,
            rows: self.cols.clone(),
            cols: self.rows.clone(),
            vals: self.vals.clone(),
            sorted: self.vals.len() <= 1,
            diag_first: false,
        }
    }
}

impl std::fmt::Display for CooMatrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fmt_entries(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SparseError;

    #[test]
    fn dense_constructor_applies_tolerance() {
        let data = [1.0, 1e-20, 0.0, -2.0];
        let m = CooMatrix::from_dense(2, 2, &data).unwrap();
        assert_eq!(m.nnz(), 2);
        assert_eq!(m.rows, vec![0, 1]);
        assert_eq!(m.cols, vec![0, 1]);

        let loose = CooMatrix::from_dense_with(2, 2, &data, &SparseConfig::with_zero_tol(1.5))
            .unwrap();
        assert_eq!(loose.nnz(), 1);
        assert_eq!(loose.vals, vec![-2.0]);
    }

    #[test]
    fn dense_constructor_rejects_wrong_length() {
        assert!(CooMatrix::from_dense(2, 2, &[1.0; 3]).is_err());
    }

    #[test]
    fn sort_is_lexicographic_and_stable() {
        let mut m = CooMatrix::from_triplets(
            3,
            3,
            vec![2, 0, 1, 0, 0],
            vec![0, 2, 1, 0, 2],
            vec![1.0, 2.0, 3.0, 4.0, 5.0],
        )
        .unwrap();
        assert!(!m.is_sorted());
        m.sort();
        assert_eq!(m.rows, vec![0, 0, 0, 1, 2]);
        assert_eq!(m.cols, vec![0, 2, 2, 1, 0]);
        // equal keys keep insertion order
        assert_eq!(m.vals, vec![4.0, 2.0, 5.0, 3.0, 1.0]);
    }

    #[test]
    fn duplicates_collapse_by_summation() {
        let mut m = CooMatrix::new(2, 2);
        m.add_value(1, 1, 2.0).unwrap();
        m.add_value(0, 1, 1.0).unwrap();
        m.add_value(1, 1, 3.0).unwrap();
        assert_eq!(m.nnz(), 3);
        m.sort();
        m.remove_duplicates();
        assert_eq!(m.nnz(), 2);
        assert_eq!(m.to_dense(), vec![0.0, 1.0, 0.0, 5.0]);
    }

    #[test]
    fn move_diag_puts_diagonal_first() {
        let mut m = CooMatrix::from_dense(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        m.move_diag();
        assert!(m.is_diag_first());
        assert_eq!(m.cols, vec![0, 1, 2, 1, 0, 2]);
        assert_eq!(m.vals, vec![1.0, 2.0, 3.0, 5.0, 4.0, 6.0]);
    }

    #[test]
    fn add_value_out_of_bounds() {
        let mut m = CooMatrix::new(2, 2);
        assert!(matches!(
            m.add_value(2, 0, 1.0),
            Err(SparseError::IndexOutOfBounds { row: 2, .. })
        ));
    }

    #[test]
    fn in_order_appends_keep_sorted_flag() {
        let mut m = CooMatrix::new(3, 3);
        m.add_value(0, 0, 1.0).unwrap();
        m.add_value(0, 2, 1.0).unwrap();
        m.add_value(2, 1, 1.0).unwrap();
        assert!(m.is_sorted());
        m.add_value(1, 0, 1.0).unwrap();
        assert!(!m.is_sorted());
    }

    #[test]
    fn spmv_and_transpose() {
        let m = CooMatrix::from_dense(2, 3, &[1.0, 0.0, 2.0, 0.0, 3.0, 0.0]).unwrap();
        let mut b = vec![0.0; 2];
        m.mult(&[1.0, 1.0, 1.0], &mut b).unwrap();
        assert_eq!(b, vec![3.0, 3.0]);

        let mut bt = vec![0.0; 3];
        m.mult_t(&[1.0, 2.0], &mut bt).unwrap();
        assert_eq!(bt, vec![1.0, 6.0, 2.0]);

        let t = m.transpose();
        assert_eq!((t.n_rows, t.n_cols), (3, 2));
        assert_eq!(t.to_dense(), vec![1.0, 0.0, 0.0, 3.0, 2.0, 0.0]);
    }

    #[test]
    fn resize_drops_entries_outside() {
        let mut m = CooMatrix::from_dense(3, 3, &[1.0; 9]).unwrap();
        m.resize(2, 2);
        assert_eq!(m.nnz(), 4);
        m.resize(4, 4);
        assert_eq!(m.nnz(), 4);
        assert_eq!(m.n_rows, 4);
    }

    #[test]
    fn spgemm_is_unsupported() {
        let m = CooMatrix::new(2, 2);
        let b = CsrMatrix::identity(2);
        assert!(matches!(
            m.spgemm(&b),
            Err(SparseError::Unsupported { format: Format::Coo, .. })
        ));
    }
}
