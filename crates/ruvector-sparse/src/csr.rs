//! Compressed Sparse Row storage, the primary kernel format.
//!
//! Row `i` occupies `row_ptr[i]..row_ptr[i + 1]` of `col_indices`/`values`.
//! Sparse-sparse products, strength of connection, aggregation and the
//! relaxation sweeps all run on this format; other formats reach them through
//! [`Matrix::to_csr`].

use serde::{Deserialize, Serialize};

use crate::aggregate::{self, FitCandidates};
use crate::convert;
use crate::coo::CooMatrix;
use crate::csc::CscMatrix;
use crate::error::{Result, SparseError};
use crate::relax;
use crate::spgemm;
use crate::strength;
use crate::traits::{check_position, fmt_entries, Matrix, Op};
use crate::types::{Format, SparseConfig, StrengthType};
use crate::validation::{check_finite, check_len, validate_compressed};

/// Compressed Sparse Row (CSR) matrix.
///
/// Stores only non-zero entries for efficient sparse matrix-vector
/// multiplication in O(nnz) time with good cache locality.
///
/// # Layout
///
/// For a matrix with `m` rows and `nnz` non-zeros:
/// - `row_ptr` has length `m + 1`
/// - `col_indices` and `values` each have length `nnz`
/// - Row `i` spans indices `row_ptr[i]..row_ptr[i+1]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsrMatrix {
    /// Number of rows.
    pub n_rows: usize,
    /// Number of columns.
    pub n_cols: usize,
    /// Row pointers: `row_ptr[i]` is the start index in `col_indices`/`values`
    /// for row `i`.
    pub row_ptr: Vec<usize>,
    /// Column indices for each non-zero entry.
    pub col_indices: Vec<usize>,
    /// Values for each non-zero entry.
    pub values: Vec<f64>,
    pub(crate) sorted: bool,
    pub(crate) diag_first: bool,
}

impl CsrMatrix {
    /// Empty `n_rows x n_cols` matrix.
    pub fn new(n_rows: usize, n_cols: usize) -> Self {
        Self::with_capacity(n_rows, n_cols, 0)
    }

    /// Empty matrix with room for `nnz` entries.
    pub fn with_capacity(n_rows: usize, n_cols: usize, nnz: usize) -> Self {
        Self {
            n_rows,
            n_cols,
            row_ptr: vec![0; n_rows + 1],
            col_indices: Vec::with_capacity(nnz),
            values: Vec::with_capacity(nnz),
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
                    m.col_indices.push(j);
                    m.values.push(v);
                }
            }
            m.row_ptr[i + 1] = m.values.len();
        }
        Ok(m)
    }

    /// Build from raw CSR arrays after validating them.
    pub fn from_parts(
        n_rows: usize,
        n_cols: usize,
        row_ptr: Vec<usize>,
        col_indices: Vec<usize>,
        values: Vec<f64>,
    ) -> Result<Self> {
        let sorted = validate_compressed(&row_ptr, &col_indices, &values, n_rows, n_cols, 1)?;
        Ok(Self {
            n_rows,
            n_cols,
            row_ptr,
            col_indices,
            values,
            sorted,
            diag_first: false,
        })
    }

    /// Build from `(row, col, value)` triplets in any order.
    ///
    /// Entries are sorted by `(row, col)`. Duplicate positions are kept as
    /// separate entries until [`remove_duplicates`](Matrix::remove_duplicates).
    pub fn from_entries(
        n_rows: usize,
        n_cols: usize,
        entries: impl IntoIterator<Item = (usize, usize, f64)>,
    ) -> Result<Self> {
        let mut coo = CooMatrix::from_entries(n_rows, n_cols, entries)?;
        coo.sort();
        Ok(convert::coo_to_csr(&coo))
    }

    /// Square identity matrix of dimension `n`.
    pub fn identity(n: usize) -> Self {
        Self {
            n_rows: n,
            n_cols: n,
            row_ptr: (0..=n).collect(),
            col_indices: (0..n).collect(),
            values: vec![1.0; n],
            sorted: true,
            diag_first: true,
        }
    }

    /// Number of non-zeros in a specific row.
    #[inline]
    pub fn row_degree(&self, row: usize) -> usize {
        self.row_ptr[row + 1] - self.row_ptr[row]
    }

    /// Iterate over `(col_index, value)` pairs for the given row.
    #[inline]
    pub fn row_entries(&self, row: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let start = self.row_ptr[row];
        let end = self.row_ptr[row + 1];
        self.col_indices[start..end]
            .iter()
            .copied()
            .zip(self.values[start..end].iter().copied())
    }

    /// Change the logical shape. Entries falling outside are dropped.
    pub fn resize(&mut self, n_rows: usize, n_cols: usize) {
        let mut row_ptr = vec![0usize; n_rows + 1];
        let mut w = 0;
        for row in 0..n_rows {
            if row < self.n_rows {
                for k in self.row_ptr[row]..self.row_ptr[row + 1] {
                    if self.col_indices[k] < n_cols {
                        self.col_indices[w] = self.col_indices[k];
                        self.values[w] = self.values[k];
                        w += 1;
                    }
                }
            }
            row_ptr[row + 1] = w;
        }
        self.col_indices.truncate(w);
        self.values.truncate(w);
        self.row_ptr = row_ptr;
        self.n_rows = n_rows;
        self.n_cols = n_cols;
    }

    /// `self + other` over the union of both patterns.
    pub fn add(&self, other: &CsrMatrix) -> Result<CsrMatrix> {
        self.combine(other, 1.0)
    }

    /// `self - other` over the union of both patterns.
    pub fn subtract(&self, other: &CsrMatrix) -> Result<CsrMatrix> {
        self.combine(other, -1.0)
    }

    /// Galerkin coarse operator `P^T A P`.
    pub fn rap(&self, p: &CscMatrix) -> Result<CsrMatrix> {
        spgemm::rap(self, p)
    }

    /// Treat `self` as an aggregation operator and fit `num_candidates`
    /// row-major candidate vectors to it. See [`aggregate::fit_candidates`].
    pub fn fit_candidates(
        &self,
        candidates: &[f64],
        num_candidates: usize,
        tol: f64,
    ) -> Result<FitCandidates> {
        aggregate::fit_candidates(self, candidates, num_candidates, tol)
    }

    /// `self + beta * other`.
    ///
    /// Sorted operands are merged row by row with two cursors; anything else
    /// goes through a dense column marker.
    fn combine(&self, other: &CsrMatrix, beta: f64) -> Result<CsrMatrix> {
        if self.n_rows != other.n_rows || self.n_cols != other.n_cols {
            return Err(SparseError::dims(format!(
                "cannot combine {}x{} with {}x{}",
                self.n_rows, self.n_cols, other.n_rows, other.n_cols,
            )));
        }

        let mut out = CsrMatrix::with_capacity(self.n_rows, self.n_cols, self.nnz() + other.nnz());
        let merge = self.sorted && other.sorted && !self.diag_first && !other.diag_first;

        if merge {
            for row in 0..self.n_rows {
                let (mut i, end_a) = (self.row_ptr[row], self.row_ptr[row + 1]);
                let (mut j, end_b) = (other.row_ptr[row], other.row_ptr[row + 1]);
                let row_start = out.values.len();
                while i < end_a || j < end_b {
                    let take_a = j >= end_b
                        || (i < end_a && self.col_indices[i] <= other.col_indices[j]);
                    let (col, val) = if take_a {
                        i += 1;
                        (self.col_indices[i - 1], self.values[i - 1])
                    } else {
                        j += 1;
                        (other.col_indices[j - 1], beta * other.values[j - 1])
                    };
                    match out.col_indices.last() {
                        Some(&last) if out.values.len() > row_start && last == col => {
                            if let Some(v) = out.values.last_mut() {
                                *v += val;
                            }
                        }
                        _ => {
                            out.col_indices.push(col);
                            out.values.push(val);
                        }
                    }
                }
                out.row_ptr[row + 1] = out.values.len();
            }
            out.sorted = true;
        } else {
            let mut marker = vec![usize::MAX; self.n_cols];
            for row in 0..self.n_rows {
                let row_start = out.values.len();
                let entries = self
                    .row_entries(row)
                    .chain(other.row_entries(row).map(|(c, v)| (c, beta * v)));
                for (col, val) in entries {
                    let slot = marker[col];
                    if slot != usize::MAX && slot >= row_start {
                        out.values[slot] += val;
                    } else {
                        marker[col] = out.values.len();
                        out.col_indices.push(col);
                        out.values.push(val);
                    }
                }
                out.row_ptr[row + 1] = out.values.len();
            }
            out.sorted = false;
        }

        tracing::debug!(
            rows = out.n_rows,
            cols = out.n_cols,
            nnz = out.nnz(),
            merged = merge,
            "csr combine complete"
        );
        Ok(out)
    }

    fn row_diag_offset(&self, row: usize) -> Option<usize> {
        (self.row_ptr[row]..self.row_ptr[row + 1]).find(|&k| self.col_indices[k] == row)
    }
}

impl Matrix for CsrMatrix {
    fn format(&self) -> Format {
        Format::Csr
    }

    fn n_rows(&self) -> usize {
        self.n_rows
    }

    fn n_cols(&self) -> usize {
        self.n_cols
    }

    fn nnz(&self) -> usize {
        self.values.len()
    }

    fn is_sorted(&self) -> bool {
        self.sorted
    }

    fn is_diag_first(&self) -> bool {
        self.diag_first
    }

    /// Sort column indices within each row. Rows never move.
    fn sort(&mut self) {
        if self.sorted && !self.diag_first {
            return;
        }
        let mut scratch: Vec<(usize, f64)> = Vec::new();
        for row in 0..self.n_rows {
            let (start, end) = (self.row_ptr[row], self.row_ptr[row + 1]);
            scratch.clear();
            scratch.extend(
                self.col_indices[start..end]
                    .iter()
                    .copied()
                    .zip(self.values[start..end].iter().copied()),
            );
            scratch.sort_by_key(|&(c, _)| c);
            for (k, &(c, v)) in scratch.iter().enumerate() {
                self.col_indices[start + k] = c;
                self.values[start + k] = v;
            }
        }
        self.sorted = true;
        self.diag_first = false;
    }

    fn move_diag(&mut self) {
        if self.diag_first {
            return;
        }
        for row in 0..self.n_rows.min(self.n_cols) {
            if let Some(p) = self.row_diag_offset(row) {
                let start = self.row_ptr[row];
                self.col_indices[start..=p].rotate_right(1);
                self.values[start..=p].rotate_right(1);
            }
        }
        self.diag_first = true;
    }

    fn remove_duplicates(&mut self) {
        let diag_first = self.diag_first;
        if !self.sorted || diag_first {
            self.sort();
        }
        let mut w = 0;
        let mut read = 0;
        for row in 0..self.n_rows {
            let end = self.row_ptr[row + 1];
            let row_start = w;
            while read < end {
                let col = self.col_indices[read];
                if w > row_start && self.col_indices[w - 1] == col {
                    self.values[w - 1] += self.values[read];
                } else {
                    self.col_indices[w] = col;
                    self.values[w] = self.values[read];
                    w += 1;
                }
                read += 1;
            }
            self.row_ptr[row + 1] = w;
        }
        self.col_indices.truncate(w);
        self.values.truncate(w);
        if diag_first {
            self.move_diag();
        }
    }

    /// Accumulate into an existing entry, or insert a new one in place.
    ///
    /// Insertion shifts the tail of the arrays, so it costs O(nnz).
    fn add_value(&mut self, row: usize, col: usize, val: f64) -> Result<()> {
        check_position(&*self, row, col)?;
        let (start, end) = (self.row_ptr[row], self.row_ptr[row + 1]);
        if let Some(k) = (start..end).find(|&k| self.col_indices[k] == col) {
            self.values[k] += val;
            return Ok(());
        }

        let pos = if self.diag_first && col == row {
            start
        } else if self.sorted {
            let skip = usize::from(self.diag_first && start < end && self.col_indices[start] == row);
            let s = start + skip;
            s + self.col_indices[s..end].partition_point(|&c| c < col)
        } else {
            end
        };
        self.col_indices.insert(pos, col);
        self.values.insert(pos, val);
        for p in &mut self.row_ptr[row + 1..] {
            *p += 1;
        }
        Ok(())
    }

    fn spmv_kernel(&self, x: &[f64], b: &mut [f64], op: Op, sign: f64) {
        match op {
            Op::NoTrans => {
                for i in 0..self.n_rows {
                    let mut sum = 0.0f64;
                    for idx in self.row_ptr[i]..self.row_ptr[i + 1] {
                        sum += self.values[idx] * x[self.col_indices[idx]];
                    }
                    b[i] += sign * sum;
                }
            }
            Op::Trans => {
                for i in 0..self.n_rows {
                    let xi = x[i];
                    for idx in self.row_ptr[i]..self.row_ptr[i + 1] {
                        b[self.col_indices[idx]] += sign * (self.values[idx] * xi);
                    }
                }
            }
        }
    }

    fn to_coo(&self) -> CooMatrix {
        convert::csr_to_coo(self)
    }

    fn to_csr(&self) -> CsrMatrix {
        self.clone()
    }

    fn to_csc(&self) -> CscMatrix {
        convert::csr_to_csc(self)
    }

    /// Transpose by a two-pass counting sort in O(nnz + rows + cols).
    fn transpose(&self) -> CsrMatrix {
        let nnz = self.nnz();
        let t_rows = self.n_cols;

        // Pass 1: count entries per new row (= old column).
        let mut row_ptr = vec![0usize; t_rows + 1];
        for &c in &self.col_indices {
            row_ptr[c + 1] += 1;
        }
        for i in 1..=t_rows {
            row_ptr[i] += row_ptr[i - 1];
        }

        // Pass 2: scatter entries into the transposed arrays.
        let mut col_indices = vec![0usize; nnz];
        let mut values = vec![0.0f64; nnz];
        let mut cursor = row_ptr.clone();

        for row in 0..self.n_rows {
            for idx in self.row_ptr[row]..self.row_ptr[row + 1] {
                let c = self.col_indices[idx];
                let dest = cursor[c];
                col_indices[dest] = row;
                values[dest] = self.values[idx];
                cursor[c] += 1;
            }
        }

        CsrMatrix {
            n_rows: t_rows,
            n_cols: self.n_rows,
            row_ptr,
            col_indices,
            values,
            sorted: true,
            diag_first: false,
        }
    }

    fn spgemm(&self, b: &CsrMatrix) -> Result<CsrMatrix> {
        spgemm::spgemm(self, b)
    }

    fn spgemm_t(&self, a: &CscMatrix) -> Result<CsrMatrix> {
        spgemm::spgemm_t(a, self)
    }

    fn strength(
        &self,
        strength_type: StrengthType,
        theta: f64,
        num_variables: usize,
        variables: Option<&[usize]>,
    ) -> Result<CsrMatrix> {
        strength::strength(self, strength_type, theta, num_variables, variables)
    }

    fn aggregate(&self) -> Result<CsrMatrix> {
        aggregate::aggregate(self)
    }

    fn jacobi(&self, x: &mut [f64], b: &[f64], tmp: &mut [f64], omega: f64) -> Result<()> {
        relax::jacobi(self, x, b, tmp, omega)
    }

    fn gauss_seidel(&self, x: &mut [f64], b: &[f64]) -> Result<()> {
        relax::gauss_seidel(self, x, b)
    }

    fn sor(&self, x: &mut [f64], b: &[f64], omega: f64) -> Result<()> {
        relax::sor(self, x, b, omega)
    }
}

impl std::fmt::Display for CsrMatrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fmt_entries(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tridiag(n: usize) -> CsrMatrix {
        let mut entries = Vec::with_capacity(3 * n);
        for i in 0..n {
            if i > 0 {
                entries.push((i, i - 1, -1.0));
            }
            entries.push((i, i, 2.0));
            if i + 1 < n {
                entries.push((i, i + 1, -1.0));
            }
        }
        CsrMatrix::from_entries(n, n, entries).unwrap()
    }

    #[test]
    fn dense_constructor_builds_row_pointer() {
        let m = CsrMatrix::from_dense(3, 3, &[1.0, 0.0, 2.0, 0.0, 0.0, 0.0, 3.0, 4.0, 0.0])
            .unwrap();
        assert_eq!(m.row_ptr, vec![0, 2, 2, 4]);
        assert_eq!(m.col_indices, vec![0, 2, 0, 1]);
        assert!(m.is_sorted());
    }

    #[test]
    fn from_parts_validates() {
        assert!(CsrMatrix::from_parts(2, 2, vec![0, 1, 2], vec![0, 1], vec![1.0, 1.0]).is_ok());
        assert!(CsrMatrix::from_parts(2, 2, vec![0, 1], vec![0], vec![1.0]).is_err());
        let m = CsrMatrix::from_parts(1, 3, vec![0, 2], vec![2, 0], vec![1.0, 1.0]).unwrap();
        assert!(!m.is_sorted());
    }

    #[test]
    fn sort_orders_columns_within_rows() {
        let mut m =
            CsrMatrix::from_parts(2, 3, vec![0, 3, 4], vec![2, 0, 1, 1], vec![3.0, 1.0, 2.0, 4.0])
                .unwrap();
        m.sort();
        assert_eq!(m.col_indices, vec![0, 1, 2, 1]);
        assert_eq!(m.values, vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(m.row_ptr, vec![0, 3, 4]);
    }

    #[test]
    fn move_diag_then_insert_keeps_invariants() {
        let mut m = tridiag(3);
        m.move_diag();
        assert!(m.is_diag_first());
        assert_eq!(m.col_indices, vec![0, 1, 1, 0, 2, 2, 1]);

        m.add_value(0, 2, 7.0).unwrap();
        assert_eq!(&m.col_indices[0..3], &[0, 1, 2]);
        assert_eq!(m.row_ptr, vec![0, 3, 6, 8]);
        assert_eq!(m.to_dense()[2], 7.0);
    }

    #[test]
    fn add_value_accumulates_existing_entry() {
        let mut m = CsrMatrix::identity(3);
        m.add_value(1, 1, 4.0).unwrap();
        assert_eq!(m.nnz(), 3);
        assert_eq!(m.values[1], 5.0);
        m.add_value(2, 0, 1.0).unwrap();
        assert_eq!(m.nnz(), 4);
        assert_eq!(m.row_ptr, vec![0, 1, 2, 4]);
        assert!(m.add_value(3, 0, 1.0).is_err());
    }

    #[test]
    fn remove_duplicates_compacts_rows() {
        let mut m = CsrMatrix::from_entries(
            2,
            2,
            vec![(0, 0, 1.0), (0, 0, 2.0), (1, 1, 1.0), (1, 0, 1.0), (1, 1, 5.0)],
        )
        .unwrap();
        assert_eq!(m.nnz(), 5);
        m.remove_duplicates();
        assert_eq!(m.nnz(), 3);
        assert_eq!(m.row_ptr, vec![0, 1, 3]);
        assert_eq!(m.to_dense(), vec![3.0, 0.0, 1.0, 6.0]);
    }

    #[test]
    fn transpose_is_sorted() {
        let m = CsrMatrix::from_dense(2, 3, &[1.0, 2.0, 0.0, 0.0, 3.0, 4.0]).unwrap();
        let t = m.transpose();
        assert_eq!((t.n_rows, t.n_cols), (3, 2));
        assert_eq!(t.row_ptr, vec![0, 1, 3, 4]);
        assert_eq!(t.col_indices, vec![0, 0, 1, 1]);
        assert_eq!(t.values, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn add_and_subtract_union_patterns() {
        let a = CsrMatrix::from_dense(2, 2, &[1.0, 0.0, 0.0, 2.0]).unwrap();
        let b = CsrMatrix::from_dense(2, 2, &[0.0, 3.0, 0.0, 1.0]).unwrap();
        let sum = a.add(&b).unwrap();
        assert!(sum.is_sorted());
        assert_eq!(sum.to_dense(), vec![1.0, 3.0, 0.0, 3.0]);
        let diff = a.subtract(&b).unwrap();
        assert_eq!(diff.to_dense(), vec![1.0, -3.0, 0.0, 1.0]);
    }

    #[test]
    fn add_falls_back_for_unsorted_operands() {
        let a = CsrMatrix::from_parts(1, 3, vec![0, 2], vec![2, 0], vec![1.0, 2.0]).unwrap();
        let b = CsrMatrix::from_dense(1, 3, &[1.0, 1.0, 1.0]).unwrap();
        let sum = a.add(&b).unwrap();
        assert!(!sum.is_sorted());
        assert_eq!(sum.nnz(), 3);
        assert_eq!(sum.to_dense(), vec![3.0, 1.0, 2.0]);
        assert!(a.add(&CsrMatrix::new(2, 3)).is_err());
    }

    #[test]
    fn resize_truncates() {
        let mut m = tridiag(4);
        m.resize(2, 2);
        assert_eq!(m.row_ptr, vec![0, 2, 4]);
        assert_eq!(m.to_dense(), vec![2.0, -1.0, -1.0, 2.0]);
    }

    #[test]
    fn add_block_scatters_nonzeros() {
        let mut m = CsrMatrix::new(3, 3);
        m.add_block(1, 1, (2, 2), &[1.0, 0.0, 2.0, 3.0]).unwrap();
        assert_eq!(m.nnz(), 3);
        assert_eq!(m.to_dense(), vec![0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 2.0, 3.0]);
        assert!(m.add_block(2, 2, (2, 2), &[1.0; 4]).is_err());
    }

    #[test]
    fn display_lists_entries() {
        let s = CsrMatrix::identity(2).to_string();
        assert!(s.starts_with("CSR matrix 2x2"));
        assert!(s.contains("(1, 1) 1e0"));
    }
}
