//! Compressed Sparse Column storage.
//!
//! Mirror of [`CsrMatrix`] with the roles of rows and columns exchanged:
//! column `j` occupies `col_ptr[j]..col_ptr[j + 1]` of `row_indices`/`values`.
//! CSC is the natural left operand of [`spgemm_t`](Matrix::spgemm_t), since its
//! columns are the rows of the transpose.

use serde::{Deserialize, Serialize};

use crate::convert;
use crate::coo::CooMatrix;
use crate::csr::CsrMatrix;
use crate::error::Result;
use crate::traits::{check_position, fmt_entries, Matrix, Op};
use crate::types::{Format, SparseConfig};
use crate::validation::{check_finite, check_len, validate_compressed};

/// Compressed Sparse Column (CSC) matrix.
///
/// - `col_ptr` has length `n_cols + 1`
/// - `row_indices` and `values` each have length `nnz`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CscMatrix {
    /// Number of rows.
    pub n_rows: usize,
    /// Number of columns.
    pub n_cols: usize,
    /// Column pointers.
    pub col_ptr: Vec<usize>,
    /// Row index of each entry.
    pub row_indices: Vec<usize>,
    /// Value of each entry.
    pub values: Vec<f64>,
    pub(crate) sorted: bool,
    pub(crate) diag_first: bool,
}

impl CscMatrix {
    /// Empty `n_rows x n_cols` matrix.
    pub fn new(n_rows: usize, n_cols: usize) -> Self {
        Self::with_capacity(n_rows, n_cols, 0)
    }

    /// Empty matrix with room for `nnz` entries.
    pub fn with_capacity(n_rows: usize, n_cols: usize, nnz: usize) -> Self {
        Self {
            n_rows,
            n_cols,
            col_ptr: vec![0; n_cols + 1],
            row_indices: Vec::with_capacity(nnz),
            values: Vec::with_capacity(nnz),
            sorted: true,
            diag_first: false,
        }
    }

    /// Sparsify a row-major dense array with the default zero tolerance.
    pub fn from_dense(n_rows: usize, n_cols: usize, data: &[f64]) -> Result<Self> {
        Self::from_dense_with(n_rows, n_cols, data, &SparseConfig::default())
    }

    /// Sparsify a row-major dense array column by column, keeping entries
    /// with `|v| > config.zero_tol`.
    pub fn from_dense_with(
        n_rows: usize,
        n_cols: usize,
        data: &[f64],
        config: &SparseConfig,
    ) -> Result<Self> {
        check_len("dense data", data.len(), n_rows * n_cols)?;
        check_finite(data)?;
        let mut m = Self::new(n_rows, n_cols);
        for j in 0..n_cols {
            for i in 0..n_rows {
                let v = data[i * n_cols + j];
                if config.is_nonzero(v) {
                    m.row_indices.push(i);
                    m.values.push(v);
                }
            }
            m.col_ptr[j + 1] = m.values.len();
        }
        Ok(m)
    }

    /// Build from raw CSC arrays after validating them.
    pub fn from_parts(
        n_rows: usize,
        n_cols: usize,
        col_ptr: Vec<usize>,
        row_indices: Vec<usize>,
        values: Vec<f64>,
    ) -> Result<Self> {
        let sorted = validate_compressed(&col_ptr, &row_indices, &values, n_cols, n_rows, 1)?;
        Ok(Self {
            n_rows,
            n_cols,
            col_ptr,
            row_indices,
            values,
            sorted,
            diag_first: false,
        })
    }

    /// Iterate over `(row_index, value)` pairs for the given column.
    #[inline]
    pub fn col_entries(&self, col: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let start = self.col_ptr[col];
        let end = self.col_ptr[col + 1];
        self.row_indices[start..end]
            .iter()
            .copied()
            .zip(self.values[start..end].iter().copied())
    }

    /// Change the logical shape. Entries falling outside are dropped.
    pub fn resize(&mut self, n_rows: usize, n_cols: usize) {
        let mut col_ptr = vec![0usize; n_cols + 1];
        let mut w = 0;
        for col in 0..n_cols {
            if col < self.n_cols {
                for k in self.col_ptr[col]..self.col_ptr[col + 1] {
                    if self.row_indices[k] < n_rows {
                        self.row_indices[w] = self.row_indices[k];
                        self.values[w] = self.values[k];
                        w += 1;
                    }
                }
            }
            col_ptr[col + 1] = w;
        }
        self.row_indices.truncate(w);
        self.values.truncate(w);
        self.col_ptr = col_ptr;
        self.n_rows = n_rows;
        self.n_cols = n_cols;
    }

    fn col_diag_offset(&self, col: usize) -> Option<usize> {
        (self.col_ptr[col]..self.col_ptr[col + 1]).find(|&k| self.row_indices[k] == col)
    }
}

impl Matrix for CscMatrix {
    fn format(&self) -> Format {
        Format::Csc
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

    /// Sort row indices within each column.
    fn sort(&mut self) {
        if self.sorted && !self.diag_first {
            return;
        }
        let mut scratch: Vec<(usize, f64)> = Vec::new();
        for col in 0..self.n_cols {
            let (start, end) = (self.col_ptr[col], self.col_ptr[col + 1]);
            scratch.clear();
            scratch.extend(self.col_entries(col));
            scratch.sort_by_key(|&(r, _)| r);
            for (k, &(r, v)) in scratch.iter().enumerate() {
                self.row_indices[start + k] = r;
                self.values[start + k] = v;
            }
            debug_assert_eq!(start + scratch.len(), end);
        }
        self.sorted = true;
        self.diag_first = false;
    }

    fn move_diag(&mut self) {
        if self.diag_first {
            return;
        }
        for col in 0..self.n_cols.min(self.n_rows) {
            if let Some(p) = self.col_diag_offset(col) {
                let start = self.col_ptr[col];
                self.row_indices[start..=p].rotate_right(1);
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
        for col in 0..self.n_cols {
            let end = self.col_ptr[col + 1];
            let col_start = w;
            while read < end {
                let row = self.row_indices[read];
                if w > col_start && self.row_indices[w - 1] == row {
                    self.values[w - 1] += self.values[read];
                } else {
                    self.row_indices[w] = row;
                    self.values[w] = self.values[read];
                    w += 1;
                }
                read += 1;
            }
            self.col_ptr[col + 1] = w;
        }
        self.row_indices.truncate(w);
        self.values.truncate(w);
        if diag_first {
            self.move_diag();
        }
    }

    /// Accumulate into an existing entry, or insert a new one in place.
    fn add_value(&mut self, row: usize, col: usize, val: f64) -> Result<()> {
        check_position(&*self, row, col)?;
        let (start, end) = (self.col_ptr[col], self.col_ptr[col + 1]);
        if let Some(k) = (start..end).find(|&k| self.row_indices[k] == row) {
            self.values[k] += val;
            return Ok(());
        }

        let pos = if self.diag_first && row == col {
            start
        } else if self.sorted {
            let skip = usize::from(self.diag_first && start < end && self.row_indices[start] == col);
            let s = start + skip;
            s + self.row_indices[s..end].partition_point(|&r| r < row)
        } else {
            end
        };
        self.row_indices.insert(pos, row);
        self.values.insert(pos, val);
        for p in &mut self.col_ptr[col + 1..] {
            *p += 1;
        }
        Ok(())
    }

    fn spmv_kernel(&self, x: &[f64], b: &mut [f64], op: Op, sign: f64) {
        match op {
            Op::NoTrans => {
                for j in 0..self.n_cols {
                    let xj = x[j];
                    for idx in self.col_ptr[j]..self.col_ptr[j + 1] {
                        b[self.row_indices[idx]] += sign * (self.values[idx] * xj);
                    }
                }
            }
            Op::Trans => {
                for j in 0..self.n_cols {
                    let mut sum = 0.0f64;
                    for idx in self.col_ptr[j]..self.col_ptr[j + 1] {
                        sum += self.values[idx] * x[self.row_indices[idx]];
                    }
                    b[j] += sign * sum;
                }
            }
        }
    }

    fn to_coo(&self) -> CooMatrix {
        convert::csc_to_coo(self)
    }

    fn to_csr(&self) -> CsrMatrix {
        convert::csc_to_csr(self)
    }

    fn to_csc(&self) -> CscMatrix {
        self.clone()
    }

    /// `A^T` in CSC form: the columns of `A^T` are the rows of `A`.
    fn transpose(&self) -> CscMatrix {
        let rowwise = convert::csc_to_csr(self);
        CscMatrix {
            n_rows: self.n_cols,
            n_cols: self.n_rows,
            col_ptr: rowwise.row_ptr,
            row_indices: rowwise.col_indices,
            values: rowwise.values,
            sorted: true,
            diag_first: false,
        }
    }
}

impl std::fmt::Display for CscMatrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fmt_entries(self, f)
    }
}
