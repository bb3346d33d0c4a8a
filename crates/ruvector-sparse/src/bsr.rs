//! Block Compressed Sparse Row storage.
//!
//! CSR at block granularity: block row `I` owns blocks
//! `row_ptr[I]..row_ptr[I + 1]`, block `k` sits at block column
//! `col_indices[k]` and its `b_rows x b_cols` scalars occupy
//! `values[k * b_size..(k + 1) * b_size]`, row-major within the block.
//! Every scalar of a stored block counts toward `nnz`, zeros included.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::convert;
use crate::coo::CooMatrix;
use crate::csc::CscMatrix;
use crate::csr::CsrMatrix;
use crate::error::{Result, SparseError};
use crate::traits::{check_position, fmt_entries, Matrix, Op};
use crate::types::{Format, SparseConfig};
use crate::validation::{check_finite, check_len, validate_compressed};

/// Block Compressed Sparse Row (BSR) matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BsrMatrix {
    /// Number of scalar rows.
    pub n_rows: usize,
    /// Number of scalar columns.
    pub n_cols: usize,
    /// Rows per block.
    pub b_rows: usize,
    /// Columns per block.
    pub b_cols: usize,
    /// Scalars per block, `b_rows * b_cols`.
    pub b_size: usize,
    /// Number of stored blocks.
    pub n_blocks: usize,
    /// Block-row pointers, length `n_rows / b_rows + 1`.
    pub row_ptr: Vec<usize>,
    /// Block-column index of each stored block.
    pub col_indices: Vec<usize>,
    /// Block values, `b_size` consecutive scalars per block.
    pub values: Vec<f64>,
    pub(crate) sorted: bool,
    pub(crate) diag_first: bool,
}

/// Reject block grids that do not tile the matrix.
fn check_block_shape(n_rows: usize, n_cols: usize, b_rows: usize, b_cols: usize) -> Result<()> {
    if b_rows == 0 || b_cols == 0 || n_rows % b_rows != 0 || n_cols % b_cols != 0 {
        return Err(SparseError::InvalidBlockShape {
            n_rows,
            n_cols,
            b_rows,
            b_cols,
        });
    }
    Ok(())
}

impl BsrMatrix {
    /// Empty matrix with `b_rows x b_cols` blocks.
    ///
    /// # Errors
    ///
    /// [`SparseError::InvalidBlockShape`] when a block dimension is zero or
    /// does not divide the matching matrix dimension.
    pub fn new(n_rows: usize, n_cols: usize, b_rows: usize, b_cols: usize) -> Result<Self> {
        check_block_shape(n_rows, n_cols, b_rows, b_cols)?;
        Ok(Self {
            n_rows,
            n_cols,
            b_rows,
            b_cols,
            b_size: b_rows * b_cols,
            n_blocks: 0,
            row_ptr: vec![0; n_rows / b_rows + 1],
            col_indices: Vec::new(),
            values: Vec::new(),
            sorted: true,
            diag_first: false,
        })
    }

    /// Block a row-major dense array with the default zero tolerance.
    pub fn from_dense(
        n_rows: usize,
        n_cols: usize,
        b_rows: usize,
        b_cols: usize,
        data: &[f64],
    ) -> Result<Self> {
        Self::from_dense_with(n_rows, n_cols, b_rows, b_cols, data, &SparseConfig::default())
    }

    /// Block a row-major dense array. A block is stored only when at least
    /// one of its scalars satisfies `|v| > config.zero_tol`; stored blocks keep
    /// all their scalars verbatim.
    pub fn from_dense_with(
        n_rows: usize,
        n_cols: usize,
        b_rows: usize,
        b_cols: usize,
        data: &[f64],
        config: &SparseConfig,
    ) -> Result<Self> {
        let mut m = Self::new(n_rows, n_cols, b_rows, b_cols)?;
        check_len("dense data", data.len(), n_rows * n_cols)?;
        check_finite(data)?;
        let mut block = vec![0.0f64; m.b_size];
        for brow in 0..m.n_block_rows() {
            for bcol in 0..m.n_block_cols() {
                for i in 0..b_rows {
                    let start = (brow * b_rows + i) * n_cols + bcol * b_cols;
                    block[i * b_cols..(i + 1) * b_cols].copy_from_slice(&data[start..start + b_cols]);
                }
                if block.iter().any(|&v| config.is_nonzero(v)) {
                    m.push_block(bcol, &block);
                }
            }
            m.row_ptr[brow + 1] = m.n_blocks;
        }
        Ok(m)
    }

    /// Build from block-ordered dense data with the default zero tolerance.
    pub fn from_block_data(
        n_rows: usize,
        n_cols: usize,
        b_rows: usize,
        b_cols: usize,
        data: &[f64],
    ) -> Result<Self> {
        Self::from_block_data_with(n_rows, n_cols, b_rows, b_cols, data, &SparseConfig::default())
    }

    /// Build from block-ordered dense data: the full grid of blocks, block
    /// rows outermost, each block stored as `b_size` row-major scalars.
    /// Blocks are dropped under the same rule as
    /// [`from_dense_with`](Self::from_dense_with).
    pub fn from_block_data_with(
        n_rows: usize,
        n_cols: usize,
        b_rows: usize,
        b_cols: usize,
        data: &[f64],
        config: &SparseConfig,
    ) -> Result<Self> {
        let mut m = Self::new(n_rows, n_cols, b_rows, b_cols)?;
        check_len("block data", data.len(), n_rows * n_cols)?;
        check_finite(data)?;
        let b_size = m.b_size;
        for (k, block) in data.chunks_exact(b_size).enumerate() {
            let (brow, bcol) = (k / m.n_block_cols(), k % m.n_block_cols());
            if block.iter().any(|&v| config.is_nonzero(v)) {
                m.push_block(bcol, block);
            }
            m.row_ptr[brow + 1] = m.n_blocks;
        }
        Ok(m)
    }

    /// Build from raw BSR arrays after validating them.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        n_rows: usize,
        n_cols: usize,
        b_rows: usize,
        b_cols: usize,
        row_ptr: Vec<usize>,
        col_indices: Vec<usize>,
        values: Vec<f64>,
    ) -> Result<Self> {
        check_block_shape(n_rows, n_cols, b_rows, b_cols)?;
        let sorted = validate_compressed(
            &row_ptr,
            &col_indices,
            &values,
            n_rows / b_rows,
            n_cols / b_cols,
            b_rows * b_cols,
        )?;
        Ok(Self {
            n_rows,
            n_cols,
            b_rows,
            b_cols,
            b_size: b_rows * b_cols,
            n_blocks: col_indices.len(),
            row_ptr,
            col_indices,
            values,
            sorted,
            diag_first: false,
        })
    }

    /// Re-block a CSR matrix. Every block touched by a stored entry is
    /// created; duplicate scalar entries are summed. The result is sorted.
    pub fn from_csr(csr: &CsrMatrix, b_rows: usize, b_cols: usize) -> Result<Self> {
        let mut m = Self::new(csr.n_rows, csr.n_cols, b_rows, b_cols)?;
        let mut slot = vec![usize::MAX; m.n_block_cols()];
        let mut touched: Vec<usize> = Vec::new();

        for brow in 0..m.n_block_rows() {
            let rows = brow * b_rows..(brow + 1) * b_rows;

            touched.clear();
            for row in rows.clone() {
                for (col, _) in csr.row_entries(row) {
                    let bcol = col / b_cols;
                    if slot[bcol] == usize::MAX {
                        slot[bcol] = 0;
                        touched.push(bcol);
                    }
                }
            }
            touched.sort_unstable();

            let base = m.n_blocks;
            for (offset, &bcol) in touched.iter().enumerate() {
                slot[bcol] = base + offset;
                m.col_indices.push(bcol);
            }
            m.n_blocks += touched.len();
            m.values.resize(m.n_blocks * m.b_size, 0.0);

            for row in rows {
                let i = row - brow * b_rows;
                for (col, v) in csr.row_entries(row) {
                    let k = slot[col / b_cols];
                    m.values[k * m.b_size + i * b_cols + col % b_cols] += v;
                }
            }
            for &bcol in &touched {
                slot[bcol] = usize::MAX;
            }
            m.row_ptr[brow + 1] = m.n_blocks;
        }

        debug!(
            rows = m.n_rows,
            cols = m.n_cols,
            b_rows,
            b_cols,
            blocks = m.n_blocks,
            "csr -> bsr"
        );
        Ok(m)
    }

    /// Number of block rows.
    #[inline]
    pub fn n_block_rows(&self) -> usize {
        self.n_rows / self.b_rows
    }

    /// Number of block columns.
    #[inline]
    pub fn n_block_cols(&self) -> usize {
        self.n_cols / self.b_cols
    }

    /// Scalars of stored block `k`.
    #[inline]
    pub fn block(&self, k: usize) -> &[f64] {
        &self.values[k * self.b_size..(k + 1) * self.b_size]
    }

    /// Iterate `(block_col, block_values)` for a block row.
    pub fn block_row(&self, brow: usize) -> impl Iterator<Item = (usize, &[f64])> + '_ {
        (self.row_ptr[brow]..self.row_ptr[brow + 1]).map(move |k| (self.col_indices[k], self.block(k)))
    }

    /// Accumulate a `b_rows x b_cols` block at block coordinates
    /// `(brow, bcol)`. A missing block is inserted at its sorted position, or
    /// at the end of the block row when the matrix is unsorted.
    fn accumulate_block(&mut self, brow: usize, bcol: usize, values: &[f64]) {
        let k = self.find_or_insert(brow, bcol);
        let b_size = self.b_size;
        for (dst, &v) in self.values[k * b_size..(k + 1) * b_size].iter_mut().zip(values) {
            *dst += v;
        }
    }

    fn find_or_insert(&mut self, brow: usize, bcol: usize) -> usize {
        let (start, end) = (self.row_ptr[brow], self.row_ptr[brow + 1]);
        if let Some(k) = (start..end).find(|&k| self.col_indices[k] == bcol) {
            return k;
        }
        let pos = if self.diag_first && brow == bcol {
            start
        } else if self.sorted {
            let skip = usize::from(self.diag_first && start < end && self.col_indices[start] == brow);
            let s = start + skip;
            s + self.col_indices[s..end].partition_point(|&c| c < bcol)
        } else {
            end
        };
        self.col_indices.insert(pos, bcol);
        let at = pos * self.b_size;
        let tail = self.values.split_off(at);
        self.values.resize(at + self.b_size, 0.0);
        self.values.extend(tail);
        self.n_blocks += 1;
        for p in &mut self.row_ptr[brow + 1..] {
            *p += 1;
        }
        pos
    }

    fn push_block(&mut self, bcol: usize, block: &[f64]) {
        self.col_indices.push(bcol);
        self.values.extend_from_slice(block);
        self.n_blocks += 1;
    }

    /// Reorder the blocks of one block row by `perm` (indices relative to the
    /// row start).
    fn permute_row(&mut self, brow: usize, perm: &[usize]) {
        let start = self.row_ptr[brow];
        let b_size = self.b_size;
        let cols: Vec<usize> = perm.iter().map(|&p| self.col_indices[start + p]).collect();
        let vals: Vec<f64> = perm
            .iter()
            .flat_map(|&p| self.values[(start + p) * b_size..(start + p + 1) * b_size].iter().copied())
            .collect();
        self.col_indices[start..start + perm.len()].copy_from_slice(&cols);
        self.values[start * b_size..(start + perm.len()) * b_size].copy_from_slice(&vals);
    }
}

impl Matrix for BsrMatrix {
    fn format(&self) -> Format {
        Format::Bsr
    }

    fn n_rows(&self) -> usize {
        self.n_rows
    }

    fn n_cols(&self) -> usize {
        self.n_cols
    }

    fn nnz(&self) -> usize {
        self.n_blocks * self.b_size
    }

    fn is_sorted(&self) -> bool {
        self.sorted
    }

    fn is_diag_first(&self) -> bool {
        self.diag_first
    }

    /// Sort blocks by block column within each block row.
    fn sort(&mut self) {
        if self.sorted && !self.diag_first {
            return;
        }
        for brow in 0..self.n_block_rows() {
            let (start, end) = (self.row_ptr[brow], self.row_ptr[brow + 1]);
            let mut perm: Vec<usize> = (0..end - start).collect();
            perm.sort_by_key(|&p| self.col_indices[start + p]);
            self.permute_row(brow, &perm);
        }
        self.sorted = true;
        self.diag_first = false;
    }

    /// Move the diagonal block (block column equal to block row) to the
    /// front of its block row.
    ///
    /// With non-square blocks (`b_rows != b_cols`) the block at
    /// `bcol == brow` does not in general hold the scalar diagonal of the
    /// matrix; it is still the block moved to the front.
    fn move_diag(&mut self) {
        if self.diag_first {
            return;
        }
        for brow in 0..self.n_block_rows().min(self.n_block_cols()) {
            let (start, end) = (self.row_ptr[brow], self.row_ptr[brow + 1]);
            if let Some(p) = (start..end).find(|&k| self.col_indices[k] == brow) {
                let mut perm: Vec<usize> = (0..end - start).collect();
                perm[..=p - start].rotate_right(1);
                self.permute_row(brow, &perm);
            }
        }
        self.diag_first = true;
    }

    /// Merge blocks sharing a block column by summing them elementwise.
    fn remove_duplicates(&mut self) {
        let diag_first = self.diag_first;
        if !self.sorted || diag_first {
            self.sort();
        }
        let b_size = self.b_size;
        let mut w = 0;
        let mut read = 0;
        for brow in 0..self.n_block_rows() {
            let end = self.row_ptr[brow + 1];
            let row_start = w;
            while read < end {
                let bcol = self.col_indices[read];
                if w > row_start && self.col_indices[w - 1] == bcol {
                    for t in 0..b_size {
                        self.values[(w - 1) * b_size + t] += self.values[read * b_size + t];
                    }
                } else {
                    self.col_indices[w] = bcol;
                    self.values
                        .copy_within(read * b_size..(read + 1) * b_size, w * b_size);
                    w += 1;
                }
                read += 1;
            }
            self.row_ptr[brow + 1] = w;
        }
        self.col_indices.truncate(w);
        self.values.truncate(w * b_size);
        self.n_blocks = w;
        if diag_first {
            self.move_diag();
        }
    }

    /// Accumulate a scalar, creating its enclosing block (zero-filled) when
    /// absent.
    fn add_value(&mut self, row: usize, col: usize, val: f64) -> Result<()> {
        check_position(&*self, row, col)?;
        let k = self.find_or_insert(row / self.b_rows, col / self.b_cols);
        self.values[k * self.b_size + (row % self.b_rows) * self.b_cols + col % self.b_cols] += val;
        Ok(())
    }

    /// Accumulate one whole block. `(row, col)` is the global top-left scalar
    /// position and must lie on the block grid; `shape` must equal the block
    /// dimensions.
    fn add_block(
        &mut self,
        row: usize,
        col: usize,
        shape: (usize, usize),
        values: &[f64],
    ) -> Result<()> {
        if shape != (self.b_rows, self.b_cols) {
            return Err(SparseError::dims(format!(
                "block shape {}x{} does not match {}x{} blocks",
                shape.0, shape.1, self.b_rows, self.b_cols
            )));
        }
        check_len("block values", values.len(), self.b_size)?;
        check_position(&*self, row, col)?;
        if row % self.b_rows != 0 || col % self.b_cols != 0 {
            return Err(SparseError::dims(format!(
                "block origin ({row}, {col}) is not on the {}x{} grid",
                self.b_rows, self.b_cols
            )));
        }
        self.accumulate_block(row / self.b_rows, col / self.b_cols, values);
        Ok(())
    }

    /// Block-row traversal with a dense `b_rows x b_cols` multiply per block.
    fn spmv_kernel(&self, x: &[f64], b: &mut [f64], op: Op, sign: f64) {
        let (br, bc) = (self.b_rows, self.b_cols);
        for brow in 0..self.n_block_rows() {
            for (bcol, block) in self.block_row(brow) {
                match op {
                    Op::NoTrans => {
                        let xs = &x[bcol * bc..(bcol + 1) * bc];
                        for i in 0..br {
                            let mut sum = 0.0f64;
                            for j in 0..bc {
                                sum += block[i * bc + j] * xs[j];
                            }
                            b[brow * br + i] += sign * sum;
                        }
                    }
                    Op::Trans => {
                        for i in 0..br {
                            let xi = x[brow * br + i];
                            for j in 0..bc {
                                b[bcol * bc + j] += sign * (block[i * bc + j] * xi);
                            }
                        }
                    }
                }
            }
        }
    }

    fn to_coo(&self) -> CooMatrix {
        convert::bsr_to_coo(self)
    }

    fn to_csr(&self) -> CsrMatrix {
        convert::bsr_to_csr(self)
    }

    fn to_csc(&self) -> CscMatrix {
        convert::bsr_to_csc(self)
    }

    fn to_bsr(&self, b_rows: usize, b_cols: usize) -> Result<BsrMatrix> {
        if (b_rows, b_cols) == (self.b_rows, self.b_cols) {
            return Ok(self.clone());
        }
        BsrMatrix::from_csr(&self.to_csr(), b_rows, b_cols)
    }

    /// Counting sort over block columns; each block is transposed in place
    /// of the copy, so the result has `b_cols x b_rows` blocks.
    fn transpose(&self) -> BsrMatrix {
        let (br, bc, b_size) = (self.b_rows, self.b_cols, self.b_size);
        let t_block_rows = self.n_block_cols();

        let mut row_ptr = vec![0usize; t_block_rows + 1];
        for &c in &self.col_indices {
            row_ptr[c + 1] += 1;
        }
        for i in 1..=t_block_rows {
            row_ptr[i] += row_ptr[i - 1];
        }

        let mut col_indices = vec![0usize; self.n_blocks];
        let mut values = vec![0.0f64; self.values.len()];
        let mut cursor = row_ptr.clone();
        for brow in 0..self.n_block_rows() {
            for (bcol, block) in self.block_row(brow) {
                let dest = cursor[bcol];
                col_indices[dest] = brow;
                let out = &mut values[dest * b_size..(dest + 1) * b_size];
                for i in 0..br {
                    for j in 0..bc {
                        out[j * br + i] = block[i * bc + j];
                    }
                }
                cursor[bcol] += 1;
            }
        }

        BsrMatrix {
            n_rows: self.n_cols,
            n_cols: self.n_rows,
            b_rows: bc,
            b_cols: br,
            b_size,
            n_blocks: self.n_blocks,
            row_ptr,
            col_indices,
            values,
            sorted: true,
            diag_first: false,
        }
    }
}

impl std::fmt::Display for BsrMatrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fmt_entries(self, f)
    }
}
