//! Format conversions, keyed by `(source, destination)`.
//!
//! Each `Matrix::to_*` method forwards here, so every pair of formats shares
//! one implementation. Conversions borrow the source and always allocate a
//! fresh matrix. Scatters into compressed storage are stable counting sorts:
//! the source's entry order survives inside each row or column, which is what
//! lets the `sorted` flag carry over without re-sorting.

use tracing::debug;

use crate::bsr::BsrMatrix;
use crate::coo::CooMatrix;
use crate::csc::CscMatrix;
use crate::csr::CsrMatrix;
use crate::error::Result;
use crate::traits::{Matrix, Op};
use crate::types::Format;

// ---------------------------------------------------------------------------
// Shared scatter
// ---------------------------------------------------------------------------

/// Stable counting scatter of `(major, minor, value)` triplets into compressed
/// arrays with `n_major` runs. `entries` is walked twice: once to count, once
/// to place.
fn compress<I>(
    n_major: usize,
    nnz: usize,
    entries: impl Fn() -> I,
) -> (Vec<usize>, Vec<usize>, Vec<f64>)
where
    I: Iterator<Item = (usize, usize, f64)>,
{
    let mut ptr = vec![0usize; n_major + 1];
    for (major, _, _) in entries() {
        ptr[major + 1] += 1;
    }
    for i in 1..=n_major {
        ptr[i] += ptr[i - 1];
    }

    let mut idx = vec![0usize; nnz];
    let mut vals = vec![0.0f64; nnz];
    let mut cursor = ptr.clone();
    for (major, minor, v) in entries() {
        let dest = cursor[major];
        idx[dest] = minor;
        vals[dest] = v;
        cursor[major] += 1;
    }
    (ptr, idx, vals)
}

// ---------------------------------------------------------------------------
// From COO
// ---------------------------------------------------------------------------

/// COO to CSR. Within-row order is the COO entry order.
pub fn coo_to_csr(coo: &CooMatrix) -> CsrMatrix {
    let (row_ptr, col_indices, values) = compress(coo.n_rows, coo.nnz(), || coo.entries());
    debug!(rows = coo.n_rows, cols = coo.n_cols, nnz = coo.nnz(), "coo -> csr");
    CsrMatrix {
        n_rows: coo.n_rows,
        n_cols: coo.n_cols,
        row_ptr,
        col_indices,
        values,
        sorted: coo.sorted,
        diag_first: coo.sorted && coo.diag_first,
    }
}

/// COO to CSC. A row-sorted COO yields ascending rows in every column.
pub fn coo_to_csc(coo: &CooMatrix) -> CscMatrix {
    let (col_ptr, row_indices, values) = compress(coo.n_cols, coo.nnz(), || {
        coo.entries().map(|(r, c, v)| (c, r, v))
    });
    debug!(rows = coo.n_rows, cols = coo.n_cols, nnz = coo.nnz(), "coo -> csc");
    CscMatrix {
        n_rows: coo.n_rows,
        n_cols: coo.n_cols,
        col_ptr,
        row_indices,
        values,
        sorted: coo.sorted,
        diag_first: false,
    }
}

// ---------------------------------------------------------------------------
// From CSR
// ---------------------------------------------------------------------------

/// CSR to COO, expanding the row pointer.
pub fn csr_to_coo(csr: &CsrMatrix) -> CooMatrix {
    let nnz = csr.nnz();
    let mut rows = Vec::with_capacity(nnz);
    for row in 0..csr.n_rows {
        rows.extend(std::iter::repeat(row).take(csr.row_degree(row)));
    }
    CooMatrix {
        n_rows: csr.n_rows,
        n_cols: csr.n_cols,
        rows,
        cols: csr.col_indices.clone(),
        vals: csr.values.clone(),
        sorted: csr.sorted,
        diag_first: csr.diag_first,
    }
}

/// CSR to CSC. Rows are visited in order, so every column comes out sorted.
pub fn csr_to_csc(csr: &CsrMatrix) -> CscMatrix {
    let entries = || {
        (0..csr.n_rows).flat_map(move |row| csr.row_entries(row).map(move |(col, v)| (col, row, v)))
    };
    let (col_ptr, row_indices, values) = compress(csr.n_cols, csr.nnz(), entries);
    debug!(rows = csr.n_rows, cols = csr.n_cols, nnz = csr.nnz(), "csr -> csc");
    CscMatrix {
        n_rows: csr.n_rows,
        n_cols: csr.n_cols,
        col_ptr,
        row_indices,
        values,
        sorted: true,
        diag_first: false,
    }
}

// ---------------------------------------------------------------------------
// From CSC
// ---------------------------------------------------------------------------

/// CSC to CSR. Columns are visited in order, so every row comes out sorted.
pub fn csc_to_csr(csc: &CscMatrix) -> CsrMatrix {
    let entries = || {
        (0..csc.n_cols).flat_map(move |col| csc.col_entries(col).map(move |(row, v)| (row, col, v)))
    };
    let (row_ptr, col_indices, values) = compress(csc.n_rows, csc.nnz(), entries);
    debug!(rows = csc.n_rows, cols = csc.n_cols, nnz = csc.nnz(), "csc -> csr");
    CsrMatrix {
        n_rows: csc.n_rows,
        n_cols: csc.n_cols,
        row_ptr,
        col_indices,
        values,
        sorted: true,
        diag_first: false,
    }
}

/// CSC to COO, in row-major order.
pub fn csc_to_coo(csc: &CscMatrix) -> CooMatrix {
    csr_to_coo(&csc_to_csr(csc))
}

// ---------------------------------------------------------------------------
// From BSR
// ---------------------------------------------------------------------------

/// BSR to CSR. Every stored block scalar becomes an entry, zeros included,
/// so `nnz` is preserved.
pub fn bsr_to_csr(bsr: &BsrMatrix) -> CsrMatrix {
    let mut out = CsrMatrix::with_capacity(bsr.n_rows, bsr.n_cols, bsr.nnz());
    for brow in 0..bsr.n_block_rows() {
        for i in 0..bsr.b_rows {
            let row = brow * bsr.b_rows + i;
            for k in bsr.row_ptr[brow]..bsr.row_ptr[brow + 1] {
                let block = bsr.block(k);
                let col0 = bsr.col_indices[k] * bsr.b_cols;
                for j in 0..bsr.b_cols {
                    out.col_indices.push(col0 + j);
                    out.values.push(block[i * bsr.b_cols + j]);
                }
            }
            out.row_ptr[row + 1] = out.values.len();
        }
    }
    out.sorted = bsr.sorted && !bsr.diag_first;
    debug!(
        rows = bsr.n_rows,
        cols = bsr.n_cols,
        blocks = bsr.n_blocks,
        nnz = out.nnz(),
        "bsr -> csr"
    );
    out
}

/// BSR to COO via CSR.
pub fn bsr_to_coo(bsr: &BsrMatrix) -> CooMatrix {
    csr_to_coo(&bsr_to_csr(bsr))
}

/// BSR to CSC via CSR.
pub fn bsr_to_csc(bsr: &BsrMatrix) -> CscMatrix {
    csr_to_csc(&bsr_to_csr(bsr))
}

// ---------------------------------------------------------------------------
// Dynamic dispatch
// ---------------------------------------------------------------------------

/// A matrix in any of the four storage formats.
///
/// Useful when the format is chosen at runtime; [`SparseMatrix::convert`] is
/// the single entry point for every `(source, destination)` pair.
#[derive(Debug, Clone, PartialEq)]
pub enum SparseMatrix {
    Coo(CooMatrix),
    Csr(CsrMatrix),
    Csc(CscMatrix),
    Bsr(BsrMatrix),
}

impl SparseMatrix {
    /// Storage format of the wrapped matrix.
    pub fn format(&self) -> Format {
        self.as_matrix().format()
    }

    /// Borrow the wrapped matrix through the shared contract.
    pub fn as_matrix(&self) -> &dyn Matrix {
        match self {
            SparseMatrix::Coo(m) => m,
            SparseMatrix::Csr(m) => m,
            SparseMatrix::Csc(m) => m,
            SparseMatrix::Bsr(m) => m,
        }
    }

    /// Mutably borrow the wrapped matrix through the shared contract.
    pub fn as_matrix_mut(&mut self) -> &mut dyn Matrix {
        match self {
            SparseMatrix::Coo(m) => m,
            SparseMatrix::Csr(m) => m,
            SparseMatrix::Csc(m) => m,
            SparseMatrix::Bsr(m) => m,
        }
    }

    /// Convert to `target`, leaving `self` untouched.
    ///
    /// `block` gives the block dimensions for a BSR target. When omitted, a
    /// BSR source keeps its own and any other source uses `1 x 1` blocks.
    ///
    /// # Errors
    ///
    /// [`SparseError::InvalidBlockShape`](crate::SparseError::InvalidBlockShape)
    /// when the block grid does not divide the matrix.
    pub fn convert(&self, target: Format, block: Option<(usize, usize)>) -> Result<SparseMatrix> {
        let m = self.as_matrix();
        let out = match target {
            Format::Coo => SparseMatrix::Coo(m.to_coo()),
            Format::Csr => SparseMatrix::Csr(m.to_csr()),
            Format::Csc => SparseMatrix::Csc(m.to_csc()),
            Format::Bsr => {
                let (b_rows, b_cols) = match (block, self) {
                    (Some(shape), _) => shape,
                    (None, SparseMatrix::Bsr(b)) => (b.b_rows, b.b_cols),
                    (None, _) => (1, 1),
                };
                match self {
                    SparseMatrix::Bsr(b) if (b.b_rows, b.b_cols) == (b_rows, b_cols) => {
                        SparseMatrix::Bsr(b.clone())
                    }
                    _ => SparseMatrix::Bsr(m.to_bsr(b_rows, b_cols)?),
                }
            }
        };
        debug!(from = %self.format(), to = %target, "convert");
        Ok(out)
    }

    /// `b = A x` on whichever format is wrapped.
    pub fn mult(&self, x: &[f64], b: &mut [f64]) -> Result<()> {
        self.as_matrix().mult(x, b)
    }

    /// `b += sign * op(A) x` without length checks.
    pub fn spmv_kernel(&self, x: &[f64], b: &mut [f64], op: Op, sign: f64) {
        self.as_matrix().spmv_kernel(x, b, op, sign)
    }

    /// Transpose in the wrapped format.
    pub fn transpose(&self) -> SparseMatrix {
        match self {
            SparseMatrix::Coo(m) => SparseMatrix::Coo(m.transpose()),
            SparseMatrix::Csr(m) => SparseMatrix::Csr(m.transpose()),
            SparseMatrix::Csc(m) => SparseMatrix::Csc(m.transpose()),
            SparseMatrix::Bsr(m) => SparseMatrix::Bsr(m.transpose()),
        }
    }
}

impl From<CooMatrix> for SparseMatrix {
    fn from(m: CooMatrix) -> Self {
        SparseMatrix::Coo(m)
    }
}

impl From<CsrMatrix> for SparseMatrix {
    fn from(m: CsrMatrix) -> Self {
        SparseMatrix::Csr(m)
    }
}

impl From<CscMatrix> for SparseMatrix {
    fn from(m: CscMatrix) -> Self {
        SparseMatrix::Csc(m)
    }
}

impl From<BsrMatrix> for SparseMatrix {
    fn from(m: BsrMatrix) -> Self {
        SparseMatrix::Bsr(m)
    }
}
