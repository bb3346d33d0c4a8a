//! The shared matrix contract.
//!
//! Every storage format implements [`Matrix`]. A format supplies its
//! structural operations (sort, duplicate reduction, diagonal placement,
//! insertion), a single unchecked SpMV kernel and its conversions; the checked
//! multiplication family, residual, dense export and the multigrid entry
//! points are provided on top of those.
//!
//! Formats that cannot run a sparse-sparse product keep the default
//! [`spgemm`](Matrix::spgemm) / [`spgemm_t`](Matrix::spgemm_t), which return
//! [`SparseError::Unsupported`]. Callers convert to CSR and retry.

use crate::aggregate;
use crate::bsr::BsrMatrix;
use crate::coo::CooMatrix;
use crate::csc::CscMatrix;
use crate::csr::CsrMatrix;
use crate::error::{Result, SparseError};
use crate::relax;
use crate::strength;
use crate::types::{Format, StrengthType};
use crate::validation::check_len;

/// Direction of a matrix-vector product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// `b <- b + sign * A x`
    NoTrans,
    /// `b <- b + sign * A^T x`
    Trans,
}

/// Capability set shared by the COO, CSR, CSC and BSR formats.
pub trait Matrix {
    // -------------------------------------------------------------------
    // Shape and state
    // -------------------------------------------------------------------

    /// Storage format tag.
    fn format(&self) -> Format;

    /// Number of rows.
    fn n_rows(&self) -> usize;

    /// Number of columns.
    fn n_cols(&self) -> usize;

    /// Number of stored scalar values (block zeros included for BSR).
    fn nnz(&self) -> usize;

    /// Whether entries are in the canonical order of the format.
    fn is_sorted(&self) -> bool;

    /// Whether each row/column run stores its diagonal entry first.
    fn is_diag_first(&self) -> bool;

    // -------------------------------------------------------------------
    // Structural mutation
    // -------------------------------------------------------------------

    /// Put entries in the canonical order of the format.
    fn sort(&mut self);

    /// Move the diagonal entry, when present, to the front of its run.
    fn move_diag(&mut self);

    /// Merge entries sharing a position by summing their values.
    fn remove_duplicates(&mut self);

    /// Accumulate `val` at `(row, col)`.
    ///
    /// # Errors
    ///
    /// [`SparseError::IndexOutOfBounds`] when the position lies outside the
    /// matrix.
    fn add_value(&mut self, row: usize, col: usize, val: f64) -> Result<()>;

    /// Accumulate a dense row-major block whose top-left scalar position is
    /// `(row, col)`.
    ///
    /// Scalar formats insert each nonzero of the block through
    /// [`add_value`](Matrix::add_value).
    fn add_block(
        &mut self,
        row: usize,
        col: usize,
        shape: (usize, usize),
        values: &[f64],
    ) -> Result<()> {
        let (rows, cols) = shape;
        check_len("block values", values.len(), rows * cols)?;
        check_position(&*self, row + rows.saturating_sub(1), col + cols.saturating_sub(1))?;
        for i in 0..rows {
            for j in 0..cols {
                let v = values[i * cols + j];
                if v != 0.0 {
                    self.add_value(row + i, col + j, v)?;
                }
            }
        }
        Ok(())
    }

    // -------------------------------------------------------------------
    // Kernels
    // -------------------------------------------------------------------

    /// `b <- b + sign * op(A) x` in storage order.
    ///
    /// Lengths are not checked here; use the checked wrappers below.
    fn spmv_kernel(&self, x: &[f64], b: &mut [f64], op: Op, sign: f64);

    /// `b = A x`.
    fn mult(&self, x: &[f64], b: &mut [f64]) -> Result<()> {
        check_mult(self, x, b, Op::NoTrans)?;
        b.fill(0.0);
        self.spmv_kernel(x, b, Op::NoTrans, 1.0);
        Ok(())
    }

    /// `b = A^T x`.
    fn mult_t(&self, x: &[f64], b: &mut [f64]) -> Result<()> {
        check_mult(self, x, b, Op::Trans)?;
        b.fill(0.0);
        self.spmv_kernel(x, b, Op::Trans, 1.0);
        Ok(())
    }

    /// `b += A x`.
    fn mult_append(&self, x: &[f64], b: &mut [f64]) -> Result<()> {
        check_mult(self, x, b, Op::NoTrans)?;
        self.spmv_kernel(x, b, Op::NoTrans, 1.0);
        Ok(())
    }

    /// `b += A^T x`.
    fn mult_append_t(&self, x: &[f64], b: &mut [f64]) -> Result<()> {
        check_mult(self, x, b, Op::Trans)?;
        self.spmv_kernel(x, b, Op::Trans, 1.0);
        Ok(())
    }

    /// `b -= A x`.
    fn mult_append_neg(&self, x: &[f64], b: &mut [f64]) -> Result<()> {
        check_mult(self, x, b, Op::NoTrans)?;
        self.spmv_kernel(x, b, Op::NoTrans, -1.0);
        Ok(())
    }

    /// `b -= A^T x`.
    fn mult_append_neg_t(&self, x: &[f64], b: &mut [f64]) -> Result<()> {
        check_mult(self, x, b, Op::Trans)?;
        self.spmv_kernel(x, b, Op::Trans, -1.0);
        Ok(())
    }

    /// `r = b - A x`.
    ///
    /// `A x` is accumulated into `r` exactly as [`mult`](Matrix::mult) would,
    /// then subtracted from `b`, so the result is bit-identical to computing
    /// the product separately.
    fn residual(&self, x: &[f64], b: &[f64], r: &mut [f64]) -> Result<()> {
        check_len("b", b.len(), self.n_rows())?;
        check_mult(self, x, r, Op::NoTrans)?;
        r.fill(0.0);
        self.spmv_kernel(x, r, Op::NoTrans, 1.0);
        for (ri, &bi) in r.iter_mut().zip(b) {
            *ri = bi - *ri;
        }
        Ok(())
    }

    // -------------------------------------------------------------------
    // Conversion
    // -------------------------------------------------------------------

    /// Fresh COO copy.
    fn to_coo(&self) -> CooMatrix;

    /// Fresh CSR copy.
    fn to_csr(&self) -> CsrMatrix;

    /// Fresh CSC copy.
    fn to_csc(&self) -> CscMatrix;

    /// Fresh BSR copy with `b_rows x b_cols` blocks.
    ///
    /// # Errors
    ///
    /// [`SparseError::InvalidBlockShape`] when the dimensions are not
    /// divisible by the block dimensions.
    fn to_bsr(&self, b_rows: usize, b_cols: usize) -> Result<BsrMatrix> {
        BsrMatrix::from_csr(&self.to_csr(), b_rows, b_cols)
    }

    /// Row-major dense copy; duplicate entries are summed.
    fn to_dense(&self) -> Vec<f64> {
        let coo = self.to_coo();
        let mut dense = vec![0.0; self.n_rows() * self.n_cols()];
        for k in 0..coo.nnz() {
            dense[coo.rows[k] * self.n_cols() + coo.cols[k]] += coo.vals[k];
        }
        dense
    }

    /// `A^T` in the same format.
    fn transpose(&self) -> Self
    where
        Self: Sized;

    /// Deep copy.
    fn copy(&self) -> Self
    where
        Self: Sized + Clone,
    {
        self.clone()
    }

    // -------------------------------------------------------------------
    // Sparse-sparse products
    // -------------------------------------------------------------------

    /// `A B` in CSR form. Only CSR receivers support this.
    fn spgemm(&self, _b: &CsrMatrix) -> Result<CsrMatrix> {
        Err(SparseError::Unsupported {
            op: "spgemm",
            format: self.format(),
        })
    }

    /// `A^T B` where `self` is `B` (CSR) and `a` is stored column-wise.
    /// Only CSR receivers support this.
    fn spgemm_t(&self, _a: &CscMatrix) -> Result<CsrMatrix> {
        Err(SparseError::Unsupported {
            op: "spgemm_t",
            format: self.format(),
        })
    }

    // -------------------------------------------------------------------
    // Multigrid primitives (CSR kernels)
    // -------------------------------------------------------------------

    /// Strength-of-connection matrix. See [`strength::strength`].
    fn strength(
        &self,
        strength_type: StrengthType,
        theta: f64,
        num_variables: usize,
        variables: Option<&[usize]>,
    ) -> Result<CsrMatrix> {
        strength::strength(&self.to_csr(), strength_type, theta, num_variables, variables)
    }

    /// Aggregation operator built from `self` as a strength graph. See
    /// [`aggregate::aggregate`].
    fn aggregate(&self) -> Result<CsrMatrix> {
        aggregate::aggregate(&self.to_csr())
    }

    /// One weighted-Jacobi sweep. See [`relax::jacobi`].
    fn jacobi(&self, x: &mut [f64], b: &[f64], tmp: &mut [f64], omega: f64) -> Result<()> {
        relax::jacobi(&self.to_csr(), x, b, tmp, omega)
    }

    /// One forward Gauss-Seidel sweep. See [`relax::gauss_seidel`].
    fn gauss_seidel(&self, x: &mut [f64], b: &[f64]) -> Result<()> {
        relax::gauss_seidel(&self.to_csr(), x, b)
    }

    /// One forward SOR sweep. See [`relax::sor`].
    fn sor(&self, x: &mut [f64], b: &[f64], omega: f64) -> Result<()> {
        relax::sor(&self.to_csr(), x, b, omega)
    }
}

/// Reject positions outside the matrix.
pub(crate) fn check_position<M: Matrix + ?Sized>(m: &M, row: usize, col: usize) -> Result<()> {
    if row >= m.n_rows() || col >= m.n_cols() {
        return Err(SparseError::IndexOutOfBounds {
            row,
            col,
            n_rows: m.n_rows(),
            n_cols: m.n_cols(),
        });
    }
    Ok(())
}

fn check_mult<M: Matrix + ?Sized>(m: &M, x: &[f64], b: &[f64], op: Op) -> Result<()> {
    let (x_len, b_len) = match op {
        Op::NoTrans => (m.n_cols(), m.n_rows()),
        Op::Trans => (m.n_rows(), m.n_cols()),
    };
    check_len("x", x.len(), x_len)?;
    check_len("b", b.len(), b_len)?;
    Ok(())
}

/// Shared `Display` body: a header line then one `(row, col) value` line per
/// stored entry, in COO order.
pub(crate) fn fmt_entries<M: Matrix + ?Sized>(
    m: &M,
    f: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
    let coo = m.to_coo();
    writeln!(
        f,
        "{} matrix {}x{} ({} stored)",
        m.format(),
        m.n_rows(),
        m.n_cols(),
        m.nnz()
    )?;
    for k in 0..coo.nnz() {
        writeln!(f, "({}, {}) {:e}", coo.rows[k], coo.cols[k], coo.vals[k])?;
    }
    Ok(())
}
