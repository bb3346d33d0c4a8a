//! Error types for the sparse matrix core.
//!
//! Every precondition the kernels rely on (vector lengths, index ranges, block
//! grid divisibility, format support) is checked up front and reported through
//! [`SparseError`]. Nothing in this crate terminates the process on bad input.

use crate::types::Format;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SparseError>;

/// Primary error type for sparse matrix operations.
#[derive(Debug, thiserror::Error)]
pub enum SparseError {
    /// Matrix dimensions are not divisible by the requested block dimensions
    /// (or a block dimension is zero). No BSR matrix can be built.
    #[error(
        "matrix dimensions {n_rows}x{n_cols} are not divisible by block dimensions {b_rows}x{b_cols}"
    )]
    InvalidBlockShape {
        /// Number of scalar rows requested.
        n_rows: usize,
        /// Number of scalar columns requested.
        n_cols: usize,
        /// Rows per block.
        b_rows: usize,
        /// Columns per block.
        b_cols: usize,
    },

    /// The operation cannot run on this storage format. Convert the operand
    /// (usually to CSR) and retry.
    #[error("{op} is not supported for {format} matrices")]
    Unsupported {
        /// Name of the rejected operation.
        op: &'static str,
        /// Format of the receiver.
        format: Format,
    },

    /// A `(row, col)` position lies outside the matrix.
    #[error("position ({row}, {col}) out of bounds for {n_rows}x{n_cols} matrix")]
    IndexOutOfBounds {
        /// Offending row.
        row: usize,
        /// Offending column.
        col: usize,
        /// Matrix rows.
        n_rows: usize,
        /// Matrix columns.
        n_cols: usize,
    },

    /// An iterative method did not reach its tolerance.
    #[error(
        "solver did not converge after {iterations} iterations (residual={residual:.2e}, tol={tolerance:.2e})"
    )]
    NonConvergence {
        /// Iterations completed.
        iterations: usize,
        /// Final relative residual.
        residual: f64,
        /// Target tolerance.
        tolerance: f64,
    },

    /// The caller supplied structurally invalid input.
    #[error("invalid input: {0}")]
    InvalidInput(#[from] ValidationError),
}

/// Structural validation errors.
///
/// Raised eagerly by constructors and kernels before any data is touched.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    /// Lengths or dimensions do not agree.
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// A value is NaN or infinite where a finite number is required.
    #[error("non-finite value detected: {0}")]
    NonFiniteValue(String),

    /// A stored index exceeds its dimension.
    #[error("index {index} at position {position} out of bounds (bound {bound})")]
    IndexOutOfBounds {
        /// Offending index value.
        index: usize,
        /// Position in the index array.
        position: usize,
        /// Exclusive upper bound.
        bound: usize,
    },

    /// A pointer array decreases.
    #[error("pointer array is not monotonically non-decreasing at position {position}")]
    NonMonotonicPointer {
        /// Position where the violation was detected.
        position: usize,
    },

    /// A parameter is outside its valid range.
    #[error("parameter out of range: {name} = {value} (expected {expected})")]
    ParameterOutOfRange {
        /// Name of the parameter.
        name: String,
        /// The invalid value.
        value: String,
        /// Human-readable description of the valid range.
        expected: String,
    },
}

impl SparseError {
    /// Shorthand for a [`ValidationError::DimensionMismatch`].
    pub(crate) fn dims(msg: impl Into<String>) -> Self {
        SparseError::InvalidInput(ValidationError::DimensionMismatch(msg.into()))
    }
}
