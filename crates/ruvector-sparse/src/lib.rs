//! Sparse matrix core for the ruvector multigrid and Krylov stack.
//!
//! Four storage formats share one [`Matrix`] contract:
//!
//! | Format | Type | Best for |
//! |--------|------|----------|
//! | COO | [`CooMatrix`] | incremental assembly, duplicates allowed |
//! | CSR | [`CsrMatrix`] | SpMV, SpGEMM, strength, aggregation, relaxation |
//! | CSC | [`CscMatrix`] | column access, left operand of `spgemm_t` |
//! | BSR | [`BsrMatrix`] | block-structured (multi-variable) problems |
//!
//! Every format converts losslessly to every other (see [`convert`] and
//! [`SparseMatrix::convert`]). All fallible operations return
//! [`Result`]; nothing in this crate aborts on bad input.
//!
//! # Example
//!
//! ```rust
//! use ruvector_sparse::{CooMatrix, Matrix};
//!
//! let coo = CooMatrix::from_dense(3, 3, &[
//!     1.0, 0.0, 0.0,
//!     0.0, 1.0, 0.0,
//!     0.0, 0.0, 1.0,
//! ]).unwrap();
//! let mut a = coo.to_csr();
//!
//! let x = [1.0, 2.0, 3.0];
//! let mut b = vec![0.0; 3];
//! a.mult(&x, &mut b).unwrap();
//! assert_eq!(b, vec![1.0, 2.0, 3.0]);
//!
//! a.add_value(0, 0, 5.0).unwrap();
//! a.remove_duplicates();
//! a.mult(&x, &mut b).unwrap();
//! assert_eq!(b, vec![8.0, 2.0, 3.0]);
//! ```

pub mod aggregate;
pub mod bsr;
pub mod cg;
pub mod convert;
pub mod coo;
pub mod csc;
pub mod csr;
pub mod error;
pub mod gallery;
pub mod relax;
pub mod spgemm;
pub mod strength;
pub mod traits;
pub mod types;
pub mod validation;
pub mod vector;

pub use aggregate::FitCandidates;
pub use bsr::BsrMatrix;
pub use cg::{CgResult, ConjugateGradientSolver};
pub use convert::SparseMatrix;
pub use coo::CooMatrix;
pub use csc::CscMatrix;
pub use csr::CsrMatrix;
pub use error::{Result, SparseError, ValidationError};
pub use traits::{Matrix, Op};
pub use types::{Format, SparseConfig, StrengthType, DEFAULT_ZERO_TOL};
pub use vector::Vector;
