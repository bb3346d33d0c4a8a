//! Conjugate Gradient for symmetric positive-definite systems.
//!
//! Solves `Ax = b` for any [`Matrix`] using only its checked kernels
//! (`residual` and `mult`), starting from the caller's `x`.
//!
//! ```text
//! r = b - A*x
//! p = r
//! rr = r . r
//!
//! for k in 0..max_iterations:
//!     Ap = A * p
//!     alpha = rr / (p . Ap)
//!     x  = x + alpha * p
//!     r  = r - alpha * Ap
//!     if ||r||_2 / ||b||_2 < tolerance:
//!         converged; break
//!     rr_new = r . r
//!     p  = r + (rr_new / rr) * p
//!     rr = rr_new
//! ```

use tracing::{debug, trace, warn};

use crate::error::{Result, SparseError, ValidationError};
use crate::traits::Matrix;
use crate::validation::check_len;
use crate::vector::{axpy, dot, norm2};

/// Outcome of a converged CG solve.
#[derive(Debug, Clone, PartialEq)]
pub struct CgResult {
    /// Iterations performed.
    pub iterations: usize,
    /// Final relative residual `||r|| / ||b||`.
    pub residual_norm: f64,
    /// Relative residual before the first iteration and after each one.
    pub residuals: Vec<f64>,
}

/// Unpreconditioned Conjugate Gradient solver.
///
/// Stores only the stopping criteria; a solve borrows the matrix and writes
/// the solution into the caller's buffer.
#[derive(Debug, Clone)]
pub struct ConjugateGradientSolver {
    /// Relative residual convergence tolerance.
    tolerance: f64,
    /// Maximum number of CG iterations before declaring non-convergence.
    max_iterations: usize,
}

impl Default for ConjugateGradientSolver {
    fn default() -> Self {
        Self::new(1e-5, 100)
    }
}

impl ConjugateGradientSolver {
    /// Create a new CG solver.
    ///
    /// # Arguments
    ///
    /// * `tolerance` -- Relative residual threshold for convergence. Must be
    ///   positive and finite.
    /// * `max_iterations` -- Upper bound on CG iterations. Must be >= 1.
    pub fn new(tolerance: f64, max_iterations: usize) -> Self {
        Self {
            tolerance,
            max_iterations,
        }
    }

    /// Return the configured tolerance.
    #[inline]
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Return the configured maximum iterations.
    #[inline]
    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    fn validate<M: Matrix + ?Sized>(&self, matrix: &M, rhs: &[f64], x: &[f64]) -> Result<()> {
        if matrix.n_rows() != matrix.n_cols() {
            return Err(SparseError::dims(format!(
                "CG requires a square matrix but got {}x{}",
                matrix.n_rows(),
                matrix.n_cols(),
            )));
        }
        check_len("rhs", rhs.len(), matrix.n_rows())?;
        check_len("x", x.len(), matrix.n_cols())?;

        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return Err(ValidationError::ParameterOutOfRange {
                name: "tolerance".into(),
                value: self.tolerance.to_string(),
                expected: "positive finite value".into(),
            }
            .into());
        }
        if self.max_iterations == 0 {
            return Err(ValidationError::ParameterOutOfRange {
                name: "max_iterations".into(),
                value: "0".into(),
                expected: ">= 1".into(),
            }
            .into());
        }
        Ok(())
    }

    /// Solve `Ax = b`, using `x` as the initial guess and overwriting it
    /// with the solution.
    ///
    /// # Errors
    ///
    /// * [`SparseError::InvalidInput`] -- dimension mismatch or invalid params.
    /// * [`SparseError::NonConvergence`] -- iteration limit reached, or the
    ///   recurrence broke down (`p . Ap <= 0`, the matrix is not SPD).
    pub fn solve<M: Matrix + ?Sized>(
        &self,
        matrix: &M,
        rhs: &[f64],
        x: &mut [f64],
    ) -> Result<CgResult> {
        self.validate(matrix, rhs, x)?;
        let n = matrix.n_rows();

        let b_norm = norm2(rhs);
        if b_norm == 0.0 {
            debug!("CG: zero RHS detected, returning zero solution");
            x.fill(0.0);
            return Ok(CgResult {
                iterations: 0,
                residual_norm: 0.0,
                residuals: vec![0.0],
            });
        }

        let mut r = vec![0.0f64; n];
        let mut ap = vec![0.0f64; n];
        matrix.residual(x, rhs, &mut r)?;
        let mut p = r.clone();
        let mut rr = dot(&r, &r);

        let mut residuals = Vec::with_capacity(self.max_iterations.min(256) + 1);
        let mut rel = rr.sqrt() / b_norm;
        residuals.push(rel);

        debug!(
            n,
            nnz = matrix.nnz(),
            format = %matrix.format(),
            tol = self.tolerance,
            max_iter = self.max_iterations,
            "CG start"
        );

        if rel < self.tolerance {
            return Ok(CgResult {
                iterations: 0,
                residual_norm: rel,
                residuals,
            });
        }

        for k in 0..self.max_iterations {
            matrix.mult(&p, &mut ap)?;
            let p_dot_ap = dot(&p, &ap);
            if p_dot_ap <= 0.0 {
                warn!(
                    iteration = k,
                    p_dot_ap,
                    "CG breakdown: p.Ap <= 0, matrix may not be SPD"
                );
                return Err(SparseError::NonConvergence {
                    iterations: k,
                    residual: rel,
                    tolerance: self.tolerance,
                });
            }

            let alpha = rr / p_dot_ap;
            axpy(alpha, &p, x);
            axpy(-alpha, &ap, &mut r);

            let rr_new = dot(&r, &r);
            rel = rr_new.sqrt() / b_norm;
            residuals.push(rel);
            trace!(iteration = k, rel, "CG iteration");

            if rel < self.tolerance {
                debug!(iterations = k + 1, rel, "CG converged");
                return Ok(CgResult {
                    iterations: k + 1,
                    residual_norm: rel,
                    residuals,
                });
            }

            let beta = rr_new / rr;
            for (pi, &ri) in p.iter_mut().zip(&r) {
                *pi = ri + beta * *pi;
            }
            rr = rr_new;
        }

        debug!(iterations = self.max_iterations, rel, "CG: non-convergence");
        Err(SparseError::NonConvergence {
            iterations: self.max_iterations,
            residual: rel,
            tolerance: self.tolerance,
        })
    }
}
