//! Dense vector operand for the matrix kernels.
//!
//! [`Vector`] is a thin owner of a `Vec<f64>` that dereferences to `[f64]`, so
//! it can be passed to every kernel that takes a slice. The BLAS-1 style
//! helpers use a 4-wide accumulator to shorten the dependency chain in the
//! reductions.

use std::ops::{Deref, DerefMut};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SparseError, ValidationError};
use crate::validation::check_len;

/// Fixed-length dense vector of `f64`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector {
    /// Backing storage.
    pub values: Vec<f64>,
}

impl Vector {
    /// Zero vector of length `n`.
    pub fn new(n: usize) -> Self {
        Self {
            values: vec![0.0; n],
        }
    }

    /// Take ownership of existing values.
    pub fn from_vec(values: Vec<f64>) -> Self {
        Self { values }
    }

    /// Number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the vector has no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Set every entry to `alpha`.
    pub fn set_const_value(&mut self, alpha: f64) {
        self.values.fill(alpha);
    }

    /// Fill with uniform samples from `[0, 1)`.
    pub fn set_rand_values<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for v in &mut self.values {
            *v = rng.gen::<f64>();
        }
    }

    /// `self += alpha * x`.
    pub fn axpy(&mut self, x: &[f64], alpha: f64) -> Result<()> {
        check_len("x", x.len(), self.len())?;
        axpy(alpha, x, &mut self.values);
        Ok(())
    }

    /// `self *= alpha`.
    pub fn scale(&mut self, alpha: f64) {
        for v in &mut self.values {
            *v *= alpha;
        }
    }

    /// Copy `x` into `self`.
    pub fn copy_from(&mut self, x: &[f64]) -> Result<()> {
        check_len("x", x.len(), self.len())?;
        self.values.copy_from_slice(x);
        Ok(())
    }

    /// Dot product with `x`.
    pub fn inner_product(&self, x: &[f64]) -> Result<f64> {
        check_len("x", x.len(), self.len())?;
        Ok(dot(&self.values, x))
    }

    /// `l_p` norm, `p >= 1`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::ParameterOutOfRange`] for `p < 1` or a
    /// non-finite `p`.
    pub fn norm(&self, p: f64) -> Result<f64> {
        if !p.is_finite() || p < 1.0 {
            return Err(SparseError::InvalidInput(
                ValidationError::ParameterOutOfRange {
                    name: "p".into(),
                    value: p.to_string(),
                    expected: "finite value >= 1".into(),
                },
            ));
        }
        Ok(lp_norm(&self.values, p))
    }
}

impl Deref for Vector {
    type Target = [f64];

    fn deref(&self) -> &[f64] {
        &self.values
    }
}

impl DerefMut for Vector {
    fn deref_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }
}

impl From<Vec<f64>> for Vector {
    fn from(values: Vec<f64>) -> Self {
        Self { values }
    }
}

// ---------------------------------------------------------------------------
// Slice kernels
// ---------------------------------------------------------------------------

/// Dot product with 4-wide accumulation.
///
/// # Panics
///
/// Asserts that `a.len() == b.len()`.
#[inline]
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    assert_eq!(a.len(), b.len(), "dot: length mismatch");

    let n = a.len();
    let chunks = n / 4;
    let remainder = n % 4;

    let mut acc0: f64 = 0.0;
    let mut acc1: f64 = 0.0;
    let mut acc2: f64 = 0.0;
    let mut acc3: f64 = 0.0;

    for i in 0..chunks {
        let j = i * 4;
        acc0 += a[j] * b[j];
        acc1 += a[j + 1] * b[j + 1];
        acc2 += a[j + 2] * b[j + 2];
        acc3 += a[j + 3] * b[j + 3];
    }

    let base = chunks * 4;
    for i in 0..remainder {
        acc0 += a[base + i] * b[base + i];
    }

    (acc0 + acc1) + (acc2 + acc3)
}

/// `y[i] += alpha * x[i]`.
///
/// # Panics
///
/// Asserts that `x.len() == y.len()`.
#[inline]
pub fn axpy(alpha: f64, x: &[f64], y: &mut [f64]) {
    assert_eq!(x.len(), y.len(), "axpy: length mismatch");

    let n = x.len();
    let chunks = n / 4;
    let base = chunks * 4;

    for i in 0..chunks {
        let j = i * 4;
        y[j] += alpha * x[j];
        y[j + 1] += alpha * x[j + 1];
        y[j + 2] += alpha * x[j + 2];
        y[j + 3] += alpha * x[j + 3];
    }
    for i in base..n {
        y[i] += alpha * x[i];
    }
}

/// Euclidean norm.
#[inline]
pub fn norm2(x: &[f64]) -> f64 {
    dot(x, x).sqrt()
}

fn lp_norm(x: &[f64], p: f64) -> f64 {
    if p == 2.0 {
        return norm2(x);
    }
    if p == 1.0 {
        return x.iter().map(|v| v.abs()).sum();
    }
    x.iter().map(|v| v.abs().powf(p)).sum::<f64>().powf(1.0 / p)
}
