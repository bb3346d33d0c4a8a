//! Shared test helpers for the ruvector-sparse integration test suite.
//!
//! Provides deterministic random matrix generators, dense reference kernels,
//! and floating-point comparison utilities used across all test modules.

#![allow(dead_code)]

use ruvector_sparse::CsrMatrix;

// ---------------------------------------------------------------------------
// Random number generator (simple LCG for deterministic reproducibility)
// ---------------------------------------------------------------------------

/// A minimal linear congruential generator for deterministic test data.
pub struct Lcg {
    state: u64,
}

impl Lcg {
    /// Create a new LCG with the given seed.
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Generate the next u64 value.
    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        self.state
    }

    /// Generate a uniform f64 in [0, 1).
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Generate a uniform f64 in [lo, hi).
    pub fn next_f64_range(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }
}

// ---------------------------------------------------------------------------
// Matrix generators
// ---------------------------------------------------------------------------

/// Row-major dense `n_rows x n_cols` array where each entry is non-zero with
/// probability `density`. Non-zeros are drawn from `[-1, -0.1) U [0.1, 1)`
/// so they never fall under the zero tolerance.
pub fn random_dense(n_rows: usize, n_cols: usize, density: f64, seed: u64) -> Vec<f64> {
    let mut rng = Lcg::new(seed);
    (0..n_rows * n_cols)
        .map(|_| {
            if rng.next_f64() < density {
                let v = rng.next_f64_range(0.1, 1.0);
                if rng.next_f64() < 0.5 {
                    -v
                } else {
                    v
                }
            } else {
                0.0
            }
        })
        .collect()
}

/// Random strictly diagonally dominant CSR matrix of dimension `n`.
pub fn random_diag_dominant_csr(n: usize, density: f64, seed: u64) -> CsrMatrix {
    let mut dense = random_dense(n, n, density, seed);
    for i in 0..n {
        let off: f64 = (0..n).filter(|&j| j != i).map(|j| dense[i * n + j].abs()).sum();
        dense[i * n + i] = off + 1.0;
    }
    CsrMatrix::from_dense(n, n, &dense).expect("valid dense input")
}

/// Random vector in [-1, 1).
pub fn random_vector(n: usize, seed: u64) -> Vec<f64> {
    let mut rng = Lcg::new(seed);
    (0..n).map(|_| rng.next_f64_range(-1.0, 1.0)).collect()
}

// ---------------------------------------------------------------------------
// Dense reference kernels
// ---------------------------------------------------------------------------

/// Dense `(m x k) * (k x n)` product, row-major.
pub fn dense_matmul(a: &[f64], b: &[f64], m: usize, k: usize, n: usize) -> Vec<f64> {
    let mut c = vec![0.0; m * n];
    for i in 0..m {
        for p in 0..k {
            let aip = a[i * k + p];
            if aip == 0.0 {
                continue;
            }
            for j in 0..n {
                c[i * n + j] += aip * b[p * n + j];
            }
        }
    }
    c
}

/// Dense matrix-vector product, row-major.
pub fn dense_matvec(a: &[f64], x: &[f64], m: usize, n: usize) -> Vec<f64> {
    (0..m)
        .map(|i| (0..n).map(|j| a[i * n + j] * x[j]).sum())
        .collect()
}

/// Dense transpose, row-major.
pub fn dense_transpose(a: &[f64], m: usize, n: usize) -> Vec<f64> {
    let mut t = vec![0.0; m * n];
    for i in 0..m {
        for j in 0..n {
            t[j * m + i] = a[i * n + j];
        }
    }
    t
}

// ---------------------------------------------------------------------------
// Comparison utilities
// ---------------------------------------------------------------------------

/// Assert two slices agree element-wise within `tol`.
pub fn assert_close(actual: &[f64], expected: &[f64], tol: f64) {
    assert_eq!(actual.len(), expected.len(), "length mismatch");
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!(
            (a - e).abs() <= tol * (1.0 + e.abs()),
            "index {i}: {a} vs {e} (tol {tol})"
        );
    }
}

/// Sorted `(row, col, value)` triplets of a matrix, for multiset comparisons.
pub fn sorted_triplets(m: &impl ruvector_sparse::Matrix) -> Vec<(usize, usize, f64)> {
    let mut t: Vec<_> = m.to_coo().entries().collect();
    t.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)).then(a.2.total_cmp(&b.2)));
    t
}
