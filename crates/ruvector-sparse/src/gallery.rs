//! Model problems for tests, benchmarks and solver experiments.

use tracing::debug;

use crate::csr::CsrMatrix;
use crate::error::{Result, SparseError};
use crate::traits::Matrix;

/// 3x3 finite-element stencil of the rotated anisotropic diffusion operator
/// `-div(Q diag(1, eps) Q^T grad u)`, with `Q` the rotation by `theta`.
///
/// Returned row-major; `eps = 1` gives the isotropic 9-point Laplacian
/// `[-1 -1 -1; -1 8 -1; -1 -1 -1] / 3` regardless of `theta`.
pub fn diffusion_stencil_2d(eps: f64, theta: f64) -> [f64; 9] {
    let (s, c) = theta.sin_cos();
    let (cc, ss, cs) = (c * c, s * s, c * s);

    let a = (-eps - 1.0) * cc + (-eps - 1.0) * ss + (3.0 * eps - 3.0) * cs;
    let b = (2.0 * eps - 4.0) * cc + (-4.0 * eps + 2.0) * ss;
    let corner = (-eps - 1.0) * cc + (-eps - 1.0) * ss + (-3.0 * eps + 3.0) * cs;
    let d = (-4.0 * eps + 2.0) * cc + (2.0 * eps - 4.0) * ss;
    let e = (8.0 * eps + 8.0) * cc + (8.0 * eps + 8.0) * ss;

    [a, b, corner, d, e, d, corner, b, a].map(|v| v / 6.0)
}

/// Assemble the operator of a `3^d` stencil on a `d`-dimensional grid.
///
/// Unknowns are numbered in C order (last axis fastest); neighbours that
/// fall outside the grid are dropped (homogeneous Dirichlet boundary). Zero
/// stencil coefficients produce no entries.
///
/// # Errors
///
/// An empty grid, or a stencil whose length is not `3^grid.len()`.
pub fn stencil_grid(stencil: &[f64], grid: &[usize]) -> Result<CsrMatrix> {
    let dim = grid.len();
    if dim == 0 {
        return Err(SparseError::dims("stencil grid needs at least one axis"));
    }
    let expected = 3usize.pow(dim as u32);
    if stencil.len() != expected {
        return Err(SparseError::dims(format!(
            "{dim}-d stencil needs {expected} coefficients, got {}",
            stencil.len()
        )));
    }

    let n: usize = grid.iter().product();
    let mut strides = vec![1usize; dim];
    for axis in (0..dim.saturating_sub(1)).rev() {
        strides[axis] = strides[axis + 1] * grid[axis + 1];
    }

    let mut entries = Vec::with_capacity(n * expected);
    let mut point = vec![0usize; dim];
    for row in 0..n {
        let mut rem = row;
        for axis in 0..dim {
            point[axis] = rem / strides[axis];
            rem %= strides[axis];
        }
        'offsets: for (s_idx, &coef) in stencil.iter().enumerate() {
            if coef == 0.0 {
                continue;
            }
            let mut col = 0usize;
            let mut code = s_idx;
            for axis in 0..dim {
                let digit = code / 3usize.pow((dim - 1 - axis) as u32);
                code %= 3usize.pow((dim - 1 - axis) as u32);
                let p = point[axis] + digit;
                if p < 1 || p > grid[axis] {
                    continue 'offsets;
                }
                col += (p - 1) * strides[axis];
            }
            entries.push((row, col, coef));
        }
    }

    let mut a = CsrMatrix::from_entries(n, n, entries)?;
    a.remove_duplicates();
    debug!(dim, unknowns = n, nnz = a.nnz(), "stencil grid assembled");
    Ok(a)
}

/// `n x n` second-difference matrix `tridiag(-1, 2, -1)`.
pub fn laplacian_1d(n: usize) -> Result<CsrMatrix> {
    stencil_grid(&[-1.0, 2.0, -1.0], &[n])
}

/// Five-point Poisson operator on an `nx x ny` grid.
pub fn poisson_2d(nx: usize, ny: usize) -> Result<CsrMatrix> {
    stencil_grid(
        &[0.0, -1.0, 0.0, -1.0, 4.0, -1.0, 0.0, -1.0, 0.0],
        &[nx, ny],
    )
}
