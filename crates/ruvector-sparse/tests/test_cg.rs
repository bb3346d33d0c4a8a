//! Integration tests for the Conjugate Gradient solver on gallery problems.

mod helpers;

use approx::assert_relative_eq;
use ruvector_sparse::gallery::{diffusion_stencil_2d, laplacian_1d, poisson_2d, stencil_grid};
use ruvector_sparse::vector::norm2;
use ruvector_sparse::{ConjugateGradientSolver, Format, Matrix, SparseError, SparseMatrix};

#[test]
fn test_cg_anisotropic_diffusion() {
    let stencil = diffusion_stencil_2d(0.001, std::f64::consts::PI / 8.0);
    let a = stencil_grid(&stencil, &[50, 50]).unwrap();
    let n = a.n_rows;
    assert_eq!(n, 2500);

    let ones = vec![1.0; n];
    let mut b = vec![0.0; n];
    a.mult(&ones, &mut b).unwrap();

    let mut x = vec![0.0; n];
    let result = ConjugateGradientSolver::new(1e-8, 10_000)
        .solve(&a, &b, &mut x)
        .unwrap();
    assert!(result.residual_norm < 1e-8);
    assert_eq!(result.residuals.len(), result.iterations + 1);

    let mut r = vec![0.0; n];
    a.residual(&x, &b, &mut r).unwrap();
    assert!(norm2(&r) / norm2(&b) < 1e-7);
}

#[test]
fn test_cg_poisson_matches_across_formats() {
    let a = poisson_2d(8, 8).unwrap();
    let b = helpers::random_vector(64, 9);
    let solver = ConjugateGradientSolver::new(1e-10, 500);

    let mut reference = vec![0.0; 64];
    solver.solve(&a, &b, &mut reference).unwrap();

    let source = SparseMatrix::from(a);
    for (format, block) in [(Format::Coo, None), (Format::Csc, None), (Format::Bsr, Some((4, 4)))] {
        let m = source.convert(format, block).unwrap();
        let mut x = vec![0.0; 64];
        solver.solve(m.as_matrix(), &b, &mut x).unwrap();
        helpers::assert_close(&x, &reference, 1e-8);
    }
}

#[test]
fn test_cg_laplacian_history() {
    let a = laplacian_1d(40).unwrap();
    let b = vec![1.0; 40];
    let mut x = vec![0.0; 40];
    let result = ConjugateGradientSolver::new(1e-10, 200).solve(&a, &b, &mut x).unwrap();
    assert!(result.iterations <= 60);
    assert_relative_eq!(result.residuals[0], 1.0);
    assert!(result.residuals.last().copied().unwrap_or(1.0) < 1e-10);
}

#[test]
fn test_cg_rejects_singular_direction() {
    // Pure Neumann 1-d Laplacian is singular; b outside its range breaks CG.
    let mut a = laplacian_1d(5).unwrap();
    a.add_value(0, 0, -1.0).unwrap();
    a.add_value(4, 4, -1.0).unwrap();
    let b = vec![1.0; 5];
    let mut x = vec![0.0; 5];
    let err = ConjugateGradientSolver::new(1e-10, 3).solve(&a, &b, &mut x).unwrap_err();
    assert!(matches!(err, SparseError::NonConvergence { .. }));
}
