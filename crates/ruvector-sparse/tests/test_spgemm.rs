//! Integration tests for sparse matrix-matrix products.

mod helpers;

use helpers::{assert_close, dense_matmul, dense_transpose, random_dense};
use ruvector_sparse::{CooMatrix, CscMatrix, CsrMatrix, Matrix, SparseError};

#[test]
fn test_spgemm_random_against_dense() {
    for (seed, (m, k, n)) in [(1u64, (12, 9, 15)), (2, (1, 20, 1)), (3, (30, 30, 30))] {
        let da = random_dense(m, k, 0.2, seed);
        let db = random_dense(k, n, 0.2, seed + 100);
        let a = CsrMatrix::from_dense(m, k, &da).unwrap();
        let b = CsrMatrix::from_dense(k, n, &db).unwrap();

        let c = a.spgemm(&b).unwrap();
        assert_eq!((c.n_rows, c.n_cols), (m, n));
        assert_close(&c.to_dense(), &dense_matmul(&da, &db, m, k, n), 1e-12);
    }
}

#[test]
fn test_spgemm_output_has_no_duplicates() {
    let dense = random_dense(20, 20, 0.3, 11);
    let a = CsrMatrix::from_dense(20, 20, &dense).unwrap();
    let c = a.spgemm(&a).unwrap();
    for row in 0..c.n_rows {
        let mut cols: Vec<usize> = c.row_entries(row).map(|(col, _)| col).collect();
        let len = cols.len();
        cols.sort_unstable();
        cols.dedup();
        assert_eq!(cols.len(), len, "row {row} has duplicate columns");
    }
}

#[test]
fn test_spgemm_t_matches_explicit_transpose() {
    let (r, m, n) = (14, 6, 9);
    let da = random_dense(r, m, 0.3, 21);
    let db = random_dense(r, n, 0.3, 22);
    let a = CscMatrix::from_dense(r, m, &da).unwrap();
    let b = CsrMatrix::from_dense(r, n, &db).unwrap();

    let c = b.spgemm_t(&a).unwrap();
    assert_eq!((c.n_rows, c.n_cols), (m, n));
    let expected = dense_matmul(&dense_transpose(&da, r, m), &db, m, r, n);
    assert_close(&c.to_dense(), &expected, 1e-12);
}

#[test]
fn test_spgemm_rejects_non_csr_and_bad_shapes() {
    let coo = CooMatrix::new(2, 2);
    let b = CsrMatrix::new(2, 2);
    assert!(matches!(coo.spgemm(&b), Err(SparseError::Unsupported { .. })));

    let a = CsrMatrix::new(2, 3);
    assert!(a.spgemm(&b).is_err());
    assert!(b.spgemm_t(&CscMatrix::new(3, 2)).is_err());
}

#[test]
fn test_rap_of_stencil_operator() {
    let a = ruvector_sparse::gallery::poisson_2d(4, 4).unwrap();
    let s = a.strength(ruvector_sparse::StrengthType::Symmetric, 0.0, 1, None).unwrap();
    let aggop = s.aggregate().unwrap();
    let p = aggop.to_csc();

    let coarse = a.rap(&p).unwrap();
    let n_c = aggop.n_cols;
    assert_eq!((coarse.n_rows, coarse.n_cols), (n_c, n_c));

    let dp = aggop.to_dense();
    let ap = dense_matmul(&a.to_dense(), &dp, 16, 16, n_c);
    let expected = dense_matmul(&dense_transpose(&dp, 16, n_c), &ap, n_c, 16, n_c);
    assert_close(&coarse.to_dense(), &expected, 1e-12);

    // Galerkin product of a symmetric operator stays symmetric.
    let dc = coarse.to_dense();
    assert_close(&dc, &dense_transpose(&dc, n_c, n_c), 1e-12);
}
