//! Property tests for format conversions, transposition and duplicate
//! handling across all four storage formats.

mod helpers;

use helpers::{dense_transpose, random_dense, sorted_triplets};
use proptest::prelude::*;
use ruvector_sparse::{BsrMatrix, CooMatrix, Format, Matrix, SparseMatrix};

/// Random `(n_rows, n_cols, triplets)` with in-range indices. Values are
/// small integers so sums stay exact regardless of accumulation order.
fn triplets() -> impl Strategy<Value = (usize, usize, Vec<(usize, usize, f64)>)> {
    (1usize..9, 1usize..9).prop_flat_map(|(m, n)| {
        let entry = (0..m, 0..n, -8i32..9).prop_map(|(r, c, v)| (r, c, f64::from(v)));
        (Just(m), Just(n), prop::collection::vec(entry, 0..30))
    })
}

fn deduplicated(m: usize, n: usize, entries: &[(usize, usize, f64)]) -> CooMatrix {
    let mut coo = CooMatrix::from_entries(m, n, entries.iter().copied()).unwrap();
    coo.remove_duplicates();
    coo
}

proptest! {
    #[test]
    fn compressed_round_trips_preserve_entries((m, n, entries) in triplets()) {
        let coo = deduplicated(m, n, &entries);
        let expected = sorted_triplets(&coo);

        let csr = coo.to_csr();
        let csc = coo.to_csc();
        prop_assert_eq!(sorted_triplets(&csr), expected.clone());
        prop_assert_eq!(sorted_triplets(&csc), expected.clone());
        prop_assert_eq!(sorted_triplets(&csr.to_csc()), expected.clone());
        prop_assert_eq!(sorted_triplets(&csc.to_csr()), expected.clone());
        prop_assert_eq!(sorted_triplets(&csr.to_coo()), expected);
    }

    #[test]
    fn duplicates_are_kept_until_removed((m, n, entries) in triplets()) {
        let coo = CooMatrix::from_entries(m, n, entries.iter().copied()).unwrap();
        prop_assert_eq!(coo.nnz(), entries.len());
        prop_assert_eq!(coo.to_csr().nnz(), entries.len());

        let mut dense = vec![0.0; m * n];
        for &(r, c, v) in &entries {
            dense[r * n + c] += v;
        }
        let mut csr = coo.to_csr();
        csr.remove_duplicates();
        prop_assert_eq!(csr.to_dense(), dense.clone());
        prop_assert_eq!(coo.to_dense(), dense);

        let mut positions: Vec<(usize, usize)> = entries.iter().map(|&(r, c, _)| (r, c)).collect();
        positions.sort_unstable();
        positions.dedup();
        prop_assert_eq!(csr.nnz(), positions.len());
    }

    #[test]
    fn transpose_agrees_with_mult_t((m, n, entries) in triplets(), seed in 0u64..1000) {
        let coo = deduplicated(m, n, &entries);
        let x = helpers::random_vector(m, seed);
        for format in [Format::Coo, Format::Csr, Format::Csc] {
            let a = SparseMatrix::from(coo.clone()).convert(format, None).unwrap();
            let t = a.transpose();
            prop_assert_eq!(t.as_matrix().n_rows(), n);

            let mut via_t = vec![0.0; n];
            t.mult(&x, &mut via_t).unwrap();
            let mut via_mult_t = vec![0.0; n];
            a.as_matrix().mult_t(&x, &mut via_mult_t).unwrap();
            for (u, v) in via_t.iter().zip(&via_mult_t) {
                prop_assert!((u - v).abs() <= 1e-12 * (1.0 + v.abs()));
            }
            prop_assert_eq!(
                t.as_matrix().to_dense(),
                dense_transpose(&coo.to_dense(), m, n)
            );
        }
    }

    #[test]
    fn bsr_round_trip_is_lossless(seed in 0u64..500, density in 0.05f64..0.6) {
        let (m, n, br, bc) = (6, 8, 2, 4);
        let dense = random_dense(m, n, density, seed);
        let csr = ruvector_sparse::CsrMatrix::from_dense(m, n, &dense).unwrap();
        let bsr = BsrMatrix::from_csr(&csr, br, bc).unwrap();
        prop_assert_eq!(bsr.to_dense(), dense.clone());

        let mut back = bsr.to_csr();
        back.remove_duplicates();
        prop_assert_eq!(back.to_dense(), dense.clone());

        let from_dense = BsrMatrix::from_dense(m, n, br, bc, &dense).unwrap();
        prop_assert_eq!(from_dense.n_blocks, bsr.n_blocks);
        prop_assert_eq!(from_dense.to_dense(), dense);
    }
}

#[test]
fn convert_every_pair_through_enum() {
    let dense = random_dense(6, 6, 0.4, 42);
    let source = SparseMatrix::from(ruvector_sparse::CsrMatrix::from_dense(6, 6, &dense).unwrap());
    let formats = [Format::Coo, Format::Csr, Format::Csc, Format::Bsr];
    for from in formats {
        let a = source.convert(from, Some((3, 2))).unwrap();
        assert_eq!(a.format(), from);
        for to in formats {
            let b = a.convert(to, Some((2, 3))).unwrap();
            assert_eq!(b.format(), to);
            assert_eq!(b.as_matrix().to_dense(), dense, "{from} -> {to}");
        }
    }
}
