//! SpMV benchmarks across storage formats.
//!
//! Measures `mult` and `mult_t` on the same random operator stored as COO,
//! CSR, CSC and BSR, plus the dense-to-sparse ingestion cost.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use ruvector_sparse::{BsrMatrix, CsrMatrix, Matrix, SparseMatrix};

// ---------------------------------------------------------------------------
// Helpers: deterministic random data generation
// ---------------------------------------------------------------------------

/// Random square operator with roughly `density` fraction of non-zeros
/// arranged in 4x4 blocks, so the BSR variant is not padded with zeros.
fn random_block_csr(n: usize, density: f64, seed: u64) -> CsrMatrix {
    let mut rng = StdRng::seed_from_u64(seed);
    let nb = n / 4;
    let mut entries = Vec::new();
    for bi in 0..nb {
        for bj in 0..nb {
            if bi != bj && rng.gen::<f64>() >= density {
                continue;
            }
            for r in 0..4 {
                for c in 0..4 {
                    entries.push((bi * 4 + r, bj * 4 + c, rng.gen_range(-1.0..1.0)));
                }
            }
        }
    }
    CsrMatrix::from_entries(n, n, entries).expect("generated entries are in range")
}

fn random_vector(n: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n).map(|_| rng.gen_range(-1.0..1.0)).collect()
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn spmv_by_format(c: &mut Criterion) {
    let mut group = c.benchmark_group("spmv_by_format");
    group.warm_up_time(Duration::from_secs(3));
    group.sample_size(50);

    for &n in &[256usize, 1024, 4096] {
        let csr = random_block_csr(n, 0.02, 42);
        let x = random_vector(n, 7);
        let mut y = vec![0.0; n];
        let source = SparseMatrix::from(csr);

        group.throughput(Throughput::Elements(source.as_matrix().nnz() as u64));
        for (label, target) in [
            ("coo", SparseMatrix::Coo(source.as_matrix().to_coo())),
            ("csr", source.clone()),
            ("csc", SparseMatrix::Csc(source.as_matrix().to_csc())),
            (
                "bsr4",
                SparseMatrix::Bsr(source.as_matrix().to_bsr(4, 4).expect("4 divides n")),
            ),
        ] {
            group.bench_with_input(BenchmarkId::new(label, n), &n, |b, _| {
                b.iter(|| {
                    target
                        .mult(criterion::black_box(&x), criterion::black_box(&mut y))
                        .expect("dimensions agree")
                });
            });
        }
    }
    group.finish();
}

fn spmv_transpose(c: &mut Criterion) {
    let mut group = c.benchmark_group("spmv_transpose");
    group.warm_up_time(Duration::from_secs(3));
    group.sample_size(50);

    let n = 2048;
    let csr = random_block_csr(n, 0.02, 11);
    let x = random_vector(n, 12);
    let mut y = vec![0.0; n];
    let t = csr.transpose();

    group.throughput(Throughput::Elements(csr.nnz() as u64));
    group.bench_function("mult_t", |b| {
        b.iter(|| {
            csr.mult_t(criterion::black_box(&x), criterion::black_box(&mut y))
                .expect("dimensions agree")
        });
    });
    group.bench_function("explicit_transpose_mult", |b| {
        b.iter(|| {
            t.mult(criterion::black_box(&x), criterion::black_box(&mut y))
                .expect("dimensions agree")
        });
    });
    group.bench_function("residual", |b| {
        let mut r = vec![0.0; n];
        b.iter(|| {
            csr.residual(criterion::black_box(&x), &y, criterion::black_box(&mut r))
                .expect("dimensions agree")
        });
    });
    group.finish();
}

fn dense_ingestion(c: &mut Criterion) {
    let mut group = c.benchmark_group("dense_ingestion");
    group.sample_size(20);

    let n = 512;
    let dense = random_block_csr(n, 0.05, 3).to_dense();
    group.throughput(Throughput::Elements((n * n) as u64));
    group.bench_function("csr_from_dense", |b| {
        b.iter(|| CsrMatrix::from_dense(n, n, criterion::black_box(&dense)))
    });
    group.bench_function("bsr_from_dense", |b| {
        b.iter(|| BsrMatrix::from_dense(n, n, 4, 4, criterion::black_box(&dense)))
    });
    group.finish();
}

criterion_group!(spmv, spmv_by_format, spmv_transpose, dense_ingestion);
criterion_main!(spmv);
