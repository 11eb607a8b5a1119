//! Benchmarks for the alternating-minimization engine, the multi-run
//! scheduler and consensus scoring
//!
//! Run with: cargo bench --bench cocluster_benchmarks
//! HTML reports: target/criterion/report/index.html

use block_cocluster::consensus::{blocks_from_labels, consensus_score};
use block_cocluster::engine::OptimizationRun;
use block_cocluster::{CancelToken, ClusterCounts, DataCube, MultiRunScheduler, RunConfig};
use criterion::{black_box, criterion_group, criterion_main, AxisScale, BenchmarkId, Criterion, PlotConfiguration};
use ndarray::{Array2, Array3};
use ndarray_rand::rand::rngs::StdRng;
use ndarray_rand::rand::SeedableRng;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;

/// Synthetic matrix with planted co-cluster structure
fn create_benchmark_matrix(n_rows: usize, n_cols: usize, n_clusters: usize) -> Array2<f64> {
    let mut rng = StdRng::seed_from_u64(42);
    let mut matrix = Array2::random_using((n_rows, n_cols), Uniform::new(0.0, 1.0), &mut rng);
    for ((i, j), value) in matrix.indexed_iter_mut() {
        *value += ((i * n_clusters / n_rows) * n_clusters + j * n_clusters / n_cols) as f64 * 2.0;
    }
    matrix
}

fn create_benchmark_cube(n_bands: usize, n_rows: usize, n_cols: usize) -> Array3<f64> {
    let mut rng = StdRng::seed_from_u64(7);
    let mut cube = Array3::random_using((n_bands, n_rows, n_cols), Uniform::new(0.0, 1.0), &mut rng);
    for ((b, i, j), value) in cube.indexed_iter_mut() {
        *value += (b % 2 + (i * 3 / n_rows) * 2 + j * 2 / n_cols) as f64 * 3.0;
    }
    cube
}

/// Single run to convergence on matrices of growing size
fn bench_single_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_run");
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));
    group.sample_size(20);

    for (n_rows, n_cols) in [(50, 40), (100, 80), (200, 150), (400, 300)] {
        let data = DataCube::from_matrix(create_benchmark_matrix(n_rows, n_cols, 3)).unwrap();
        let counts = ClusterCounts::matrix(3, 3);

        group.bench_with_input(
            BenchmarkId::new("matrix", format!("{}x{}", n_rows, n_cols)),
            &data,
            |b, data| {
                b.iter(|| {
                    OptimizationRun::new(black_box(data), &counts, 0)
                        .unwrap()
                        .run(100, 1e-5, &CancelToken::new())
                        .unwrap()
                });
            },
        );
    }

    let cube = DataCube::from_cube(create_benchmark_cube(6, 60, 40)).unwrap();
    let counts = ClusterCounts::cube(3, 2, 2);
    group.bench_function("cube_6x60x40", |b| {
        b.iter(|| {
            OptimizationRun::new(black_box(&cube), &counts, 0)
                .unwrap()
                .run(100, 1e-5, &CancelToken::new())
                .unwrap()
        });
    });

    group.finish();
}

/// Ten runs with different worker counts
fn bench_parallelism_comparison(c: &mut Criterion) {
    let mut group = c.benchmark_group("parallelism");
    group.sample_size(10);

    let data = DataCube::from_matrix(create_benchmark_matrix(200, 150, 3)).unwrap();
    let counts = ClusterCounts::matrix(3, 3);

    for nthreads in [1, 2, 4] {
        let config = RunConfig::default().with_nruns(10).with_nthreads(nthreads).with_seed(0);
        group.bench_with_input(BenchmarkId::new("nthreads", nthreads), &config, |b, config| {
            b.iter(|| {
                MultiRunScheduler::new(&data, counts, config.clone())
                    .unwrap()
                    .run()
                    .unwrap()
            });
        });
    }

    group.finish();
}

/// Consensus scoring with many blocks per side
fn bench_consensus(c: &mut Criterion) {
    let mut group = c.benchmark_group("consensus");

    for k in [4, 8, 16] {
        let rows: Vec<usize> = (0..400).map(|i| i % k).collect();
        let cols: Vec<usize> = (0..300).map(|j| j % k).collect();
        let shifted_rows: Vec<usize> = (0..400).map(|i| (i / 3) % k).collect();
        let a = blocks_from_labels(&[rows.as_slice(), cols.as_slice()]);
        let b = blocks_from_labels(&[shifted_rows.as_slice(), cols.as_slice()]);

        group.bench_with_input(BenchmarkId::new("blocks", k * k), &(a, b), |bench, (a, b)| {
            bench.iter(|| consensus_score(black_box(a), black_box(b)).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_single_run, bench_parallelism_comparison, bench_consensus);

criterion_main!(benches);
