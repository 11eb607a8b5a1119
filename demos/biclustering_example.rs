//! Recover a shuffled, noisy checkerboard and score the result against the
//! planted labels.
//!
//! Run with: cargo run --example biclustering_example

use block_cocluster::consensus::label_consensus;
use block_cocluster::{init_logger, timestamp, Coclustering, RunConfig};
use log::{info, LevelFilter};
use ndarray::Array2;
use ndarray_rand::rand::rngs::StdRng;
use ndarray_rand::rand::seq::SliceRandom;
use ndarray_rand::rand::SeedableRng;
use ndarray_rand::rand_distr::{Normal, Uniform};
use ndarray_rand::RandomExt;
use std::error::Error;

const N_ROWS: usize = 120;
const N_COLS: usize = 90;
const N_CLUSTERS: (usize, usize) = (4, 3);

/// Checkerboard with constant blocks plus Gaussian noise; returns the data
/// and the planted row and column labels
fn make_checkerboard(rng: &mut StdRng, noise: f64) -> Result<(Array2<f64>, Vec<usize>, Vec<usize>), Box<dyn Error>> {
    let (k_row, k_col) = N_CLUSTERS;
    let row_labels: Vec<usize> = (0..N_ROWS).map(|i| i * k_row / N_ROWS).collect();
    let col_labels: Vec<usize> = (0..N_COLS).map(|j| j * k_col / N_COLS).collect();

    let block_values = Array2::random_using((k_row, k_col), Uniform::new(10.0, 100.0), rng);
    let normal = Normal::new(0.0, noise).map_err(|e| format!("{:?}", e))?;
    let mut data = Array2::random_using((N_ROWS, N_COLS), normal, rng);
    for ((i, j), value) in data.indexed_iter_mut() {
        *value += block_values[[row_labels[i], col_labels[j]]];
    }
    Ok((data, row_labels, col_labels))
}

fn main() -> Result<(), Box<dyn Error>> {
    init_logger(LevelFilter::Info)?;
    let mut rng = StdRng::seed_from_u64(42);

    info!("[{}] Generating a {}x{} checkerboard", timestamp(), N_ROWS, N_COLS);
    let (data, rows, cols) = make_checkerboard(&mut rng, 2.0)?;

    let mut row_order: Vec<usize> = (0..N_ROWS).collect();
    let mut col_order: Vec<usize> = (0..N_COLS).collect();
    row_order.shuffle(&mut rng);
    col_order.shuffle(&mut rng);
    let shuffled = Array2::from_shape_fn((N_ROWS, N_COLS), |(i, j)| data[[row_order[i], col_order[j]]]);
    let planted_rows: Vec<usize> = row_order.iter().map(|&i| rows[i]).collect();
    let planted_cols: Vec<usize> = col_order.iter().map(|&j| cols[j]).collect();

    let config = RunConfig::default().with_nruns(10).with_seed(0);
    let cc = Coclustering::new(shuffled, N_CLUSTERS.0, N_CLUSTERS.1, config)?;
    let results = cc.run_with_threads(4)?;
    info!(
        "[{}] Best run {} of {}: objective {:.2}, converged {}",
        timestamp(),
        results.run_index,
        results.nruns_completed,
        results.objective,
        results.converged
    );

    let planted: [&[usize]; 2] = [&planted_rows, &planted_cols];
    let recovered = [results.row_labels(), results.col_labels()];
    let score = label_consensus(&planted, &recovered)?;
    info!("[{}] Consensus score: {:.3}", timestamp(), score);

    let means = results.cluster_averages(cc.data())?;
    for ((r, c), mean) in means
        .into_dimensionality::<ndarray::Ix2>()?
        .indexed_iter()
    {
        if let Some(mean) = mean {
            info!("[{}] Bicluster ({}, {}): mean {:.2}", timestamp(), r, c, mean);
        }
    }

    Ok(())
}
