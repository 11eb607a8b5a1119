//! Triclustering of a small `(bands, rows, columns)` cube.
//!
//! Run with: cargo run --example triclustering_example

use block_cocluster::statistics::block_summaries;
use block_cocluster::{init_logger, timestamp, RunConfig, Triclustering};
use log::{info, LevelFilter};
use ndarray::{Array3, Dimension};
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    init_logger(LevelFilter::Info)?;

    let z = Array3::from_shape_vec(
        (3, 2, 4),
        vec![
            1., 1., 2., 4., 1., 1., 2., 4., //
            5., 5., 8., 8., 5., 5., 8., 8., //
            6., 7., 8., 9., 6., 7., 9., 8.,
        ],
    )?;
    info!("[{}] Input cube:\n{}", timestamp(), z);

    let config = RunConfig::default()
        .with_max_iterations(100)
        .with_conv_threshold(1e-5)
        .with_nruns(10)
        .with_seed(2024);
    let tc = Triclustering::new(z, 2, 3, 2, config)?;
    let results = tc.run_with_threads(4)?;

    info!("[{}] Row clusters: {:?}", timestamp(), results.row_labels());
    info!("[{}] Column clusters: {:?}", timestamp(), results.col_labels());
    info!("[{}] Band clusters: {:?}", timestamp(), results.band_labels());
    info!(
        "[{}] Objective {:.4} after {} iterations (converged: {})",
        timestamp(),
        results.objective,
        results.iterations,
        results.converged
    );

    let means = results.cluster_averages(tc.data())?;
    for (index, mean) in means.indexed_iter() {
        match mean {
            Some(value) => info!("[{}] Block {:?}: mean {:.3}", timestamp(), index.slice(), value),
            None => info!("[{}] Block {:?}: empty", timestamp(), index.slice()),
        }
    }

    let summaries = block_summaries(tc.data(), &results.partitions)?;
    for (index, summary) in summaries.indexed_iter() {
        if let Some(summary) = summary {
            info!(
                "[{}] Block {:?}: {} cells, std {:.3}, range [{}, {}]",
                timestamp(),
                index.slice(),
                summary.count,
                summary.std_dev,
                summary.min,
                summary.max
            );
        }
    }

    Ok(())
}
