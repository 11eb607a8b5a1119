//! # block_cocluster
//!
//! Co-clustering of dense matrices and triclustering of dense
//! `(bands, rows, columns)` cubes. Every clustered axis is partitioned into a
//! fixed number of clusters so that the values inside each block (one
//! cluster per axis) are as close to constant as possible, measured by the
//! total within-block sum of squares.
//!
//! ## Modules
//! - [`tensor`]: data cube, axis partitions and block statistics
//! - [`engine`]: single seeded alternating-minimization run
//! - [`scheduler`]: independently seeded runs on a bounded worker pool
//! - [`consensus`]: label-invariant agreement between two partitions
//! - [`statistics`]: per-block means and summaries
//! - [`coclustering`]: `Coclustering` and `Triclustering` entry points
//!
//! ## Example
//! ```
//! use block_cocluster::{consensus::label_consensus, Coclustering, RunConfig};
//! use ndarray::Array2;
//!
//! let rows = [0, 1, 0, 1, 0, 1];
//! let cols = [1, 0, 1, 1, 0, 0];
//! let values = [[1.0, 5.0], [3.0, 8.0]];
//! let data = Array2::from_shape_fn((6, 6), |(i, j)| values[rows[i]][cols[j]]);
//!
//! let cc = Coclustering::new(data, 2, 2, RunConfig::default().with_nruns(4).with_seed(7)).unwrap();
//! let result = cc.run_with_threads(2).unwrap();
//! assert_eq!(result.objective, 0.0);
//!
//! let planted: [&[usize]; 2] = [&rows, &cols];
//! let recovered = [result.row_labels(), result.col_labels()];
//! assert_eq!(label_consensus(&planted, &recovered).unwrap(), 1.0);
//! ```

pub mod assignment;
pub mod coclustering;
pub mod config;
pub mod consensus;
pub mod engine;
pub mod error;
pub mod scheduler;
pub mod statistics;
pub mod tensor;

use chrono::Local;
use log::LevelFilter;

pub use coclustering::{Coclustering, Triclustering};
pub use config::{ClusterCounts, RunConfig};
pub use error::{CoclusterError, Result};
pub use scheduler::{CancelToken, ClusteringResult, MultiRunScheduler};
pub use tensor::{ClusterAxis, DataCube};

/// Wall-clock time for log lines
pub fn timestamp() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

/// Install `simple_logger` at `level`. The library itself only logs
/// through the `log` facade; binaries decide whether to call this.
pub fn init_logger(level: LevelFilter) -> std::result::Result<(), log::SetLoggerError> {
    simple_logger::SimpleLogger::new().with_level(level).init()
}
