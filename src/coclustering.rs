//! Caller-facing entry points for matrix (`Coclustering`) and
//! `(bands, rows, columns)` cube (`Triclustering`) input.

use ndarray::{Array2, Array3};

use crate::config::{ClusterCounts, RunConfig};
use crate::error::Result;
use crate::scheduler::{CancelToken, ClusteringResult, MultiRunScheduler};
use crate::tensor::DataCube;

/// Shared driver behind both entry points
#[derive(Debug)]
struct Driver {
    data: DataCube,
    counts: ClusterCounts,
    config: RunConfig,
    cancel: CancelToken,
}

impl Driver {
    fn new(data: DataCube, counts: ClusterCounts, config: RunConfig) -> Result<Self> {
        config.validate()?;
        counts.validate_for(&data)?;
        Ok(Self {
            data,
            counts,
            config,
            cancel: CancelToken::new(),
        })
    }

    fn run(&self, config: RunConfig) -> Result<ClusteringResult> {
        MultiRunScheduler::new(&self.data, self.counts, config)?
            .with_cancel_token(self.cancel.clone())
            .run()
    }
}

/// Row and column clustering of a matrix
///
/// # Example
/// ```
/// use block_cocluster::{Coclustering, RunConfig};
/// use ndarray::array;
///
/// let data = array![
///     [1.0, 1.0, 1.0, 5.0, 5.0, 5.0],
///     [1.0, 1.0, 1.0, 5.0, 5.0, 5.0],
///     [1.0, 1.0, 1.0, 5.0, 5.0, 5.0],
///     [3.0, 3.0, 3.0, 8.0, 8.0, 8.0],
///     [3.0, 3.0, 3.0, 8.0, 8.0, 8.0],
///     [3.0, 3.0, 3.0, 8.0, 8.0, 8.0],
/// ];
/// let cc = Coclustering::new(data, 2, 2, RunConfig::default().with_seed(0)).unwrap();
/// let result = cc.run_serial().unwrap();
/// assert_eq!(result.objective, 0.0);
/// assert_eq!(result.row_labels().len(), 6);
/// ```
#[derive(Debug)]
pub struct Coclustering {
    driver: Driver,
}

impl Coclustering {
    pub fn new(
        data: Array2<f64>,
        nclusters_row: usize,
        nclusters_col: usize,
        config: RunConfig,
    ) -> Result<Self> {
        let data = DataCube::from_matrix(data)?;
        let counts = ClusterCounts::matrix(nclusters_row, nclusters_col);
        Ok(Self {
            driver: Driver::new(data, counts, config)?,
        })
    }

    /// All runs on the calling thread
    pub fn run_serial(&self) -> Result<ClusteringResult> {
        self.driver.run(self.driver.config.clone().with_nthreads(1))
    }

    /// All runs on a pool of `nthreads` workers
    pub fn run_with_threads(&self, nthreads: usize) -> Result<ClusteringResult> {
        self.driver.run(self.driver.config.clone().with_nthreads(nthreads))
    }

    /// Run with the worker count of the configuration
    pub fn run(&self) -> Result<ClusteringResult> {
        self.driver.run(self.driver.config.clone())
    }

    /// Token that stops every run at its next pass boundary
    pub fn cancel_token(&self) -> CancelToken {
        self.driver.cancel.clone()
    }

    pub fn data(&self) -> &DataCube {
        &self.driver.data
    }

    pub fn config(&self) -> &RunConfig {
        &self.driver.config
    }
}

/// Row, column and band clustering of a `(bands, rows, columns)` cube
#[derive(Debug)]
pub struct Triclustering {
    driver: Driver,
}

impl Triclustering {
    pub fn new(
        data: Array3<f64>,
        nclusters_row: usize,
        nclusters_col: usize,
        nclusters_bnd: usize,
        config: RunConfig,
    ) -> Result<Self> {
        let data = DataCube::from_cube(data)?;
        let counts = ClusterCounts::cube(nclusters_row, nclusters_col, nclusters_bnd);
        Ok(Self {
            driver: Driver::new(data, counts, config)?,
        })
    }

    pub fn run_serial(&self) -> Result<ClusteringResult> {
        self.driver.run(self.driver.config.clone().with_nthreads(1))
    }

    pub fn run_with_threads(&self, nthreads: usize) -> Result<ClusteringResult> {
        self.driver.run(self.driver.config.clone().with_nthreads(nthreads))
    }

    pub fn run(&self) -> Result<ClusteringResult> {
        self.driver.run(self.driver.config.clone())
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.driver.cancel.clone()
    }

    pub fn data(&self) -> &DataCube {
        &self.driver.data
    }

    pub fn config(&self) -> &RunConfig {
        &self.driver.config
    }
}
