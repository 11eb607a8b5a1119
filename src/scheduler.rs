//! # Multi-Run Scheduler
//!
//! Runs `nruns` independently seeded optimizations on a bounded rayon pool
//! and keeps the one with the lowest objective. Run `i` is seeded with
//! `base_seed + i`, and ties go to the lowest run index, so the winner
//! depends only on the base seed and `nruns`, never on the worker count
//! or completion order.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use log::{debug, info};
use ndarray::ArrayD;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{ClusterCounts, RunConfig};
use crate::engine::{OptimizationRun, RunOutcome};
use crate::error::{CoclusterError, Result};
use crate::statistics::cluster_averages;
use crate::tensor::{DataCube, Partitions};

/// Shared stop flag. Runs observe it at their next pass boundary.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Outcome of a multi-run clustering
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusteringResult {
    pub partitions: Partitions,
    /// Within-block sum of squares of the winning run
    pub objective: f64,
    pub converged: bool,
    pub iterations: usize,
    /// Index of the winning run
    pub run_index: usize,
    /// Base seed the run seeds were derived from
    pub seed: u64,
    pub nruns_completed: usize,
    pub nruns_converged: usize,
    pub counts: ClusterCounts,
    pub config: RunConfig,
}

impl ClusteringResult {
    pub fn row_labels(&self) -> &[usize] {
        self.partitions.row.labels()
    }

    pub fn col_labels(&self) -> &[usize] {
        self.partitions.col.labels()
    }

    /// `None` for matrix input
    pub fn band_labels(&self) -> Option<&[usize]> {
        self.partitions.band.as_ref().map(|p| p.labels())
    }

    /// Block means of `data` under this result's partitions
    pub fn cluster_averages(&self, data: &DataCube) -> Result<ArrayD<Option<f64>>> {
        cluster_averages(data, &self.partitions)
    }
}

/// Multi-run driver over one data cube
pub struct MultiRunScheduler<'a> {
    data: &'a DataCube,
    counts: ClusterCounts,
    config: RunConfig,
    cancel: CancelToken,
}

impl<'a> MultiRunScheduler<'a> {
    /// Validates the configuration and the counts before anything runs
    pub fn new(data: &'a DataCube, counts: ClusterCounts, config: RunConfig) -> Result<Self> {
        config.validate()?;
        counts.validate_for(data)?;
        Ok(Self {
            data,
            counts,
            config,
            cancel: CancelToken::new(),
        })
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Seeds of all runs, derived from the base seed
    pub fn run_seeds(base_seed: u64, nruns: usize) -> Vec<u64> {
        (0..nruns as u64).map(|i| base_seed.wrapping_add(i)).collect()
    }

    /// Execute all runs on `config.nthreads` workers and select the winner
    pub fn run(&self) -> Result<ClusteringResult> {
        let start_time = Instant::now();
        let base_seed = self
            .config
            .seed
            .unwrap_or_else(ndarray_rand::rand::random::<u64>);
        let seeds = Self::run_seeds(base_seed, self.config.nruns);

        info!(
            "Starting {} runs on {} with {} worker(s), base seed {}",
            self.config.nruns, self.data, self.config.nthreads, base_seed
        );

        let outcomes = if self.config.nthreads == 1 {
            seeds
                .iter()
                .map(|&seed| self.run_one(seed))
                .collect::<Result<Vec<_>>>()?
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.config.nthreads)
                .build()
                .map_err(|e| CoclusterError::ThreadPool(e.to_string()))?;
            pool.install(|| {
                seeds
                    .par_iter()
                    .map(|&seed| self.run_one(seed))
                    .collect::<Result<Vec<_>>>()
            })?
        };

        let result = self.select(outcomes, base_seed)?;
        info!(
            "Selected run {} of {}: objective {:.6e}, {} iterations, converged {} ({} of {} runs converged) in {:.2?}",
            result.run_index,
            result.nruns_completed,
            result.objective,
            result.iterations,
            result.converged,
            result.nruns_converged,
            result.nruns_completed,
            start_time.elapsed()
        );
        Ok(result)
    }

    fn run_one(&self, seed: u64) -> Result<RunOutcome> {
        let outcome = OptimizationRun::new(self.data, &self.counts, seed)?.run(
            self.config.max_iterations,
            self.config.conv_threshold,
            &self.cancel,
        )?;
        debug!(
            "Run with seed {} finished: objective {:.6e} after {} iterations (converged: {})",
            seed, outcome.state.objective, outcome.state.iterations, outcome.state.converged
        );
        Ok(outcome)
    }

    /// Lowest objective wins; ties go to the earliest run
    fn select(&self, outcomes: Vec<RunOutcome>, base_seed: u64) -> Result<ClusteringResult> {
        let nruns_completed = outcomes.len();
        let nruns_converged = outcomes.iter().filter(|o| o.state.converged).count();

        let mut best: Option<(usize, RunOutcome)> = None;
        for (run_index, outcome) in outcomes.into_iter().enumerate() {
            let better = match &best {
                Some((_, current)) => outcome.state.objective < current.state.objective,
                None => true,
            };
            if better {
                best = Some((run_index, outcome));
            }
        }

        let (run_index, winner) = best.ok_or_else(|| CoclusterError::InvalidParameter {
            name: "nruns",
            reason: "no runs were executed".to_string(),
        })?;

        Ok(ClusteringResult {
            partitions: winner.state.partitions,
            objective: winner.state.objective,
            converged: winner.state.converged,
            iterations: winner.state.iterations,
            run_index,
            seed: base_seed,
            nruns_completed,
            nruns_converged,
            counts: self.counts,
            config: self.config.clone(),
        })
    }
}
