//! # Alternating Optimization Engine
//!
//! One seeded run of block-constant co-clustering. Each pass updates the
//! clustered axes in turn: with the other axes held fixed, every index is
//! moved to the cluster whose block means reproduce its values with the
//! least squared error. The objective is the total within-block sum of
//! squares and never increases from one pass to the next.

use log::{debug, warn};
use ndarray::{Array2, Array3, Zip};
use ndarray_rand::rand::rngs::StdRng;
use ndarray_rand::rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::config::ClusterCounts;
use crate::error::{CoclusterError, Result};
use crate::scheduler::CancelToken;
use crate::tensor::{BlockStatistics, ClusterAxis, DataCube, Partitions};

/// Relative slack allowed on the objective before a rise counts as a defect
const MONOTONE_TOLERANCE: f64 = 1e-9;
/// Relative margin a candidate cluster must win by before an index moves
const MOVE_TOLERANCE: f64 = 1e-12;

/// Working state of one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    pub partitions: Partitions,
    pub objective: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// Final state of a finished run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    pub seed: u64,
    pub state: RunState,
    /// Objective after initialization followed by one entry per pass
    pub objective_trace: Vec<f64>,
}

/// Single optimization run over a shared read-only data cube
pub struct OptimizationRun<'a> {
    data: &'a DataCube,
    axes: Vec<ClusterAxis>,
    seed: u64,
    state: RunState,
    stats: BlockStatistics,
    trace: Vec<f64>,
}

impl<'a> OptimizationRun<'a> {
    /// Start from a random partition drawn from `seed`
    pub fn new(data: &'a DataCube, counts: &ClusterCounts, seed: u64) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(seed);
        let partitions = Partitions::random(data, counts, &mut rng)?;
        Ok(Self::start(data, partitions, seed))
    }

    /// Start from caller-supplied partitions
    pub fn from_partitions(data: &'a DataCube, partitions: Partitions) -> Result<Self> {
        partitions.validate_for(data)?;
        Ok(Self::start(data, partitions, 0))
    }

    fn start(data: &'a DataCube, partitions: Partitions, seed: u64) -> Self {
        let stats = BlockStatistics::compute(data.view(), &partitions);
        let objective = stats.objective();
        OptimizationRun {
            data,
            axes: data.clustered_axes(),
            seed,
            state: RunState {
                partitions,
                objective,
                iterations: 0,
                converged: false,
            },
            stats,
            trace: vec![objective],
        }
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn statistics(&self) -> &BlockStatistics {
        &self.stats
    }

    /// One full pass over all clustered axes. Returns the new objective.
    pub fn step(&mut self) -> f64 {
        let previous = self.state.objective;
        for axis_idx in 0..self.axes.len() {
            let axis = self.axes[axis_idx];
            let moved = self.reassign(axis);
            if moved > 0 {
                self.stats = BlockStatistics::compute(self.data.view(), &self.state.partitions);
            }
        }

        let objective = self.stats.objective();
        let slack = MONOTONE_TOLERANCE * previous.abs().max(1.0);
        if objective > previous + slack {
            warn!(
                "Objective increased from {:.6e} to {:.6e} (seed {})",
                previous, objective, self.seed
            );
        }
        debug_assert!(
            objective <= previous + slack,
            "objective increased from {} to {}",
            previous,
            objective
        );

        self.state.objective = objective;
        self.state.iterations += 1;
        self.trace.push(objective);
        debug!(
            "seed {} iteration {}: objective {:.6e}",
            self.seed, self.state.iterations, objective
        );
        objective
    }

    /// Iterate until the relative improvement drops below `conv_threshold`
    /// or `max_iterations` passes have run. The cancel token is checked at
    /// every pass boundary.
    pub fn run(
        mut self,
        max_iterations: usize,
        conv_threshold: f64,
        cancel: &CancelToken,
    ) -> Result<RunOutcome> {
        let mut previous = self.state.objective;
        while self.state.iterations < max_iterations {
            if cancel.is_cancelled() {
                debug!("seed {} cancelled after {} iterations", self.seed, self.state.iterations);
                return Err(CoclusterError::Cancelled);
            }
            let objective = self.step();
            if relative_improvement(previous, objective) < conv_threshold {
                self.state.converged = true;
                break;
            }
            previous = objective;
        }

        if !self.state.converged {
            warn!(
                "Run with seed {} did not converge in {} iterations (objective {:.6e})",
                self.seed, max_iterations, self.state.objective
            );
        }

        Ok(RunOutcome {
            seed: self.seed,
            state: self.state,
            objective_trace: self.trace,
        })
    }

    /// Reassign every index of `axis` against the current block means.
    /// Returns the number of indices that changed cluster.
    fn reassign(&mut self, axis: ClusterAxis) -> usize {
        let partitions = &self.state.partitions;
        let [first, second] = axis.others();
        let first_labels = partitions.axis_labels(first);
        let second_labels = partitions.axis_labels(second);
        let shape = (partitions.axis_k(first), partitions.axis_k(second));

        let current = match partitions.get(axis) {
            Some(partition) => partition,
            None => return 0,
        };
        // empty clusters have no mean and stay empty
        let candidates = current.populated_clusters();
        let means: &Array3<f64> = self.stats.means();

        let mut moves = Vec::new();
        for (index, lane) in self.data.view().axis_iter(axis.ndarray_axis()).enumerate() {
            let mut sums = Array2::<f64>::zeros(shape);
            let mut counts = Array2::<f64>::zeros(shape);
            for ((x, y), &value) in lane.indexed_iter() {
                let cell = (first_labels[x], second_labels[y]);
                sums[cell] += value;
                counts[cell] += 1.0;
            }

            // squared error of this index against cluster r, minus the
            // constant sum of its squared values
            let cost = |cluster: usize| -> f64 {
                let block_means = means.index_axis(axis.ndarray_axis(), cluster);
                Zip::from(&block_means)
                    .and(&sums)
                    .and(&counts)
                    .fold(0.0, |acc, &mean, &sum, &count| {
                        if count > 0.0 {
                            acc + count * mean * mean - 2.0 * mean * sum
                        } else {
                            acc
                        }
                    })
            };

            let label = current.label(index);
            let mut best = label;
            let mut best_cost = cost(label);
            for &cluster in &candidates {
                if cluster == label {
                    continue;
                }
                let candidate_cost = cost(cluster);
                let margin = MOVE_TOLERANCE * best_cost.abs().max(candidate_cost.abs()).max(1.0);
                if candidate_cost < best_cost - margin {
                    best = cluster;
                    best_cost = candidate_cost;
                }
            }
            if best != label {
                moves.push((index, best));
            }
        }

        if let Some(partition) = self.state.partitions.get_mut(axis) {
            for &(index, cluster) in &moves {
                partition.assign(index, cluster);
            }
        }
        moves.len()
    }
}

/// `|prev - curr| / max(prev, EPSILON)`
pub fn relative_improvement(previous: f64, current: f64) -> f64 {
    (previous - current).abs() / previous.max(f64::EPSILON)
}
