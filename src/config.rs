//! # Run Configuration
//!
//! Run-control parameters for the multi-run scheduler and the per-axis
//! cluster counts.

use serde::{Deserialize, Serialize};

use crate::error::{CoclusterError, Result};
use crate::tensor::{ClusterAxis, DataCube};

/// Run-control parameters
///
/// # Examples
/// ```
/// use block_cocluster::config::RunConfig;
///
/// let config = RunConfig::default()
///     .with_nruns(10)
///     .with_nthreads(4)
///     .with_seed(42);
/// assert!(config.validate().is_ok());
/// assert_eq!(config.max_iterations, 100);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Maximum number of full passes per run
    pub max_iterations: usize,
    /// Relative objective improvement below which a run is converged
    pub conv_threshold: f64,
    /// Number of differently-initialized runs
    pub nruns: usize,
    /// Number of worker threads
    pub nthreads: usize,
    /// Base seed; `None` draws one from OS entropy
    pub seed: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            conv_threshold: 1e-5,
            nruns: 1,
            nthreads: 1,
            seed: None,
        }
    }
}

impl RunConfig {
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_conv_threshold(mut self, conv_threshold: f64) -> Self {
        self.conv_threshold = conv_threshold;
        self
    }

    pub fn with_nruns(mut self, nruns: usize) -> Self {
        self.nruns = nruns;
        self
    }

    pub fn with_nthreads(mut self, nthreads: usize) -> Self {
        self.nthreads = nthreads;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(CoclusterError::InvalidParameter {
                name: "max_iterations",
                reason: "must be at least 1".to_string(),
            });
        }
        if !self.conv_threshold.is_finite() || self.conv_threshold < 0.0 {
            return Err(CoclusterError::InvalidParameter {
                name: "conv_threshold",
                reason: format!("must be finite and non-negative, got {}", self.conv_threshold),
            });
        }
        if self.nruns == 0 {
            return Err(CoclusterError::InvalidParameter {
                name: "nruns",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.nthreads == 0 {
            return Err(CoclusterError::InvalidParameter {
                name: "nthreads",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Number of clusters per axis; `band` is set only for rank-3 data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterCounts {
    pub row: usize,
    pub col: usize,
    pub band: Option<usize>,
}

impl ClusterCounts {
    /// Counts for a matrix
    pub fn matrix(row: usize, col: usize) -> Self {
        Self {
            row,
            col,
            band: None,
        }
    }

    /// Counts for a `(bands, rows, columns)` cube
    pub fn cube(row: usize, col: usize, band: usize) -> Self {
        Self {
            row,
            col,
            band: Some(band),
        }
    }

    pub fn get(&self, axis: ClusterAxis) -> Option<usize> {
        match axis {
            ClusterAxis::Row => Some(self.row),
            ClusterAxis::Column => Some(self.col),
            ClusterAxis::Band => self.band,
        }
    }

    /// Number of clustered axes
    pub fn num_axes(&self) -> usize {
        if self.band.is_some() {
            3
        } else {
            2
        }
    }

    /// Total number of blocks
    pub fn num_blocks(&self) -> usize {
        self.row * self.col * self.band.unwrap_or(1)
    }

    /// Check rank agreement and `1 <= k <= axis length` on every axis
    pub fn validate_for(&self, data: &DataCube) -> Result<()> {
        if self.num_axes() != data.rank() {
            return Err(CoclusterError::RankMismatch {
                data_rank: data.rank(),
                cluster_axes: self.num_axes(),
            });
        }
        for axis in data.clustered_axes() {
            let requested = self.get(axis).unwrap_or(0);
            let axis_len = data.axis_len(axis);
            if requested == 0 || requested > axis_len {
                return Err(CoclusterError::InvalidClusterCount {
                    axis,
                    requested,
                    axis_len,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, Array3};

    #[test]
    fn test_default_config() {
        let config = RunConfig::default();
        assert_eq!(config.max_iterations, 100);
        assert_eq!(config.conv_threshold, 1e-5);
        assert_eq!(config.nruns, 1);
        assert_eq!(config.nthreads, 1);
        assert!(config.seed.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_parameters() {
        let bad = [
            RunConfig::default().with_max_iterations(0),
            RunConfig::default().with_nruns(0),
            RunConfig::default().with_nthreads(0),
            RunConfig::default().with_conv_threshold(-1.0),
            RunConfig::default().with_conv_threshold(f64::NAN),
        ];
        for config in bad.iter() {
            assert!(matches!(
                config.validate(),
                Err(CoclusterError::InvalidParameter { .. })
            ));
        }
    }

    #[test]
    fn test_counts_rank_mismatch() {
        let matrix = DataCube::from_matrix(Array2::zeros((4, 4))).unwrap();
        let err = ClusterCounts::cube(2, 2, 2).validate_for(&matrix).unwrap_err();
        assert_eq!(
            err,
            CoclusterError::RankMismatch {
                data_rank: 2,
                cluster_axes: 3
            }
        );

        let cube = DataCube::from_cube(Array3::zeros((2, 4, 4))).unwrap();
        assert!(matches!(
            ClusterCounts::matrix(2, 2).validate_for(&cube),
            Err(CoclusterError::RankMismatch { data_rank: 3, .. })
        ));
    }

    #[test]
    fn test_counts_out_of_range() {
        let cube = DataCube::from_cube(Array3::zeros((3, 2, 4))).unwrap();
        assert_eq!(
            ClusterCounts::cube(4, 3, 2).validate_for(&cube).unwrap_err(),
            CoclusterError::InvalidClusterCount {
                axis: ClusterAxis::Row,
                requested: 4,
                axis_len: 2
            }
        );
        assert!(matches!(
            ClusterCounts::cube(2, 0, 2).validate_for(&cube),
            Err(CoclusterError::InvalidClusterCount {
                axis: ClusterAxis::Column,
                ..
            })
        ));
        assert!(ClusterCounts::cube(2, 3, 2).validate_for(&cube).is_ok());
    }

    #[test]
    fn test_num_blocks() {
        assert_eq!(ClusterCounts::matrix(4, 3).num_blocks(), 12);
        assert_eq!(ClusterCounts::cube(4, 3, 2).num_blocks(), 24);
    }

    #[test]
    fn test_config_roundtrip_json() {
        let config = RunConfig::default().with_seed(3).with_nruns(5);
        let json = serde_json::to_string(&config).unwrap();
        let back: RunConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
