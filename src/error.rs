//! # Error Types
//!
//! Configuration errors abort before any optimization starts. Numerical
//! edge cases (empty clusters, empty blocks) are absorbed internally and
//! never surface here; non-convergence is reported as data on the result.

use crate::tensor::ClusterAxis;
use std::error::Error;
use std::fmt;

/// Errors raised by the co-clustering engine and its helpers
#[derive(Debug, Clone, PartialEq)]
pub enum CoclusterError {
    /// Cluster count outside `[1, axis length]`
    InvalidClusterCount {
        axis: ClusterAxis,
        requested: usize,
        axis_len: usize,
    },
    /// Number of cluster counts does not match the rank of the data
    RankMismatch {
        data_rank: usize,
        cluster_axes: usize,
    },
    /// Only rank 2 and rank 3 arrays can be clustered
    UnsupportedRank(usize),
    /// NaN or infinite value found in the input (index in the input's own layout)
    NonFiniteValue { index: Vec<usize> },
    /// A clustered axis has length zero
    EmptyAxis(ClusterAxis),
    /// A run-control parameter is out of range
    InvalidParameter { name: &'static str, reason: String },
    /// A label array does not cover its axis
    LabelLengthMismatch {
        axis: ClusterAxis,
        expected: usize,
        found: usize,
    },
    /// A label is not in `[0, k)`
    LabelOutOfRange {
        axis: ClusterAxis,
        label: usize,
        k: usize,
    },
    /// The worker pool could not be built
    ThreadPool(String),
    /// The caller requested a stop before all runs finished
    Cancelled,
}

impl fmt::Display for CoclusterError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CoclusterError::InvalidClusterCount {
                axis,
                requested,
                axis_len,
            } => write!(
                f,
                "Invalid cluster count {} for {} axis (must be in [1, {}])",
                requested, axis, axis_len
            ),
            CoclusterError::RankMismatch {
                data_rank,
                cluster_axes,
            } => write!(
                f,
                "Rank mismatch: data has rank {} but {} cluster counts were supplied",
                data_rank, cluster_axes
            ),
            CoclusterError::UnsupportedRank(rank) => {
                write!(f, "Unsupported array rank {} (expected 2 or 3)", rank)
            }
            CoclusterError::NonFiniteValue { index } => {
                write!(f, "Non-finite value in input array at {:?}", index)
            }
            CoclusterError::EmptyAxis(axis) => write!(f, "The {} axis has length zero", axis),
            CoclusterError::InvalidParameter { name, reason } => {
                write!(f, "Invalid parameter `{}`: {}", name, reason)
            }
            CoclusterError::LabelLengthMismatch {
                axis,
                expected,
                found,
            } => write!(
                f,
                "Label array for {} axis has length {} (expected {})",
                axis, found, expected
            ),
            CoclusterError::LabelOutOfRange { axis, label, k } => write!(
                f,
                "Label {} on {} axis is out of range for {} clusters",
                label, axis, k
            ),
            CoclusterError::ThreadPool(msg) => write!(f, "Thread pool error: {}", msg),
            CoclusterError::Cancelled => write!(f, "Clustering was cancelled"),
        }
    }
}

impl Error for CoclusterError {}

pub type Result<T> = std::result::Result<T, CoclusterError>;
