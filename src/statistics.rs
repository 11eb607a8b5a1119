//! # Cluster Statistics
//!
//! Per-block aggregates of a finalized partition. Tables are indexed by
//! `(row_cluster, column_cluster)` for matrices and by
//! `(row_cluster, column_cluster, band_cluster)` for cubes. Blocks built
//! from an empty cluster hold `None`.

use ndarray::{ArrayD, Dimension, IxDyn};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::error::Result;
use crate::tensor::{BlockIndex, BlockStatistics, ClusterAxis, DataCube, Partitions};

/// Aggregates of the cells of one non-empty block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockSummary {
    pub count: usize,
    pub mean: f64,
    /// Population standard deviation
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

fn table_shape(partitions: &Partitions) -> Vec<usize> {
    let mut dims = vec![partitions.row.k(), partitions.col.k()];
    if let Some(band) = &partitions.band {
        dims.push(band.k());
    }
    dims
}

fn block_at(index: &IxDyn) -> BlockIndex {
    let block = BlockIndex::new(index[0], index[1]);
    if index.ndim() == 3 {
        block.with_band(index[2])
    } else {
        block
    }
}

/// Mean of every block, `None` for empty blocks
///
/// # Example
/// ```
/// use block_cocluster::config::ClusterCounts;
/// use block_cocluster::statistics::cluster_averages;
/// use block_cocluster::tensor::{DataCube, Partitions};
/// use ndarray::array;
///
/// let data = DataCube::from_matrix(array![[1.0, 2.0], [3.0, 4.0]]).unwrap();
/// let partitions = Partitions::from_labels(
///     &data, &ClusterCounts::matrix(2, 1), vec![0, 1], vec![0, 0], None,
/// ).unwrap();
/// let means = cluster_averages(&data, &partitions).unwrap();
/// assert_eq!(means[[0, 0]], Some(1.5));
/// assert_eq!(means[[1, 0]], Some(3.5));
/// ```
pub fn cluster_averages(data: &DataCube, partitions: &Partitions) -> Result<ArrayD<Option<f64>>> {
    partitions.validate_for(data)?;
    let stats = BlockStatistics::compute(data.view(), partitions);
    Ok(ArrayD::from_shape_fn(IxDyn(&table_shape(partitions)), |index| {
        stats.block_mean(block_at(&index))
    }))
}

/// Count, mean, spread and range of every block, `None` for empty blocks
pub fn block_summaries(data: &DataCube, partitions: &Partitions) -> Result<ArrayD<Option<BlockSummary>>> {
    partitions.validate_for(data)?;
    let dims = table_shape(partitions);
    let mut values: ArrayD<Vec<f64>> = ArrayD::from_elem(IxDyn(&dims), Vec::new());

    let band_labels = partitions.axis_labels(ClusterAxis::Band);
    let row_labels = partitions.axis_labels(ClusterAxis::Row);
    let col_labels = partitions.axis_labels(ClusterAxis::Column);
    let is_cube = partitions.band.is_some();

    for ((b, i, j), &value) in data.view().indexed_iter() {
        let cell = if is_cube {
            IxDyn(&[row_labels[i], col_labels[j], band_labels[b]])
        } else {
            IxDyn(&[row_labels[i], col_labels[j]])
        };
        values[cell].push(value);
    }

    Ok(values.map(|cells| {
        if cells.is_empty() {
            return None;
        }
        Some(BlockSummary {
            count: cells.len(),
            mean: Statistics::mean(cells.iter()),
            std_dev: Statistics::population_std_dev(cells.iter()),
            min: Statistics::min(cells.iter()),
            max: Statistics::max(cells.iter()),
        })
    }))
}
