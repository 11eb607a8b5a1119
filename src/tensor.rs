//! # Tensor Partition Model
//!
//! Dense data cube, per-axis hard partitions and the block statistics the
//! alternating optimization works from.
//!
//! Everything is stored in a single `(bands, rows, columns)` layout. A
//! matrix is a cube with one band whose band axis is not clustered, so the
//! engine never special-cases the rank.

use ndarray::{Array2, Array3, ArrayD, ArrayView3, Axis, Ix2, Ix3, Zip};
use ndarray_rand::rand::seq::SliceRandom;
use ndarray_rand::rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::ClusterCounts;
use crate::error::{CoclusterError, Result};

/// Labels of the band axis of a matrix: one band, one cluster.
const SINGLE_BAND: &[usize] = &[0];

/// A clustered dimension of the data cube
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClusterAxis {
    Row,
    Column,
    Band,
}

impl ClusterAxis {
    /// Position of the axis in the `(bands, rows, columns)` layout
    pub fn position(self) -> usize {
        match self {
            ClusterAxis::Band => 0,
            ClusterAxis::Row => 1,
            ClusterAxis::Column => 2,
        }
    }

    pub fn ndarray_axis(self) -> Axis {
        Axis(self.position())
    }

    /// The two remaining axes, in layout order
    pub fn others(self) -> [ClusterAxis; 2] {
        match self {
            ClusterAxis::Band => [ClusterAxis::Row, ClusterAxis::Column],
            ClusterAxis::Row => [ClusterAxis::Band, ClusterAxis::Column],
            ClusterAxis::Column => [ClusterAxis::Band, ClusterAxis::Row],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ClusterAxis::Row => "row",
            ClusterAxis::Column => "column",
            ClusterAxis::Band => "band",
        }
    }
}

impl fmt::Display for ClusterAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Immutable dense input array of rank 2 `(rows, columns)` or rank 3
/// `(bands, rows, columns)`, validated to hold finite values only.
#[derive(Debug, Clone)]
pub struct DataCube {
    data: Array3<f64>,
    rank: usize,
}

impl DataCube {
    /// Wrap a `(rows, columns)` matrix
    pub fn from_matrix(matrix: Array2<f64>) -> Result<Self> {
        if let Some(((i, j), _)) = matrix.indexed_iter().find(|(_, v)| !v.is_finite()) {
            return Err(CoclusterError::NonFiniteValue { index: vec![i, j] });
        }
        let cube = DataCube {
            data: matrix.insert_axis(Axis(0)),
            rank: 2,
        };
        cube.check_axes()?;
        Ok(cube)
    }

    /// Wrap a `(bands, rows, columns)` cube
    pub fn from_cube(cube: Array3<f64>) -> Result<Self> {
        if let Some(((b, i, j), _)) = cube.indexed_iter().find(|(_, v)| !v.is_finite()) {
            return Err(CoclusterError::NonFiniteValue {
                index: vec![b, i, j],
            });
        }
        let cube = DataCube {
            data: cube,
            rank: 3,
        };
        cube.check_axes()?;
        Ok(cube)
    }

    /// Wrap an array of dynamic rank, which must be 2 or 3
    pub fn from_dyn(array: ArrayD<f64>) -> Result<Self> {
        match array.ndim() {
            2 => Self::from_matrix(
                array
                    .into_dimensionality::<Ix2>()
                    .map_err(|_| CoclusterError::UnsupportedRank(2))?,
            ),
            3 => Self::from_cube(
                array
                    .into_dimensionality::<Ix3>()
                    .map_err(|_| CoclusterError::UnsupportedRank(3))?,
            ),
            rank => Err(CoclusterError::UnsupportedRank(rank)),
        }
    }

    fn check_axes(&self) -> Result<()> {
        for axis in self.clustered_axes() {
            if self.axis_len(axis) == 0 {
                return Err(CoclusterError::EmptyAxis(axis));
            }
        }
        Ok(())
    }

    /// 2 for a matrix, 3 for a cube
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Shape in `(bands, rows, columns)` layout; a matrix has one band
    pub fn shape(&self) -> [usize; 3] {
        let shape = self.data.shape();
        [shape[0], shape[1], shape[2]]
    }

    pub fn axis_len(&self, axis: ClusterAxis) -> usize {
        self.data.len_of(axis.ndarray_axis())
    }

    /// Axes in the order the engine updates them
    pub fn clustered_axes(&self) -> Vec<ClusterAxis> {
        if self.rank == 3 {
            vec![ClusterAxis::Row, ClusterAxis::Column, ClusterAxis::Band]
        } else {
            vec![ClusterAxis::Row, ClusterAxis::Column]
        }
    }

    pub fn view(&self) -> ArrayView3<'_, f64> {
        self.data.view()
    }

    /// Number of cells
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

impl fmt::Display for DataCube {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [bands, rows, cols] = self.shape();
        if self.rank == 3 {
            write!(f, "DataCube {} × {} × {} (bands × rows × columns)", bands, rows, cols)
        } else {
            write!(f, "DataCube {} × {} (rows × columns)", rows, cols)
        }
    }
}

/// Hard partition of one axis: every index maps to exactly one id in `[0, k)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "AxisPartitionRecord")]
pub struct AxisPartition {
    axis: ClusterAxis,
    labels: Vec<usize>,
    k: usize,
}

/// Unchecked serialized form; converted through `AxisPartition::new`
#[derive(Deserialize)]
struct AxisPartitionRecord {
    axis: ClusterAxis,
    labels: Vec<usize>,
    k: usize,
}

impl TryFrom<AxisPartitionRecord> for AxisPartition {
    type Error = CoclusterError;

    fn try_from(record: AxisPartitionRecord) -> Result<Self> {
        AxisPartition::new(record.axis, record.labels, record.k)
    }
}

impl AxisPartition {
    pub fn new(axis: ClusterAxis, labels: Vec<usize>, k: usize) -> Result<Self> {
        if k == 0 || k > labels.len() {
            return Err(CoclusterError::InvalidClusterCount {
                axis,
                requested: k,
                axis_len: labels.len(),
            });
        }
        if let Some(&label) = labels.iter().find(|&&label| label >= k) {
            return Err(CoclusterError::LabelOutOfRange { axis, label, k });
        }
        Ok(AxisPartition { axis, labels, k })
    }

    /// Random initial partition. Ids are dealt round-robin and then
    /// shuffled, so every cluster starts non-empty.
    pub fn random<R: Rng + ?Sized>(axis: ClusterAxis, len: usize, k: usize, rng: &mut R) -> Self {
        let mut labels: Vec<usize> = (0..len).map(|i| i % k.max(1)).collect();
        labels.shuffle(rng);
        AxisPartition {
            axis,
            labels,
            k: k.max(1),
        }
    }

    pub fn axis(&self) -> ClusterAxis {
        self.axis
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Number of clusters, including empty ones
    pub fn k(&self) -> usize {
        self.k
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn label(&self, index: usize) -> usize {
        self.labels[index]
    }

    /// Move one index to another cluster. Block statistics are not
    /// refreshed; the caller recomputes them once per pass.
    pub fn assign(&mut self, index: usize, cluster: usize) {
        debug_assert!(cluster < self.k, "cluster id {} out of range {}", cluster, self.k);
        self.labels[index] = cluster;
    }

    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.k];
        for &label in &self.labels {
            sizes[label] += 1;
        }
        sizes
    }

    /// Indices assigned to `cluster`, ascending
    pub fn members(&self, cluster: usize) -> Vec<usize> {
        self.labels
            .iter()
            .enumerate()
            .filter(|(_, &label)| label == cluster)
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Ids of clusters with at least one member
    pub fn populated_clusters(&self) -> Vec<usize> {
        self.cluster_sizes()
            .iter()
            .enumerate()
            .filter(|(_, &size)| size > 0)
            .map(|(cluster, _)| cluster)
            .collect()
    }

    /// Renumber clusters by first appearance, keeping `k`. Membership is
    /// unchanged; empty clusters get the highest ids.
    pub fn relabel(&self) -> AxisPartition {
        let mut mapping = vec![usize::MAX; self.k];
        let mut next = 0;
        for &label in &self.labels {
            if mapping[label] == usize::MAX {
                mapping[label] = next;
                next += 1;
            }
        }
        let labels = self.labels.iter().map(|&label| mapping[label]).collect();
        AxisPartition {
            axis: self.axis,
            labels,
            k: self.k,
        }
    }
}

/// Coordinates of one block; `band` is 0 for a matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockIndex {
    pub row: usize,
    pub col: usize,
    pub band: usize,
}

impl BlockIndex {
    pub fn new(row: usize, col: usize) -> Self {
        BlockIndex { row, col, band: 0 }
    }

    pub fn with_band(mut self, band: usize) -> Self {
        self.band = band;
        self
    }

    fn layout(self) -> (usize, usize, usize) {
        (self.band, self.row, self.col)
    }
}

/// Partitions of all clustered axes of one data cube
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partitions {
    pub row: AxisPartition,
    pub col: AxisPartition,
    /// `None` when the data is a matrix
    pub band: Option<AxisPartition>,
}

impl Partitions {
    /// Seeded random initialization respecting the requested counts
    pub fn random<R: Rng + ?Sized>(data: &DataCube, counts: &ClusterCounts, rng: &mut R) -> Result<Self> {
        counts.validate_for(data)?;
        let row = AxisPartition::random(ClusterAxis::Row, data.axis_len(ClusterAxis::Row), counts.row, rng);
        let col = AxisPartition::random(
            ClusterAxis::Column,
            data.axis_len(ClusterAxis::Column),
            counts.col,
            rng,
        );
        let band = counts
            .band
            .map(|k| AxisPartition::random(ClusterAxis::Band, data.axis_len(ClusterAxis::Band), k, rng));
        Ok(Partitions { row, col, band })
    }

    /// Build partitions from caller-supplied label arrays
    pub fn from_labels(
        data: &DataCube,
        counts: &ClusterCounts,
        row_labels: Vec<usize>,
        col_labels: Vec<usize>,
        band_labels: Option<Vec<usize>>,
    ) -> Result<Self> {
        counts.validate_for(data)?;
        let check = |axis: ClusterAxis, labels: Vec<usize>, k: usize| -> Result<AxisPartition> {
            let expected = data.axis_len(axis);
            if labels.len() != expected {
                return Err(CoclusterError::LabelLengthMismatch {
                    axis,
                    expected,
                    found: labels.len(),
                });
            }
            AxisPartition::new(axis, labels, k)
        };
        let row = check(ClusterAxis::Row, row_labels, counts.row)?;
        let col = check(ClusterAxis::Column, col_labels, counts.col)?;
        let band = match (counts.band, band_labels) {
            (Some(k), Some(labels)) => Some(check(ClusterAxis::Band, labels, k)?),
            (None, None) => None,
            (Some(_), None) | (None, Some(_)) => {
                return Err(CoclusterError::RankMismatch {
                    data_rank: data.rank(),
                    cluster_axes: if counts.band.is_some() { 2 } else { 3 },
                })
            }
        };
        Ok(Partitions { row, col, band })
    }

    pub fn get(&self, axis: ClusterAxis) -> Option<&AxisPartition> {
        match axis {
            ClusterAxis::Row => Some(&self.row),
            ClusterAxis::Column => Some(&self.col),
            ClusterAxis::Band => self.band.as_ref(),
        }
    }

    pub fn get_mut(&mut self, axis: ClusterAxis) -> Option<&mut AxisPartition> {
        match axis {
            ClusterAxis::Row => Some(&mut self.row),
            ClusterAxis::Column => Some(&mut self.col),
            ClusterAxis::Band => self.band.as_mut(),
        }
    }

    /// Labels along `axis`; an unclustered band axis maps its single band to 0
    pub fn axis_labels(&self, axis: ClusterAxis) -> &[usize] {
        self.get(axis).map_or(SINGLE_BAND, |p| p.labels())
    }

    pub fn axis_k(&self, axis: ClusterAxis) -> usize {
        self.get(axis).map_or(1, |p| p.k())
    }

    /// Shape of the block table in `(bands, rows, columns)` layout
    pub fn block_shape(&self) -> (usize, usize, usize) {
        (
            self.axis_k(ClusterAxis::Band),
            self.axis_k(ClusterAxis::Row),
            self.axis_k(ClusterAxis::Column),
        )
    }

    /// Check these partitions cover every clustered axis of `data` with
    /// labels in `[0, k)`
    pub fn validate_for(&self, data: &DataCube) -> Result<()> {
        self.counts().validate_for(data)?;
        for axis in data.clustered_axes() {
            let partition = match self.get(axis) {
                Some(partition) => partition,
                None => {
                    return Err(CoclusterError::LabelLengthMismatch {
                        axis,
                        expected: data.axis_len(axis),
                        found: 0,
                    })
                }
            };
            let expected = data.axis_len(axis);
            if partition.len() != expected {
                return Err(CoclusterError::LabelLengthMismatch {
                    axis,
                    expected,
                    found: partition.len(),
                });
            }
            if let Some(&label) = partition.labels().iter().find(|&&label| label >= partition.k()) {
                return Err(CoclusterError::LabelOutOfRange {
                    axis,
                    label,
                    k: partition.k(),
                });
            }
        }
        Ok(())
    }

    /// Counts these partitions were built with
    pub fn counts(&self) -> ClusterCounts {
        ClusterCounts {
            row: self.row.k(),
            col: self.col.k(),
            band: self.band.as_ref().map(|p| p.k()),
        }
    }
}

/// Per-block sums, cell counts, means and sums of squared deviations
#[derive(Debug, Clone)]
pub struct BlockStatistics {
    sums: Array3<f64>,
    counts: Array3<usize>,
    means: Array3<f64>,
    deviations: Array3<f64>,
}

impl BlockStatistics {
    /// Two passes over the data: block sums first, then squared
    /// deviations from the block means.
    pub fn compute(data: ArrayView3<'_, f64>, partitions: &Partitions) -> Self {
        let shape = partitions.block_shape();
        let band_labels = partitions.axis_labels(ClusterAxis::Band);
        let row_labels = partitions.axis_labels(ClusterAxis::Row);
        let col_labels = partitions.axis_labels(ClusterAxis::Column);

        let mut sums = Array3::<f64>::zeros(shape);
        let mut counts = Array3::<usize>::zeros(shape);
        for ((b, i, j), &value) in data.indexed_iter() {
            let block = (band_labels[b], row_labels[i], col_labels[j]);
            sums[block] += value;
            counts[block] += 1;
        }

        let means = Zip::from(&sums)
            .and(&counts)
            .map_collect(|&sum, &count| if count > 0 { sum / count as f64 } else { f64::NAN });

        let mut deviations = Array3::<f64>::zeros(shape);
        for ((b, i, j), &value) in data.indexed_iter() {
            let block = (band_labels[b], row_labels[i], col_labels[j]);
            let delta = value - means[block];
            deviations[block] += delta * delta;
        }

        BlockStatistics {
            sums,
            counts,
            means,
            deviations,
        }
    }

    /// Mean of the block, `None` when it holds no cells
    pub fn block_mean(&self, block: BlockIndex) -> Option<f64> {
        let idx = block.layout();
        match self.counts.get(idx) {
            Some(&count) if count > 0 => Some(self.means[idx]),
            _ => None,
        }
    }

    /// Sum of squared deviations from the block mean, `None` when empty
    pub fn block_variance(&self, block: BlockIndex) -> Option<f64> {
        let idx = block.layout();
        match self.counts.get(idx) {
            Some(&count) if count > 0 => Some(self.deviations[idx]),
            _ => None,
        }
    }

    pub fn block_count(&self, block: BlockIndex) -> usize {
        self.counts.get(block.layout()).copied().unwrap_or(0)
    }

    pub fn block_sum(&self, block: BlockIndex) -> f64 {
        self.sums.get(block.layout()).copied().unwrap_or(0.0)
    }

    /// Block means in `(bands, rows, columns)` layout; NaN marks empty blocks
    pub fn means(&self) -> &Array3<f64> {
        &self.means
    }

    /// Total within-block sum of squares. Empty blocks contribute zero.
    pub fn objective(&self) -> f64 {
        self.deviations.sum()
    }
}
