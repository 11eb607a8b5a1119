//! # Consensus Scoring
//!
//! Agreement between two partitions of the same array, independent of how
//! either labels its clusters. Every block of one partition is compared with
//! every block of the other by Jaccard index over cell sets, the blocks are
//! matched one-to-one for maximum total similarity, and the matched total is
//! divided by the larger block count.

use std::collections::BTreeMap;

use ndarray::Array2;

use crate::assignment::max_weight_assignment;
use crate::error::{CoclusterError, Result};
use crate::tensor::{ClusterAxis, Partitions};

/// Axis order of label arrays handed to [`label_consensus`]
const LABEL_AXES: [ClusterAxis; 3] = [ClusterAxis::Row, ClusterAxis::Column, ClusterAxis::Band];

/// Box-shaped set of cells: one sorted index set per axis.
///
/// The block's cells are the Cartesian product of its per-axis index sets,
/// so two blocks overlap in the product of their per-axis overlaps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    indices: Vec<Vec<usize>>,
}

impl Block {
    /// Build from per-axis index sets (duplicates are dropped)
    ///
    /// # Example
    /// ```
    /// use block_cocluster::consensus::Block;
    ///
    /// let block = Block::new(vec![vec![2, 0, 2], vec![1, 3]]);
    /// assert_eq!(block.axis_indices(0), &[0, 2]);
    /// assert_eq!(block.size(), 4);
    /// ```
    pub fn new(indices: Vec<Vec<usize>>) -> Self {
        let indices = indices
            .into_iter()
            .map(|mut axis| {
                axis.sort_unstable();
                axis.dedup();
                axis
            })
            .collect();
        Self { indices }
    }

    pub fn rank(&self) -> usize {
        self.indices.len()
    }

    /// Number of cells
    pub fn size(&self) -> usize {
        if self.indices.is_empty() {
            return 0;
        }
        self.indices.iter().map(Vec::len).product()
    }

    pub fn axis_indices(&self, axis: usize) -> &[usize] {
        &self.indices[axis]
    }

    /// Number of cells shared with `other`
    pub fn intersection_size(&self, other: &Block) -> usize {
        if self.rank() != other.rank() || self.indices.is_empty() {
            return 0;
        }
        self.indices
            .iter()
            .zip(other.indices.iter())
            .map(|(a, b)| sorted_overlap(a, b))
            .product()
    }

    /// Jaccard index of the two cell sets; 0 when both are empty
    pub fn jaccard(&self, other: &Block) -> f64 {
        let intersection = self.intersection_size(other);
        let union = self.size() + other.size() - intersection;
        if union == 0 {
            return 0.0;
        }
        intersection as f64 / union as f64
    }
}

fn sorted_overlap(a: &[usize], b: &[usize]) -> usize {
    let (mut i, mut j, mut count) = (0, 0, 0);
    while i < a.len() && j < b.len() {
        if a[i] < b[j] {
            i += 1;
        } else if a[i] > b[j] {
            j += 1;
        } else {
            count += 1;
            i += 1;
            j += 1;
        }
    }
    count
}

/// Blocks induced by per-axis label arrays.
///
/// Only combinations of populated clusters produce a block, so unused
/// cluster ids never add empty blocks to the count. Blocks are emitted in
/// ascending cluster-id order, last axis fastest.
pub fn blocks_from_labels(labels: &[&[usize]]) -> Vec<Block> {
    if labels.is_empty() {
        return Vec::new();
    }

    let groups: Vec<Vec<Vec<usize>>> = labels
        .iter()
        .map(|axis_labels| {
            let mut members: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
            for (index, &label) in axis_labels.iter().enumerate() {
                members.entry(label).or_default().push(index);
            }
            members.into_values().collect()
        })
        .collect();

    let mut blocks: Vec<Vec<Vec<usize>>> = vec![Vec::new()];
    for axis_groups in &groups {
        blocks = blocks
            .into_iter()
            .flat_map(|prefix| {
                axis_groups.iter().map(move |group| {
                    let mut next = prefix.clone();
                    next.push(group.clone());
                    next
                })
            })
            .collect();
    }

    blocks.into_iter().map(|indices| Block { indices }).collect()
}

/// Blocks of a clustering result, axes ordered row, column, band
pub fn blocks_from_partitions(partitions: &Partitions) -> Vec<Block> {
    let mut labels: Vec<&[usize]> = vec![partitions.row.labels(), partitions.col.labels()];
    if let Some(band) = &partitions.band {
        labels.push(band.labels());
    }
    blocks_from_labels(&labels)
}

/// Matched Jaccard similarity of two block sets, in `[0, 1]`.
///
/// Both sides empty scores 1.0; exactly one side empty scores 0.0.
pub fn consensus_score(a: &[Block], b: &[Block]) -> Result<f64> {
    if a.is_empty() && b.is_empty() {
        return Ok(1.0);
    }
    if a.is_empty() || b.is_empty() {
        return Ok(0.0);
    }

    let rank = a[0].rank();
    if let Some(block) = a.iter().chain(b.iter()).find(|block| block.rank() != rank) {
        return Err(CoclusterError::InvalidParameter {
            name: "blocks",
            reason: format!("blocks of rank {} and {} cannot be compared", rank, block.rank()),
        });
    }

    let similarity = Array2::from_shape_fn((a.len(), b.len()), |(i, j)| a[i].jaccard(&b[j]));
    let matched: f64 = max_weight_assignment(similarity.view())
        .into_iter()
        .map(|(i, j)| similarity[[i, j]])
        .sum();

    Ok((matched / a.len().max(b.len()) as f64).clamp(0.0, 1.0))
}

/// Consensus of two labelings given as per-axis label arrays
/// (row, column and optionally band).
///
/// # Example
/// ```
/// use block_cocluster::consensus::label_consensus;
///
/// let planted: [&[usize]; 2] = [&[0, 0, 1, 1], &[0, 1, 0, 1]];
/// let recovered: [&[usize]; 2] = [&[1, 1, 0, 0], &[1, 0, 1, 0]];
/// assert_eq!(label_consensus(&planted, &recovered).unwrap(), 1.0);
/// ```
pub fn label_consensus(a: &[&[usize]], b: &[&[usize]]) -> Result<f64> {
    if a.len() != b.len() || a.len() < 2 || a.len() > LABEL_AXES.len() {
        return Err(CoclusterError::InvalidParameter {
            name: "labels",
            reason: format!(
                "expected label arrays for 2 or 3 matching axes, got {} and {}",
                a.len(),
                b.len()
            ),
        });
    }
    for ((axis, a_labels), b_labels) in LABEL_AXES.iter().zip(a.iter()).zip(b.iter()) {
        if a_labels.len() != b_labels.len() {
            return Err(CoclusterError::LabelLengthMismatch {
                axis: *axis,
                expected: a_labels.len(),
                found: b_labels.len(),
            });
        }
    }
    consensus_score(&blocks_from_labels(a), &blocks_from_labels(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_normalizes_indices() {
        let block = Block::new(vec![vec![3, 1, 3], vec![0]]);
        assert_eq!(block.axis_indices(0), &[1, 3]);
        assert_eq!(block.size(), 2);
    }

    #[test]
    fn test_jaccard() {
        let a = Block::new(vec![vec![0, 1], vec![0, 1]]);
        let b = Block::new(vec![vec![1, 2], vec![0, 1]]);
        // 2 shared cells out of 6
        assert!((a.jaccard(&b) - 2.0 / 6.0).abs() < 1e-12);
        assert_eq!(a.jaccard(&a), 1.0);

        let empty = Block::new(vec![vec![], vec![0]]);
        assert_eq!(empty.jaccard(&empty), 0.0);
        assert_eq!(empty.jaccard(&a), 0.0);
    }

    #[test]
    fn test_blocks_from_labels_skips_unpopulated() {
        let rows: &[usize] = &[0, 0, 2, 2];
        let cols: &[usize] = &[1, 0, 1];
        let blocks = blocks_from_labels(&[rows, cols]);
        assert_eq!(blocks.len(), 4);
        assert_eq!(blocks[0], Block::new(vec![vec![0, 1], vec![1]]));
        assert_eq!(blocks[1], Block::new(vec![vec![0, 1], vec![0, 2]]));
        let total: usize = blocks.iter().map(Block::size).sum();
        assert_eq!(total, 12);
    }

    #[test]
    fn test_self_consensus_is_one() {
        let rows: &[usize] = &[0, 1, 2, 0, 1];
        let cols: &[usize] = &[1, 1, 0];
        let bands: &[usize] = &[0, 1];
        let labels = [rows, cols, bands];
        assert_eq!(label_consensus(&labels, &labels).unwrap(), 1.0);
    }

    #[test]
    fn test_permutation_invariance() {
        let rows: &[usize] = &[0, 0, 1, 1, 2, 3];
        let cols: &[usize] = &[0, 1, 1, 0, 2];
        let rows_swapped: &[usize] = &[3, 3, 0, 0, 1, 2];
        let cols_swapped: &[usize] = &[2, 0, 0, 2, 1];
        let other_rows: &[usize] = &[0, 1, 1, 1, 2, 2];
        let other_cols: &[usize] = &[0, 0, 1, 1, 1];

        let reference = label_consensus(&[rows, cols], &[other_rows, other_cols]).unwrap();
        let swapped = label_consensus(&[rows_swapped, cols_swapped], &[other_rows, other_cols]).unwrap();
        assert!((reference - swapped).abs() < 1e-12);
        assert!(reference > 0.0 && reference < 1.0);
    }

    #[test]
    fn test_mismatched_block_counts() {
        let rows: &[usize] = &[0, 0, 1, 1, 2, 2, 3, 3];
        let a_cols: &[usize] = &[0, 0, 1, 1, 2, 2];
        let b_cols: &[usize] = &[0, 0, 0, 1, 1, 1];
        let a = blocks_from_labels(&[rows, a_cols]);
        let b = blocks_from_labels(&[rows, b_cols]);
        assert_eq!(a.len(), 12);
        assert_eq!(b.len(), 8);

        // each of B's 8 blocks matches an A block at 4/6; 4 A blocks stay unmatched
        let score = consensus_score(&a, &b).unwrap();
        assert!((score - 4.0 / 9.0).abs() < 1e-12);
        assert_eq!(consensus_score(&b, &a).unwrap(), score);
    }

    #[test]
    fn test_empty_sides() {
        let a = vec![Block::new(vec![vec![0], vec![0]])];
        assert_eq!(consensus_score(&[], &[]).unwrap(), 1.0);
        assert_eq!(consensus_score(&a, &[]).unwrap(), 0.0);
    }

    #[test]
    fn test_rank_mismatch_rejected() {
        let a = vec![Block::new(vec![vec![0], vec![0]])];
        let b = vec![Block::new(vec![vec![0], vec![0], vec![0]])];
        assert!(matches!(
            consensus_score(&a, &b),
            Err(CoclusterError::InvalidParameter { name: "blocks", .. })
        ));
    }

    #[test]
    fn test_label_length_mismatch() {
        let rows: &[usize] = &[0, 1];
        let cols: &[usize] = &[0, 1, 1];
        let short_cols: &[usize] = &[0, 1];
        assert_eq!(
            label_consensus(&[rows, cols], &[rows, short_cols]).unwrap_err(),
            CoclusterError::LabelLengthMismatch {
                axis: ClusterAxis::Column,
                expected: 3,
                found: 2
            }
        );
    }
}
