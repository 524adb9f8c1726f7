//! Hyperslab blocks.
//!
//! A [`HyperslabBlock`] is a single axis-aligned rectangle of an array, described the way hyperslab selections are: a `start`, `stride`, `count` and `block` per axis.
//! Blocks produced by this crate always have unit stride and count, so the rectangle is `start..start + block` on each axis.
//!
//! Hyperslab blocks are assembled from per-axis [`Block`]s with [`combine_blocks`].

use derive_more::Display;
use itertools::{izip, Itertools};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A contiguous run of indices along a single axis.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[display("{{start: {start}, length: {length}}}")]
pub struct Block {
    start: u64,
    length: u64,
}

impl Block {
    /// Create a new block of `length` indices beginning at `start`.
    #[must_use]
    pub const fn new(start: u64, length: u64) -> Self {
        Self { start, length }
    }

    /// Return the first index of the block.
    #[must_use]
    pub const fn start(&self) -> u64 {
        self.start
    }

    /// Return the number of indices in the block.
    #[must_use]
    pub const fn length(&self) -> u64 {
        self.length
    }

    /// Return the end (exclusive) of the block.
    #[must_use]
    pub const fn end_exc(&self) -> u64 {
        self.start + self.length
    }

    /// Return the block moved towards the origin by `offset`.
    ///
    /// Used to translate a block from global coordinates to the local frame of a process window.
    #[must_use]
    pub const fn shifted_down(&self, offset: u64) -> Self {
        Self {
            start: self.start.saturating_sub(offset),
            length: self.length,
        }
    }
}

/// A hyperslab block.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[display("start {start:?} block {block:?}")]
pub struct HyperslabBlock {
    /// The start of the block.
    start: Vec<u64>,
    /// The stride between repeated blocks.
    stride: Vec<u64>,
    /// The number of repeated blocks.
    count: Vec<u64>,
    /// The shape of the block.
    block: Vec<u64>,
}

impl HyperslabBlock {
    /// Create a new hyperslab block with unit stride and count.
    ///
    /// # Errors
    /// Returns [`IncompatibleDimensionalityError`] if the lengths of `start` and `block` do not match.
    pub fn new_with_start_block(
        start: Vec<u64>,
        block: Vec<u64>,
    ) -> Result<Self, IncompatibleDimensionalityError> {
        if start.len() == block.len() {
            let ones = vec![1; start.len()];
            Ok(Self {
                start,
                stride: ones.clone(),
                count: ones,
                block,
            })
        } else {
            Err(IncompatibleDimensionalityError::new(
                block.len(),
                start.len(),
            ))
        }
    }

    /// Create a hyperslab block from one [`Block`] per axis.
    #[must_use]
    pub fn from_blocks(blocks: &[Block]) -> Self {
        let ones = vec![1; blocks.len()];
        Self {
            start: blocks.iter().map(Block::start).collect(),
            stride: ones.clone(),
            count: ones,
            block: blocks.iter().map(Block::length).collect(),
        }
    }

    /// Return the start of the hyperslab block.
    #[must_use]
    pub fn start(&self) -> &[u64] {
        &self.start
    }

    /// Return the stride of the hyperslab block.
    #[must_use]
    pub fn stride(&self) -> &[u64] {
        &self.stride
    }

    /// Return the count of the hyperslab block.
    #[must_use]
    pub fn count(&self) -> &[u64] {
        &self.count
    }

    /// Return the block shape of the hyperslab block.
    #[must_use]
    pub fn block(&self) -> &[u64] {
        &self.block
    }

    /// Return the dimensionality of the hyperslab block.
    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.start.len()
    }

    /// Return the per-axis [`Block`]s.
    #[must_use]
    pub fn blocks(&self) -> Vec<Block> {
        std::iter::zip(&self.start, &self.block)
            .map(|(&start, &length)| Block::new(start, length))
            .collect()
    }

    /// Return the number of elements of the hyperslab block.
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        std::iter::zip(&self.count, &self.block)
            .map(|(count, block)| count * block)
            .product()
    }

    /// Returns true if the hyperslab block is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.num_elements() == 0
    }

    /// Return the end (exclusive) of the hyperslab block.
    #[must_use]
    pub fn end_exc(&self) -> Vec<u64> {
        izip!(&self.start, &self.stride, &self.count, &self.block)
            .map(|(start, stride, count, block)| {
                if *count == 0 {
                    *start
                } else {
                    start + (count - 1) * stride + block
                }
            })
            .collect()
    }

    /// Returns true if the hyperslab block is within the bounds of `shape`.
    #[must_use]
    pub fn inbounds(&self, shape: &[u64]) -> bool {
        self.dimensionality() == shape.len()
            && std::iter::zip(self.end_exc(), shape).all(|(end, &extent)| end <= extent)
    }

    /// Returns an iterator over the indices of elements within the hyperslab block in C order.
    pub fn iter_indices(&self) -> impl Iterator<Item = Vec<u64>> + '_ {
        if self.is_empty() || self.dimensionality() == 0 {
            return itertools::Either::Left(std::iter::empty());
        }
        itertools::Either::Right(
            izip!(&self.start, &self.stride, &self.count, &self.block)
                .map(|(&start, &stride, &count, &block)| {
                    (0..count).flat_map(move |c| {
                        let offset = start + c * stride;
                        offset..offset + block
                    })
                })
                .multi_cartesian_product(),
        )
    }
}

/// Combine per-axis blocks into hyperslab blocks.
///
/// Returns one [`HyperslabBlock`] for every element of the Cartesian product of `blocks_per_axis`, with the first axis varying slowest.
/// If any axis has no blocks, or there are no axes, the result is empty.
#[must_use]
pub fn combine_blocks(blocks_per_axis: &[Vec<Block>]) -> Vec<HyperslabBlock> {
    if blocks_per_axis.is_empty() || blocks_per_axis.iter().any(Vec::is_empty) {
        return vec![];
    }
    blocks_per_axis
        .iter()
        .map(|blocks| blocks.iter().copied())
        .multi_cartesian_product()
        .map(|blocks| HyperslabBlock::from_blocks(&blocks))
        .collect()
}

/// An incompatible dimensionality error.
#[derive(Copy, Clone, Debug, Error, PartialEq, Eq)]
#[error("incompatible dimensionality {0}, expected {1}")]
pub struct IncompatibleDimensionalityError(usize, usize);

impl IncompatibleDimensionalityError {
    /// Create a new incompatible dimensionality error.
    #[must_use]
    pub const fn new(got: usize, expected: usize) -> Self {
        Self(got, expected)
    }
}
