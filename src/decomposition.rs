//! Process decomposition.
//!
//! Each process holds a contiguous partition of the memory-side global array.
//! A [`ProcessGrid`] identifies a process by its id along each axis, and the number of processes along each axis.
//! The [`PartitionPolicy`] decides how an axis extent is divided among the processes along it.

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::hyperslab::IncompatibleDimensionalityError;

/// The policy for dividing an axis extent among processes.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartitionPolicy {
    /// Every process along an axis holds `extent / count` indices.
    ///
    /// An extent that is not divisible by the process count is rejected with a [`DegenerateExtentError`].
    #[default]
    Exact,
    /// Every process along an axis holds `extent / count` indices, and the first `extent % count` processes hold one more.
    Balanced,
}

/// An invalid process grid error.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("invalid process grid with ids {0:?} and counts {1:?}")]
pub struct InvalidProcessGridError(Vec<u64>, Vec<u64>);

/// A degenerate extent error.
///
/// The extent of an axis is not divisible by the number of processes along it.
#[derive(Copy, Clone, Debug, Error, PartialEq, Eq)]
#[error("extent {extent} of axis {axis} is not divisible by {count} processes")]
pub struct DegenerateExtentError {
    axis: usize,
    extent: u64,
    count: u64,
}

impl DegenerateExtentError {
    /// Create a new degenerate extent error.
    #[must_use]
    pub const fn new(axis: usize, extent: u64, count: u64) -> Self {
        Self {
            axis,
            extent,
            count,
        }
    }

    /// The axis with the degenerate extent.
    #[must_use]
    pub const fn axis(&self) -> usize {
        self.axis
    }
}

/// A process decomposition error.
#[derive(Clone, Debug, Error)]
pub enum DecompositionError {
    /// The process grid does not match the dimensionality of the shape.
    #[error(transparent)]
    IncompatibleDimensionality(#[from] IncompatibleDimensionalityError),
    /// An axis cannot be divided under the partition policy.
    #[error(transparent)]
    DegenerateExtent(#[from] DegenerateExtentError),
}

/// The position of a process within a grid of processes.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "ProcessGridFields")]
pub struct ProcessGrid {
    ids: Vec<u64>,
    counts: Vec<u64>,
}

#[derive(Deserialize)]
struct ProcessGridFields {
    ids: Vec<u64>,
    counts: Vec<u64>,
}

impl TryFrom<ProcessGridFields> for ProcessGrid {
    type Error = InvalidProcessGridError;

    fn try_from(fields: ProcessGridFields) -> Result<Self, Self::Error> {
        Self::new(fields.ids, fields.counts)
    }
}

impl ProcessGrid {
    /// Create a new process grid.
    ///
    /// # Errors
    /// Returns [`InvalidProcessGridError`] if
    ///  - `ids` and `counts` are empty or differ in length,
    ///  - any count is zero, or
    ///  - any id is not less than its count.
    pub fn new(ids: Vec<u64>, counts: Vec<u64>) -> Result<Self, InvalidProcessGridError> {
        let valid = !ids.is_empty()
            && ids.len() == counts.len()
            && std::iter::zip(&ids, &counts).all(|(id, count)| id < count);
        if valid {
            Ok(Self { ids, counts })
        } else {
            Err(InvalidProcessGridError(ids, counts))
        }
    }

    /// Create a grid for a lone process on an array with `dimensionality` axes.
    ///
    /// # Panics
    /// Panics if `dimensionality` is zero.
    #[must_use]
    pub fn single(dimensionality: usize) -> Self {
        assert!(dimensionality > 0, "a process grid must have at least one axis");
        Self {
            ids: vec![0; dimensionality],
            counts: vec![1; dimensionality],
        }
    }

    /// Create a grid where `size` processes divide the first axis of an array with `dimensionality` axes, and this process is `rank`.
    ///
    /// This is the decomposition of a communicator of `size` processes.
    ///
    /// # Errors
    /// Returns [`InvalidProcessGridError`] if `dimensionality` is zero or `rank` is not less than `size`.
    pub fn along_first_axis(
        rank: u64,
        size: u64,
        dimensionality: usize,
    ) -> Result<Self, InvalidProcessGridError> {
        let mut ids = vec![0; dimensionality];
        let mut counts = vec![1; dimensionality];
        if let (Some(id), Some(count)) = (ids.first_mut(), counts.first_mut()) {
            *id = rank;
            *count = size;
        }
        Self::new(ids, counts)
    }

    /// Returns an iterator over the grid of every process for `counts`, in C order of the ids.
    pub fn iter_all(counts: &[u64]) -> impl Iterator<Item = ProcessGrid> + '_ {
        counts
            .iter()
            .map(|&count| 0..count)
            .multi_cartesian_product()
            .filter(|ids| !ids.is_empty())
            .map(move |ids| ProcessGrid {
                ids,
                counts: counts.to_vec(),
            })
    }

    /// Return the process id along each axis.
    #[must_use]
    pub fn ids(&self) -> &[u64] {
        &self.ids
    }

    /// Return the number of processes along each axis.
    #[must_use]
    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    /// Return the dimensionality of the grid.
    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.ids.len()
    }

    /// Return the total number of processes in the grid.
    #[must_use]
    pub fn num_processes(&self) -> u64 {
        self.counts.iter().product()
    }

    /// Returns true if this process has id zero along every axis.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.ids.iter().all(|&id| id == 0)
    }

    /// Return the window `start..end` of indices held by this process along `axis` of `extent` under `policy`.
    ///
    /// # Errors
    /// Returns [`DegenerateExtentError`] if `policy` is [`PartitionPolicy::Exact`] and `extent` is not divisible by the process count.
    ///
    /// # Panics
    /// Panics if `axis` is not less than the grid dimensionality.
    pub fn local_window(
        &self,
        axis: usize,
        extent: u64,
        policy: PartitionPolicy,
    ) -> Result<std::ops::Range<u64>, DegenerateExtentError> {
        let (id, count) = (self.ids[axis], self.counts[axis]);
        let (base, remainder) = (extent / count, extent % count);
        match policy {
            PartitionPolicy::Exact if remainder != 0 => {
                Err(DegenerateExtentError::new(axis, extent, count))
            }
            PartitionPolicy::Exact => Ok(id * base..(id + 1) * base),
            PartitionPolicy::Balanced => {
                let start = id * base + id.min(remainder);
                let length = base + u64::from(id < remainder);
                Ok(start..start + length)
            }
        }
    }

    /// Return the window held by this process along every axis of `shape` under `policy`.
    ///
    /// # Errors
    /// Returns a [`DecompositionError`] if `shape` does not match the grid dimensionality or an axis is degenerate.
    pub fn local_windows(
        &self,
        shape: &[u64],
        policy: PartitionPolicy,
    ) -> Result<Vec<std::ops::Range<u64>>, DecompositionError> {
        if shape.len() != self.dimensionality() {
            return Err(
                IncompatibleDimensionalityError::new(shape.len(), self.dimensionality()).into(),
            );
        }
        Ok(shape
            .iter()
            .enumerate()
            .map(|(axis, &extent)| self.local_window(axis, extent, policy))
            .collect::<Result<_, _>>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_grid_validation() {
        assert!(ProcessGrid::new(vec![0, 1], vec![1, 2]).is_ok());
        assert!(ProcessGrid::new(vec![], vec![]).is_err());
        assert!(ProcessGrid::new(vec![0], vec![0]).is_err());
        assert!(ProcessGrid::new(vec![2], vec![2]).is_err());
        assert!(ProcessGrid::new(vec![0, 0], vec![1]).is_err());
        assert!(ProcessGrid::along_first_axis(3, 3, 2).is_err());
        assert!(ProcessGrid::along_first_axis(0, 1, 0).is_err());
    }

    #[test]
    fn process_grid_constructors() {
        let grid = ProcessGrid::single(3);
        assert_eq!(grid.ids(), &[0, 0, 0]);
        assert_eq!(grid.counts(), &[1, 1, 1]);
        assert!(grid.is_root());

        let grid = ProcessGrid::along_first_axis(2, 4, 2).unwrap();
        assert_eq!(grid.ids(), &[2, 0]);
        assert_eq!(grid.counts(), &[4, 1]);
        assert_eq!(grid.num_processes(), 4);
        assert!(!grid.is_root());
    }

    #[test]
    fn process_grid_iter_all() {
        let grids: Vec<_> = ProcessGrid::iter_all(&[2, 3]).collect();
        assert_eq!(grids.len(), 6);
        assert_eq!(grids[0].ids(), &[0, 0]);
        assert_eq!(grids[1].ids(), &[0, 1]);
        assert_eq!(grids[5].ids(), &[1, 2]);
        assert!(grids.iter().all(|grid| grid.counts() == [2, 3]));
        assert_eq!(ProcessGrid::iter_all(&[2, 0]).count(), 0);
        assert_eq!(ProcessGrid::iter_all(&[]).count(), 0);
    }

    #[test]
    fn local_window_exact() {
        let grid = ProcessGrid::new(vec![1, 0], vec![2, 3]).unwrap();
        assert_eq!(grid.local_window(0, 8, PartitionPolicy::Exact).unwrap(), 4..8);
        assert_eq!(grid.local_window(1, 9, PartitionPolicy::Exact).unwrap(), 0..3);
        assert_eq!(grid.local_window(0, 0, PartitionPolicy::Exact).unwrap(), 0..0);
        let err = grid.local_window(1, 10, PartitionPolicy::Exact).unwrap_err();
        assert_eq!(err.axis(), 1);
        assert_eq!(
            err.to_string(),
            "extent 10 of axis 1 is not divisible by 3 processes"
        );
    }

    #[test]
    fn local_window_balanced() {
        let windows: Vec<_> = ProcessGrid::iter_all(&[3])
            .map(|grid| grid.local_window(0, 10, PartitionPolicy::Balanced).unwrap())
            .collect();
        assert_eq!(windows, vec![0..4, 4..7, 7..10]);

        let windows: Vec<_> = ProcessGrid::iter_all(&[4])
            .map(|grid| grid.local_window(0, 2, PartitionPolicy::Balanced).unwrap())
            .collect();
        assert_eq!(windows, vec![0..1, 1..2, 2..2, 2..2]);
    }

    #[test]
    fn local_windows_dimensionality() {
        let grid = ProcessGrid::single(2);
        assert!(matches!(
            grid.local_windows(&[4], PartitionPolicy::Exact),
            Err(DecompositionError::IncompatibleDimensionality(_))
        ));
        assert_eq!(
            grid.local_windows(&[4, 5], PartitionPolicy::Exact).unwrap(),
            vec![0..4, 0..5]
        );
    }

    #[test]
    fn process_grid_serde() {
        let grid = ProcessGrid::new(vec![1, 0], vec![2, 1]).unwrap();
        let json = serde_json::to_string(&grid).unwrap();
        assert_eq!(json, r#"{"ids":[1,0],"counts":[2,1]}"#);
        assert_eq!(serde_json::from_str::<ProcessGrid>(&json).unwrap(), grid);
        assert!(serde_json::from_str::<ProcessGrid>(r#"{"ids":[2],"counts":[2]}"#).is_err());
    }
}
