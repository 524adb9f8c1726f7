//! An in-memory selection backend.

use std::{
    collections::BTreeMap,
    sync::atomic::{AtomicU64, Ordering},
};

use itertools::Itertools;
use parking_lot::Mutex;

use crate::hyperslab::{HyperslabBlock, IncompatibleDimensionalityError};

use super::{BackendError, SelectionBackend, SelectionSpaceId};

#[derive(Debug)]
struct MemorySelection {
    shape: Vec<u64>,
    selected: Vec<bool>,
}

impl MemorySelection {
    fn new(shape: &[u64]) -> Result<Self, BackendError> {
        let num_elements = shape
            .iter()
            .try_fold(1u64, |acc, &extent| acc.checked_mul(extent))
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| BackendError::from(format!("selection space shape {shape:?} is too large")))?;
        Ok(Self {
            shape: shape.to_vec(),
            selected: vec![false; num_elements],
        })
    }

    /// The linear index is bounded by the number of elements, which fits in a usize.
    #[allow(clippy::cast_possible_truncation)]
    fn linear_index(&self, indices: &[u64]) -> usize {
        std::iter::zip(indices, &self.shape)
            .fold(0, |acc, (&index, &extent)| acc * extent + index) as usize
    }

    fn set_blocks(&mut self, blocks: &[HyperslabBlock], value: bool) -> Result<(), BackendError> {
        for block in blocks {
            if block.dimensionality() != self.shape.len() {
                return Err(IncompatibleDimensionalityError::new(
                    block.dimensionality(),
                    self.shape.len(),
                )
                .into());
            }
            if !block.inbounds(&self.shape) {
                return Err(BackendError::BlockOutOfBounds(
                    block.clone(),
                    self.shape.clone(),
                ));
            }
        }
        for block in blocks {
            for indices in block.iter_indices() {
                let linear = self.linear_index(&indices);
                self.selected[linear] = value;
            }
        }
        Ok(())
    }
}

/// An in-memory selection backend.
///
/// Every selection space is a dense boolean mask in C order.
/// It serves as a reference implementation and for resolving plans without a storage library.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    spaces: Mutex<BTreeMap<SelectionSpaceId, MemorySelection>>,
    next_id: AtomicU64,
}

impl MemoryBackend {
    /// Create a new memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the number of selection spaces that have not been released.
    #[must_use]
    pub fn num_spaces(&self) -> usize {
        self.spaces.lock().len()
    }

    /// Return the shape of `space`.
    ///
    /// # Errors
    /// Returns [`BackendError::UnknownSelectionSpace`] if `space` does not exist.
    pub fn shape(&self, space: SelectionSpaceId) -> Result<Vec<u64>, BackendError> {
        self.with_space(space, |selection| Ok(selection.shape.clone()))
    }

    /// Return the indices of the selected elements of `space` in C order.
    ///
    /// # Errors
    /// Returns [`BackendError::UnknownSelectionSpace`] if `space` does not exist.
    pub fn selected_indices(&self, space: SelectionSpaceId) -> Result<Vec<Vec<u64>>, BackendError> {
        self.with_space(space, |selection| {
            if selection.selected.is_empty() {
                return Ok(vec![]);
            }
            Ok(selection
                .shape
                .iter()
                .map(|&extent| 0..extent)
                .multi_cartesian_product()
                .zip(&selection.selected)
                .filter_map(|(indices, &selected)| selected.then_some(indices))
                .collect())
        })
    }

    fn with_space<T>(
        &self,
        space: SelectionSpaceId,
        f: impl FnOnce(&mut MemorySelection) -> Result<T, BackendError>,
    ) -> Result<T, BackendError> {
        let mut spaces = self.spaces.lock();
        let selection = spaces
            .get_mut(&space)
            .ok_or(BackendError::UnknownSelectionSpace(space))?;
        f(selection)
    }
}

impl SelectionBackend for MemoryBackend {
    fn create_selection_space(&self, shape: &[u64]) -> Result<SelectionSpaceId, BackendError> {
        let selection = MemorySelection::new(shape)?;
        let id = SelectionSpaceId::from(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.spaces.lock().insert(id, selection);
        Ok(id)
    }

    fn select_none(&self, space: SelectionSpaceId) -> Result<(), BackendError> {
        self.with_space(space, |selection| {
            selection.selected.fill(false);
            Ok(())
        })
    }

    fn union_blocks(
        &self,
        space: SelectionSpaceId,
        blocks: &[HyperslabBlock],
    ) -> Result<(), BackendError> {
        self.with_space(space, |selection| selection.set_blocks(blocks, true))
    }

    fn subtract_blocks(
        &self,
        space: SelectionSpaceId,
        blocks: &[HyperslabBlock],
    ) -> Result<(), BackendError> {
        self.with_space(space, |selection| selection.set_blocks(blocks, false))
    }

    fn count_selected(&self, space: SelectionSpaceId) -> Result<u64, BackendError> {
        self.with_space(space, |selection| {
            Ok(selection.selected.iter().filter(|&&s| s).count() as u64)
        })
    }

    fn release_selection_space(&self, space: SelectionSpaceId) -> Result<(), BackendError> {
        self.spaces
            .lock()
            .remove(&space)
            .map(|_| ())
            .ok_or(BackendError::UnknownSelectionSpace(space))
    }
}
