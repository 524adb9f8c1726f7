//! Selection backends.
//!
//! A selection backend owns the selection state of memory-side and file-side dataspaces, and is driven by [`Plan`](crate::plan::Plan) resolution.
//! Implementations wrap the dataspace API of a storage library.
//!
//! This module provides:
//!  - the [`SelectionBackend`] trait,
//!  - [`SelectionSpace`], a handle to a backend selection space that is released when dropped,
//!  - [`MemoryBackend`], a dense in-memory reference implementation, and
//!  - [`UsageLogBackend`], an adapter that logs every backend call.

mod memory_backend;
mod usage_log;

pub use memory_backend::MemoryBackend;
pub use usage_log::UsageLogBackend;

use std::sync::Arc;

use derive_more::{Deref, Display, From};
use thiserror::Error;

use crate::{
    hyperslab::{HyperslabBlock, IncompatibleDimensionalityError},
    selection::Sign,
};

/// The identifier of a selection space within a [`SelectionBackend`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Display, From, Deref)]
pub struct SelectionSpaceId(u64);

/// A backend error.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The selection space does not exist, or has already been released.
    #[error("unknown selection space {0}")]
    UnknownSelectionSpace(SelectionSpaceId),
    /// A block does not match the dimensionality of the selection space.
    #[error(transparent)]
    IncompatibleDimensionality(#[from] IncompatibleDimensionalityError),
    /// A block extends beyond the shape of the selection space.
    #[error("hyperslab block {0} is out of bounds of selection space with shape {1:?}")]
    BlockOutOfBounds(HyperslabBlock, Vec<u64>),
    /// An IO error.
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    /// Any other error.
    #[error("{0}")]
    Other(String),
}

impl From<&str> for BackendError {
    fn from(err: &str) -> Self {
        Self::Other(err.to_string())
    }
}

impl From<String> for BackendError {
    fn from(err: String) -> Self {
        Self::Other(err)
    }
}

/// Selection backend traits.
///
/// A selection space is a dataspace of a fixed shape holding a set of selected elements.
pub trait SelectionBackend: Send + Sync {
    /// Create a selection space with `shape`.
    ///
    /// The initial selection is unspecified until [`select_none`](SelectionBackend::select_none) is called.
    ///
    /// # Errors
    /// Returns a [`BackendError`] if there is an underlying backend error.
    fn create_selection_space(&self, shape: &[u64]) -> Result<SelectionSpaceId, BackendError>;

    /// Deselect every element of `space`.
    ///
    /// # Errors
    /// Returns a [`BackendError`] if `space` is unknown or there is an underlying backend error.
    fn select_none(&self, space: SelectionSpaceId) -> Result<(), BackendError>;

    /// Add the elements of `blocks` to the selection of `space`.
    ///
    /// # Errors
    /// Returns a [`BackendError`] if `space` is unknown, a block does not fit the selection space, or there is an underlying backend error.
    fn union_blocks(
        &self,
        space: SelectionSpaceId,
        blocks: &[HyperslabBlock],
    ) -> Result<(), BackendError>;

    /// Remove the elements of `blocks` from the selection of `space`.
    ///
    /// # Errors
    /// Returns a [`BackendError`] if `space` is unknown, a block does not fit the selection space, or there is an underlying backend error.
    fn subtract_blocks(
        &self,
        space: SelectionSpaceId,
        blocks: &[HyperslabBlock],
    ) -> Result<(), BackendError>;

    /// Return the number of selected elements of `space`.
    ///
    /// # Errors
    /// Returns a [`BackendError`] if `space` is unknown or there is an underlying backend error.
    fn count_selected(&self, space: SelectionSpaceId) -> Result<u64, BackendError>;

    /// Release `space`.
    ///
    /// # Errors
    /// Returns a [`BackendError`] if `space` is unknown or there is an underlying backend error.
    fn release_selection_space(&self, space: SelectionSpaceId) -> Result<(), BackendError>;

    /// Union or subtract `blocks` according to `sign`.
    ///
    /// # Errors
    /// Returns a [`BackendError`] if there is an underlying backend error.
    fn apply_blocks(
        &self,
        space: SelectionSpaceId,
        sign: Sign,
        blocks: &[HyperslabBlock],
    ) -> Result<(), BackendError> {
        match sign {
            Sign::Include => self.union_blocks(space, blocks),
            Sign::Exclude => self.subtract_blocks(space, blocks),
        }
    }
}

/// A shared selection backend.
pub type Backend = Arc<dyn SelectionBackend>;

/// A selection space owned by this handle.
///
/// The selection space is created with nothing selected and released when the handle is dropped.
pub struct SelectionSpace<TBackend: ?Sized + SelectionBackend> {
    backend: Arc<TBackend>,
    id: SelectionSpaceId,
    shape: Vec<u64>,
}

impl<TBackend: ?Sized + SelectionBackend> SelectionSpace<TBackend> {
    /// Create a selection space with `shape` and nothing selected.
    ///
    /// # Errors
    /// Returns a [`BackendError`] if there is an underlying backend error.
    pub fn create(backend: Arc<TBackend>, shape: Vec<u64>) -> Result<Self, BackendError> {
        let id = backend.create_selection_space(&shape)?;
        let space = Self { backend, id, shape };
        space.backend.select_none(space.id)?;
        Ok(space)
    }

    /// Return the backend identifier of the selection space.
    #[must_use]
    pub const fn id(&self) -> SelectionSpaceId {
        self.id
    }

    /// Return the shape of the selection space.
    #[must_use]
    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    /// Return the backend.
    #[must_use]
    pub fn backend(&self) -> &Arc<TBackend> {
        &self.backend
    }

    /// Union or subtract `blocks` according to `sign`.
    ///
    /// # Errors
    /// Returns a [`BackendError`] if there is an underlying backend error.
    pub fn apply_blocks(&self, sign: Sign, blocks: &[HyperslabBlock]) -> Result<(), BackendError> {
        if blocks.is_empty() {
            return Ok(());
        }
        self.backend.apply_blocks(self.id, sign, blocks)
    }

    /// Return the number of selected elements.
    ///
    /// # Errors
    /// Returns a [`BackendError`] if there is an underlying backend error.
    pub fn count_selected(&self) -> Result<u64, BackendError> {
        self.backend.count_selected(self.id)
    }
}

impl<TBackend: ?Sized + SelectionBackend> std::fmt::Debug for SelectionSpace<TBackend> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectionSpace")
            .field("id", &self.id)
            .field("shape", &self.shape)
            .finish_non_exhaustive()
    }
}

impl<TBackend: ?Sized + SelectionBackend> Drop for SelectionSpace<TBackend> {
    fn drop(&mut self) {
        if let Err(err) = self.backend.release_selection_space(self.id) {
            tracing::warn!(space = %self.id, "failed to release selection space: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hyperslab::Block;

    #[test]
    fn selection_space_released_on_drop() {
        let backend = Arc::new(MemoryBackend::new());
        {
            let space = SelectionSpace::create(backend.clone(), vec![4, 4]).unwrap();
            assert_eq!(space.count_selected().unwrap(), 0);
            assert_eq!(backend.num_spaces(), 1);
        }
        assert_eq!(backend.num_spaces(), 0);
    }

    #[test]
    fn selection_space_apply_blocks() {
        let backend = Arc::new(MemoryBackend::new());
        let space = SelectionSpace::create(backend, vec![4]).unwrap();
        let all = HyperslabBlock::from_blocks(&[Block::new(0, 4)]);
        let middle = HyperslabBlock::from_blocks(&[Block::new(1, 2)]);
        space.apply_blocks(Sign::Include, &[all]).unwrap();
        space.apply_blocks(Sign::Exclude, &[middle]).unwrap();
        assert_eq!(space.count_selected().unwrap(), 2);
        space.apply_blocks(Sign::Exclude, &[]).unwrap();
        assert_eq!(space.count_selected().unwrap(), 2);
    }

    #[test]
    fn selection_space_dyn_backend() {
        let backend: Backend = Arc::new(MemoryBackend::new());
        let space = SelectionSpace::create(backend, vec![2, 2]).unwrap();
        assert_eq!(space.shape(), &[2, 2]);
        assert_eq!(*space.id(), 0);
    }

    #[test]
    fn backend_error_display() {
        let block = HyperslabBlock::from_blocks(&[Block::new(3, 2)]);
        assert_eq!(
            BackendError::BlockOutOfBounds(block, vec![4]).to_string(),
            "hyperslab block start [3] block [2] is out of bounds of selection space with shape [4]"
        );
        assert_eq!(
            BackendError::UnknownSelectionSpace(SelectionSpaceId::from(7)).to_string(),
            "unknown selection space 7"
        );
    }
}
