use thiserror::Error;

use crate::{
    backend::BackendError,
    decomposition::{DecompositionError, DegenerateExtentError, InvalidProcessGridError},
    hyperslab::IncompatibleDimensionalityError,
    selection::{SelectionError, SelectionParseError},
};

/// A plan resolution error.
#[derive(Debug, Error)]
pub enum PlanError {
    /// A selection is malformed or does not match the dimensionality of its shape.
    #[error(transparent)]
    InvalidSelection(#[from] SelectionError),
    /// A shape does not match the dimensionality of the process grid.
    #[error("{0} is incompatible with the process grid: {1}")]
    IncompatibleDimensionality(&'static str, IncompatibleDimensionalityError),
    /// An axis of the memory shape cannot be divided among the processes along it.
    #[error(transparent)]
    DegenerateExtent(#[from] DegenerateExtentError),
    /// An invalid process grid.
    #[error(transparent)]
    InvalidProcessGrid(#[from] InvalidProcessGridError),
    /// The number of elements selected in memory space and file space differ.
    #[error("number of selected elements in memory space ({memory}) does not match file space ({file})")]
    ShapeMismatch {
        /// The number of selected elements in memory space.
        memory: u64,
        /// The number of selected elements in file space.
        file: u64,
    },
    /// An axis selects a different number of indices in memory and in file.
    #[error("axis {axis} selects {memory} indices in memory but {file} in file")]
    AxisCountMismatch {
        /// The axis index.
        axis: usize,
        /// The number of indices selected along the axis in memory.
        memory: u64,
        /// The number of indices selected along the axis in file.
        file: u64,
    },
    /// A selection backend error.
    #[error(transparent)]
    BackendError(#[from] BackendError),
}

impl From<SelectionParseError> for PlanError {
    fn from(err: SelectionParseError) -> Self {
        Self::InvalidSelection(err.into())
    }
}

impl From<DecompositionError> for PlanError {
    fn from(err: DecompositionError) -> Self {
        match err {
            DecompositionError::IncompatibleDimensionality(err) => {
                Self::IncompatibleDimensionality("memory shape", err)
            }
            DecompositionError::DegenerateExtent(err) => Self::DegenerateExtent(err),
        }
    }
}
