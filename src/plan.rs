//! I/O plans.
//!
//! A [`Plan`] pairs a memory-side selection with a file-side selection for one process of a [`ProcessGrid`].
//!
//! Resolution proceeds axis by axis:
//!  - the memory shape is divided among the processes along each axis (see [`PartitionPolicy`](crate::decomposition::PartitionPolicy)),
//!  - the memory expression restricted to the local window of this process is issued to the memory selection space,
//!  - the selected memory elements before and inside the window are counted, and the file window holding the same ordinal range of selected file elements is located,
//!  - the file expression restricted to that file window is issued to the file selection space.
//!
//! The numbers of selected elements on both sides must match, otherwise resolution fails with [`PlanError::ShapeMismatch`].
//! A resolved plan owns its two [`SelectionSpace`]s and releases them when dropped.

mod plan_builder;
mod plan_descriptor;
mod plan_errors;
mod plan_layout;

pub use plan_builder::PlanBuilder;
pub use plan_descriptor::PlanDescriptor;
pub use plan_errors::PlanError;
pub use plan_layout::{PlanLayout, TermBlocks};

use std::sync::Arc;

use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::{
    backend::{SelectionBackend, SelectionSpace},
    config::global_config,
    decomposition::{PartitionPolicy, ProcessGrid},
    element_type::ElementType,
    filter::AxisFilter,
    selection::SelectionExpression,
};

/// A resolved I/O plan for one process.
///
/// The memory selection space has the shape of the local partition of this process, and the file selection space has the file shape.
/// Both hold exactly [`num_elements`](Plan::num_elements) selected elements, which correspond in C order.
pub struct Plan<TBackend: ?Sized + SelectionBackend = dyn SelectionBackend> {
    grid: ProcessGrid,
    element_type: ElementType,
    partition_policy: PartitionPolicy,
    memory_shape: Vec<u64>,
    memory_expression: SelectionExpression,
    file_shape: Vec<u64>,
    file_expression: SelectionExpression,
    layout: PlanLayout,
    memory_space: SelectionSpace<TBackend>,
    file_space: SelectionSpace<TBackend>,
    num_elements: u64,
}

impl<TBackend: ?Sized + SelectionBackend> Plan<TBackend> {
    /// Resolve a plan for the process at `grid`.
    ///
    /// The memory shape is divided under the [partition policy](crate::config::Config#partition-policy) of the global configuration.
    /// Use a [`PlanBuilder`] to set the policy of an individual plan.
    ///
    /// An empty expression selects everything.
    ///
    /// Under the default [`PartitionPolicy::Exact`], every memory extent must be divisible by the number of processes along its axis.
    /// In particular, an axis with fewer indices than processes is rejected with [`PlanError::DegenerateExtent`].
    /// Under [`PartitionPolicy::Balanced`] such processes hold an empty window and resolve to a plan with no elements.
    ///
    /// # Errors
    /// Returns a [`PlanError`] if
    ///  - the grid, shapes, and expressions disagree in dimensionality,
    ///  - an axis of the memory shape cannot be divided among its processes,
    ///  - there is an underlying backend error, or
    ///  - the numbers of selected memory and file elements differ.
    pub fn resolve(
        backend: Arc<TBackend>,
        grid: ProcessGrid,
        memory_shape: Vec<u64>,
        memory_expression: SelectionExpression,
        file_shape: Vec<u64>,
        file_expression: SelectionExpression,
        element_type: ElementType,
    ) -> Result<Self, PlanError> {
        PlanBuilder::new(memory_shape, file_shape)
            .memory_selection(memory_expression)
            .file_selection(file_expression)
            .process_grid(grid)
            .element_type(element_type)
            .build(backend)
    }

    /// Resolve a plan for the process at `grid` from per-axis memory and file filters.
    ///
    /// Each side selects the Cartesian product of the selected indices of its filters, and the shapes are the extents of the filters.
    /// See [`PlanBuilder::from_filters`].
    ///
    /// # Errors
    /// Returns a [`PlanError`] if
    ///  - the grid and filters disagree in dimensionality,
    ///  - an axis selects a different number of indices in memory and in file,
    ///  - an axis of the memory shape cannot be divided among its processes, or
    ///  - there is an underlying backend error.
    pub fn resolve_filters(
        backend: Arc<TBackend>,
        grid: ProcessGrid,
        memory_filters: Vec<AxisFilter>,
        file_filters: Vec<AxisFilter>,
        element_type: ElementType,
    ) -> Result<Self, PlanError> {
        PlanBuilder::from_filters(memory_filters, file_filters)
            .process_grid(grid)
            .element_type(element_type)
            .build(backend)
    }

    /// Resolve the plan of every process of a grid with `counts` processes along each axis, in parallel.
    ///
    /// Plans are returned in C order of the process ids.
    /// This is intended for validating a decomposition or simulating a parallel run within a single process.
    ///
    /// # Errors
    /// Returns the first [`PlanError`] encountered while resolving any process.
    pub fn resolve_all(
        backend: Arc<TBackend>,
        counts: &[u64],
        memory_shape: Vec<u64>,
        memory_expression: SelectionExpression,
        file_shape: Vec<u64>,
        file_expression: SelectionExpression,
        element_type: ElementType,
    ) -> Result<Vec<Self>, PlanError> {
        let grid = ProcessGrid::new(vec![0; counts.len()], counts.to_vec())?;
        PlanBuilder::new(memory_shape, file_shape)
            .memory_selection(memory_expression)
            .file_selection(file_expression)
            .process_grid(grid)
            .element_type(element_type)
            .build_all(backend)
    }

    fn from_builder(builder: &PlanBuilder, backend: Arc<TBackend>) -> Result<Self, PlanError> {
        let grid = builder.grid()?;
        let partition_policy = builder.policy();
        let layout = builder.layout_for(&grid, partition_policy)?;
        tracing::debug!(
            ids = ?grid.ids(),
            memory_windows = ?layout.memory_windows(),
            file_windows = ?layout.file_windows(),
            "computed plan layout"
        );

        let memory_space =
            SelectionSpace::create(backend.clone(), layout.memory_local_shape().to_vec())?;
        for term in layout.memory_terms() {
            memory_space.apply_blocks(term.sign(), term.blocks())?;
        }

        let file_space = SelectionSpace::create(backend, builder.file_shape.clone())?;
        for term in layout.file_terms() {
            file_space.apply_blocks(term.sign(), term.blocks())?;
        }

        let memory_count = memory_space.count_selected()?;
        let file_count = file_space.count_selected()?;
        tracing::debug!(
            ids = ?grid.ids(),
            memory_blocks = layout.memory_blocks().count(),
            file_blocks = layout.file_blocks().count(),
            memory_count,
            file_count,
            "populated selection spaces"
        );
        if memory_count != file_count {
            tracing::warn!(
                ids = ?grid.ids(),
                memory_count,
                file_count,
                "selected element counts do not match"
            );
            return Err(PlanError::ShapeMismatch {
                memory: memory_count,
                file: file_count,
            });
        }

        if global_config().log_resolution_summary() {
            tracing::info!(
                ids = ?grid.ids(),
                counts = ?grid.counts(),
                memory_windows = ?layout.memory_windows(),
                file_windows = ?layout.file_windows(),
                element_type = %builder.element_type,
                num_elements = memory_count,
                "resolved plan"
            );
        }

        Ok(Self {
            grid,
            element_type: builder.element_type.clone(),
            partition_policy,
            memory_shape: builder.memory_shape.clone(),
            memory_expression: builder.memory_expression.clone(),
            file_shape: builder.file_shape.clone(),
            file_expression: builder.file_expression.clone(),
            layout,
            memory_space,
            file_space,
            num_elements: memory_count,
        })
    }

    fn all_from_builder(
        builder: &PlanBuilder,
        backend: &Arc<TBackend>,
    ) -> Result<Vec<Self>, PlanError> {
        let counts = builder.grid()?.counts().to_vec();
        let builders: Vec<PlanBuilder> = ProcessGrid::iter_all(&counts)
            .map(|grid| {
                let mut builder = builder.clone();
                builder.process_grid(grid);
                builder
            })
            .collect();
        builders
            .into_par_iter()
            .map(|builder| Self::from_builder(&builder, backend.clone()))
            .collect()
    }

    /// Return the process grid.
    #[must_use]
    pub fn grid(&self) -> &ProcessGrid {
        &self.grid
    }

    /// Return the element type.
    #[must_use]
    pub fn element_type(&self) -> &ElementType {
        &self.element_type
    }

    /// Return the partition policy the memory shape was divided under.
    #[must_use]
    pub fn partition_policy(&self) -> PartitionPolicy {
        self.partition_policy
    }

    /// Return the global memory shape.
    #[must_use]
    pub fn memory_shape(&self) -> &[u64] {
        &self.memory_shape
    }

    /// Return the memory expression.
    #[must_use]
    pub fn memory_expression(&self) -> &SelectionExpression {
        &self.memory_expression
    }

    /// Return the file shape.
    #[must_use]
    pub fn file_shape(&self) -> &[u64] {
        &self.file_shape
    }

    /// Return the file expression as given.
    ///
    /// See [`PlanLayout::file_expression`] for the expression the file blocks were computed from.
    #[must_use]
    pub fn file_expression(&self) -> &SelectionExpression {
        &self.file_expression
    }

    /// Return the layout.
    #[must_use]
    pub fn layout(&self) -> &PlanLayout {
        &self.layout
    }

    /// Return the shape of the local memory partition of this process.
    #[must_use]
    pub fn memory_local_shape(&self) -> &[u64] {
        self.layout.memory_local_shape()
    }

    /// Return the window of the file shape paired with this process along each axis.
    #[must_use]
    pub fn file_windows(&self) -> &[std::ops::Range<u64>] {
        self.layout.file_windows()
    }

    /// Return the memory selection space.
    #[must_use]
    pub fn memory_space(&self) -> &SelectionSpace<TBackend> {
        &self.memory_space
    }

    /// Return the file selection space.
    #[must_use]
    pub fn file_space(&self) -> &SelectionSpace<TBackend> {
        &self.file_space
    }

    /// Return the number of elements selected in both the memory and file selection spaces.
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        self.num_elements
    }

    /// Return the number of bytes transferred by the plan.
    #[must_use]
    pub fn size_in_bytes(&self) -> u64 {
        self.num_elements * self.element_type.size() as u64
    }

    /// Return a serialisable description of the inputs the plan was resolved from.
    #[must_use]
    pub fn descriptor(&self) -> PlanDescriptor {
        PlanDescriptor {
            grid: self.grid.clone(),
            element_type: self.element_type.clone(),
            partition_policy: self.partition_policy,
            memory_shape: self.memory_shape.clone(),
            memory_expression: self.memory_expression.clone(),
            file_shape: self.file_shape.clone(),
            file_expression: self.file_expression.clone(),
            num_elements: self.num_elements,
        }
    }
}

impl<TBackend: ?Sized + SelectionBackend> std::fmt::Debug for Plan<TBackend> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Plan")
            .field("grid", &self.grid)
            .field("element_type", &self.element_type)
            .field("memory_shape", &self.memory_shape)
            .field("memory_expression", &self.memory_expression)
            .field("file_shape", &self.file_shape)
            .field("file_expression", &self.file_expression)
            .field("memory_space", &self.memory_space)
            .field("file_space", &self.file_space)
            .field("num_elements", &self.num_elements)
            .finish_non_exhaustive()
    }
}
