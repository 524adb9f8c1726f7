use std::sync::Arc;

use crate::{
    backend::SelectionBackend,
    decomposition::{InvalidProcessGridError, PartitionPolicy, ProcessGrid},
    element_type::ElementType,
    filter::{self, AxisFilter},
    selection::SelectionExpression,
};

use super::{Plan, PlanError, PlanLayout};

/// A [`Plan`] builder.
///
/// The plan builder is initialised from a global memory shape and a file shape.
///  - Both selections are empty, which selects everything.
///  - The process grid is a single process.
///  - The element type is `double`.
///  - The partition policy is taken from the [global configuration](crate::config::Config#partition-policy).
///
/// Use the methods in the plan builder to change the configuration away from these defaults, and then resolve the plan against a backend with [`PlanBuilder::build`].
///
/// For example:
///
/// ```rust
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// # use std::sync::Arc;
/// use hyperslabs::backend::MemoryBackend;
/// use hyperslabs::decomposition::{PartitionPolicy, ProcessGrid};
/// use hyperslabs::plan::PlanBuilder;
/// use hyperslabs::selection::SelectionExpression;
/// let backend = Arc::new(MemoryBackend::new());
/// let plan = PlanBuilder::new(
///     vec![10, 4], // global memory shape
///     vec![3, 4], // file shape
/// )
/// .memory_selection("[0:9:2, :] - [4, :]".parse::<SelectionExpression>()?)
/// .process_grid(ProcessGrid::new(vec![0, 0], vec![3, 1])?)
/// .partition_policy(PartitionPolicy::Balanced)
/// .element_type("<i32".parse()?)
/// .build(backend)?;
/// assert_eq!(plan.memory_local_shape(), &[4, 4]);
/// assert_eq!(plan.num_elements(), 8);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct PlanBuilder {
    /// Global memory shape.
    pub memory_shape: Vec<u64>,
    /// File shape.
    pub file_shape: Vec<u64>,
    /// Memory selection.
    pub memory_expression: SelectionExpression,
    /// File selection.
    pub file_expression: SelectionExpression,
    /// Process grid.
    pub process_grid: Option<ProcessGrid>,
    /// Element type.
    pub element_type: ElementType,
    /// Partition policy.
    pub partition_policy: Option<PartitionPolicy>,
    /// Per-axis memory and file filters.
    ///
    /// If set, the layout is computed from the filters instead of the expressions.
    pub filters: Option<(Vec<AxisFilter>, Vec<AxisFilter>)>,
}

impl PlanBuilder {
    /// Create a new plan builder for a global memory shape and a file shape.
    #[must_use]
    pub fn new(memory_shape: Vec<u64>, file_shape: Vec<u64>) -> Self {
        Self {
            memory_shape,
            file_shape,
            memory_expression: SelectionExpression::new(),
            file_expression: SelectionExpression::new(),
            process_grid: None,
            element_type: ElementType::default(),
            partition_policy: None,
            filters: None,
        }
    }

    /// Create a new plan builder from per-axis memory and file filters.
    ///
    /// The memory and file shapes are the extents of the filters, and each side selects the Cartesian product of its selected indices.
    /// The expressions are set to the equivalent of the filters (see [`filter::to_expression`]).
    /// Every axis must select the same number of indices in memory and in file, otherwise the layout fails with [`PlanError::AxisCountMismatch`].
    #[must_use]
    pub fn from_filters(memory_filters: Vec<AxisFilter>, file_filters: Vec<AxisFilter>) -> Self {
        let mut builder = Self::new(
            memory_filters.iter().map(AxisFilter::extent).collect(),
            file_filters.iter().map(AxisFilter::extent).collect(),
        );
        builder.memory_expression = filter::to_expression(&memory_filters);
        builder.file_expression = filter::to_expression(&file_filters);
        builder.filters = Some((memory_filters, file_filters));
        builder
    }

    /// Set the memory selection.
    ///
    /// Any filters are cleared, and the plan is resolved from the expressions.
    pub fn memory_selection(&mut self, expression: impl Into<SelectionExpression>) -> &mut Self {
        self.memory_expression = expression.into();
        self.filters = None;
        self
    }

    /// Set the file selection.
    ///
    /// Any filters are cleared, and the plan is resolved from the expressions.
    pub fn file_selection(&mut self, expression: impl Into<SelectionExpression>) -> &mut Self {
        self.file_expression = expression.into();
        self.filters = None;
        self
    }

    /// Set the process grid.
    pub fn process_grid(&mut self, grid: ProcessGrid) -> &mut Self {
        self.process_grid = Some(grid);
        self
    }

    /// Set the element type.
    pub fn element_type(&mut self, element_type: ElementType) -> &mut Self {
        self.element_type = element_type;
        self
    }

    /// Set the partition policy, overriding the global configuration.
    pub fn partition_policy(&mut self, partition_policy: PartitionPolicy) -> &mut Self {
        self.partition_policy = Some(partition_policy);
        self
    }

    /// The process grid, defaulting to a single process.
    pub(super) fn grid(&self) -> Result<ProcessGrid, InvalidProcessGridError> {
        self.process_grid.clone().map_or_else(
            || {
                let dimensionality = self.memory_shape.len();
                ProcessGrid::new(vec![0; dimensionality], vec![1; dimensionality])
            },
            Ok,
        )
    }

    /// The partition policy, defaulting to the global configuration.
    pub(super) fn policy(&self) -> PartitionPolicy {
        self.partition_policy
            .unwrap_or_else(|| crate::config::global_config().partition_policy())
    }

    pub(super) fn layout_for(
        &self,
        grid: &ProcessGrid,
        policy: PartitionPolicy,
    ) -> Result<PlanLayout, PlanError> {
        if let Some((memory_filters, file_filters)) = &self.filters {
            PlanLayout::from_filters(grid, memory_filters, file_filters, policy)
        } else {
            PlanLayout::compute(
                grid,
                &self.memory_shape,
                &self.memory_expression,
                &self.file_shape,
                &self.file_expression,
                policy,
            )
        }
    }

    /// Compute the backend-free layout of the plan.
    ///
    /// # Errors
    /// Returns a [`PlanError`] if the inputs are invalid or inconsistent.
    pub fn layout(&self) -> Result<PlanLayout, PlanError> {
        self.layout_for(&self.grid()?, self.policy())
    }

    /// Resolve the plan against `backend`.
    ///
    /// # Errors
    /// Returns a [`PlanError`] if the inputs are invalid or inconsistent, there is an underlying backend error, or the selected element counts differ.
    pub fn build<TBackend: ?Sized + SelectionBackend>(
        &self,
        backend: Arc<TBackend>,
    ) -> Result<Plan<TBackend>, PlanError> {
        Plan::from_builder(self, backend)
    }

    /// Resolve the plan of every process of the process grid against `backend`, in parallel.
    ///
    /// Only the process counts of the process grid are used.
    /// Plans are returned in C order of the process ids.
    ///
    /// # Errors
    /// Returns the first [`PlanError`] encountered while resolving any process.
    pub fn build_all<TBackend: ?Sized + SelectionBackend>(
        &self,
        backend: Arc<TBackend>,
    ) -> Result<Vec<Plan<TBackend>>, PlanError> {
        Plan::all_from_builder(self, &backend)
    }
}
