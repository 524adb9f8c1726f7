use serde::{Deserialize, Serialize};

use crate::{
    decomposition::{PartitionPolicy, ProcessGrid},
    element_type::ElementType,
    selection::SelectionExpression,
};

/// A serialisable description of the inputs a [`Plan`](super::Plan) was resolved from.
///
/// Expressions are serialised in their textual form, so a descriptor can be logged, stored alongside a dataset, or exchanged between processes to check that they agree on a decomposition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanDescriptor {
    /// The process grid.
    pub grid: ProcessGrid,
    /// The element type.
    pub element_type: ElementType,
    /// The partition policy the memory shape was divided under.
    pub partition_policy: PartitionPolicy,
    /// The global memory shape.
    pub memory_shape: Vec<u64>,
    /// The memory expression.
    pub memory_expression: SelectionExpression,
    /// The file shape.
    pub file_shape: Vec<u64>,
    /// The file expression.
    pub file_expression: SelectionExpression,
    /// The number of elements selected on each side.
    pub num_elements: u64,
}

impl PlanDescriptor {
    /// Serialise the descriptor to pretty printed JSON.
    ///
    /// # Errors
    /// Returns a [`serde_json::Error`] if serialisation fails.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Returns true if `other` was resolved from the same global inputs.
    ///
    /// Process ids and element counts are allowed to differ, everything else must match.
    #[must_use]
    pub fn same_global_inputs(&self, other: &Self) -> bool {
        self.grid.counts() == other.grid.counts()
            && self.element_type == other.element_type
            && self.partition_policy == other.partition_policy
            && self.memory_shape == other.memory_shape
            && self.memory_expression == other.memory_expression
            && self.file_shape == other.file_shape
            && self.file_expression == other.file_expression
    }
}

impl std::fmt::Display for PlanDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| std::fmt::Error)?;
        write!(f, "{json}")
    }
}
