use std::ops::Range;

use crate::{
    decomposition::{PartitionPolicy, ProcessGrid},
    filter::{self, AxisFilter},
    hyperslab::{combine_blocks, Block, HyperslabBlock, IncompatibleDimensionalityError},
    selection::{SelectionExpression, SelectionTerm, Sign},
};

use super::PlanError;

/// The hyperslab blocks issued for a single selection term.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TermBlocks {
    sign: Sign,
    blocks: Vec<HyperslabBlock>,
}

impl TermBlocks {
    /// Return the sign of the term.
    #[must_use]
    pub const fn sign(&self) -> Sign {
        self.sign
    }

    /// Return the blocks of the term.
    #[must_use]
    pub fn blocks(&self) -> &[HyperslabBlock] {
        &self.blocks
    }

    /// Return the number of elements covered by the blocks.
    #[must_use]
    pub fn num_elements(&self) -> u64 {
        self.blocks.iter().map(HyperslabBlock::num_elements).sum()
    }
}

/// The backend-free layout of a plan for one process.
///
/// Holds the process windows and the signed hyperslab blocks that a [`Plan`](super::Plan) issues to the memory and file selection spaces.
/// Memory blocks are in the local frame of the process, so they address the local partition of the array.
/// File blocks are in the global frame of the file shape.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlanLayout {
    memory_local_shape: Vec<u64>,
    memory_windows: Vec<Range<u64>>,
    file_windows: Vec<Range<u64>>,
    memory_terms: Vec<TermBlocks>,
    file_terms: Vec<TermBlocks>,
    file_expression: SelectionExpression,
}

fn check_dimensionality(
    name: &'static str,
    dimensionality: usize,
    grid: &ProcessGrid,
) -> Result<(), PlanError> {
    if dimensionality == grid.dimensionality() {
        Ok(())
    } else {
        Err(PlanError::IncompatibleDimensionality(
            name,
            IncompatibleDimensionalityError::new(dimensionality, grid.dimensionality()),
        ))
    }
}

/// Cut each filter into runs within its window.
///
/// Block starts are translated into the frame of the windows if `local` is true.
fn axis_blocks(filters: &[AxisFilter], windows: &[Range<u64>], local: bool) -> Vec<Vec<Block>> {
    std::iter::zip(filters, windows)
        .map(|(filter, window)| {
            let blocks = filter.blocks(window);
            if local {
                blocks
                    .iter()
                    .map(|block| block.shifted_down(window.start))
                    .collect()
            } else {
                blocks
            }
        })
        .collect()
}

/// Locate the file window holding the same ordinal range of selected elements as each memory window.
fn file_windows(
    memory_filters: &[AxisFilter],
    memory_windows: &[Range<u64>],
    file_filters: &[AxisFilter],
) -> Vec<Range<u64>> {
    itertools::izip!(memory_filters, memory_windows, file_filters)
        .map(|(memory_filter, window, file_filter)| {
            let start_count = memory_filter.count_in(&(0..window.start));
            let count = memory_filter.count_in(window);
            file_filter.ordinal_window(start_count, count)
        })
        .collect()
}

/// Issue every term of `expression` on `shape`, restricted to `windows`.
fn term_blocks(
    expression: &SelectionExpression,
    shape: &[u64],
    windows: &[Range<u64>],
    local: bool,
) -> Result<Vec<TermBlocks>, PlanError> {
    let mut terms = Vec::with_capacity(expression.len());
    for term in expression {
        let filters = filter::materialize_term(term, shape)?;
        terms.push(TermBlocks {
            sign: term.sign(),
            blocks: combine_blocks(&axis_blocks(&filters, windows, local)),
        });
    }
    Ok(terms)
}

impl PlanLayout {
    /// Compute the layout of a plan for the process at `grid`.
    ///
    /// The memory side of each axis is divided among the processes under `policy`.
    /// This process then holds the selected memory elements of its window, and is paired with the file window holding the same ordinal range of selected file elements.
    /// An empty memory or file expression selects everything.
    ///
    /// # Errors
    /// Returns a [`PlanError`] if
    ///  - a shape does not match the grid dimensionality,
    ///  - a selection term does not match the dimensionality of its shape, or
    ///  - an axis of the memory shape cannot be divided under `policy`.
    pub fn compute(
        grid: &ProcessGrid,
        memory_shape: &[u64],
        memory_expression: &SelectionExpression,
        file_shape: &[u64],
        file_expression: &SelectionExpression,
        policy: PartitionPolicy,
    ) -> Result<Self, PlanError> {
        check_dimensionality("memory shape", memory_shape.len(), grid)?;
        check_dimensionality("file shape", file_shape.len(), grid)?;
        let dimensionality = grid.dimensionality();

        let memory_windows = grid.local_windows(memory_shape, policy)?;
        let memory_local_shape = memory_windows
            .iter()
            .map(|window| window.end - window.start)
            .collect();

        let memory_expression = if memory_expression.is_empty() {
            SelectionExpression::from(SelectionTerm::all(dimensionality))
        } else {
            memory_expression.clone()
        };
        let file_expression = if file_expression.is_empty() {
            SelectionExpression::from(SelectionTerm::all(dimensionality))
        } else {
            file_expression.clone()
        };

        let memory_filters = filter::materialize(&memory_expression, memory_shape)?;
        let file_filters = filter::materialize(&file_expression, file_shape)?;

        let file_windows = file_windows(&memory_filters, &memory_windows, &file_filters);

        let memory_terms = term_blocks(&memory_expression, memory_shape, &memory_windows, true)?;
        let file_terms = term_blocks(&file_expression, file_shape, &file_windows, false)?;

        Ok(Self {
            memory_local_shape,
            memory_windows,
            file_windows,
            memory_terms,
            file_terms,
            file_expression,
        })
    }

    /// Compute the layout of a plan for the process at `grid` from per-axis filters.
    ///
    /// The memory and file shapes are the extents of the filters.
    /// The selected elements on each side are the Cartesian product of the selected indices of every axis, so each side is issued as a single include term.
    /// Every memory run within the window of this process is paired with the file runs holding the same ordinals.
    ///
    /// # Errors
    /// Returns a [`PlanError`] if
    ///  - the number of filters on either side does not match the grid dimensionality,
    ///  - an axis selects a different number of indices in memory and in file, or
    ///  - an axis of the memory shape cannot be divided under `policy`.
    pub fn from_filters(
        grid: &ProcessGrid,
        memory_filters: &[AxisFilter],
        file_filters: &[AxisFilter],
        policy: PartitionPolicy,
    ) -> Result<Self, PlanError> {
        check_dimensionality("memory filters", memory_filters.len(), grid)?;
        check_dimensionality("file filters", file_filters.len(), grid)?;
        for (axis, (memory_filter, file_filter)) in
            std::iter::zip(memory_filters, file_filters).enumerate()
        {
            let (memory, file) = (memory_filter.num_selected(), file_filter.num_selected());
            if memory != file {
                return Err(PlanError::AxisCountMismatch { axis, memory, file });
            }
        }

        let memory_shape: Vec<u64> = memory_filters.iter().map(AxisFilter::extent).collect();
        let memory_windows = grid.local_windows(&memory_shape, policy)?;
        let memory_local_shape = memory_windows
            .iter()
            .map(|window| window.end - window.start)
            .collect();
        let file_windows = file_windows(memory_filters, &memory_windows, file_filters);

        let memory_terms = vec![TermBlocks {
            sign: Sign::Include,
            blocks: combine_blocks(&axis_blocks(memory_filters, &memory_windows, true)),
        }];
        let file_terms = vec![TermBlocks {
            sign: Sign::Include,
            blocks: combine_blocks(&axis_blocks(file_filters, &file_windows, false)),
        }];

        Ok(Self {
            memory_local_shape,
            memory_windows,
            file_windows,
            memory_terms,
            file_terms,
            file_expression: filter::to_expression(file_filters),
        })
    }

    /// Return the shape of the local memory partition of this process.
    #[must_use]
    pub fn memory_local_shape(&self) -> &[u64] {
        &self.memory_local_shape
    }

    /// Return the window of the global memory shape held by this process along each axis.
    #[must_use]
    pub fn memory_windows(&self) -> &[Range<u64>] {
        &self.memory_windows
    }

    /// Return the window of the file shape paired with this process along each axis.
    #[must_use]
    pub fn file_windows(&self) -> &[Range<u64>] {
        &self.file_windows
    }

    /// Return the signed blocks issued to the memory selection space, one entry per memory term.
    #[must_use]
    pub fn memory_terms(&self) -> &[TermBlocks] {
        &self.memory_terms
    }

    /// Return the signed blocks issued to the file selection space, one entry per file term.
    #[must_use]
    pub fn file_terms(&self) -> &[TermBlocks] {
        &self.file_terms
    }

    /// Return the file expression the blocks were computed from.
    ///
    /// This is the whole file shape if the file expression was empty.
    #[must_use]
    pub fn file_expression(&self) -> &SelectionExpression {
        &self.file_expression
    }

    /// Returns an iterator over every memory block and its sign, in issue order.
    pub fn memory_blocks(&self) -> impl Iterator<Item = (Sign, &HyperslabBlock)> {
        self.memory_terms
            .iter()
            .flat_map(|term| term.blocks.iter().map(move |block| (term.sign, block)))
    }

    /// Returns an iterator over every file block and its sign, in issue order.
    pub fn file_blocks(&self) -> impl Iterator<Item = (Sign, &HyperslabBlock)> {
        self.file_terms
            .iter()
            .flat_map(|term| term.blocks.iter().map(move |block| (term.sign, block)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{decomposition::DegenerateExtentError, selection::SelectionError};

    fn compute(
        grid: &ProcessGrid,
        memory_shape: &[u64],
        memory_expression: &str,
        file_shape: &[u64],
        file_expression: &str,
    ) -> Result<PlanLayout, PlanError> {
        PlanLayout::compute(
            grid,
            memory_shape,
            &memory_expression.parse().unwrap(),
            file_shape,
            &file_expression.parse().unwrap(),
            PartitionPolicy::Exact,
        )
    }

    #[test]
    fn plan_layout_two_processes_all() {
        for (id, start) in [(0, 0), (1, 4)] {
            let grid = ProcessGrid::new(vec![id], vec![2]).unwrap();
            let layout = compute(&grid, &[8], "", &[8], "").unwrap();
            assert_eq!(layout.memory_local_shape(), &[4]);
            let memory: Vec<_> = layout.memory_blocks().map(|(_, b)| b.blocks()).collect();
            assert_eq!(memory, vec![vec![Block::new(0, 4)]]);
            let file: Vec<_> = layout.file_blocks().map(|(_, b)| b.blocks()).collect();
            assert_eq!(file, vec![vec![Block::new(start, 4)]]);
        }
    }

    #[test]
    fn plan_layout_strided_memory() {
        let layout = compute(&ProcessGrid::single(1), &[8], "+[0:8:2]", &[4], "").unwrap();
        let memory: Vec<_> = layout.memory_blocks().map(|(_, b)| b.blocks()).collect();
        assert_eq!(
            memory,
            vec![
                vec![Block::new(0, 1)],
                vec![Block::new(2, 1)],
                vec![Block::new(4, 1)],
                vec![Block::new(6, 1)]
            ]
        );
        let file: Vec<_> = layout.file_blocks().map(|(_, b)| b.blocks()).collect();
        assert_eq!(file, vec![vec![Block::new(0, 4)]]);
        assert_eq!(layout.memory_terms()[0].num_elements(), 4);
        assert_eq!(layout.file_terms()[0].num_elements(), 4);
        assert_eq!(layout.file_expression().to_string(), "[:]");
    }

    #[test]
    fn plan_layout_exclude_term_signs() {
        let layout = compute(&ProcessGrid::single(1), &[8], "[0:7] - [2:3]", &[6], "").unwrap();
        let signs: Vec<_> = layout.memory_terms().iter().map(TermBlocks::sign).collect();
        assert_eq!(signs, vec![Sign::Include, Sign::Exclude]);
        assert_eq!(layout.memory_terms()[1].blocks()[0].blocks(), vec![Block::new(2, 2)]);
        assert_eq!(layout.file_windows(), &[0..6]);
    }

    #[test]
    fn plan_layout_two_dimensional_local_frame() {
        let grid = ProcessGrid::new(vec![1, 1], vec![2, 2]).unwrap();
        let layout = compute(&grid, &[4, 6], "[1:2, 0:5:2]", &[2, 3], "").unwrap();
        assert_eq!(layout.memory_windows(), &[2..4, 3..6]);
        assert_eq!(layout.memory_local_shape(), &[2, 3]);
        let memory: Vec<_> = layout.memory_blocks().map(|(_, b)| b.blocks()).collect();
        assert_eq!(memory, vec![vec![Block::new(0, 1), Block::new(1, 1)]]);
        // one selected row before the window on axis 0, two selected columns before it on axis 1
        assert_eq!(layout.file_windows(), &[1..2, 2..3]);
    }

    #[test]
    fn plan_layout_zero_extent() {
        let grid = ProcessGrid::new(vec![3], vec![4]).unwrap();
        let layout = PlanLayout::compute(
            &grid,
            &[2],
            &SelectionExpression::new(),
            &[2],
            &SelectionExpression::new(),
            PartitionPolicy::Balanced,
        )
        .unwrap();
        assert_eq!(layout.memory_local_shape(), &[0]);
        assert_eq!(layout.memory_blocks().count(), 0);
        assert_eq!(layout.file_blocks().count(), 0);
    }

    #[test]
    fn plan_layout_from_filters_matches_expression() {
        let grid = ProcessGrid::new(vec![1, 1], vec![2, 2]).unwrap();
        let from_expression = compute(&grid, &[4, 6], "[1:2, 0:5:2]", &[2, 3], "").unwrap();
        let memory_filters = vec![
            AxisFilter::from(vec![false, true, true, false]),
            AxisFilter::from(vec![true, false, true, false, true, false]),
        ];
        let file_filters = vec![
            AxisFilter::new_all(2).unwrap(),
            AxisFilter::new_all(3).unwrap(),
        ];
        let from_filters = PlanLayout::from_filters(
            &grid,
            &memory_filters,
            &file_filters,
            PartitionPolicy::Exact,
        )
        .unwrap();
        assert_eq!(from_filters, from_expression);
    }

    #[test]
    fn plan_layout_from_filters_gapped_file() {
        let memory_filters = vec![AxisFilter::new_all(4).unwrap()];
        let file_filters = vec![AxisFilter::from(vec![
            true, false, true, true, false, true,
        ])];
        let layout = PlanLayout::from_filters(
            &ProcessGrid::new(vec![1], vec![2]).unwrap(),
            &memory_filters,
            &file_filters,
            PartitionPolicy::Exact,
        )
        .unwrap();
        assert_eq!(layout.file_windows(), &[3..6]);
        let file: Vec<_> = layout.file_blocks().map(|(_, b)| b.blocks()).collect();
        assert_eq!(file, vec![vec![Block::new(3, 1)], vec![Block::new(5, 1)]]);
        assert_eq!(layout.file_expression().to_string(), "[:] - [1] - [4]");
    }

    #[test]
    fn plan_layout_from_filters_errors() {
        let grid = ProcessGrid::single(2);
        let memory_filters = vec![AxisFilter::new_all(2).unwrap(), AxisFilter::new_all(3).unwrap()];
        let file_filters = vec![
            AxisFilter::new_all(2).unwrap(),
            AxisFilter::from(vec![true, false, true]),
        ];
        assert!(matches!(
            PlanLayout::from_filters(&grid, &memory_filters, &file_filters, PartitionPolicy::Exact),
            Err(PlanError::AxisCountMismatch {
                axis: 1,
                memory: 3,
                file: 2
            })
        ));
        assert!(matches!(
            PlanLayout::from_filters(&grid, &memory_filters[..1], &file_filters, PartitionPolicy::Exact),
            Err(PlanError::IncompatibleDimensionality("memory filters", _))
        ));
    }

    #[test]
    fn plan_layout_errors() {
        let grid = ProcessGrid::new(vec![0], vec![3]).unwrap();
        assert!(matches!(
            compute(&grid, &[8], "", &[8], ""),
            Err(PlanError::DegenerateExtent(err)) if err == DegenerateExtentError::new(0, 8, 3)
        ));
        assert!(matches!(
            compute(&grid, &[9, 9], "", &[9], ""),
            Err(PlanError::IncompatibleDimensionality("memory shape", _))
        ));
        assert!(matches!(
            compute(&grid, &[9], "", &[9, 1], ""),
            Err(PlanError::IncompatibleDimensionality("file shape", _))
        ));
        assert!(matches!(
            compute(&grid, &[9], "[1, 2]", &[9], ""),
            Err(PlanError::InvalidSelection(SelectionError::AxisCountMismatch(..)))
        ));
    }
}
