//! Per-axis selection filters.
//!
//! An [`AxisFilter`] marks which indices of one axis are touched by a selection.
//! Plans are resolved one axis at a time: the filters of an expression are materialized with [`materialize`], then cut into contiguous [`Block`]s within a process window.

use derive_more::{Deref, From};

use crate::{
    hyperslab::Block,
    selection::{Range, SelectionError, SelectionExpression, SelectionTerm, Sign},
};

/// A boolean marker per index of a single axis.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Deref, From)]
pub struct AxisFilter(Vec<bool>);

fn extent_to_usize(extent: u64) -> Result<usize, SelectionError> {
    usize::try_from(extent).map_err(|_| SelectionError::ExtentTooLarge(extent))
}

impl AxisFilter {
    /// Create a filter for an axis of `extent` with nothing selected.
    ///
    /// # Errors
    /// Returns [`SelectionError::ExtentTooLarge`] if `extent` does not fit in a [`usize`].
    pub fn new_empty(extent: u64) -> Result<Self, SelectionError> {
        Ok(Self(vec![false; extent_to_usize(extent)?]))
    }

    /// Create a filter for an axis of `extent` with everything selected.
    ///
    /// # Errors
    /// Returns [`SelectionError::ExtentTooLarge`] if `extent` does not fit in a [`usize`].
    pub fn new_all(extent: u64) -> Result<Self, SelectionError> {
        Ok(Self(vec![true; extent_to_usize(extent)?]))
    }

    /// Create a filter for an axis of `extent` with the indices of `range` selected.
    ///
    /// Indices of `range` outside of `0..extent` are ignored.
    ///
    /// # Errors
    /// Returns [`SelectionError::ExtentTooLarge`] if `extent` does not fit in a [`usize`].
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_range(range: &Range, extent: u64) -> Result<Self, SelectionError> {
        let mut filter = Self::new_empty(extent)?;
        // indices are below extent, which fits in a usize
        for index in range.indices(extent) {
            filter.0[index as usize] = true;
        }
        Ok(filter)
    }

    /// Return the extent of the axis.
    #[must_use]
    pub fn extent(&self) -> u64 {
        self.0.len() as u64
    }

    /// Return the number of selected indices.
    #[must_use]
    pub fn num_selected(&self) -> u64 {
        self.0.iter().filter(|&&selected| selected).count() as u64
    }

    fn clamp(&self, window: &std::ops::Range<u64>) -> std::ops::Range<usize> {
        let len = self.0.len();
        let clamp = |i: u64| usize::try_from(i).map_or(len, |i| i.min(len));
        let start = clamp(window.start);
        start..clamp(window.end).max(start)
    }

    /// Return the number of selected indices in `window`.
    #[must_use]
    pub fn count_in(&self, window: &std::ops::Range<u64>) -> u64 {
        self.0[self.clamp(window)]
            .iter()
            .filter(|&&selected| selected)
            .count() as u64
    }

    /// Return a copy of the filter with every index outside of `window` cleared.
    #[must_use]
    pub fn restrict(&self, window: &std::ops::Range<u64>) -> Self {
        let window = self.clamp(window);
        Self(
            self.0
                .iter()
                .enumerate()
                .map(|(i, &selected)| selected && window.contains(&i))
                .collect(),
        )
    }

    /// Return the maximal runs of selected indices within `window`, in ascending order.
    ///
    /// Block starts are indices of the whole axis, not offsets into `window`.
    #[must_use]
    pub fn blocks(&self, window: &std::ops::Range<u64>) -> Vec<Block> {
        let window = self.clamp(window);
        let mut blocks = Vec::new();
        let mut run_start = None;
        for i in window.clone() {
            match (self.0[i], run_start) {
                (true, None) => run_start = Some(i),
                (false, Some(start)) => {
                    blocks.push(Block::new(start as u64, (i - start) as u64));
                    run_start = None;
                }
                _ => {}
            }
        }
        if let Some(start) = run_start {
            blocks.push(Block::new(start as u64, (window.end - start) as u64));
        }
        blocks
    }

    /// Return the window of this filter holding the selected indices with ordinals `start_count..start_count + count`.
    ///
    /// The window starts after the first `start_count` selected indices and ends at the index where `count` more have been seen.
    /// If the filter holds fewer selected indices, the window is cut short at the extent.
    #[must_use]
    pub fn ordinal_window(&self, start_count: u64, count: u64) -> std::ops::Range<u64> {
        let len = self.0.len();
        let mut i = 0;
        let mut seen = 0;
        while i < len && seen < start_count {
            seen += u64::from(self.0[i]);
            i += 1;
        }
        let start = i;
        seen = 0;
        while i < len && seen < count {
            seen += u64::from(self.0[i]);
            i += 1;
        }
        start as u64..i as u64
    }

    /// Select every index selected in `other`.
    pub fn union_with(&mut self, other: &Self) {
        std::iter::zip(&mut self.0, &other.0).for_each(|(a, &b)| *a |= b);
    }

    /// Clear every index selected in `other`.
    pub fn subtract(&mut self, other: &Self) {
        std::iter::zip(&mut self.0, &other.0).for_each(|(a, &b)| *a &= !b);
    }

    /// Returns true if every index selected in `other` is also selected in this filter.
    #[must_use]
    pub fn covers(&self, other: &Self) -> bool {
        std::iter::zip(&self.0, &other.0).all(|(&a, &b)| a || !b)
    }
}

/// Materialize the per-axis filters of a single `term` on an array of `shape`, ignoring its sign.
///
/// # Errors
/// Returns a [`SelectionError`] if the term does not match the dimensionality of `shape` or an extent is too large.
pub fn materialize_term(
    term: &SelectionTerm,
    shape: &[u64],
) -> Result<Vec<AxisFilter>, SelectionError> {
    term.validate(shape)?;
    std::iter::zip(term.ranges(), shape)
        .map(|(range, &extent)| AxisFilter::from_range(range, extent))
        .collect()
}

/// Materialize the per-axis filters of `expression` on an array of `shape`.
///
/// An empty expression selects every index of every axis.
/// Terms are folded in order.
/// An include term selects its indices on every axis.
/// An exclude term clears its indices on an axis only if, on every other axis, it covers all indices selected so far, so that the whole cross-section is removed.
/// For a single axis this is a plain difference.
///
/// # Errors
/// Returns a [`SelectionError`] if a term does not match the dimensionality of `shape` or an extent is too large.
pub fn materialize(
    expression: &SelectionExpression,
    shape: &[u64],
) -> Result<Vec<AxisFilter>, SelectionError> {
    if expression.is_empty() {
        return shape.iter().map(|&extent| AxisFilter::new_all(extent)).collect();
    }
    let mut filters = shape
        .iter()
        .map(|&extent| AxisFilter::new_empty(extent))
        .collect::<Result<Vec<_>, _>>()?;
    for term in expression {
        let term_filters = materialize_term(term, shape)?;
        match term.sign() {
            Sign::Include => {
                std::iter::zip(&mut filters, &term_filters)
                    .for_each(|(filter, term_filter)| filter.union_with(term_filter));
            }
            Sign::Exclude => {
                let removable: Vec<bool> = (0..shape.len())
                    .map(|axis| {
                        std::iter::zip(&filters, &term_filters)
                            .enumerate()
                            .all(|(other, (filter, term_filter))| {
                                other == axis || term_filter.covers(filter)
                            })
                    })
                    .collect();
                for ((filter, term_filter), removable) in
                    std::iter::zip(&mut filters, &term_filters).zip(removable)
                {
                    if removable {
                        filter.subtract(term_filter);
                    }
                }
            }
        }
    }
    Ok(filters)
}

/// Return an expression selecting the Cartesian product of the selected indices of `filters`.
///
/// The expression includes everything, then excludes every unselected run of each axis across all other axes.
#[must_use]
pub fn to_expression(filters: &[AxisFilter]) -> SelectionExpression {
    let mut expression = SelectionExpression::from(SelectionTerm::all(filters.len()));
    for (axis, filter) in filters.iter().enumerate() {
        let unselected = AxisFilter(filter.iter().map(|&selected| !selected).collect());
        for block in unselected.blocks(&(0..unselected.extent())) {
            let start = i64::try_from(block.start()).unwrap_or(i64::MAX);
            let stop = i64::try_from(block.end_exc() - 1).unwrap_or(i64::MAX);
            let mut ranges = vec![Range::all(); filters.len()];
            ranges[axis] = Range::new(start, stop);
            expression.push(SelectionTerm::new_with_sign(Sign::Exclude, ranges));
        }
    }
    expression
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(bits: &str) -> AxisFilter {
        AxisFilter(bits.chars().map(|c| c == '1').collect())
    }

    #[test]
    fn axis_filter_from_range() {
        let range = Range::new_with_step(0, 8, 2).unwrap();
        assert_eq!(AxisFilter::from_range(&range, 8).unwrap(), filter("10101010"));
        assert_eq!(
            AxisFilter::from_range(&Range::all(), 3).unwrap(),
            filter("111")
        );
        assert_eq!(
            AxisFilter::from_range(&Range::new(-2, 1), 4).unwrap(),
            filter("1100")
        );
    }

    #[test]
    fn axis_filter_blocks() {
        let f = filter("0001100111000");
        assert_eq!(f.blocks(&(0..13)), vec![Block::new(3, 2), Block::new(7, 3)]);
        assert_eq!(f.blocks(&(4..8)), vec![Block::new(4, 1), Block::new(7, 1)]);
        assert_eq!(f.blocks(&(8..100)), vec![Block::new(8, 2)]);
        assert!(f.blocks(&(10..13)).is_empty());
        assert!(f.blocks(&(5..2)).is_empty());
        assert_eq!(filter("11").blocks(&(0..2)), vec![Block::new(0, 2)]);
    }

    #[test]
    fn axis_filter_counts() {
        let f = filter("0110110");
        assert_eq!(f.extent(), 7);
        assert_eq!(f.num_selected(), 4);
        assert_eq!(f.count_in(&(0..3)), 2);
        assert_eq!(f.count_in(&(3..7)), 2);
        assert_eq!(f.restrict(&(2..5)), filter("0010100"));
    }

    #[test]
    fn axis_filter_ordinal_window() {
        let f = filter("11111111");
        assert_eq!(f.ordinal_window(0, 4), 0..4);
        assert_eq!(f.ordinal_window(4, 4), 4..8);
        let f = filter("01011001");
        assert_eq!(f.ordinal_window(0, 2), 0..4);
        assert_eq!(f.ordinal_window(2, 2), 4..8);
        assert_eq!(f.ordinal_window(1, 0), 2..2);
        assert_eq!(f.ordinal_window(3, 5), 5..8);
    }

    #[test]
    fn axis_filter_set_operations() {
        let mut f = filter("1100");
        f.union_with(&filter("0110"));
        assert_eq!(f, filter("1110"));
        f.subtract(&filter("0101"));
        assert_eq!(f, filter("1010"));
        assert!(filter("1110").covers(&filter("1010")));
        assert!(!filter("0110").covers(&filter("1010")));
    }

    #[test]
    fn materialize_empty_expression_selects_all() {
        let filters = materialize(&SelectionExpression::new(), &[2, 3]).unwrap();
        assert_eq!(filters, vec![filter("11"), filter("111")]);
    }

    #[test]
    fn materialize_one_dimensional_difference() {
        let expression: SelectionExpression = "[0:7] - [2:3]".parse().unwrap();
        let filters = materialize(&expression, &[8]).unwrap();
        assert_eq!(filters, vec![filter("11001111")]);
    }

    #[test]
    fn materialize_cross_section_difference() {
        // removes row 4 entirely
        let expression: SelectionExpression = "[0:5, :] - [4, :]".parse().unwrap();
        let filters = materialize(&expression, &[6, 3]).unwrap();
        assert_eq!(filters, vec![filter("111101"), filter("111")]);

        // removes a single element, which does not change any axis
        let expression: SelectionExpression = "[:, :] - [1, 1]".parse().unwrap();
        let filters = materialize(&expression, &[3, 3]).unwrap();
        assert_eq!(filters, vec![filter("111"), filter("111")]);
    }

    #[test]
    fn materialize_union() {
        let expression: SelectionExpression = "[0, 0:1] + [3, 2]".parse().unwrap();
        let filters = materialize(&expression, &[4, 4]).unwrap();
        assert_eq!(filters, vec![filter("1001"), filter("1110")]);
    }

    #[test]
    fn filters_to_expression() {
        let filters = vec![filter("0110"), filter("101101")];
        let expression = to_expression(&filters);
        assert_eq!(
            expression.to_string(),
            "[:,:] - [0,:] - [3,:] - [:,1] - [:,4]"
        );
        assert_eq!(materialize(&expression, &[4, 6]).unwrap(), filters);
        assert_eq!(to_expression(&[filter("111")]).to_string(), "[:]");
    }

    #[test]
    fn materialize_axis_count_mismatch() {
        let expression: SelectionExpression = "[0, 0]".parse().unwrap();
        assert!(matches!(
            materialize(&expression, &[4]),
            Err(SelectionError::AxisCountMismatch(_, 2, 1))
        ));
    }
}
