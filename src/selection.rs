//! Selections.
//!
//! A selection describes a region of a multidimensional array with a compact, NumPy-like syntax.
//!  - A [`Range`] selects indices along a single axis.
//!  - A [`SelectionTerm`] is a signed ([`Sign::Include`] or [`Sign::Exclude`]) list of ranges, one per axis.
//!  - A [`SelectionExpression`] is an ordered composition of terms, e.g. `[0:9,:] - [4,:]`.
//!
//! ```text
//! expression ::= term ( ("+" | "-") term )*
//! term       ::= ("+" | "-")? "[" axis ( "," axis )* "]"
//! axis       ::= INT | INT ":" INT | INT ":" INT ":" INT | ":" | "::"
//! ```
//!
//! Range bounds are inclusive, so `2:6:2` selects `2`, `4` and `6`.
//! Whitespace is ignored.

mod parse;
mod range;
mod selection_expression;
mod selection_term;

pub use range::Range;
pub use selection_expression::SelectionExpression;
pub use selection_term::{SelectionTerm, Sign};

use thiserror::Error;

/// A selection parse error.
///
/// Holds the (whitespace stripped) input and the substring at which parsing failed.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("invalid selection `{input}` at `{at}`")]
pub struct SelectionParseError {
    input: String,
    at: String,
}

impl SelectionParseError {
    /// Create a new selection parse error.
    #[must_use]
    pub fn new(input: String, at: String) -> Self {
        Self { input, at }
    }

    /// The input that failed to parse.
    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }

    /// The offending substring of the input.
    #[must_use]
    pub fn at(&self) -> &str {
        &self.at
    }
}

/// An invalid range error.
#[derive(Copy, Clone, Debug, Error, PartialEq, Eq)]
#[error("range {0}:{1} has a zero step")]
pub struct InvalidRangeError(i64, i64);

/// A selection error raised when a selection is resolved against a shape.
#[derive(Clone, Debug, Error)]
pub enum SelectionError {
    /// A malformed selection string.
    #[error(transparent)]
    ParseError(#[from] SelectionParseError),
    /// The number of ranges in a term does not match the dimensionality of the shape it is resolved against.
    #[error("selection term {0} has {1} axes, expected {2}")]
    AxisCountMismatch(SelectionTerm, usize, usize),
    /// An axis extent that cannot be addressed on this platform.
    #[error("axis extent {0} is too large")]
    ExtentTooLarge(u64),
}
