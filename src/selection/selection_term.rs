use serde::{Deserialize, Serialize};

use super::{parse, Range, SelectionError, SelectionParseError};

/// The sign of a [`SelectionTerm`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sign {
    /// The term adds its elements to the selection.
    #[default]
    Include,
    /// The term removes its elements from the selection.
    Exclude,
}

impl Sign {
    /// Return the opposite sign.
    #[must_use]
    pub const fn negated(self) -> Self {
        match self {
            Self::Include => Self::Exclude,
            Self::Exclude => Self::Include,
        }
    }

    /// Return the sign as `+` or `-`.
    #[must_use]
    pub const fn symbol(self) -> char {
        match self {
            Self::Include => '+',
            Self::Exclude => '-',
        }
    }
}

/// A signed selection of a multidimensional array, holding one [`Range`] per axis.
///
/// The selected elements are the Cartesian product of the indices of each range.
/// The dimensionality is not validated until the term is resolved against a shape.
///
/// A term can be parsed from a string such as `-[0:10:2, 4:20, 5]`, where the leading sign is optional and defaults to `+`.
///
/// The [`Display`](std::fmt::Display) implementation omits a positive sign.
/// The alternate form (`{:#}`) always prints the sign.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SelectionTerm {
    sign: Sign,
    ranges: Vec<Range>,
}

impl SelectionTerm {
    /// Create a new [`Sign::Include`] term from `ranges`.
    #[must_use]
    pub fn new(ranges: impl Into<Vec<Range>>) -> Self {
        Self::new_with_sign(Sign::Include, ranges)
    }

    /// Create a new term with `sign` from `ranges`.
    #[must_use]
    pub fn new_with_sign(sign: Sign, ranges: impl Into<Vec<Range>>) -> Self {
        Self {
            sign,
            ranges: ranges.into(),
        }
    }

    /// Create a term including every element of an array with `dimensionality`.
    #[must_use]
    pub fn all(dimensionality: usize) -> Self {
        Self::new(vec![Range::all(); dimensionality])
    }

    /// Return the sign.
    #[must_use]
    pub const fn sign(&self) -> Sign {
        self.sign
    }

    /// Return the ranges.
    #[must_use]
    pub fn ranges(&self) -> &[Range] {
        &self.ranges
    }

    /// Return the number of ranges.
    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.ranges.len()
    }

    /// Flip the sign of the term.
    pub fn negate(&mut self) {
        self.sign = self.sign.negated();
    }

    /// Return the term with its sign flipped.
    #[must_use]
    pub fn negated(mut self) -> Self {
        self.negate();
        self
    }

    /// Check that the term has one range per axis of `shape`.
    ///
    /// # Errors
    /// Returns [`SelectionError::AxisCountMismatch`] if the dimensionalities differ.
    pub fn validate(&self, shape: &[u64]) -> Result<(), SelectionError> {
        if self.dimensionality() == shape.len() {
            Ok(())
        } else {
            Err(SelectionError::AxisCountMismatch(
                self.clone(),
                self.dimensionality(),
                shape.len(),
            ))
        }
    }

    /// Pretty print the term, e.g. `- [0:10:2,4:20,5]`.
    ///
    /// The sign of an include term is only printed if `print_positive_sign` is true.
    #[must_use]
    pub fn pretty_print(&self, print_positive_sign: bool) -> String {
        let mut out = String::new();
        if print_positive_sign || self.sign == Sign::Exclude {
            out.push(self.sign.symbol());
            out.push(' ');
        }
        out.push('[');
        for (i, range) in self.ranges.iter().enumerate() {
            if i != 0 {
                out.push(',');
            }
            out.push_str(&range.to_string());
        }
        out.push(']');
        out
    }
}

impl std::ops::Index<usize> for SelectionTerm {
    type Output = Range;

    fn index(&self, axis: usize) -> &Self::Output {
        &self.ranges[axis]
    }
}

impl From<Vec<Range>> for SelectionTerm {
    fn from(ranges: Vec<Range>) -> Self {
        Self::new(ranges)
    }
}

impl std::fmt::Display for SelectionTerm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.pretty_print(f.alternate()))
    }
}

impl std::str::FromStr for SelectionTerm {
    type Err = SelectionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse::parse_term(s)
    }
}

impl Serialize for SelectionTerm {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.pretty_print(true))
    }
}

impl<'de> Deserialize<'de> for SelectionTerm {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_term_pretty_print() {
        let term: SelectionTerm = "[0:10:2, 4:20, 5]".parse().unwrap();
        assert_eq!(term.to_string(), "[0:10:2,4:20,5]");
        assert_eq!(format!("{term:#}"), "+ [0:10:2,4:20,5]");
        let term = term.negated();
        assert_eq!(term.to_string(), "- [0:10:2,4:20,5]");
        assert_eq!(SelectionTerm::all(3).to_string(), "[:,:,:]");
    }

    #[test]
    fn selection_term_round_trip() {
        for input in [
            "[0:10:2,4:20,5]",
            "-[::, 3, 7:1:-2]",
            "+[5:5:3]",
            "[-4:9:4, 0]",
            "-[3:1]",
        ] {
            let term: SelectionTerm = input.parse().unwrap();
            let printed: SelectionTerm = format!("{term:#}").parse().unwrap();
            assert_eq!(term, printed);
            let printed: SelectionTerm = term.to_string().parse().unwrap();
            assert_eq!(term, printed);
        }
    }

    #[test]
    fn selection_term_negate() {
        let mut term = SelectionTerm::new([Range::index(1)]);
        assert_eq!(term.sign(), Sign::Include);
        term.negate();
        assert_eq!(term.sign(), Sign::Exclude);
        assert_eq!(term.clone().negated().sign(), Sign::Include);
        assert_eq!(term[0], Range::index(1));
    }

    #[test]
    fn selection_term_validate() {
        let term: SelectionTerm = "[1, 2]".parse().unwrap();
        assert!(term.validate(&[4, 4]).is_ok());
        assert!(matches!(
            term.validate(&[4, 4, 4]),
            Err(SelectionError::AxisCountMismatch(_, 2, 3))
        ));
    }

    #[test]
    fn selection_term_serde() {
        let term: SelectionTerm = "-[0:4, :]".parse().unwrap();
        let json = serde_json::to_string(&term).unwrap();
        assert_eq!(json, r#""- [0:4,:]""#);
        let term_json: SelectionTerm = serde_json::from_str(&json).unwrap();
        assert_eq!(term, term_json);
    }
}
