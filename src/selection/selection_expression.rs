use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

use super::{parse, SelectionError, SelectionParseError, SelectionTerm};

/// An ordered composition of [`SelectionTerm`]s.
///
/// The terms are applied in order: an include term adds its elements and an exclude term removes them.
/// An empty expression selects every element.
///
/// Expressions are parsed from strings such as `[0:9,:] - [4,:]` or assembled with the `+` and `-` operators:
/// ```
/// # use hyperslabs::selection::{SelectionExpression, SelectionTerm};
/// let a: SelectionTerm = "[0:9, :]".parse()?;
/// let b: SelectionTerm = "[4, :]".parse()?;
/// let expression = a - b;
/// assert_eq!(expression.to_string(), "[0:9,:] - [4,:]");
/// assert_eq!(expression, "[0:9,:] - [4,:]".parse::<SelectionExpression>()?);
/// # Ok::<_, Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct SelectionExpression {
    terms: Vec<SelectionTerm>,
}

impl SelectionExpression {
    /// Create an empty expression.
    #[must_use]
    pub const fn new() -> Self {
        Self { terms: Vec::new() }
    }

    /// Return the number of terms.
    #[must_use]
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Returns true if the expression has no terms, and thus selects everything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Return the terms.
    #[must_use]
    pub fn terms(&self) -> &[SelectionTerm] {
        &self.terms
    }

    /// Return an iterator over the terms.
    pub fn iter(&self) -> std::slice::Iter<'_, SelectionTerm> {
        self.terms.iter()
    }

    /// Append `term`.
    pub fn push(&mut self, term: SelectionTerm) {
        self.terms.push(term);
    }

    /// Append `term` with its sign flipped.
    pub fn push_negated(&mut self, term: SelectionTerm) {
        self.terms.push(term.negated());
    }

    /// Insert `term` before `index`, or append it if `index` is [`None`] or past the end.
    pub fn insert(&mut self, term: SelectionTerm, index: Option<usize>) {
        match index {
            Some(index) if index < self.terms.len() => self.terms.insert(index, term),
            _ => self.terms.push(term),
        }
    }

    /// Remove and return the term at `index`, or [`None`] if `index` is out of bounds.
    pub fn remove(&mut self, index: usize) -> Option<SelectionTerm> {
        (index < self.terms.len()).then(|| self.terms.remove(index))
    }

    /// Flip the sign of every term.
    fn negate_all(&mut self) {
        self.terms.iter_mut().for_each(SelectionTerm::negate);
    }

    /// Check that every term has one range per axis of `shape`.
    ///
    /// # Errors
    /// Returns [`SelectionError::AxisCountMismatch`] for the first term that does not match.
    pub fn validate(&self, shape: &[u64]) -> Result<(), SelectionError> {
        self.terms.iter().try_for_each(|term| term.validate(shape))
    }

    /// Pretty print the expression, e.g. `+ [0:9,:] - [4,:]`.
    ///
    /// Terms after the first are always signed.
    /// The sign of the first term is printed if it is an exclude term or `print_first_sign` is true.
    #[must_use]
    pub fn pretty_print(&self, print_first_sign: bool) -> String {
        self.terms
            .iter()
            .enumerate()
            .map(|(i, term)| term.pretty_print(i != 0 || print_first_sign))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl std::ops::Index<usize> for SelectionExpression {
    type Output = SelectionTerm;

    fn index(&self, index: usize) -> &Self::Output {
        &self.terms[index]
    }
}

impl<'a> IntoIterator for &'a SelectionExpression {
    type Item = &'a SelectionTerm;
    type IntoIter = std::slice::Iter<'a, SelectionTerm>;

    fn into_iter(self) -> Self::IntoIter {
        self.terms.iter()
    }
}

impl FromIterator<SelectionTerm> for SelectionExpression {
    fn from_iter<T: IntoIterator<Item = SelectionTerm>>(iter: T) -> Self {
        Self {
            terms: iter.into_iter().collect(),
        }
    }
}

impl From<SelectionTerm> for SelectionExpression {
    fn from(term: SelectionTerm) -> Self {
        Self { terms: vec![term] }
    }
}

impl From<Vec<SelectionTerm>> for SelectionExpression {
    fn from(terms: Vec<SelectionTerm>) -> Self {
        Self { terms }
    }
}

impl std::fmt::Display for SelectionExpression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.pretty_print(f.alternate()))
    }
}

impl std::str::FromStr for SelectionExpression {
    type Err = SelectionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse::parse_expression(s)
    }
}

impl Serialize for SelectionExpression {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.pretty_print(false))
    }
}

impl<'de> Deserialize<'de> for SelectionExpression {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Both terms are kept as given.
impl Add for SelectionTerm {
    type Output = SelectionExpression;

    fn add(self, rhs: Self) -> Self::Output {
        SelectionExpression::from(vec![self, rhs])
    }
}

/// The right term is negated.
impl Sub for SelectionTerm {
    type Output = SelectionExpression;

    fn sub(self, rhs: Self) -> Self::Output {
        SelectionExpression::from(vec![self, rhs.negated()])
    }
}

/// The term is appended.
impl Add<SelectionTerm> for SelectionExpression {
    type Output = SelectionExpression;

    fn add(mut self, rhs: SelectionTerm) -> Self::Output {
        self.push(rhs);
        self
    }
}

/// The term is appended with its sign flipped.
impl Sub<SelectionTerm> for SelectionExpression {
    type Output = SelectionExpression;

    fn sub(mut self, rhs: SelectionTerm) -> Self::Output {
        self.push_negated(rhs);
        self
    }
}

/// The term is prepended.
impl Add<SelectionExpression> for SelectionTerm {
    type Output = SelectionExpression;

    fn add(self, mut rhs: SelectionExpression) -> Self::Output {
        rhs.insert(self, Some(0));
        rhs
    }
}

/// The term is prepended and every term of the expression is negated.
impl Sub<SelectionExpression> for SelectionTerm {
    type Output = SelectionExpression;

    fn sub(self, mut rhs: SelectionExpression) -> Self::Output {
        rhs.negate_all();
        rhs.insert(self, Some(0));
        rhs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::{Range, Sign};

    fn term(s: &str) -> SelectionTerm {
        s.parse().unwrap()
    }

    #[test]
    fn selection_expression_term_algebra() {
        let expression = term("[0:4]") + term("-[2]");
        assert_eq!(expression.len(), 2);
        assert_eq!(expression[1].sign(), Sign::Exclude);

        let expression = term("[0:4]") - term("[2]");
        assert_eq!(expression[1].sign(), Sign::Exclude);
        let expression = term("[0:4]") - term("-[2]");
        assert_eq!(expression[1].sign(), Sign::Include);
    }

    #[test]
    fn selection_expression_append_prepend() {
        let expression = SelectionExpression::from(term("[1]")) + term("[2]") - term("[3]");
        assert_eq!(expression.to_string(), "[1] + [2] - [3]");

        let expression = term("[0]") + expression;
        assert_eq!(expression.to_string(), "[0] + [1] + [2] - [3]");
    }

    #[test]
    fn selection_expression_term_minus_expression_negates_all() {
        let expression: SelectionExpression = "[1] + [2] - [3]".parse().unwrap();
        let expression = term("[0]") - expression;
        assert_eq!(expression.to_string(), "[0] - [1] - [2] + [3]");
    }

    #[test]
    fn selection_expression_insert_remove() {
        let mut expression = SelectionExpression::new();
        assert!(expression.is_empty());
        expression.insert(term("[1]"), None);
        expression.insert(term("[0]"), Some(0));
        expression.insert(term("[3]"), Some(10));
        expression.insert(term("-[2]"), Some(2));
        assert_eq!(expression.to_string(), "[0] + [1] - [2] + [3]");
        assert_eq!(expression.remove(1), Some(term("[1]")));
        assert_eq!(expression.remove(5), None);
        assert_eq!(expression.len(), 3);
        expression.push_negated(term("[4]"));
        assert_eq!(expression.to_string(), "[0] - [2] + [3] - [4]");
    }

    #[test]
    fn selection_expression_pretty_print() {
        let expression: SelectionExpression = "[0:9, :] - [4, :] + [1:7:3, 2]".parse().unwrap();
        assert_eq!(expression.to_string(), "[0:9,:] - [4,:] + [1:7:3,2]");
        assert_eq!(format!("{expression:#}"), "+ [0:9,:] - [4,:] + [1:7:3,2]");
        let expression: SelectionExpression = "-[1]".parse().unwrap();
        assert_eq!(expression.to_string(), "- [1]");
        assert_eq!(SelectionExpression::new().to_string(), "");
    }

    #[test]
    fn selection_expression_round_trip() {
        for input in [
            "[0:9, :] - [4, :]",
            "-[::] + [1:10:3] - [7:0:-1]",
            "[5]",
            "+[1,2,3] + [-1:1, 0, 5:5:2]",
        ] {
            let expression: SelectionExpression = input.parse().unwrap();
            let printed = expression.to_string();
            assert_eq!(printed.parse::<SelectionExpression>().unwrap(), expression);
            let printed = format!("{expression:#}");
            assert_eq!(printed.parse::<SelectionExpression>().unwrap(), expression);
        }
    }

    #[test]
    fn selection_expression_from_term() {
        let expression = SelectionExpression::from(SelectionTerm::all(2));
        assert_eq!(expression.len(), 1);
        assert_eq!(expression[0][1], Range::all());
        assert!(expression.validate(&[3, 3]).is_ok());
        assert!(expression.validate(&[3]).is_err());
    }

    #[test]
    fn selection_expression_serde() {
        let expression: SelectionExpression = "[0:3] - [1]".parse().unwrap();
        let json = serde_json::to_string(&expression).unwrap();
        assert_eq!(json, r#""[0:3] - [1]""#);
        assert_eq!(
            serde_json::from_str::<SelectionExpression>(&json).unwrap(),
            expression
        );
    }
}
