//! Parsers for the selection syntax.
//!
//! Every entry point strips whitespace before parsing and requires the whole input to be consumed.

use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::character::complete::{char, digit1, one_of};
use nom::combinator::{all_consuming, map, map_res, opt, recognize};
use nom::multi::{many0, separated_list1};
use nom::sequence::{delimited, preceded};
use nom::{IResult, Parser as _};

use super::{Range, SelectionExpression, SelectionParseError, SelectionTerm, Sign};

fn integer(input: &str) -> IResult<&str, i64> {
    map_res(recognize((opt(char('-')), digit1)), str::parse).parse(input)
}

fn stepped(input: &str) -> IResult<&str, Range> {
    map_res(
        (integer, preceded(char(':'), integer), preceded(char(':'), integer)),
        |(start, stop, step)| Range::new_with_step(start, stop, step),
    )
    .parse(input)
}

fn bounded(input: &str) -> IResult<&str, Range> {
    map((integer, preceded(char(':'), integer)), |(start, stop)| {
        Range::new(start, stop)
    })
    .parse(input)
}

fn index(input: &str) -> IResult<&str, Range> {
    map(integer, Range::index).parse(input)
}

fn all(input: &str) -> IResult<&str, Range> {
    map(alt((tag("::"), tag(":"))), |_| Range::all()).parse(input)
}

fn range(input: &str) -> IResult<&str, Range> {
    alt((stepped, bounded, index, all)).parse(input)
}

fn sign(input: &str) -> IResult<&str, Sign> {
    map(one_of("+-"), |c| {
        if c == '-' {
            Sign::Exclude
        } else {
            Sign::Include
        }
    })
    .parse(input)
}

fn ranges(input: &str) -> IResult<&str, Vec<Range>> {
    delimited(char('['), separated_list1(char(','), range), char(']')).parse(input)
}

fn term(input: &str) -> IResult<&str, SelectionTerm> {
    map((opt(sign), ranges), |(sign, ranges)| {
        SelectionTerm::new_with_sign(sign.unwrap_or_default(), ranges)
    })
    .parse(input)
}

fn signed_term(input: &str) -> IResult<&str, SelectionTerm> {
    map((sign, ranges), |(sign, ranges)| {
        SelectionTerm::new_with_sign(sign, ranges)
    })
    .parse(input)
}

fn expression(input: &str) -> IResult<&str, SelectionExpression> {
    map((term, many0(signed_term)), |(first, rest)| {
        std::iter::once(first).chain(rest).collect()
    })
    .parse(input)
}

fn strip_whitespace(input: &str) -> String {
    input.chars().filter(|c| !c.is_whitespace()).collect()
}

fn run<'a, T>(
    input: &'a str,
    parser: impl nom::Parser<&'a str, Output = T, Error = nom::error::Error<&'a str>>,
) -> Result<T, SelectionParseError> {
    match all_consuming(parser).parse(input) {
        Ok((_, output)) => Ok(output),
        Err(nom::Err::Error(err) | nom::Err::Failure(err)) => Err(SelectionParseError::new(
            input.to_string(),
            err.input.to_string(),
        )),
        Err(nom::Err::Incomplete(_)) => Err(SelectionParseError::new(
            input.to_string(),
            String::new(),
        )),
    }
}

/// Parse a single axis, e.g. `4`, `0:10`, `0:10:2` or `:`.
pub(super) fn parse_range(input: &str) -> Result<Range, SelectionParseError> {
    run(&strip_whitespace(input), range)
}

/// Parse a single signed term, e.g. `-[0:10:2, 4:20, 5]`.
pub(super) fn parse_term(input: &str) -> Result<SelectionTerm, SelectionParseError> {
    run(&strip_whitespace(input), term)
}

/// Parse an expression of signed terms, e.g. `[0:9,:] - [4,:]`.
///
/// An empty (or all whitespace) input is the empty expression.
pub(super) fn parse_expression(input: &str) -> Result<SelectionExpression, SelectionParseError> {
    let input = strip_whitespace(input);
    if input.is_empty() {
        Ok(SelectionExpression::new())
    } else {
        run(&input, expression)
    }
}
