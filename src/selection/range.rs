use std::hash::{Hash, Hasher};

use itertools::Either;

use super::{parse, InvalidRangeError, SelectionParseError};

/// A selection along a single axis.
///
/// Either every index of the axis ([`Range::all`]), or the indices from `start` to `stop` (inclusive) in increments of `step`.
/// A negative step walks from `start` down to `stop`.
///
/// Equality is semantic: two explicit ranges are equal if they visit the same indices, so `5`, `5:5` and `5:5:3` are all equal.
/// The all range is never equal to an explicit range.
#[derive(Copy, Clone, Debug)]
pub struct Range {
    start: i64,
    stop: i64,
    step: i64,
    all: bool,
}

impl Range {
    /// Create a range selecting every index of an axis.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            start: 0,
            stop: -1,
            step: 1,
            all: true,
        }
    }

    /// Create a range selecting the single index `index`.
    #[must_use]
    pub const fn index(index: i64) -> Self {
        Self {
            start: index,
            stop: index,
            step: 1,
            all: false,
        }
    }

    /// Create a range selecting `start` to `stop` (inclusive).
    #[must_use]
    pub const fn new(start: i64, stop: i64) -> Self {
        Self {
            start,
            stop,
            step: 1,
            all: false,
        }
    }

    /// Create a range selecting `start` to `stop` (inclusive) in increments of `step`.
    ///
    /// # Errors
    /// Returns [`InvalidRangeError`] if `step` is zero.
    pub const fn new_with_step(start: i64, stop: i64, step: i64) -> Result<Self, InvalidRangeError> {
        if step == 0 {
            Err(InvalidRangeError(start, stop))
        } else {
            Ok(Self {
                start,
                stop,
                step,
                all: false,
            })
        }
    }

    /// Return the start of the range.
    #[must_use]
    pub const fn start(&self) -> i64 {
        self.start
    }

    /// Return the inclusive stop of the range.
    #[must_use]
    pub const fn stop(&self) -> i64 {
        self.stop
    }

    /// Return the step of the range.
    #[must_use]
    pub const fn step(&self) -> i64 {
        self.step
    }

    /// Returns true if this is the all range.
    #[must_use]
    pub const fn is_all(&self) -> bool {
        self.all
    }

    /// The last index visited by an explicit range, or [`None`] if it visits nothing.
    ///
    /// Progressions are evaluated in `i128`, so every pair of `i64` bounds and step is representable.
    fn last(&self) -> Option<i128> {
        let (start, stop, step) = (
            i128::from(self.start),
            i128::from(self.stop),
            i128::from(self.step),
        );
        let span = stop - start;
        if span != 0 && span.signum() != step.signum() {
            None
        } else {
            Some(start + (span / step) * step)
        }
    }

    /// The visited indices as `(lowest, highest, |step|)`, independent of direction.
    fn canonical(&self) -> Option<(i128, i128, i128)> {
        let last = self.last()?;
        let start = i128::from(self.start);
        if last == start {
            Some((last, last, 1))
        } else {
            Some((start.min(last), start.max(last), i128::from(self.step).abs()))
        }
    }

    /// Returns an iterator over the indices selected by this range on an axis of `extent`.
    ///
    /// Indices outside of `0..extent` are skipped.
    /// Indices are visited in the direction of the step.
    pub fn indices(&self, extent: u64) -> impl Iterator<Item = u64> {
        if self.all {
            return Either::Left(0..extent);
        }
        let upper = i128::from(extent) - 1;
        let (start, step) = (i128::from(self.start), i128::from(self.step));
        // index k of the progression is start + k * step, for k in 0..=steps
        let steps = self.last().map_or(-1, |last| (last - start) / step);
        let (k_min, k_max) = if step > 0 {
            let k_min = if start >= 0 { 0 } else { div_ceil(-start, step) };
            let k_max = if upper < start {
                -1
            } else {
                steps.min((upper - start) / step)
            };
            (k_min, k_max)
        } else {
            let k_min = if start <= upper {
                0
            } else {
                div_ceil(start - upper, -step)
            };
            let k_max = if start < 0 { -1 } else { steps.min(start / -step) };
            (k_min, k_max)
        };
        Either::Right((k_min..=k_max).filter_map(move |k| u64::try_from(start + k * step).ok()))
    }
}

/// Ceiling division of non-negative `a` by positive `b`.
const fn div_ceil(a: i128, b: i128) -> i128 {
    (a + b - 1) / b
}

impl PartialEq for Range {
    fn eq(&self, other: &Self) -> bool {
        match (self.all, other.all) {
            (true, true) => true,
            (false, false) => self.canonical() == other.canonical(),
            _ => false,
        }
    }
}

impl Eq for Range {}

impl Hash for Range {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.all.hash(state);
        if !self.all {
            self.canonical().hash(state);
        }
    }
}

impl std::fmt::Display for Range {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.all {
            write!(f, ":")
        } else if self.start == self.stop {
            write!(f, "{}", self.start)
        } else if self.step == 1 {
            write!(f, "{}:{}", self.start, self.stop)
        } else {
            write!(f, "{}:{}:{}", self.start, self.stop, self.step)
        }
    }
}

impl std::str::FromStr for Range {
    type Err = SelectionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse::parse_range(s)
    }
}
