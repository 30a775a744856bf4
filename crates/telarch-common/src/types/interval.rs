//! Time intervals with optional bounds.
//!
//! Times are milliseconds since the Unix epoch. Both bounds are inclusive;
//! a missing bound extends the interval to infinity on that side.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A closed time interval whose bounds may be open-ended.
///
/// # Example
///
/// ```rust
/// use telarch_common::types::TimeInterval;
///
/// let all = TimeInterval::unbounded();
/// assert!(all.contains(i64::MIN));
///
/// let after = TimeInterval::starting_at(1_000);
/// assert!(!after.contains(999));
/// assert!(after.overlaps(500, 1_000));
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TimeInterval {
    start: Option<i64>,
    end: Option<i64>,
}

impl TimeInterval {
    /// An interval covering all time.
    #[inline]
    #[must_use]
    pub const fn unbounded() -> Self {
        Self {
            start: None,
            end: None,
        }
    }

    /// An interval `[start, end]`.
    #[inline]
    #[must_use]
    pub const fn new(start: i64, end: i64) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    /// An interval `[start, +inf)`.
    #[inline]
    #[must_use]
    pub const fn starting_at(start: i64) -> Self {
        Self {
            start: Some(start),
            end: None,
        }
    }

    /// An interval `(-inf, end]`.
    #[inline]
    #[must_use]
    pub const fn ending_at(end: i64) -> Self {
        Self {
            start: None,
            end: Some(end),
        }
    }

    /// Returns the start bound, if any.
    #[inline]
    #[must_use]
    pub const fn start(&self) -> Option<i64> {
        self.start
    }

    /// Returns the end bound, if any.
    #[inline]
    #[must_use]
    pub const fn end(&self) -> Option<i64> {
        self.end
    }

    /// Returns true if `t` lies inside the interval.
    #[must_use]
    pub fn contains(&self, t: i64) -> bool {
        self.start.map_or(true, |s| t >= s) && self.end.map_or(true, |e| t <= e)
    }

    /// Returns true if `[start, stop]` shares at least one instant with
    /// this interval.
    #[must_use]
    pub fn overlaps(&self, start: i64, stop: i64) -> bool {
        self.end.map_or(true, |e| start <= e) && self.start.map_or(true, |s| stop >= s)
    }

    /// Returns true if the interval can contain no instant.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!((self.start, self.end), (Some(s), Some(e)) if s > e)
    }
}

impl fmt::Debug for TimeInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl fmt::Display for TimeInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.start {
            Some(s) => write!(f, "[{s}, ")?,
            None => write!(f, "(-inf, ")?,
        }
        match self.end {
            Some(e) => write!(f, "{e}]"),
            None => write!(f, "+inf)"),
        }
    }
}
