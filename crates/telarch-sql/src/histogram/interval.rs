//! Histogram intervals.

use std::fmt;

use crate::types::Value;

/// A run of samples of one column value.
///
/// Covers the closed range `[start, stop]` in milliseconds; `count` is the
/// number of samples merged into it.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramInterval {
    value: Value,
    start: i64,
    stop: i64,
    count: u32,
}

impl HistogramInterval {
    /// Creates an interval.
    pub fn new(value: Value, start: i64, stop: i64, count: u32) -> Self {
        Self {
            value,
            start,
            stop,
            count,
        }
    }

    /// An interval holding a single sample at `t`.
    pub fn point(value: Value, t: i64) -> Self {
        Self::new(value, t, t, 1)
    }

    /// Returns the column value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Returns the first sample time.
    pub fn start(&self) -> i64 {
        self.start
    }

    /// Returns the last sample time.
    pub fn stop(&self) -> i64 {
        self.stop
    }

    /// Returns the number of merged samples.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Adds one sample at `t`.
    pub(crate) fn extend(&mut self, t: i64) {
        self.stop = self.stop.max(t);
        self.count = self.count.saturating_add(1);
    }
}

impl fmt::Display for HistogramInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}, {}] x{}",
            self.value, self.start, self.stop, self.count
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extend() {
        let mut interval = HistogramInterval::point(Value::string("p1"), 1000);
        interval.extend(2000);
        interval.extend(1500);
        assert_eq!(interval.start(), 1000);
        assert_eq!(interval.stop(), 2000);
        assert_eq!(interval.count(), 3);
        assert_eq!(interval.to_string(), "p1 [1000, 2000] x3");
    }
}
