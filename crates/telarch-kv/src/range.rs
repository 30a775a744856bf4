//! Key ranges and scan entries.

use std::ops::Bound;

use telarch_common::types::{Key, Value};

/// A key-value pair returned by a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvEntry {
    /// The key.
    pub key: Key,
    /// The value.
    pub value: Value,
}

impl KvEntry {
    /// Creates a new entry.
    pub fn new(key: Key, value: Value) -> Self {
        Self { key, value }
    }
}

/// Range bounds for a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRange {
    /// Start bound.
    pub start: Bound<Key>,
    /// End bound.
    pub end: Bound<Key>,
}

impl KeyRange {
    /// Creates a range covering all keys.
    pub fn all() -> Self {
        Self {
            start: Bound::Unbounded,
            end: Bound::Unbounded,
        }
    }

    /// Creates a range from start (inclusive) to end (exclusive).
    pub fn new(start: Key, end: Key) -> Self {
        Self {
            start: Bound::Included(start),
            end: Bound::Excluded(end),
        }
    }

    /// Creates a range starting from a key (inclusive).
    pub fn from(start: Key) -> Self {
        Self {
            start: Bound::Included(start),
            end: Bound::Unbounded,
        }
    }

    /// Creates a range with a prefix (all keys starting with the prefix).
    pub fn prefix(prefix: Key) -> Self {
        let end = match prefix.prefix_end() {
            Some(end) => Bound::Excluded(end),
            None => Bound::Unbounded,
        };
        Self {
            start: Bound::Included(prefix),
            end,
        }
    }

    /// Restricts this range to start no earlier than `start` (inclusive).
    ///
    /// The tighter of the two start bounds wins.
    pub fn starting_at(mut self, start: Key) -> Self {
        let tighter = match &self.start {
            Bound::Included(current) | Bound::Excluded(current) => start > *current,
            Bound::Unbounded => true,
        };
        if tighter {
            self.start = Bound::Included(start);
        }
        self
    }

    /// Restricts this range to end before `end` (exclusive).
    ///
    /// The tighter of the two end bounds wins.
    pub fn ending_before(mut self, end: Key) -> Self {
        let tighter = match &self.end {
            Bound::Included(current) | Bound::Excluded(current) => end <= *current,
            Bound::Unbounded => true,
        };
        if tighter {
            self.end = Bound::Excluded(end);
        }
        self
    }

    /// Checks if a key is within the range.
    pub fn contains(&self, key: &Key) -> bool {
        let after_start = match &self.start {
            Bound::Included(start) => key >= start,
            Bound::Excluded(start) => key > start,
            Bound::Unbounded => true,
        };

        let before_end = match &self.end {
            Bound::Included(end) => key <= end,
            Bound::Excluded(end) => key < end,
            Bound::Unbounded => true,
        };

        after_start && before_end
    }

    /// Returns true if no key can satisfy both bounds.
    pub fn is_empty(&self) -> bool {
        match (&self.start, &self.end) {
            (Bound::Included(s), Bound::Included(e)) => s > e,
            (Bound::Included(s), Bound::Excluded(e))
            | (Bound::Excluded(s), Bound::Included(e))
            | (Bound::Excluded(s), Bound::Excluded(e)) => s >= e,
            _ => false,
        }
    }

    /// Returns the bounds as a pair usable with `BTreeMap::range`.
    pub fn as_bounds(&self) -> (Bound<&Key>, Bound<&Key>) {
        (self.start.as_ref(), self.end.as_ref())
    }
}

impl Default for KeyRange {
    fn default() -> Self {
        Self::all()
    }
}
