//! Histogram scans.

use std::sync::Arc;

use tracing::{debug, trace};

use telarch_common::types::TimeInterval;
use telarch_kv::{KeyRange, KvScan, KvStore};

use crate::storage::{StorageError, StorageResult};
use crate::types::Value;

use super::{HistogramInterval, HistogramKeyspace};

/// Position of a [`HistogramIterator`].
#[derive(Debug, Clone, PartialEq)]
pub enum IteratorState {
    /// No scan has been opened yet.
    Unpositioned,
    /// The contained interval is the next one to return.
    Positioned(HistogramInterval),
    /// Nothing is left.
    Exhausted,
}

/// Iterates the intervals of one histogram column in `(value, start)` order.
///
/// Only intervals overlapping the iterator's time interval are returned.
/// The iterator holds a store cursor until it is exhausted, closed or
/// dropped.
#[derive(Debug)]
pub struct HistogramIterator {
    store: Arc<dyn KvStore>,
    keyspace: HistogramKeyspace,
    value_filter: Option<Value>,
    interval: TimeInterval,
    scan: Option<KvScan>,
    state: IteratorState,
    closed: bool,
}

impl HistogramIterator {
    /// Creates an iterator over every value of the column.
    pub fn new(
        store: Arc<dyn KvStore>,
        keyspace: HistogramKeyspace,
        interval: TimeInterval,
    ) -> Self {
        Self {
            store,
            keyspace,
            value_filter: None,
            interval,
            scan: None,
            state: IteratorState::Unpositioned,
            closed: false,
        }
    }

    /// Restricts the iterator to one column value.
    pub fn with_value(mut self, value: Value) -> Self {
        self.value_filter = Some(value);
        self
    }

    /// Returns the current state.
    pub fn state(&self) -> &IteratorState {
        &self.state
    }

    /// Returns the time interval the iterator is restricted to.
    pub fn time_interval(&self) -> TimeInterval {
        self.interval
    }

    fn base_range(&self) -> KeyRange {
        match &self.value_filter {
            Some(value) => self.keyspace.value_range(value),
            None => self.keyspace.range(),
        }
    }

    fn check_open(&self) -> StorageResult<()> {
        if self.closed {
            Err(StorageError::Closed("histogram iterator"))
        } else {
            Ok(())
        }
    }

    /// Reads the next interval of the open scan that overlaps the time
    /// interval.
    fn advance(&mut self) -> StorageResult<Option<HistogramInterval>> {
        let Some(scan) = self.scan.as_mut() else {
            return Ok(None);
        };
        for entry in scan.by_ref() {
            let interval = self.keyspace.decode(&entry)?;
            if self.interval.overlaps(interval.start(), interval.stop()) {
                return Ok(Some(interval));
            }
        }
        // Release the cursor as soon as the scan is done.
        self.scan = None;
        Ok(None)
    }

    fn set_position(&mut self, next: Option<HistogramInterval>) {
        self.state = match next {
            Some(interval) => IteratorState::Positioned(interval),
            None => {
                self.scan = None;
                IteratorState::Exhausted
            }
        };
    }

    fn ensure_positioned(&mut self) -> StorageResult<()> {
        if self.state != IteratorState::Unpositioned {
            return Ok(());
        }
        self.scan = Some(self.store.scan(self.base_range())?);
        let next = self.advance()?;
        self.set_position(next);
        Ok(())
    }

    /// Returns true if another interval is available.
    ///
    /// Always false once the iterator is closed.
    pub fn has_next(&mut self) -> StorageResult<bool> {
        if self.closed {
            return Ok(false);
        }
        self.ensure_positioned()?;
        Ok(matches!(self.state, IteratorState::Positioned(_)))
    }

    /// Returns the next interval, or `None` when exhausted.
    pub fn next_interval(&mut self) -> StorageResult<Option<HistogramInterval>> {
        self.check_open()?;
        self.ensure_positioned()?;
        match std::mem::replace(&mut self.state, IteratorState::Exhausted) {
            IteratorState::Positioned(current) => {
                let next = self.advance()?;
                self.set_position(next);
                Ok(Some(current))
            }
            other => {
                self.state = other;
                Ok(None)
            }
        }
    }

    /// Positions the iterator at the first interval of `value` that ends
    /// after `time`.
    ///
    /// Iteration then continues in key order from that interval. If `value`
    /// has no interval ending after `time` the iterator is exhausted.
    pub fn seek(&mut self, value: &Value, time: i64) -> StorageResult<()> {
        self.check_open()?;
        self.scan = None;

        let value_range = self.keyspace.value_range(value);
        let range = self
            .base_range()
            .starting_at(self.keyspace.value_start(value));
        let mut scan = self.store.scan(range)?;

        let mut found = None;
        while let Some(entry) = scan.peek() {
            if !value_range.contains(&entry.key) {
                break;
            }
            let interval = self.keyspace.decode(entry)?;
            scan.next();
            if interval.stop() > time {
                found = Some(interval);
                break;
            }
        }

        let Some(first) = found else {
            debug!(value = %value, time, "seek found no later interval");
            self.set_position(None);
            return Ok(());
        };
        trace!(interval = %first, "seek positioned");

        self.scan = Some(scan);
        let next = if self.interval.overlaps(first.start(), first.stop()) {
            Some(first)
        } else {
            self.advance()?
        };
        self.set_position(next);
        Ok(())
    }

    /// Releases the store cursor. Calling it again does nothing.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.scan = None;
        self.state = IteratorState::Exhausted;
        trace!("closed histogram iterator");
    }
}

impl Iterator for HistogramIterator {
    type Item = StorageResult<HistogramInterval>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.closed {
            return None;
        }
        self.next_interval().transpose()
    }
}

impl Drop for HistogramIterator {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::histogram::HistogramBuilder;
    use crate::schema::TupleSchema;
    use crate::tuple::Tuple;
    use crate::types::DataType;
    use telarch_common::constants::DEFAULT_MERGE_GAP_MS;
    use telarch_kv::MemKvStore;

    const T1: i64 = 100_000_000_000;

    fn keyspace() -> HistogramKeyspace {
        HistogramKeyspace::new(1, 2)
    }

    fn populate(samples: &[(i64, &str)]) -> Arc<MemKvStore> {
        let store = Arc::new(MemKvStore::new());
        let schema = Arc::new(
            TupleSchema::empty()
                .with_column("gentime", DataType::Timestamp)
                .unwrap()
                .with_column("name", DataType::String)
                .unwrap(),
        );
        let mut builder = HistogramBuilder::new(
            Arc::clone(&store) as Arc<dyn KvStore>,
            keyspace(),
            "name",
            "gentime",
            DEFAULT_MERGE_GAP_MS,
        );
        for (t, name) in samples {
            let tuple = Tuple::new(
                Arc::clone(&schema),
                vec![Value::Timestamp(*t), Value::string(*name)],
            )
            .unwrap();
            builder.on_tuple(&tuple).unwrap();
        }
        builder.close().unwrap();
        store
    }

    fn p1_samples() -> Arc<MemKvStore> {
        populate(&[
            (1000, "p1"),
            (2000, "p1"),
            (40_000, "p1"),
            (40_001, "p1"),
            (T1, "p1"),
        ])
    }

    fn iter(store: &Arc<MemKvStore>, interval: TimeInterval) -> HistogramIterator {
        HistogramIterator::new(Arc::clone(store) as Arc<dyn KvStore>, keyspace(), interval)
    }

    fn collect(it: &mut HistogramIterator) -> Vec<(i64, i64)> {
        it.map(|r| r.map(|i| (i.start(), i.stop())))
            .collect::<StorageResult<_>>()
            .unwrap()
    }

    #[test]
    fn test_full_scan() {
        let store = p1_samples();
        let mut it = iter(&store, TimeInterval::unbounded());
        assert_eq!(it.state(), &IteratorState::Unpositioned);
        assert_eq!(
            collect(&mut it),
            vec![(1000, 2000), (40_000, 40_001), (T1, T1)]
        );
        assert!(!it.has_next().unwrap());
        assert_eq!(it.state(), &IteratorState::Exhausted);
        assert_eq!(store.open_scans(), 0);
    }

    #[test]
    fn test_seek_skips_finished_intervals() {
        let store = p1_samples();
        let mut it = iter(&store, TimeInterval::unbounded());
        it.seek(&Value::string("p1"), 2000).unwrap();
        assert_eq!(collect(&mut it), vec![(40_000, 40_001), (T1, T1)]);
    }

    #[test]
    fn test_seek_inside_interval_returns_it_whole() {
        let store = p1_samples();
        let mut it = iter(&store, TimeInterval::unbounded());
        it.seek(&Value::string("p1"), 40_000).unwrap();
        assert_eq!(collect(&mut it), vec![(40_000, 40_001), (T1, T1)]);
    }

    #[test]
    fn test_seek_past_everything() {
        let store = p1_samples();
        let mut it = iter(&store, TimeInterval::unbounded());
        it.seek(&Value::string("p1"), T1 + 1).unwrap();
        assert!(!it.has_next().unwrap());
        assert_eq!(collect(&mut it), vec![]);
        assert_eq!(store.open_scans(), 0);
    }

    #[test]
    fn test_seek_continues_into_later_values() {
        let store = populate(&[(1000, "a"), (5000, "b"), (90_000, "b"), (7000, "c")]);
        let mut it = iter(&store, TimeInterval::unbounded());
        it.seek(&Value::string("b"), 6000).unwrap();
        let values: Vec<_> = it
            .map(|r| r.unwrap())
            .map(|i| (i.value().to_string(), i.start()))
            .collect();
        assert_eq!(values, vec![("b".to_string(), 90_000), ("c".to_string(), 7000)]);
    }

    #[test]
    fn test_seek_unknown_value_exhausts() {
        let store = p1_samples();
        let mut it = iter(&store, TimeInterval::unbounded());
        it.seek(&Value::string("zz"), 0).unwrap();
        assert_eq!(it.state(), &IteratorState::Exhausted);
    }

    #[test]
    fn test_time_interval_filter() {
        let store = p1_samples();
        let mut it = iter(&store, TimeInterval::new(1500, 40_000));
        assert_eq!(collect(&mut it), vec![(1000, 2000), (40_000, 40_001)]);

        let mut it = iter(&store, TimeInterval::starting_at(40_002));
        assert_eq!(collect(&mut it), vec![(T1, T1)]);

        let mut it = iter(&store, TimeInterval::ending_at(999));
        assert!(collect(&mut it).is_empty());
    }

    #[test]
    fn test_value_filter() {
        let store = populate(&[(1000, "p1"), (1000, "p10"), (1000, "p2")]);
        let mut it = iter(&store, TimeInterval::unbounded()).with_value(Value::string("p1"));
        let intervals: Vec<_> = it.by_ref().map(|r| r.unwrap()).collect();
        assert_eq!(intervals.len(), 1);
        assert_eq!(intervals[0].value(), &Value::string("p1"));
    }

    #[test]
    fn test_close() {
        let store = p1_samples();
        let mut it = iter(&store, TimeInterval::unbounded());
        assert!(it.has_next().unwrap());
        assert_eq!(store.open_scans(), 1);

        it.close();
        it.close();
        assert_eq!(store.open_scans(), 0);
        assert!(!it.has_next().unwrap());
        assert!(it.next().is_none());
        assert!(matches!(
            it.seek(&Value::string("p1"), 0),
            Err(StorageError::Closed(_))
        ));
    }

    #[test]
    fn test_drop_releases_cursor() {
        let store = p1_samples();
        {
            let mut it = iter(&store, TimeInterval::unbounded());
            assert!(it.next().is_some());
            assert_eq!(store.open_scans(), 1);
        }
        assert_eq!(store.open_scans(), 0);
    }
}
