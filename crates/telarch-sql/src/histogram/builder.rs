//! Incremental histogram construction.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use telarch_kv::KvStore;

use crate::encoding::comparable_bytes;
use crate::storage::{StorageError, StorageResult};
use crate::tuple::Tuple;
use crate::types::Value;

use super::{HistogramInterval, HistogramKeyspace};

/// Maintains the histogram of one column while tuples are written.
///
/// Samples of the same value less than `merge_gap` apart are merged into one
/// interval. Every change is written through to the store as it happens, so
/// the store always holds the last committed state of each interval.
#[derive(Debug)]
pub struct HistogramBuilder {
    store: Arc<dyn KvStore>,
    keyspace: HistogramKeyspace,
    column: String,
    time_column: String,
    merge_gap: i64,
    /// The open interval of each value, keyed by its comparable encoding.
    open: HashMap<Vec<u8>, HistogramInterval>,
    closed: bool,
}

impl HistogramBuilder {
    /// Creates a builder for `column`, timed by `time_column`.
    pub fn new(
        store: Arc<dyn KvStore>,
        keyspace: HistogramKeyspace,
        column: impl Into<String>,
        time_column: impl Into<String>,
        merge_gap: i64,
    ) -> Self {
        Self {
            store,
            keyspace,
            column: column.into(),
            time_column: time_column.into(),
            merge_gap,
            open: HashMap::new(),
            closed: false,
        }
    }

    /// Returns the indexed column.
    pub fn column(&self) -> &str {
        &self.column
    }

    /// Number of values with an open interval.
    pub fn open_intervals(&self) -> usize {
        self.open.len()
    }

    /// Records one tuple.
    ///
    /// Tuples without a value in the indexed column are ignored. The time
    /// column must hold a timestamp.
    pub fn on_tuple(&mut self, tuple: &Tuple) -> StorageResult<()> {
        if self.closed {
            return Err(StorageError::Closed("histogram builder"));
        }

        let t = match tuple.column(&self.time_column) {
            Some(Value::Timestamp(t)) => *t,
            Some(Value::Null) | None => {
                return Err(StorageError::InvalidTuple(format!(
                    "missing time column {}",
                    self.time_column
                )))
            }
            Some(other) => {
                return Err(StorageError::InvalidTuple(format!(
                    "time column {} holds {}, not a timestamp",
                    self.time_column, other
                )))
            }
        };

        let value = match tuple.column(&self.column) {
            Some(v) if !v.is_null() => v.clone(),
            _ => {
                trace!(column = %self.column, "no value to index");
                return Ok(());
            }
        };

        let slot = comparable_bytes(&value);
        match self.open.get_mut(&slot) {
            Some(open)
                if t >= open.start() && t.saturating_sub(open.stop()) <= self.merge_gap =>
            {
                let mut next = open.clone();
                next.extend(t);
                write(self.store.as_ref(), &self.keyspace, &next)?;
                trace!(interval = %next, "extended interval");
                *open = next;
            }
            Some(open) if t < open.start() => {
                warn!(
                    column = %self.column,
                    value = %value,
                    time = t,
                    open_start = open.start(),
                    "out-of-order sample before the open interval"
                );
                let backfill = merge_point(self.store.as_ref(), &self.keyspace, value, t)?;
                write(self.store.as_ref(), &self.keyspace, &backfill)?;
            }
            _ => {
                let interval = merge_point(self.store.as_ref(), &self.keyspace, value, t)?;
                write(self.store.as_ref(), &self.keyspace, &interval)?;
                debug!(interval = %interval, "opened interval");
                if let Some(previous) = self.open.insert(slot, interval) {
                    debug!(interval = %previous, "closed interval");
                }
            }
        }
        Ok(())
    }

    /// Finalizes every open interval. Calling it again does nothing.
    pub fn close(&mut self) -> StorageResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        debug!(
            column = %self.column,
            intervals = self.open.len(),
            "closed histogram builder"
        );
        self.open.clear();
        Ok(())
    }
}

/// Returns the stored interval of `value` covering `t` with the sample
/// added, or a one-sample interval at `t` when none covers it.
fn merge_point(
    store: &dyn KvStore,
    keyspace: &HistogramKeyspace,
    value: Value,
    t: i64,
) -> StorageResult<HistogramInterval> {
    // the last record starting at or before t
    let mut range = keyspace.value_range(&value);
    if let Some(end) = keyspace.key(&value, t).prefix_end() {
        range = range.ending_before(end);
    }
    let preceding = match store.scan(range)?.last() {
        Some(entry) => Some(keyspace.decode(&entry)?),
        None => None,
    };
    match preceding {
        Some(mut covering) if covering.stop() >= t => {
            covering.extend(t);
            Ok(covering)
        }
        _ => Ok(HistogramInterval::point(value, t)),
    }
}

fn write(
    store: &dyn KvStore,
    keyspace: &HistogramKeyspace,
    interval: &HistogramInterval,
) -> StorageResult<()> {
    let (key, value) = keyspace.encode(interval);
    store.put(key, value)?;
    Ok(())
}
