//! Table writers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use telarch_kv::KvStore;

use crate::histogram::HistogramBuilder;
use crate::tuple::Tuple;
use crate::types::Value;

use super::encoder::TupleEncoder;
use super::error::{StorageError, StorageResult};
use super::table::TableDefinition;

/// How a write treats a tuple whose key is already stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InsertMode {
    /// Rejects the tuple with [`StorageError::DuplicateKey`].
    #[default]
    Insert,
    /// Replaces the stored tuple.
    Upsert,
    /// Fills only the columns the stored tuple has no value for.
    InsertAppend,
    /// Overwrites stored columns with the tuple's non-null values.
    UpsertAppend,
}

/// Exclusive right to write one table. Released on drop.
#[derive(Debug)]
pub(crate) struct WriterSlot {
    busy: Arc<AtomicBool>,
}

impl WriterSlot {
    /// Takes the slot, or returns `None` if another writer holds it.
    pub(crate) fn acquire(busy: &Arc<AtomicBool>) -> Option<Self> {
        busy.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self {
                busy: Arc::clone(busy),
            })
    }
}

impl Drop for WriterSlot {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

/// Writes tuples to one table and keeps its histograms up to date.
///
/// At most one writer is open per table. The slot is released by
/// [`close`](Self::close) or when the writer is dropped.
#[derive(Debug)]
pub struct TableWriter {
    table: Arc<TableDefinition>,
    store: Arc<dyn KvStore>,
    encoder: TupleEncoder,
    mode: InsertMode,
    builders: Vec<HistogramBuilder>,
    slot: Option<WriterSlot>,
    written: u64,
}

impl TableWriter {
    pub(crate) fn new(
        table: Arc<TableDefinition>,
        store: Arc<dyn KvStore>,
        mode: InsertMode,
        merge_gap: i64,
        slot: WriterSlot,
    ) -> Self {
        let builders = table
            .histogram_columns()
            .iter()
            .filter_map(|column| {
                let keyspace = table.histogram_keyspace(column)?;
                Some(HistogramBuilder::new(
                    Arc::clone(&store),
                    keyspace,
                    column.as_str(),
                    table.time_column(),
                    merge_gap,
                ))
            })
            .collect();
        Self {
            encoder: TupleEncoder::new(&table),
            table,
            store,
            mode,
            builders,
            slot: Some(slot),
            written: 0,
        }
    }

    /// Returns the table being written.
    pub fn table(&self) -> &TableDefinition {
        &self.table
    }

    /// Returns the insert mode.
    pub fn mode(&self) -> InsertMode {
        self.mode
    }

    /// Number of tuples stored by this writer.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Returns true once the writer is closed.
    pub fn is_closed(&self) -> bool {
        self.slot.is_none()
    }

    /// Writes one tuple.
    ///
    /// The tuple may carry any subset of the table's columns; missing ones
    /// are stored as null. Histograms are fed only after the raw write
    /// succeeded, and only with values that changed the stored tuple.
    ///
    /// If a histogram update fails, the previous raw record is restored and
    /// the error returned, so the same tuple can be written again. Histograms
    /// updated before the failing one keep the sample.
    pub fn write(&mut self, tuple: &Tuple) -> StorageResult<()> {
        if self.is_closed() {
            return Err(StorageError::Closed("table writer"));
        }

        let tuple = self.conform(tuple)?;
        let key = self.encoder.encode_key(&tuple)?;
        let previous = self.store.get(&key)?;
        let existing = match &previous {
            Some(stored) => Some(self.encoder.decode(stored)?),
            None => None,
        };

        let (stored, indexed) = match existing {
            None => (tuple.clone(), tuple),
            Some(_) if self.mode == InsertMode::Insert => {
                return Err(StorageError::DuplicateKey(self.table.name().to_string()))
            }
            Some(existing) => {
                let merged = match self.mode {
                    InsertMode::InsertAppend => merge(&existing, &tuple, false)?,
                    InsertMode::UpsertAppend => merge(&existing, &tuple, true)?,
                    _ => tuple,
                };
                if merged == existing {
                    debug!(table = %self.table.name(), "tuple already stored");
                    return Ok(());
                }
                let changes = self.changes(&existing, &merged)?;
                (merged, changes)
            }
        };

        self.store.put(key.clone(), self.encoder.encode_value(&stored))?;

        for builder in &mut self.builders {
            if let Err(e) = builder.on_tuple(&indexed) {
                warn!(
                    table = %self.table.name(),
                    column = %builder.column(),
                    error = %e,
                    "histogram update failed, restoring tuple"
                );
                match previous {
                    Some(record) => self.store.put(key, record)?,
                    None => {
                        self.store.delete(&key)?;
                    }
                }
                return Err(e);
            }
        }
        self.written += 1;
        Ok(())
    }

    /// Closes every histogram builder and releases the writer slot.
    ///
    /// Returns the first builder error. Calling it again does nothing.
    pub fn close(&mut self) -> StorageResult<()> {
        let Some(slot) = self.slot.take() else {
            return Ok(());
        };

        let mut first_error = None;
        for builder in &mut self.builders {
            if let Err(e) = builder.close() {
                warn!(column = %builder.column(), error = %e, "failed to close histogram builder");
                first_error.get_or_insert(e);
            }
        }
        drop(slot);

        info!(
            table = %self.table.name(),
            written = self.written,
            "closed table writer"
        );
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Rebuilds `tuple` over the table schema, matching columns by name and
    /// converting values to the column types.
    fn conform(&self, tuple: &Tuple) -> StorageResult<Tuple> {
        let schema = self.table.schema();
        let same_layout = Arc::ptr_eq(tuple.schema(), schema) || **tuple.schema() == **schema;
        if !same_layout {
            if let Some(column) = tuple
                .schema()
                .columns()
                .iter()
                .find(|c| !schema.has_column(c.name()))
            {
                return Err(StorageError::InvalidTuple(format!(
                    "table {} has no column {}",
                    self.table.name(),
                    column.name()
                )));
            }
        }

        let mut values = Vec::with_capacity(schema.len());
        for (i, column) in schema.columns().iter().enumerate() {
            let value = if same_layout {
                tuple.get(i)
            } else {
                tuple.column(column.name())
            };
            let value = match value {
                None | Some(Value::Null) => Value::Null,
                Some(v) => v.cast_to(column.data_type()).ok_or_else(|| {
                    StorageError::InvalidTuple(format!(
                        "column {} expects {}, got {}",
                        column.name(),
                        column.data_type(),
                        v
                    ))
                })?,
            };
            values.push(value);
        }
        Ok(Tuple::new(Arc::clone(schema), values)?)
    }

    /// The values of `merged` that differ from `existing`, timed like it.
    fn changes(&self, existing: &Tuple, merged: &Tuple) -> StorageResult<Tuple> {
        let time_index = self.table.schema().index_of(self.table.time_column());
        let values = existing
            .values()
            .iter()
            .zip(merged.values())
            .enumerate()
            .map(|(i, (old, new))| {
                if Some(i) == time_index || old != new {
                    new.clone()
                } else {
                    Value::Null
                }
            })
            .collect();
        Ok(Tuple::new(Arc::clone(merged.schema()), values)?)
    }
}

/// Combines a stored tuple with an incoming one of the same schema.
///
/// With `overwrite` the incoming non-null values win; otherwise only the
/// stored nulls are filled.
fn merge(existing: &Tuple, incoming: &Tuple, overwrite: bool) -> StorageResult<Tuple> {
    let values = existing
        .values()
        .iter()
        .zip(incoming.values())
        .map(|(old, new)| {
            let take_new = !new.is_null() && (overwrite || old.is_null());
            if take_new {
                new.clone()
            } else {
                old.clone()
            }
        })
        .collect();
    Ok(Tuple::new(Arc::clone(existing.schema()), values)?)
}

impl Drop for TableWriter {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(table = %self.table.name(), error = %e, "error closing dropped table writer");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::TupleSchema;
    use crate::types::DataType;
    use telarch_common::constants::{DEFAULT_MERGE_GAP_MS, HISTOGRAM_KEYSPACE_TAG};
    use telarch_common::error::{ArchiveError, ArchiveResult};
    use telarch_common::types::{Key, Value as KvValue};
    use telarch_kv::{KeyRange, KvScan, MemKvStore};

    fn table() -> Arc<TableDefinition> {
        let schema = TupleSchema::empty()
            .with_column("gentime", DataType::Timestamp)
            .unwrap()
            .with_column("name", DataType::String)
            .unwrap()
            .with_column("raw", DataType::Int)
            .unwrap();
        Arc::new(
            TableDefinition::new("pp", schema, "gentime")
                .with_histogram("name")
                .with_table_id(1),
        )
    }

    fn writer(store: &Arc<MemKvStore>, mode: InsertMode) -> (TableWriter, Arc<AtomicBool>) {
        let busy = Arc::new(AtomicBool::new(false));
        let slot = WriterSlot::acquire(&busy).unwrap();
        let writer = TableWriter::new(
            table(),
            Arc::clone(store) as Arc<dyn KvStore>,
            mode,
            DEFAULT_MERGE_GAP_MS,
            slot,
        );
        (writer, busy)
    }

    fn row(w: &TableWriter, t: i64, name: Option<&str>, raw: Option<i32>) -> Tuple {
        Tuple::new(
            Arc::clone(w.table().schema()),
            vec![
                Value::Timestamp(t),
                name.map_or(Value::Null, Value::string),
                raw.map_or(Value::Null, Value::Int),
            ],
        )
        .unwrap()
    }

    fn stored(store: &MemKvStore, t: i64) -> Tuple {
        let encoder = TupleEncoder::new(&table());
        let key = encoder
            .encode_key(
                &Tuple::new(
                    Arc::clone(encoder.schema()),
                    vec![Value::Timestamp(t), Value::Null, Value::Null],
                )
                .unwrap(),
            )
            .unwrap();
        encoder.decode(&store.get(&key).unwrap().unwrap()).unwrap()
    }

    fn histogram(store: &MemKvStore) -> Vec<(i64, i64, u32)> {
        let keyspace = table().histogram_keyspace("name").unwrap();
        store
            .scan(keyspace.range())
            .unwrap()
            .map(|e| {
                let i = keyspace.decode(&e).unwrap();
                (i.start(), i.stop(), i.count())
            })
            .collect()
    }

    #[test]
    fn test_slot_is_exclusive() {
        let busy = Arc::new(AtomicBool::new(false));
        let slot = WriterSlot::acquire(&busy).unwrap();
        assert!(WriterSlot::acquire(&busy).is_none());
        drop(slot);
        assert!(WriterSlot::acquire(&busy).is_some());
    }

    #[test]
    fn test_insert_rejects_duplicates() {
        let store = Arc::new(MemKvStore::new());
        let (mut w, _) = writer(&store, InsertMode::Insert);
        w.write(&row(&w, 1000, Some("p1"), Some(1))).unwrap();
        let dup = row(&w, 1000, Some("p2"), Some(2));
        assert!(matches!(w.write(&dup), Err(StorageError::DuplicateKey(_))));
        assert_eq!(stored(&store, 1000).column("name"), Some(&Value::string("p1")));
        // The rejected tuple never reaches the histogram.
        assert_eq!(histogram(&store), vec![(1000, 1000, 1)]);
        assert_eq!(w.written(), 1);
    }

    #[test]
    fn test_upsert_replaces() {
        let store = Arc::new(MemKvStore::new());
        let (mut w, _) = writer(&store, InsertMode::Upsert);
        w.write(&row(&w, 1000, Some("p1"), Some(1))).unwrap();
        w.write(&row(&w, 1000, None, Some(2))).unwrap();
        let t = stored(&store, 1000);
        assert_eq!(t.column("name"), Some(&Value::Null));
        assert_eq!(t.column("raw"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_insert_append_fills_missing_columns() {
        let store = Arc::new(MemKvStore::new());
        let (mut w, _) = writer(&store, InsertMode::InsertAppend);
        w.write(&row(&w, 1000, None, Some(1))).unwrap();
        w.write(&row(&w, 1000, Some("p1"), Some(9))).unwrap();
        let t = stored(&store, 1000);
        assert_eq!(t.column("name"), Some(&Value::string("p1")));
        assert_eq!(t.column("raw"), Some(&Value::Int(1)));
        assert_eq!(histogram(&store), vec![(1000, 1000, 1)]);

        // Nothing new: no write, no histogram sample.
        w.write(&row(&w, 1000, Some("p1"), None)).unwrap();
        assert_eq!(w.written(), 2);
        assert_eq!(histogram(&store), vec![(1000, 1000, 1)]);
    }

    #[test]
    fn test_upsert_append_overwrites_present_columns() {
        let store = Arc::new(MemKvStore::new());
        let (mut w, _) = writer(&store, InsertMode::UpsertAppend);
        w.write(&row(&w, 1000, Some("p1"), Some(1))).unwrap();
        w.write(&row(&w, 1000, None, Some(2))).unwrap();
        let t = stored(&store, 1000);
        assert_eq!(t.column("name"), Some(&Value::string("p1")));
        assert_eq!(t.column("raw"), Some(&Value::Int(2)));
        // Only the raw column changed, so the histogram saw one sample.
        assert_eq!(histogram(&store), vec![(1000, 1000, 1)]);
    }

    #[test]
    fn test_sparse_tuple_is_conformed() {
        let store = Arc::new(MemKvStore::new());
        let (mut w, _) = writer(&store, InsertMode::Insert);
        let sparse_schema = Arc::new(
            TupleSchema::empty()
                .with_column("name", DataType::String)
                .unwrap()
                .with_column("gentime", DataType::Long)
                .unwrap(),
        );
        let sparse = Tuple::new(sparse_schema, vec![Value::string("p1"), Value::Long(5)]).unwrap();
        w.write(&sparse).unwrap();
        let t = stored(&store, 5);
        assert_eq!(t.column("raw"), Some(&Value::Null));
        assert_eq!(histogram(&store), vec![(5, 5, 1)]);

        let foreign = Arc::new(TupleSchema::empty().with_column("x", DataType::Int).unwrap());
        let foreign = Tuple::new(foreign, vec![Value::Int(1)]).unwrap();
        assert!(matches!(w.write(&foreign), Err(StorageError::InvalidTuple(_))));
    }

    #[test]
    fn test_missing_time_rejected() {
        let store = Arc::new(MemKvStore::new());
        let (mut w, _) = writer(&store, InsertMode::Insert);
        let t = Tuple::new(
            Arc::clone(w.table().schema()),
            vec![Value::Null, Value::string("p1"), Value::Null],
        )
        .unwrap();
        assert!(matches!(w.write(&t), Err(StorageError::InvalidTuple(_))));
        assert!(store.is_empty());
    }

    #[test]
    fn test_close_releases_slot() {
        let store = Arc::new(MemKvStore::new());
        let (mut w, busy) = writer(&store, InsertMode::Insert);
        assert!(busy.load(Ordering::Acquire));
        w.close().unwrap();
        w.close().unwrap();
        assert!(!busy.load(Ordering::Acquire));
        assert!(w.is_closed());
        let late = row(&w, 1, None, None);
        assert!(matches!(w.write(&late), Err(StorageError::Closed(_))));
    }

    /// Refuses histogram writes while `broken` is set.
    #[derive(Debug, Default)]
    struct FlakyHistogramStore {
        inner: MemKvStore,
        broken: AtomicBool,
    }

    impl KvStore for FlakyHistogramStore {
        fn get(&self, key: &Key) -> ArchiveResult<Option<KvValue>> {
            self.inner.get(key)
        }

        fn put(&self, key: Key, value: KvValue) -> ArchiveResult<()> {
            if self.broken.load(Ordering::Acquire) && key.starts_with(&[HISTOGRAM_KEYSPACE_TAG]) {
                return Err(ArchiveError::unavailable("histogram keyspace offline"));
            }
            self.inner.put(key, value)
        }

        fn delete(&self, key: &Key) -> ArchiveResult<bool> {
            self.inner.delete(key)
        }

        fn scan(&self, range: KeyRange) -> ArchiveResult<KvScan> {
            self.inner.scan(range)
        }
    }

    #[test]
    fn test_failed_histogram_update_restores_tuple() {
        let store = Arc::new(FlakyHistogramStore::default());
        let busy = Arc::new(AtomicBool::new(false));
        let mut w = TableWriter::new(
            table(),
            Arc::clone(&store) as Arc<dyn KvStore>,
            InsertMode::Upsert,
            DEFAULT_MERGE_GAP_MS,
            WriterSlot::acquire(&busy).unwrap(),
        );
        w.write(&row(&w, 1000, Some("p1"), Some(1))).unwrap();

        store.broken.store(true, Ordering::Release);
        let fresh = row(&w, 2000, Some("p1"), Some(2));
        assert!(matches!(w.write(&fresh), Err(StorageError::Kv(_))));
        let changed = row(&w, 1000, Some("p2"), Some(3));
        assert!(matches!(w.write(&changed), Err(StorageError::Kv(_))));
        assert_eq!(w.written(), 1);
        assert_eq!(stored(&store.inner, 1000).column("raw"), Some(&Value::Int(1)));

        store.broken.store(false, Ordering::Release);
        w.write(&fresh).unwrap();
        w.write(&changed).unwrap();
        assert_eq!(w.written(), 3);
        assert_eq!(stored(&store.inner, 1000).column("name"), Some(&Value::string("p2")));
    }

    #[test]
    fn test_drop_releases_slot() {
        let store = Arc::new(MemKvStore::new());
        let (w, busy) = writer(&store, InsertMode::Insert);
        drop(w);
        assert!(!busy.load(Ordering::Acquire));
    }
}
