//! Storage engine for managing all tables.
//!
//! `StorageEngine` is the entry point of the archive: it registers tables,
//! hands out writers, histogram iterators and table scans, and compiles
//! expressions against table schemas.

use std::sync::Arc;

use tracing::{debug, info};

use telarch_common::config::ArchiveConfig;
use telarch_common::types::TimeInterval;
use telarch_kv::{KeyRange, KvStore, MemKvStore};

use crate::expr::{CompiledEvaluator, ExprError, ExpressionNode};
use crate::histogram::HistogramIterator;
use crate::types::DataType;

use super::catalog::Catalog;
use super::encoder::TupleEncoder;
use super::error::{StorageError, StorageResult};
use super::scan::TableScan;
use super::table::TableDefinition;
use super::writer::{InsertMode, TableWriter};

/// Storage engine that manages all tables.
#[derive(Debug)]
pub struct StorageEngine {
    store: Arc<dyn KvStore>,
    config: ArchiveConfig,
    catalog: Catalog,
}

impl StorageEngine {
    /// Creates an engine over `store`.
    pub fn new(store: Arc<dyn KvStore>, config: ArchiveConfig) -> StorageResult<Self> {
        config.validate()?;
        Ok(Self {
            store,
            config,
            catalog: Catalog::new(),
        })
    }

    /// Creates an engine over a fresh in-memory store.
    pub fn in_memory(config: ArchiveConfig) -> StorageResult<Self> {
        let store = Arc::new(MemKvStore::with_limits(config.storage.clone()));
        Self::new(store, config)
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.store
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ArchiveConfig {
        &self.config
    }

    // =========================================================================
    // Tables
    // =========================================================================

    /// Creates a table and returns its registered definition.
    pub fn create_table(&self, definition: TableDefinition) -> StorageResult<Arc<TableDefinition>> {
        let table = self.catalog.create_table(definition)?;
        info!(
            table = %table.name(),
            table_id = table.table_id(),
            histograms = ?table.histogram_columns(),
            "created table"
        );
        Ok(table)
    }

    /// Drops a table and deletes its tuples and histograms.
    pub fn drop_table(&self, name: &str) -> StorageResult<()> {
        let table = self.catalog.drop_table(name)?;

        let mut ranges = vec![TupleEncoder::new(&table).table_range()];
        ranges.extend(
            table
                .histogram_columns()
                .iter()
                .filter_map(|c| table.histogram_keyspace(c))
                .map(|keyspace| keyspace.range()),
        );
        let mut deleted = 0usize;
        for range in ranges {
            deleted += self.delete_range(range)?;
        }

        info!(table = %name, records = deleted, "dropped table");
        Ok(())
    }

    fn delete_range(&self, range: KeyRange) -> StorageResult<usize> {
        let mut deleted = 0;
        for entry in self.store.scan(range)? {
            if self.store.delete(&entry.key)? {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    /// Returns a table definition.
    pub fn table(&self, name: &str) -> StorageResult<Arc<TableDefinition>> {
        self.catalog.get(name)
    }

    /// Lists all table names in order.
    pub fn list_tables(&self) -> Vec<String> {
        self.catalog.list_tables()
    }

    // =========================================================================
    // Writing
    // =========================================================================

    /// Opens the writer of a table.
    ///
    /// Only one writer can be open per table; a second call fails with
    /// [`StorageError::WriterBusy`] until the first writer is closed.
    pub fn open_table_writer(&self, name: &str, mode: InsertMode) -> StorageResult<TableWriter> {
        let (table, slot) = self.catalog.acquire_writer(name)?;
        info!(table = %name, mode = ?mode, "opened table writer");
        Ok(TableWriter::new(
            table,
            Arc::clone(&self.store),
            mode,
            self.config.histogram.merge_gap_ms,
            slot,
        ))
    }

    // =========================================================================
    // Reading
    // =========================================================================

    /// Opens an iterator over the histogram of `column`.
    pub fn get_histogram_iterator(
        &self,
        table: &str,
        column: &str,
        interval: TimeInterval,
    ) -> StorageResult<HistogramIterator> {
        let definition = self.table(table)?;
        if !definition.schema().has_column(column) {
            return Err(StorageError::ColumnNotFound(column.to_string()));
        }
        let keyspace = definition
            .histogram_keyspace(column)
            .ok_or_else(|| StorageError::NotIndexed {
                table: table.to_string(),
                column: column.to_string(),
            })?;
        Ok(HistogramIterator::new(
            Arc::clone(&self.store),
            keyspace,
            interval,
        ))
    }

    /// Binds `expr` to the schema of `table` and compiles it.
    pub fn compile_query(
        &self,
        table: &str,
        mut expr: ExpressionNode,
    ) -> StorageResult<CompiledEvaluator> {
        let definition = self.table(table)?;
        expr.bind(definition.schema())?;
        Ok(expr.compile()?)
    }

    /// Scans `table`, keeping the tuples for which `filter` is true.
    ///
    /// The filter's `column <op> constant` conditions are pushed into the
    /// scan; whatever remains is compiled and evaluated per tuple.
    pub fn select(&self, table: &str, filter: Option<ExpressionNode>) -> StorageResult<TableScan> {
        let definition = self.table(table)?;
        let mut scan = TableScan::new(Arc::clone(&definition), Arc::clone(&self.store));
        let Some(mut filter) = filter else {
            return Ok(scan);
        };

        filter.bind(definition.schema())?;
        if filter.has_aggregates() {
            return Err(ExprError::type_error("aggregates are not allowed in a filter").into());
        }
        if filter.data_type() != Some(DataType::Boolean) {
            return Err(ExprError::type_error(format!(
                "filter {} is not a boolean expression",
                filter
            ))
            .into());
        }

        if let Some(residual) = filter.add_filter(&mut scan)? {
            debug!(table = %table, residual = %residual, "compiled residual filter");
            scan.set_residual(residual.compile()?);
        }
        Ok(scan)
    }
}
