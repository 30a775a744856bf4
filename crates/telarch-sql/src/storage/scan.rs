//! Table scans with filter pushdown.

use std::sync::Arc;

use tracing::debug;

use telarch_kv::{KeyRange, KvScan, KvStore};

use crate::expr::{ColumnFilter, CompiledEvaluator, ComparisonOp, FilterableTarget};
use crate::tuple::Tuple;

use super::encoder::TupleEncoder;
use super::error::StorageResult;
use super::table::TableDefinition;

/// Scans the tuples of one table in primary key order.
///
/// Pushed-down column filters are applied to every tuple; filters on the
/// first primary key column also narrow the key range read from the store.
/// A residual evaluator, if set, must return `true` for a tuple to pass.
///
/// Errors are reported per tuple: a failing tuple yields `Err` and the scan
/// goes on with the next one.
#[derive(Debug)]
pub struct TableScan {
    table: Arc<TableDefinition>,
    store: Arc<dyn KvStore>,
    encoder: TupleEncoder,
    filters: Vec<ColumnFilter>,
    residual: Option<CompiledEvaluator>,
    cursor: Option<KvScan>,
    finished: bool,
}

impl TableScan {
    /// Creates an unfiltered scan of `table`.
    pub fn new(table: Arc<TableDefinition>, store: Arc<dyn KvStore>) -> Self {
        Self {
            encoder: TupleEncoder::new(&table),
            table,
            store,
            filters: Vec::new(),
            residual: None,
            cursor: None,
            finished: false,
        }
    }

    /// Sets the condition evaluated after the pushed-down filters.
    pub fn set_residual(&mut self, residual: CompiledEvaluator) {
        self.residual = Some(residual);
    }

    /// Returns the filters taken by the scan.
    pub fn filters(&self) -> &[ColumnFilter] {
        &self.filters
    }

    /// Returns true if a residual condition is set.
    pub fn has_residual(&self) -> bool {
        self.residual.is_some()
    }

    /// The key range the scan reads.
    pub fn key_range(&self) -> KeyRange {
        let mut range = self.encoder.table_range();
        let Some(leading) = self.table.primary_key().first() else {
            return range;
        };
        let Some(column) = self.table.schema().column_by_name(leading) else {
            return range;
        };

        for filter in self.filters.iter().filter(|f| f.column() == leading) {
            // A value that does not convert to the column type cannot be
            // placed in key order; the filter still applies per tuple.
            let Some(value) = filter.value().cast_to(column.data_type()) else {
                continue;
            };
            let key = self.encoder.leading_key(&value);
            let after = key.prefix_end();
            range = match filter.op() {
                ComparisonOp::Eq => {
                    let range = range.starting_at(key);
                    match after {
                        Some(end) => range.ending_before(end),
                        None => range,
                    }
                }
                ComparisonOp::Gt => match after {
                    Some(start) => range.starting_at(start),
                    None => range,
                },
                ComparisonOp::GtEq => range.starting_at(key),
                ComparisonOp::Lt => range.ending_before(key),
                ComparisonOp::LtEq => match after {
                    Some(end) => range.ending_before(end),
                    None => range,
                },
                ComparisonOp::NotEq => range,
            };
        }
        range
    }

    /// Releases the store cursor. The scan returns nothing afterwards.
    pub fn close(&mut self) {
        self.cursor = None;
        self.finished = true;
    }

    fn accept(&self, tuple: &Tuple) -> StorageResult<bool> {
        for filter in &self.filters {
            if !filter.matches(tuple)? {
                return Ok(false);
            }
        }
        match &self.residual {
            Some(residual) => Ok(residual.matches(tuple)?),
            None => Ok(true),
        }
    }

    fn open(&mut self) -> StorageResult<()> {
        let range = self.key_range();
        debug!(
            table = %self.table.name(),
            filters = self.filters.len(),
            empty = range.is_empty(),
            "opening table scan"
        );
        if range.is_empty() {
            self.finished = true;
            return Ok(());
        }
        self.cursor = Some(self.store.scan(range)?);
        Ok(())
    }
}

impl FilterableTarget for TableScan {
    fn add_column_filter(&mut self, filter: &ColumnFilter) -> bool {
        if !self.table.schema().has_column(filter.column()) {
            return false;
        }
        self.filters.push(filter.clone());
        true
    }
}

impl Iterator for TableScan {
    type Item = StorageResult<Tuple>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        if self.cursor.is_none() {
            if let Err(e) = self.open() {
                self.finished = true;
                return Some(Err(e));
            }
        }

        loop {
            let Some(entry) = self.cursor.as_mut().and_then(|c| c.next()) else {
                self.close();
                return None;
            };
            let tuple = match self.encoder.decode(&entry.value) {
                Ok(tuple) => tuple,
                Err(e) => return Some(Err(e)),
            };
            match self.accept(&tuple) {
                Ok(true) => return Some(Ok(tuple)),
                Ok(false) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
