//! Table definitions.

use std::sync::Arc;

use crate::histogram::HistogramKeyspace;
use crate::schema::TupleSchema;
use crate::types::DataType;

use super::error::{StorageError, StorageResult};

/// Definition of an archive table.
///
/// Tuples are keyed by the primary-key columns in order. The time column
/// times every sample fed to the table's histograms and must be part of the
/// primary key.
#[derive(Debug, Clone)]
pub struct TableDefinition {
    name: String,
    schema: Arc<TupleSchema>,
    time_column: String,
    primary_key: Vec<String>,
    histogram_columns: Vec<String>,
    /// Assigned by the engine when the table is created.
    table_id: u64,
}

impl TableDefinition {
    /// Creates a definition timed by `time_column`, keyed by it alone.
    pub fn new(
        name: impl Into<String>,
        schema: TupleSchema,
        time_column: impl Into<String>,
    ) -> Self {
        let time_column = time_column.into();
        Self {
            name: name.into(),
            schema: Arc::new(schema),
            primary_key: vec![time_column.clone()],
            time_column,
            histogram_columns: Vec::new(),
            table_id: 0,
        }
    }

    /// Sets the primary key columns.
    pub fn with_primary_key<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_key = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Adds a histogram on `column`.
    pub fn with_histogram(mut self, column: impl Into<String>) -> Self {
        let column = column.into();
        if !self.histogram_columns.contains(&column) {
            self.histogram_columns.push(column);
        }
        self
    }

    pub(crate) fn with_table_id(mut self, table_id: u64) -> Self {
        self.table_id = table_id;
        self
    }

    /// Returns the table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the schema shared by every tuple of the table.
    pub fn schema(&self) -> &Arc<TupleSchema> {
        &self.schema
    }

    /// Returns the time column.
    pub fn time_column(&self) -> &str {
        &self.time_column
    }

    /// Returns the primary key columns.
    pub fn primary_key(&self) -> &[String] {
        &self.primary_key
    }

    /// Returns the columns with a histogram.
    pub fn histogram_columns(&self) -> &[String] {
        &self.histogram_columns
    }

    /// Returns the table ID.
    pub fn table_id(&self) -> u64 {
        self.table_id
    }

    /// Returns true if `column` has a histogram.
    pub fn has_histogram(&self, column: &str) -> bool {
        self.histogram_columns.iter().any(|c| c == column)
    }

    /// Schema positions of the primary key columns.
    pub fn primary_key_indices(&self) -> Vec<usize> {
        self.primary_key
            .iter()
            .filter_map(|c| self.schema.index_of(c))
            .collect()
    }

    /// Histogram keyspace of `column`, if it is indexed.
    pub fn histogram_keyspace(&self, column: &str) -> Option<HistogramKeyspace> {
        if !self.has_histogram(column) {
            return None;
        }
        let ordinal = self.schema.index_of(column)?;
        u32::try_from(ordinal)
            .ok()
            .map(|ordinal| HistogramKeyspace::new(self.table_id, ordinal))
    }

    /// Checks that the definition is usable.
    pub fn validate(&self) -> StorageResult<()> {
        if self.name.is_empty() {
            return Err(invalid("table name is empty"));
        }

        match self.schema.column_by_name(&self.time_column) {
            Some(c) if c.data_type() == DataType::Timestamp => {}
            Some(c) => {
                return Err(invalid(format!(
                    "time column {} is {}, not timestamp",
                    c.name(),
                    c.data_type()
                )))
            }
            None => return Err(StorageError::ColumnNotFound(self.time_column.clone())),
        }

        if !self.primary_key.contains(&self.time_column) {
            return Err(invalid(format!(
                "time column {} must be part of the primary key",
                self.time_column
            )));
        }
        for (i, column) in self.primary_key.iter().enumerate() {
            if !self.schema.has_column(column) {
                return Err(StorageError::ColumnNotFound(column.clone()));
            }
            if self.primary_key[..i].contains(column) {
                return Err(invalid(format!("{} appears twice in the primary key", column)));
            }
        }

        for column in &self.histogram_columns {
            if !self.schema.has_column(column) {
                return Err(StorageError::ColumnNotFound(column.clone()));
            }
            if *column == self.time_column {
                return Err(invalid("the time column cannot have a histogram"));
            }
        }
        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> StorageError {
    StorageError::InvalidDefinition(message.into())
}
