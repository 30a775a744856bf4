//! Tuple schemas.
//!
//! A schema is an ordered list of column definitions with a name index. It
//! is built once and then shared through `Arc` by every tuple of a table.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::DataType;

/// A named, typed column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnDefinition {
    name: String,
    data_type: DataType,
}

impl ColumnDefinition {
    /// Creates a column definition.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }

    /// Returns the column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the column type.
    pub fn data_type(&self) -> DataType {
        self.data_type
    }
}

impl fmt::Display for ColumnDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.data_type)
    }
}

/// Error returned when a schema would contain a column twice.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("duplicate column: {0}")]
pub struct DuplicateColumn(pub String);

/// Ordered column definitions of a tuple.
#[derive(Debug, Clone, Default)]
pub struct TupleSchema {
    columns: Vec<ColumnDefinition>,
    index: HashMap<String, usize>,
}

impl TupleSchema {
    /// Creates an empty schema.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a schema from columns, rejecting duplicate names.
    pub fn new(columns: Vec<ColumnDefinition>) -> Result<Self, DuplicateColumn> {
        let mut schema = Self {
            columns: Vec::with_capacity(columns.len()),
            index: HashMap::with_capacity(columns.len()),
        };
        for column in columns {
            schema.add_column(column)?;
        }
        Ok(schema)
    }

    /// Appends a column.
    pub fn add_column(&mut self, column: ColumnDefinition) -> Result<(), DuplicateColumn> {
        if self.index.contains_key(column.name()) {
            return Err(DuplicateColumn(column.name().to_string()));
        }
        self.index.insert(column.name().to_string(), self.columns.len());
        self.columns.push(column);
        Ok(())
    }

    /// Builder-style [`add_column`](Self::add_column).
    pub fn with_column(
        mut self,
        name: impl Into<String>,
        data_type: DataType,
    ) -> Result<Self, DuplicateColumn> {
        self.add_column(ColumnDefinition::new(name, data_type))?;
        Ok(self)
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns true if the schema has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Returns the columns in order.
    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    /// Returns the column at `index`.
    pub fn column(&self, index: usize) -> Option<&ColumnDefinition> {
        self.columns.get(index)
    }

    /// Finds a column by name.
    pub fn column_by_name(&self, name: &str) -> Option<&ColumnDefinition> {
        self.index.get(name).map(|&i| &self.columns[i])
    }

    /// Returns the position of a column.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Returns true if the schema has a column with this name.
    pub fn has_column(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }
}

impl PartialEq for TupleSchema {
    fn eq(&self, other: &Self) -> bool {
        self.columns == other.columns
    }
}

impl Eq for TupleSchema {}

impl fmt::Display for TupleSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, column) in self.columns.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", column)?;
        }
        write!(f, ")")
    }
}
