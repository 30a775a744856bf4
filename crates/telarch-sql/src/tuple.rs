//! Tuples.

use std::fmt;
use std::sync::Arc;

use crate::schema::TupleSchema;
use crate::types::Value;

/// Error returned when a tuple's values do not line up with its schema.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("tuple has {values} values but schema has {columns} columns")]
pub struct ArityMismatch {
    /// Number of schema columns.
    pub columns: usize,
    /// Number of supplied values.
    pub values: usize,
}

/// An immutable row of values sharing its table's schema.
#[derive(Debug, Clone)]
pub struct Tuple {
    schema: Arc<TupleSchema>,
    values: Vec<Value>,
}

impl Tuple {
    /// Creates a tuple; `values` must have one entry per schema column.
    pub fn new(schema: Arc<TupleSchema>, values: Vec<Value>) -> Result<Self, ArityMismatch> {
        if schema.len() != values.len() {
            return Err(ArityMismatch {
                columns: schema.len(),
                values: values.len(),
            });
        }
        Ok(Self { schema, values })
    }

    /// Returns the schema.
    pub fn schema(&self) -> &Arc<TupleSchema> {
        &self.schema
    }

    /// Returns the values in schema order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Returns the value at `index`.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Returns the value of a named column.
    ///
    /// `None` means the schema has no such column; an explicitly absent
    /// value is `Some(Value::Null)`.
    pub fn column(&self, name: &str) -> Option<&Value> {
        self.schema.index_of(name).map(|i| &self.values[i])
    }

    /// Returns true if the schema has the column.
    pub fn has_column(&self, name: &str) -> bool {
        self.schema.has_column(name)
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the tuple has no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl PartialEq for Tuple {
    fn eq(&self, other: &Self) -> bool {
        self.schema == other.schema && self.values == other.values
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, (column, value)) in self.schema.columns().iter().zip(&self.values).enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", column.name(), value)?;
        }
        write!(f, ")")
    }
}
