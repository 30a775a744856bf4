//! Storage error types.

use telarch_common::error::ArchiveError;
use thiserror::Error;

use crate::encoding::DecodeError;
use crate::expr::ExprError;
use crate::schema::DuplicateColumn;
use crate::tuple::ArityMismatch;

/// Storage error type.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The key-value store failed, or its records could not be decoded.
    #[error("store error: {0}")]
    Kv(#[from] ArchiveError),

    /// An expression failed to bind, compile or evaluate.
    #[error(transparent)]
    Expr(#[from] ExprError),

    /// Table not found.
    #[error("table not found: {0}")]
    TableNotFound(String),

    /// Table already exists.
    #[error("table already exists: {0}")]
    TableExists(String),

    /// Column not found.
    #[error("column not found: {0}")]
    ColumnNotFound(String),

    /// The column has no histogram.
    #[error("column {column} of table {table} has no histogram")]
    NotIndexed {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },

    /// A tuple with the same primary key is already stored.
    #[error("duplicate key in table {0}")]
    DuplicateKey(String),

    /// The tuple does not fit the table.
    #[error("invalid tuple: {0}")]
    InvalidTuple(String),

    /// Another writer is open on the table.
    #[error("a writer is already open on table {0}")]
    WriterBusy(String),

    /// The writer or iterator was closed.
    #[error("{0} is closed")]
    Closed(&'static str),

    /// The table definition is not usable.
    #[error("invalid table definition: {0}")]
    InvalidDefinition(String),
}

impl From<DecodeError> for StorageError {
    fn from(e: DecodeError) -> Self {
        StorageError::Kv(ArchiveError::corruption(e.0))
    }
}

impl From<ArityMismatch> for StorageError {
    fn from(e: ArityMismatch) -> Self {
        StorageError::InvalidTuple(e.to_string())
    }
}

impl From<DuplicateColumn> for StorageError {
    fn from(e: DuplicateColumn) -> Self {
        StorageError::InvalidDefinition(e.to_string())
    }
}

/// Storage result type.
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions() {
        let err: StorageError = ArchiveError::unavailable("disk gone").into();
        assert!(matches!(err, StorageError::Kv(_)));

        let err: StorageError = DecodeError("truncated i64".into()).into();
        assert!(matches!(err, StorageError::Kv(ArchiveError::Corruption { .. })));
        assert_eq!(
            err.to_string(),
            "store error: data corruption detected: truncated i64"
        );

        let err: StorageError = ExprError::DivisionByZero.into();
        assert_eq!(err.to_string(), "division by zero");
    }

    #[test]
    fn test_display() {
        let err = StorageError::NotIndexed {
            table: "table1".into(),
            column: "seqNum".into(),
        };
        assert_eq!(err.to_string(), "column seqNum of table table1 has no histogram");
        assert_eq!(
            StorageError::Closed("histogram iterator").to_string(),
            "histogram iterator is closed"
        );
    }
}
