//! # telarch-sql
//!
//! Typed expressions, histogram indexes and table storage for the telarch
//! archive.
//!
//! This crate implements:
//! - Tuples and schemas shared by every table
//! - An expression engine that binds, folds and compiles expression trees
//!   to closures, with aggregates and filter pushdown
//! - Histogram indexes recording when each value of a column was present
//! - A storage engine writing tuples and histograms to a key-value store
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use telarch_common::config::ArchiveConfig;
//! use telarch_common::types::TimeInterval;
//! use telarch_sql::schema::TupleSchema;
//! use telarch_sql::storage::{InsertMode, StorageEngine, TableDefinition};
//! use telarch_sql::tuple::Tuple;
//! use telarch_sql::types::{DataType, Value};
//!
//! let engine = StorageEngine::in_memory(ArchiveConfig::default()).unwrap();
//! let schema = TupleSchema::empty()
//!     .with_column("gentime", DataType::Timestamp)
//!     .unwrap()
//!     .with_column("name", DataType::String)
//!     .unwrap();
//! let table = engine
//!     .create_table(TableDefinition::new("pp", schema, "gentime").with_histogram("name"))
//!     .unwrap();
//!
//! let mut writer = engine.open_table_writer("pp", InsertMode::Insert).unwrap();
//! for t in [1000, 2000] {
//!     let tuple = Tuple::new(
//!         Arc::clone(table.schema()),
//!         vec![Value::Timestamp(t), Value::string("p1")],
//!     )
//!     .unwrap();
//!     writer.write(&tuple).unwrap();
//! }
//! writer.close().unwrap();
//!
//! let intervals = engine
//!     .get_histogram_iterator("pp", "name", TimeInterval::unbounded())
//!     .unwrap()
//!     .collect::<Result<Vec<_>, _>>()
//!     .unwrap();
//! assert_eq!(intervals.len(), 1);
//! assert_eq!(intervals[0].count(), 2);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Order-preserving value encoding
pub mod encoding;

/// Typed expression trees
pub mod expr;

/// Histogram indexes
pub mod histogram;

/// Column definitions and tuple schemas
pub mod schema;

/// Tables, writers and scans
pub mod storage;

/// Tuples
pub mod tuple;

/// Data types and values
pub mod types;
