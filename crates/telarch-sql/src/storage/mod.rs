//! Storage layer.
//!
//! Tables live in one ordered key-value store. Each table has a raw tuple
//! keyspace, keyed by primary key, and one histogram keyspace per indexed
//! column.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      StorageEngine                          │
//! │        (tables, writers, scans, query compilation)          │
//! └─────────────────────────────────────────────────────────────┘
//!          │                    │                    │
//!          ▼                    ▼                    ▼
//! ┌────────────────┐  ┌──────────────────┐  ┌──────────────────┐
//! │  TableWriter   │  │    TableScan     │  │ HistogramIterator│
//! │ (raw + builders│  │ (pushed filters) │  │  (interval scan) │
//! └────────────────┘  └──────────────────┘  └──────────────────┘
//!          │                    │                    │
//!          ▼                    ▼                    ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         KvStore                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod catalog;
mod encoder;
mod engine;
mod error;
mod scan;
mod table;
mod writer;

pub use encoder::TupleEncoder;
pub use engine::StorageEngine;
pub use error::{StorageError, StorageResult};
pub use scan::TableScan;
pub use table::TableDefinition;
pub use writer::{InsertMode, TableWriter};
