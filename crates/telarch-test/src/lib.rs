//! # telarch-test
//!
//! End-to-end tests for the telarch archive.
//!
//! The tests under `tests/` drive the storage engine the way an archive
//! client does: create tables, write tuples through table writers, then read
//! them back through histogram iterators, table scans and compiled
//! expressions. This library holds the fixtures they share.

#![warn(missing_docs)]
#![warn(clippy::all)]

use std::sync::Arc;

use telarch_common::config::ArchiveConfig;
use telarch_sql::histogram::HistogramIterator;
use telarch_sql::schema::TupleSchema;
use telarch_sql::storage::{InsertMode, StorageEngine, TableDefinition};
use telarch_sql::tuple::Tuple;
use telarch_sql::types::{DataType, Value};

/// Name of the parameter table created by [`engine_with_parameters`].
pub const PARAMETERS: &str = "pp";

/// `100000000000` ms, far after every other sample of the fixtures.
pub const T_LATE: i64 = 100_000_000_000;

/// Installs a tracing subscriber writing to the test output.
///
/// Only the first call in a test binary has an effect.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Schema of the parameter table: `gentime`, `name`, `eng`, `raw`.
pub fn parameter_schema() -> TupleSchema {
    TupleSchema::empty()
        .with_column("gentime", DataType::Timestamp)
        .and_then(|s| s.with_column("name", DataType::String))
        .and_then(|s| s.with_column("eng", DataType::Double))
        .and_then(|s| s.with_column("raw", DataType::Int))
        .expect("parameter schema has unique columns")
}

/// Parameter table keyed by `(gentime, name)`, with a histogram on `name`.
pub fn parameter_table() -> TableDefinition {
    TableDefinition::new(PARAMETERS, parameter_schema(), "gentime")
        .with_primary_key(["gentime", "name"])
        .with_histogram("name")
}

/// An in-memory engine holding the parameter table.
pub fn engine_with_parameters(config: ArchiveConfig) -> StorageEngine {
    init_test_logging();
    let engine = StorageEngine::in_memory(config).expect("valid test configuration");
    engine
        .create_table(parameter_table())
        .expect("parameter table is valid");
    engine
}

/// A parameter tuple.
pub fn parameter(schema: &Arc<TupleSchema>, t: i64, name: &str, raw: i32) -> Tuple {
    Tuple::new(
        Arc::clone(schema),
        vec![
            Value::Timestamp(t),
            Value::string(name),
            Value::Double(f64::from(raw) * 0.5),
            Value::Int(raw),
        ],
    )
    .expect("tuple matches the parameter schema")
}

/// Writes `(time, name)` samples in one writer session; `raw` counts up
/// from 0.
pub fn write_samples(engine: &StorageEngine, samples: &[(i64, &str)]) {
    let schema = Arc::clone(engine.table(PARAMETERS).expect("table exists").schema());
    let mut writer = engine
        .open_table_writer(PARAMETERS, InsertMode::Insert)
        .expect("writer slot is free");
    for (i, (t, name)) in samples.iter().enumerate() {
        let raw = i32::try_from(i).expect("fixture is small");
        writer
            .write(&parameter(&schema, *t, name, raw))
            .expect("write succeeds");
    }
    writer.close().expect("close succeeds");
}

/// Drains an iterator into `(value, start, stop, count)` tuples.
pub fn drain(iter: HistogramIterator) -> Vec<(String, i64, i64, u32)> {
    iter.map(|r| {
        let interval = r.expect("histogram read succeeds");
        (
            interval.value().to_string(),
            interval.start(),
            interval.stop(),
            interval.count(),
        )
    })
    .collect()
}
