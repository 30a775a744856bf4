//! End-to-end tests of table scans, insert modes and table lifecycle.

use std::sync::Arc;

use telarch_common::config::ArchiveConfig;
use telarch_common::types::TimeInterval;
use telarch_kv::KeyRange;
use telarch_sql::expr::{ComparisonOp, ExpressionNode};
use telarch_sql::schema::TupleSchema;
use telarch_sql::storage::{
    InsertMode, StorageEngine, StorageError, StorageResult, TableDefinition,
};
use telarch_sql::tuple::Tuple;
use telarch_sql::types::{DataType, Value};
use telarch_test::{
    drain, engine_with_parameters, init_test_logging, parameter, parameter_table, write_samples,
    PARAMETERS,
};

const EVENTS: &str = "events";

fn cmp(op: ComparisonOp, column: &str, value: impl Into<Value>) -> ExpressionNode {
    ExpressionNode::comparison(
        op,
        ExpressionNode::column(column),
        ExpressionNode::literal(value),
    )
}

fn times(rows: &[Tuple]) -> Vec<i64> {
    rows.iter()
        .filter_map(|t| t.column("gentime").and_then(Value::to_i64))
        .collect()
}

fn select(engine: &StorageEngine, table: &str, filter: Option<ExpressionNode>) -> Vec<Tuple> {
    engine
        .select(table, filter)
        .expect("scan opens")
        .collect::<StorageResult<_>>()
        .expect("scan succeeds")
}

/// Events keyed by time alone, with a histogram on `status`.
fn engine_with_events() -> (StorageEngine, Arc<TupleSchema>) {
    init_test_logging();
    let engine = StorageEngine::in_memory(ArchiveConfig::default()).expect("valid configuration");
    let schema = TupleSchema::empty()
        .with_column("gentime", DataType::Timestamp)
        .and_then(|s| s.with_column("status", DataType::Enum))
        .and_then(|s| s.with_column("detail", DataType::String))
        .expect("unique columns");
    let table = engine
        .create_table(TableDefinition::new(EVENTS, schema, "gentime").with_histogram("status"))
        .expect("events table is valid");
    let schema = Arc::clone(table.schema());
    (engine, schema)
}

fn event(schema: &Arc<TupleSchema>, t: i64, status: Option<&str>, detail: Option<&str>) -> Tuple {
    Tuple::new(
        Arc::clone(schema),
        vec![
            Value::Timestamp(t),
            status.map_or(Value::Null, |s| Value::Enum(s.to_string())),
            detail.map_or(Value::Null, Value::string),
        ],
    )
    .expect("tuple matches the events schema")
}

fn statuses(engine: &StorageEngine) -> Vec<(String, i64, i64, u32)> {
    drain(
        engine
            .get_histogram_iterator(EVENTS, "status", TimeInterval::unbounded())
            .expect("status is indexed"),
    )
}

/// Time filters narrow the scan; the rest is checked per tuple.
#[test]
fn test_select_time_window() {
    let engine = engine_with_parameters(ArchiveConfig::default());
    write_samples(
        &engine,
        &[(1000, "p1"), (2000, "p2"), (3000, "p1"), (4000, "p2"), (5000, "p1")],
    );

    let filter = ExpressionNode::and(
        ExpressionNode::and(
            cmp(ComparisonOp::Gt, "gentime", 1000_i64),
            cmp(ComparisonOp::LtEq, "gentime", 4000_i64),
        ),
        cmp(ComparisonOp::Eq, "name", "p1"),
    );
    let scan = engine.select(PARAMETERS, Some(filter)).expect("scan opens");
    assert_eq!(scan.filters().len(), 3);
    assert!(!scan.has_residual());

    let rows: Vec<Tuple> = scan.collect::<StorageResult<_>>().expect("scan succeeds");
    assert_eq!(times(&rows), vec![3000]);
}

/// Disjunctions cannot be pushed down and are evaluated per tuple.
#[test]
fn test_select_residual_filter() {
    let engine = engine_with_parameters(ArchiveConfig::default());
    write_samples(&engine, &[(1000, "p1"), (2000, "p2"), (3000, "p3"), (4000, "p4")]);

    let filter = ExpressionNode::or(
        cmp(ComparisonOp::Eq, "name", "p2"),
        cmp(ComparisonOp::GtEq, "raw", 3),
    );
    let scan = engine.select(PARAMETERS, Some(filter)).expect("scan opens");
    assert!(scan.filters().is_empty());
    assert!(scan.has_residual());

    let rows: Vec<Tuple> = scan.collect::<StorageResult<_>>().expect("scan succeeds");
    assert_eq!(times(&rows), vec![2000, 4000]);
}

/// Unfiltered scans return every tuple in key order.
#[test]
fn test_select_all_in_key_order() {
    let engine = engine_with_parameters(ArchiveConfig::default());
    write_samples(&engine, &[(3000, "p1"), (1000, "p2"), (1000, "p1"), (2000, "p1")]);

    let rows = select(&engine, PARAMETERS, None);
    assert_eq!(times(&rows), vec![1000, 1000, 2000, 3000]);
    assert_eq!(rows[0].column("name"), Some(&Value::string("p1")));
    assert_eq!(rows[1].column("name"), Some(&Value::string("p2")));
}

/// A filter matching no key range yields nothing.
#[test]
fn test_select_empty_range() {
    let engine = engine_with_parameters(ArchiveConfig::default());
    write_samples(&engine, &[(1000, "p1"), (2000, "p1")]);

    let filter = ExpressionNode::and(
        cmp(ComparisonOp::Gt, "gentime", 2000_i64),
        cmp(ComparisonOp::Lt, "gentime", 1000_i64),
    );
    assert!(select(&engine, PARAMETERS, Some(filter)).is_empty());
}

/// Upserting a new status records it in the histogram; the old one stays.
#[test]
fn test_upsert_indexes_changed_values() {
    let (engine, schema) = engine_with_events();

    let mut writer = engine
        .open_table_writer(EVENTS, InsertMode::Upsert)
        .expect("writer slot is free");
    writer
        .write(&event(&schema, 1000, Some("OK"), Some("boot")))
        .expect("write succeeds");
    writer
        .write(&event(&schema, 1000, Some("OK"), Some("reboot")))
        .expect("write succeeds");
    writer
        .write(&event(&schema, 2000, Some("OK"), None))
        .expect("write succeeds");
    writer
        .write(&event(&schema, 2000, Some("FAIL"), None))
        .expect("write succeeds");
    writer.close().expect("close succeeds");
    assert_eq!(writer.written(), 4);

    let rows = select(&engine, EVENTS, None);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].column("detail"), Some(&Value::string("reboot")));
    assert_eq!(rows[1].column("status"), Some(&Value::Enum("FAIL".into())));

    assert_eq!(
        statuses(&engine),
        vec![("FAIL".to_string(), 2000, 2000, 1), ("OK".to_string(), 1000, 2000, 2)]
    );
}

/// Append modes merge column by column.
#[test]
fn test_append_modes() {
    let (engine, schema) = engine_with_events();

    let mut writer = engine
        .open_table_writer(EVENTS, InsertMode::InsertAppend)
        .expect("writer slot is free");
    writer
        .write(&event(&schema, 1000, None, Some("first")))
        .expect("write succeeds");
    writer
        .write(&event(&schema, 1000, Some("OK"), Some("second")))
        .expect("write succeeds");
    writer
        .write(&event(&schema, 1000, Some("OK"), Some("third")))
        .expect("unchanged tuple is accepted");
    writer.close().expect("close succeeds");
    assert_eq!(writer.written(), 2);

    let rows = select(&engine, EVENTS, None);
    assert_eq!(rows[0].column("detail"), Some(&Value::string("first")));
    assert_eq!(rows[0].column("status"), Some(&Value::Enum("OK".into())));

    let mut writer = engine
        .open_table_writer(EVENTS, InsertMode::UpsertAppend)
        .expect("writer slot is free");
    writer
        .write(&event(&schema, 1000, None, Some("fourth")))
        .expect("write succeeds");
    writer.close().expect("close succeeds");

    let rows = select(&engine, EVENTS, None);
    assert_eq!(rows[0].column("detail"), Some(&Value::string("fourth")));
    assert_eq!(rows[0].column("status"), Some(&Value::Enum("OK".into())));
    assert_eq!(statuses(&engine), vec![("OK".to_string(), 1000, 1000, 1)]);
}

/// Tuples carrying a subset of the columns, in any order, are accepted.
#[test]
fn test_sparse_tuples() {
    let (engine, _) = engine_with_events();
    let partial = Arc::new(
        TupleSchema::empty()
            .with_column("detail", DataType::String)
            .and_then(|s| s.with_column("gentime", DataType::Long))
            .expect("unique columns"),
    );

    let mut writer = engine
        .open_table_writer(EVENTS, InsertMode::Insert)
        .expect("writer slot is free");
    let tuple = Tuple::new(Arc::clone(&partial), vec![Value::string("x"), Value::Long(7)])
        .expect("matches the partial schema");
    writer.write(&tuple).expect("write succeeds");
    writer.close().expect("close succeeds");

    let rows = select(&engine, EVENTS, None);
    assert_eq!(
        rows[0].values(),
        &[Value::Timestamp(7), Value::Null, Value::string("x")]
    );
    assert!(statuses(&engine).is_empty());
}

/// Dropping a table removes its tuples and histograms; the name can be
/// reused afterwards.
#[test]
fn test_drop_and_recreate() {
    let engine = engine_with_parameters(ArchiveConfig::default());
    write_samples(&engine, &[(1000, "p1"), (2000, "p2")]);

    let writer = engine
        .open_table_writer(PARAMETERS, InsertMode::Insert)
        .expect("writer slot is free");
    assert!(matches!(
        engine.drop_table(PARAMETERS),
        Err(StorageError::WriterBusy(_))
    ));
    drop(writer);

    engine.drop_table(PARAMETERS).expect("drop succeeds");
    assert!(engine.list_tables().is_empty());
    assert!(matches!(
        engine.select(PARAMETERS, None),
        Err(StorageError::TableNotFound(_))
    ));
    let leftover = engine.store().scan(KeyRange::all()).expect("store is readable");
    assert_eq!(leftover.count(), 0);

    engine
        .create_table(parameter_table())
        .expect("name is free again");
    assert!(select(&engine, PARAMETERS, None).is_empty());

    let schema = Arc::clone(engine.table(PARAMETERS).expect("table exists").schema());
    let mut writer = engine
        .open_table_writer(PARAMETERS, InsertMode::Insert)
        .expect("writer slot is free");
    writer
        .write(&parameter(&schema, 1000, "p1", 0))
        .expect("old key is free");
    writer.close().expect("close succeeds");
    assert_eq!(select(&engine, PARAMETERS, None).len(), 1);
}
