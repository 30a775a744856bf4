//! End-to-end tests of expression binding, compilation and aggregation
//! against stored tuples.

use std::sync::Arc;

use telarch_common::config::ArchiveConfig;
use telarch_sql::expr::{
    AggregateFunc, ArithmeticOp, ComparisonOp, ExprError, ExpressionNode, ScalarFunc,
};
use telarch_sql::schema::TupleSchema;
use telarch_sql::storage::{StorageError, StorageResult};
use telarch_sql::tuple::Tuple;
use telarch_sql::types::{DataType, Value};
use telarch_test::{engine_with_parameters, parameter_schema, write_samples, PARAMETERS};

fn col(name: &str) -> ExpressionNode {
    ExpressionNode::column(name)
}

fn lit(value: impl Into<Value>) -> ExpressionNode {
    ExpressionNode::literal(value)
}

/// A constant expression evaluates to the same value for every tuple.
#[test]
fn test_constant_expression_ignores_tuples() {
    let engine = engine_with_parameters(ArchiveConfig::default());
    write_samples(&engine, &[(1000, "p1"), (2000, "p2"), (3000, "p3")]);

    let expr = ExpressionNode::arithmetic(
        ArithmeticOp::Add,
        lit(2),
        ExpressionNode::arithmetic(ArithmeticOp::Multiply, lit(3), lit(4)),
    );
    let eval = engine.compile_query(PARAMETERS, expr).expect("compiles");

    let tuples: Vec<Tuple> = engine
        .select(PARAMETERS, None)
        .expect("scan opens")
        .collect::<StorageResult<_>>()
        .expect("scan succeeds");
    assert_eq!(tuples.len(), 3);
    for tuple in &tuples {
        assert_eq!(eval.evaluate(tuple).expect("evaluates"), Value::Int(14));
    }
}

/// Compiled expressions read stored columns.
#[test]
fn test_compiled_expression_over_scan() {
    let engine = engine_with_parameters(ArchiveConfig::default());
    write_samples(&engine, &[(1000, "p1"), (2000, "p2")]);

    let expr = ExpressionNode::function(
        ScalarFunc::Concat,
        vec![ExpressionNode::function(ScalarFunc::Upper, vec![col("name")]), lit(":")],
    )
    .with_alias("label");
    let eval = engine.compile_query(PARAMETERS, expr).expect("compiles");
    assert_eq!(eval.output_column().name(), "label");
    assert_eq!(eval.data_type(), DataType::String);

    let labels: Vec<Value> = engine
        .select(PARAMETERS, None)
        .expect("scan opens")
        .map(|t| eval.evaluate(&t.expect("scan succeeds")).expect("evaluates"))
        .collect();
    assert_eq!(labels, vec![Value::string("P1:"), Value::string("P2:")]);
}

/// Aggregates are collected left to right, and only aggregates are.
#[test]
fn test_collect_aggregates_order() {
    let mut expr = ExpressionNode::arithmetic(
        ArithmeticOp::Divide,
        ExpressionNode::aggregate(AggregateFunc::Sum, col("eng")),
        ExpressionNode::arithmetic(
            ArithmeticOp::Add,
            ExpressionNode::count_all(),
            ExpressionNode::aggregate(AggregateFunc::Max, col("raw")),
        ),
    );
    expr.bind(&Arc::new(parameter_schema())).expect("binds");

    let aggregates = expr.collect_aggregates();
    assert_eq!(aggregates.len(), 3);
    assert!(aggregates.iter().all(|a| a.is_aggregate()));
    let names: Vec<_> = aggregates.iter().map(|a| a.to_string()).collect();
    assert_eq!(names, vec!["sum(eng)", "count(*)", "max(raw)"]);
}

/// Aggregates accumulate over a table scan; the enclosing expression reads
/// their results by output column.
#[test]
fn test_aggregation_over_scan() {
    let engine = engine_with_parameters(ArchiveConfig::default());
    write_samples(&engine, &[(1000, "p1"), (2000, "p1"), (3000, "p2"), (4000, "p3")]);
    let table = engine.table(PARAMETERS).expect("table exists");

    let mut expr = ExpressionNode::arithmetic(
        ArithmeticOp::Add,
        ExpressionNode::aggregate(AggregateFunc::Sum, col("raw")),
        ExpressionNode::count_all(),
    );
    expr.bind(table.schema()).expect("binds");

    let compiled: Vec<_> = expr
        .collect_aggregates()
        .into_iter()
        .map(|a| a.compile_aggregate().expect("compiles"))
        .collect();
    let mut accumulators: Vec<_> = compiled.iter().map(|c| c.accumulator()).collect();
    for tuple in engine.select(PARAMETERS, None).expect("scan opens") {
        let tuple = tuple.expect("scan succeeds");
        for acc in &mut accumulators {
            acc.update(&tuple).expect("accumulates");
        }
    }

    let mut grouped = TupleSchema::empty();
    for c in &compiled {
        grouped
            .add_column(c.output_column().clone())
            .expect("aggregate names are unique");
    }
    let results: Vec<Value> = accumulators.iter().map(|a| a.finish()).collect();
    assert_eq!(results, vec![Value::Long(6), Value::Long(4)]);

    let row = Tuple::new(Arc::new(grouped), results).expect("one value per aggregate");
    let eval = expr.compile().expect("compiles");
    assert_eq!(eval.evaluate(&row).expect("evaluates"), Value::Long(10));
}

/// An expression bound to one schema cannot be bound to another.
#[test]
fn test_rebinding_to_another_schema_fails() {
    let engine = engine_with_parameters(ArchiveConfig::default());
    let table = engine.table(PARAMETERS).expect("table exists");

    let mut expr = ExpressionNode::comparison(ComparisonOp::Gt, col("raw"), lit(1));
    expr.bind(table.schema()).expect("binds");
    expr.bind(&Arc::new(parameter_schema()))
        .expect("an equal schema is accepted");

    let other = Arc::new(
        TupleSchema::empty()
            .with_column("raw", DataType::Int)
            .expect("single column"),
    );
    assert!(matches!(
        expr.bind(&other),
        Err(ExprError::UnboundColumn { .. })
    ));
}

/// Bind and evaluation errors reach the caller as storage errors.
#[test]
fn test_errors_surface() {
    let engine = engine_with_parameters(ArchiveConfig::default());
    write_samples(&engine, &[(1000, "p1")]);

    let mismatched = ExpressionNode::arithmetic(ArithmeticOp::Add, col("name"), lit(1));
    assert!(matches!(
        engine.compile_query(PARAMETERS, mismatched),
        Err(StorageError::Expr(ExprError::Type { .. }))
    ));
    assert!(matches!(
        engine.compile_query("missing", lit(1)),
        Err(StorageError::TableNotFound(_))
    ));

    let eval = engine
        .compile_query(
            PARAMETERS,
            ExpressionNode::arithmetic(ArithmeticOp::Divide, lit(10), col("raw")),
        )
        .expect("compiles");
    let tuple = engine
        .select(PARAMETERS, None)
        .expect("scan opens")
        .next()
        .expect("one tuple")
        .expect("scan succeeds");
    assert_eq!(eval.evaluate(&tuple), Err(ExprError::DivisionByZero));
}
