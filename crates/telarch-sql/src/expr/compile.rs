//! Compilation of bound expressions into closure trees.

use std::fmt;
use std::sync::Arc;

use super::bind::apply;
use super::{ops, ExprError, ExprKind, ExprResult, ExpressionNode, LogicalOp};
use crate::schema::{ColumnDefinition, TupleSchema};
use crate::tuple::Tuple;
use crate::types::{DataType, Value};

pub(super) type EvalFn = Arc<dyn Fn(&Tuple) -> ExprResult<Value> + Send + Sync>;

/// An executable form of a bound expression.
///
/// Cheap to clone and safe to share between threads.
#[derive(Clone)]
pub struct CompiledEvaluator {
    output: ColumnDefinition,
    eval: EvalFn,
}

impl CompiledEvaluator {
    /// Evaluates the expression against `tuple`.
    pub fn evaluate(&self, tuple: &Tuple) -> ExprResult<Value> {
        (self.eval)(tuple)
    }

    /// Evaluates a boolean expression; `false` and null both reject.
    pub fn matches(&self, tuple: &Tuple) -> ExprResult<bool> {
        Ok(matches!(self.evaluate(tuple)?, Value::Boolean(true)))
    }

    /// Returns the output column this evaluator produces.
    pub fn output_column(&self) -> &ColumnDefinition {
        &self.output
    }

    /// Returns the result type.
    pub fn data_type(&self) -> DataType {
        self.output.data_type()
    }
}

impl fmt::Debug for CompiledEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledEvaluator")
            .field("output", &self.output)
            .finish_non_exhaustive()
    }
}

impl ExpressionNode {
    /// Compiles the bound tree into an evaluator.
    pub fn compile(&self) -> ExprResult<CompiledEvaluator> {
        let output = self.output_definition()?;
        Ok(CompiledEvaluator {
            output,
            eval: self.build()?,
        })
    }

    pub(super) fn output_definition(&self) -> ExprResult<ColumnDefinition> {
        let (Some(data_type), Some(name)) = (self.data_type, self.column_name()) else {
            return Err(ExprError::compile(format!("{} is not bound", self)));
        };
        Ok(ColumnDefinition::new(name, data_type))
    }

    pub(super) fn build(&self) -> ExprResult<EvalFn> {
        let data_type = self
            .data_type
            .ok_or_else(|| ExprError::compile(format!("{} has no resolved type", self)))?;

        if let Some(value) = &self.constant {
            let value = value.clone();
            return Ok(Arc::new(move |_: &Tuple| Ok(value.clone())));
        }

        match &self.kind {
            ExprKind::Literal(value) => {
                let value = value.clone();
                Ok(Arc::new(move |_: &Tuple| Ok(value.clone())))
            }
            ExprKind::Column(name) => {
                let schema = self
                    .bound_schema
                    .clone()
                    .ok_or_else(|| ExprError::compile(format!("{} is not bound", name)))?;
                Ok(column_reader(schema, name.clone()))
            }
            ExprKind::Aggregate(_) => {
                let name = self.output_definition()?.name().to_string();
                Ok(Arc::new(move |tuple: &Tuple| {
                    Ok(tuple.column(&name).cloned().unwrap_or(Value::Null))
                }))
            }
            ExprKind::Logical(op @ (LogicalOp::And | LogicalOp::Or)) => {
                let op = *op;
                let left = self.children[0].build()?;
                let right = self.children[1].build()?;
                Ok(Arc::new(move |tuple: &Tuple| {
                    let l = left(tuple)?;
                    if let Some(decided) = ops::short_circuit(op, &l) {
                        return Ok(decided);
                    }
                    let r = right(tuple)?;
                    ops::logical(op, &[l, r])
                }))
            }
            kind => {
                let kind = kind.clone();
                let children = self
                    .children
                    .iter()
                    .map(ExpressionNode::build)
                    .collect::<ExprResult<Vec<_>>>()?;
                Ok(Arc::new(move |tuple: &Tuple| {
                    let args = children
                        .iter()
                        .map(|child| child(tuple))
                        .collect::<ExprResult<Vec<_>>>()?;
                    apply(&kind, data_type, &args)
                }))
            }
        }
    }
}

/// Reads a column by position when the tuple shares the bound schema and by
/// name otherwise. A column the tuple lacks reads as null.
fn column_reader(schema: Arc<TupleSchema>, name: String) -> EvalFn {
    let position = schema.index_of(&name);
    Arc::new(move |tuple: &Tuple| {
        let value = match position {
            Some(i) if Arc::ptr_eq(tuple.schema(), &schema) => tuple.get(i),
            _ => tuple.column(&name),
        };
        Ok(value.cloned().unwrap_or(Value::Null))
    })
}
