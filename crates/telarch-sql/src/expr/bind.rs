//! Binding: type resolution, naming and constant folding.

use std::sync::Arc;

use tracing::trace;

use super::{
    ops, AggregateFunc, ArithmeticOp, ExprError, ExprKind, ExprResult, ExpressionNode,
    ScalarFunc,
};
use crate::schema::TupleSchema;
use crate::types::{DataType, Value};

impl ExpressionNode {
    /// Binds the tree to `schema`.
    ///
    /// Children are bound before their parent. Each node gets its type, an
    /// output name (`<label>_<n>` numbered in post-order unless aliased or a
    /// column reference) and, when its subtree reads no column, no aggregate
    /// and no non-deterministic function, a folded constant. Folding
    /// failures such as a division by zero are returned here.
    ///
    /// Binding again to an equal schema does nothing; binding to a
    /// different schema fails with [`ExprError::UnboundColumn`]. A failed
    /// bind leaves the tree unchanged.
    pub fn bind(&mut self, schema: &Arc<TupleSchema>) -> ExprResult<()> {
        let mut bound = self.clone();
        let mut counter = 0;
        bound.bind_node(schema, &mut counter)?;
        trace!(expr = %bound, data_type = ?bound.data_type, "bound expression");
        *self = bound;
        Ok(())
    }

    fn bind_node(&mut self, schema: &Arc<TupleSchema>, counter: &mut usize) -> ExprResult<()> {
        if let Some(bound) = &self.bound_schema {
            if **bound == **schema {
                return Ok(());
            }
            return Err(ExprError::UnboundColumn {
                name: self.display_name(),
            });
        }

        for child in &mut self.children {
            child.bind_node(schema, counter)?;
        }

        let data_type = self.resolve_type(schema)?;
        self.data_type = Some(data_type);

        if self.alias.is_none() && !matches!(self.kind, ExprKind::Column(_)) {
            self.name = Some(format!("{}_{}", self.kind.label(), *counter));
            *counter += 1;
        }

        self.constant = self.fold(data_type)?;
        self.bound_schema = Some(Arc::clone(schema));
        Ok(())
    }

    fn child_types(&self) -> Vec<DataType> {
        self.children.iter().filter_map(|c| c.data_type).collect()
    }

    fn resolve_type(&self, schema: &TupleSchema) -> ExprResult<DataType> {
        let types = self.child_types();
        match &self.kind {
            ExprKind::Literal(value) => value
                .data_type()
                .ok_or_else(|| ExprError::type_error("null literal has no type")),
            ExprKind::Column(name) => schema
                .column_by_name(name)
                .map(|c| c.data_type())
                .ok_or_else(|| ExprError::type_error(format!("unknown column: {}", name))),
            ExprKind::Arithmetic(op) => arithmetic_type(*op, types[0], types[1]),
            ExprKind::Comparison(op) => {
                if types[0].is_comparable_with(&types[1]) {
                    Ok(DataType::Boolean)
                } else {
                    Err(ExprError::type_error(format!(
                        "cannot compare {} {} {}",
                        types[0],
                        op.symbol(),
                        types[1]
                    )))
                }
            }
            ExprKind::Logical(op) => {
                if let Some(t) = types.iter().find(|t| **t != DataType::Boolean) {
                    return Err(ExprError::type_error(format!(
                        "{} expects boolean operands, got {}",
                        op.label(),
                        t
                    )));
                }
                Ok(DataType::Boolean)
            }
            ExprKind::Aggregate(func) => {
                if self.children.iter().any(|c| c.has_aggregates) {
                    return Err(ExprError::type_error(format!(
                        "aggregate {} cannot contain another aggregate",
                        func.label()
                    )));
                }
                aggregate_type(*func, &types)
            }
            ExprKind::Function(func) => function_type(*func, &types),
        }
    }

    fn fold(&self, data_type: DataType) -> ExprResult<Option<Value>> {
        match &self.kind {
            ExprKind::Literal(value) => return Ok(Some(value.clone())),
            ExprKind::Column(_) | ExprKind::Aggregate(_) => return Ok(None),
            ExprKind::Function(func) if !func.is_deterministic() => return Ok(None),
            _ => {}
        }

        let args: Option<Vec<Value>> = self.children.iter().map(|c| c.constant.clone()).collect();
        match args {
            Some(args) => apply(&self.kind, data_type, &args).map(Some),
            None => Ok(None),
        }
    }
}

/// Evaluates a non-leaf, non-aggregate node over already computed operands.
pub(super) fn apply(kind: &ExprKind, data_type: DataType, args: &[Value]) -> ExprResult<Value> {
    match kind {
        ExprKind::Arithmetic(op) => ops::arithmetic(*op, &args[0], &args[1], data_type),
        ExprKind::Comparison(op) => ops::comparison(*op, &args[0], &args[1]),
        ExprKind::Logical(op) => ops::logical(*op, args),
        ExprKind::Function(func) => ops::function(*func, args, data_type),
        ExprKind::Literal(_) | ExprKind::Column(_) | ExprKind::Aggregate(_) => Err(
            ExprError::compile(format!("{} is not an operator", kind.label())),
        ),
    }
}

fn promote(a: DataType, b: DataType) -> Option<DataType> {
    let rank = a.numeric_rank()?.max(b.numeric_rank()?);
    Some(match rank {
        0..=2 => DataType::Int,
        3 => DataType::Long,
        _ => DataType::Double,
    })
}

fn arithmetic_type(op: ArithmeticOp, left: DataType, right: DataType) -> ExprResult<DataType> {
    if let Some(t) = promote(left, right) {
        return Ok(t);
    }
    match (op, left, right) {
        (ArithmeticOp::Add, DataType::Timestamp, t) | (ArithmeticOp::Add, t, DataType::Timestamp)
            if t.is_integer() =>
        {
            Ok(DataType::Timestamp)
        }
        (ArithmeticOp::Subtract, DataType::Timestamp, t) if t.is_integer() => {
            Ok(DataType::Timestamp)
        }
        (ArithmeticOp::Subtract, DataType::Timestamp, DataType::Timestamp) => Ok(DataType::Long),
        _ => Err(ExprError::type_error(format!(
            "cannot apply {} to {} and {}",
            op.symbol(),
            left,
            right
        ))),
    }
}

fn aggregate_type(func: AggregateFunc, types: &[DataType]) -> ExprResult<DataType> {
    if func == AggregateFunc::Count {
        return if types.len() <= 1 {
            Ok(DataType::Long)
        } else {
            Err(ExprError::type_error("count takes at most one operand"))
        };
    }
    let operand = match types {
        [t] => *t,
        _ => {
            return Err(ExprError::type_error(format!(
                "{} takes exactly one operand",
                func.label()
            )))
        }
    };
    let result = match func {
        AggregateFunc::Sum if operand.is_integer() => Some(DataType::Long),
        AggregateFunc::Sum if operand == DataType::Double => Some(DataType::Double),
        AggregateFunc::Min | AggregateFunc::Max if operand.is_orderable() => Some(operand),
        AggregateFunc::Avg if operand.is_numeric() => Some(DataType::Double),
        _ => None,
    };
    result.ok_or_else(|| {
        ExprError::type_error(format!("{} is not defined for {}", func.label(), operand))
    })
}

fn function_type(func: ScalarFunc, types: &[DataType]) -> ExprResult<DataType> {
    let arity_ok = match func {
        ScalarFunc::Now => types.is_empty(),
        ScalarFunc::Concat | ScalarFunc::Coalesce => !types.is_empty(),
        _ => types.len() == 1,
    };
    if !arity_ok {
        return Err(ExprError::type_error(format!(
            "wrong number of arguments to {}: {}",
            func.label(),
            types.len()
        )));
    }

    let mismatch = || {
        let names: Vec<_> = types.iter().map(DataType::name).collect();
        ExprError::type_error(format!("{}({}) is not defined", func.label(), names.join(", ")))
    };

    match func {
        ScalarFunc::Now => Ok(DataType::Timestamp),
        ScalarFunc::Abs if types[0].is_numeric() => Ok(types[0]),
        ScalarFunc::Lower | ScalarFunc::Upper if types[0].is_string() => Ok(DataType::String),
        ScalarFunc::Length if types[0].is_string() || types[0] == DataType::Binary => {
            Ok(DataType::Int)
        }
        ScalarFunc::Concat if types.iter().all(DataType::is_string) => Ok(DataType::String),
        ScalarFunc::Coalesce => types[1..]
            .iter()
            .try_fold(types[0], |acc, t| common_type(acc, *t))
            .ok_or_else(mismatch),
        _ => Err(mismatch()),
    }
}

fn common_type(a: DataType, b: DataType) -> Option<DataType> {
    if a == b {
        return Some(a);
    }
    if a.is_string() && b.is_string() {
        return Some(DataType::String);
    }
    promote(a, b)
}
