//! Aggregate compilation and accumulation.

use std::cmp::Ordering;
use std::fmt;

use super::compile::EvalFn;
use super::{AggregateFunc, ExprError, ExprKind, ExprResult, ExpressionNode};
use crate::schema::ColumnDefinition;
use crate::tuple::Tuple;
use crate::types::{DataType, Value};

/// A compiled aggregate; creates one [`Accumulator`] per group.
#[derive(Clone)]
pub struct CompiledAggregate {
    func: AggregateFunc,
    output: ColumnDefinition,
    operand: Option<EvalFn>,
}

impl CompiledAggregate {
    /// Returns the aggregate function.
    pub fn func(&self) -> AggregateFunc {
        self.func
    }

    /// Returns the output column the grouping pass must fill.
    pub fn output_column(&self) -> &ColumnDefinition {
        &self.output
    }

    /// Creates an empty accumulator.
    pub fn accumulator(&self) -> Accumulator {
        Accumulator {
            func: self.func,
            result_type: self.output.data_type(),
            operand: self.operand.clone(),
            count: 0,
            int_sum: 0,
            float_sum: 0.0,
            best: None,
        }
    }
}

impl fmt::Debug for CompiledAggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledAggregate")
            .field("func", &self.func)
            .field("output", &self.output)
            .finish_non_exhaustive()
    }
}

/// Running state of one aggregate over one group.
///
/// Null operand values are ignored. `count(*)` counts every tuple.
pub struct Accumulator {
    func: AggregateFunc,
    result_type: DataType,
    operand: Option<EvalFn>,
    count: i64,
    int_sum: i64,
    float_sum: f64,
    best: Option<Value>,
}

impl Accumulator {
    /// Folds one tuple into the state.
    pub fn update(&mut self, tuple: &Tuple) -> ExprResult<()> {
        let value = match &self.operand {
            Some(operand) => operand(tuple)?,
            None => {
                self.count += 1;
                return Ok(());
            }
        };
        if value.is_null() {
            return Ok(());
        }
        self.count += 1;

        match self.func {
            AggregateFunc::Count => {}
            AggregateFunc::Sum | AggregateFunc::Avg => {
                if self.result_type == DataType::Long {
                    let v = value.to_i64().ok_or_else(|| not_numeric(&value))?;
                    self.int_sum = self.int_sum.wrapping_add(v);
                } else {
                    self.float_sum += value.to_f64().ok_or_else(|| not_numeric(&value))?;
                }
            }
            AggregateFunc::Min | AggregateFunc::Max => {
                if value.is_nan() {
                    return Ok(());
                }
                let wanted = if self.func == AggregateFunc::Min {
                    Ordering::Less
                } else {
                    Ordering::Greater
                };
                let replace = match &self.best {
                    None => true,
                    Some(best) => {
                        value.compare(best).ok_or_else(|| {
                            ExprError::type_error(format!("cannot compare {} with {}", value, best))
                        })? == wanted
                    }
                };
                if replace {
                    self.best = Some(value);
                }
            }
        }
        Ok(())
    }

    /// Returns the aggregate over the tuples seen so far.
    ///
    /// Every function but `count` gives null when no value was seen.
    pub fn finish(&self) -> Value {
        match self.func {
            AggregateFunc::Count => Value::Long(self.count),
            _ if self.count == 0 => Value::Null,
            AggregateFunc::Sum if self.result_type == DataType::Long => Value::Long(self.int_sum),
            AggregateFunc::Sum => Value::Double(self.float_sum),
            AggregateFunc::Avg => Value::Double(self.float_sum / self.count as f64),
            AggregateFunc::Min | AggregateFunc::Max => self.best.clone().unwrap_or(Value::Null),
        }
    }
}

impl fmt::Debug for Accumulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Accumulator")
            .field("func", &self.func)
            .field("count", &self.count)
            .finish_non_exhaustive()
    }
}

fn not_numeric(value: &Value) -> ExprError {
    ExprError::type_error(format!("{} is not numeric", value))
}

impl ExpressionNode {
    /// Compiles an aggregate node for the grouping pass.
    pub fn compile_aggregate(&self) -> ExprResult<CompiledAggregate> {
        let ExprKind::Aggregate(func) = self.kind else {
            return Err(ExprError::compile(format!("{} is not an aggregate", self)));
        };
        let output = self.output_definition()?;
        let operand = self.children.first().map(ExpressionNode::build).transpose()?;
        Ok(CompiledAggregate {
            func,
            output,
            operand,
        })
    }
}
