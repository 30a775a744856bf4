//! Value-level operator semantics shared by constant folding and compiled
//! evaluators.

use std::time::{SystemTime, UNIX_EPOCH};

use super::{ArithmeticOp, ComparisonOp, ExprError, ExprResult, LogicalOp, ScalarFunc};
use crate::types::{DataType, Value};

/// Converts a numeric value to `target`; other values pass through.
pub(super) fn coerce(value: Value, target: DataType) -> Value {
    let Some(source) = value.data_type() else {
        return value;
    };
    match target {
        DataType::Int if source.is_integer() => {
            value.to_i64().map_or(value, |i| Value::Int(i as i32))
        }
        DataType::Long if source.is_integer() => value.to_i64().map_or(value, Value::Long),
        DataType::Double if source.is_numeric() => value.to_f64().map_or(value, Value::Double),
        _ => value,
    }
}

fn int_operand(v: &Value, op: ArithmeticOp) -> ExprResult<i64> {
    v.to_i64().ok_or_else(|| {
        ExprError::type_error(format!("operand {} of {} is not an integer", v, op.symbol()))
    })
}

fn float_operand(v: &Value, op: ArithmeticOp) -> ExprResult<f64> {
    v.to_f64().ok_or_else(|| {
        ExprError::type_error(format!("operand {} of {} is not numeric", v, op.symbol()))
    })
}

fn int_arithmetic(op: ArithmeticOp, a: i64, b: i64) -> ExprResult<i64> {
    Ok(match op {
        ArithmeticOp::Add => a.wrapping_add(b),
        ArithmeticOp::Subtract => a.wrapping_sub(b),
        ArithmeticOp::Multiply => a.wrapping_mul(b),
        ArithmeticOp::Divide if b == 0 => return Err(ExprError::DivisionByZero),
        ArithmeticOp::Divide => a.wrapping_div(b),
        ArithmeticOp::Modulo if b == 0 => return Err(ExprError::DivisionByZero),
        ArithmeticOp::Modulo => a.wrapping_rem(b),
    })
}

/// Evaluates `a <op> b` producing a value of `result`.
pub(super) fn arithmetic(
    op: ArithmeticOp,
    a: &Value,
    b: &Value,
    result: DataType,
) -> ExprResult<Value> {
    if a.is_null() || b.is_null() {
        return Ok(Value::Null);
    }
    match result {
        DataType::Int => {
            let v = int_arithmetic(op, int_operand(a, op)?, int_operand(b, op)?)?;
            Ok(Value::Int(v as i32))
        }
        DataType::Long => Ok(Value::Long(int_arithmetic(
            op,
            int_operand(a, op)?,
            int_operand(b, op)?,
        )?)),
        DataType::Timestamp => Ok(Value::Timestamp(int_arithmetic(
            op,
            int_operand(a, op)?,
            int_operand(b, op)?,
        )?)),
        DataType::Double => {
            let (x, y) = (float_operand(a, op)?, float_operand(b, op)?);
            let v = match op {
                ArithmeticOp::Add => x + y,
                ArithmeticOp::Subtract => x - y,
                ArithmeticOp::Multiply => x * y,
                ArithmeticOp::Divide | ArithmeticOp::Modulo if y == 0.0 => {
                    return Err(ExprError::DivisionByZero)
                }
                ArithmeticOp::Divide => x / y,
                ArithmeticOp::Modulo => x % y,
            };
            Ok(Value::Double(v))
        }
        other => Err(ExprError::type_error(format!(
            "arithmetic cannot produce {}",
            other
        ))),
    }
}

/// Evaluates `a <op> b`; null operands give null.
///
/// A NaN operand compares as IEEE 754 does: only `!=` holds.
pub(super) fn comparison(op: ComparisonOp, a: &Value, b: &Value) -> ExprResult<Value> {
    if a.is_null() || b.is_null() {
        return Ok(Value::Null);
    }
    if a.is_nan() || b.is_nan() {
        return Ok(Value::Boolean(op == ComparisonOp::NotEq));
    }
    let ordering = a
        .compare(b)
        .ok_or_else(|| ExprError::type_error(format!("cannot compare {} with {}", a, b)))?;
    Ok(Value::Boolean(op.test(ordering)))
}

fn truth(v: &Value) -> ExprResult<Option<bool>> {
    match v {
        Value::Null => Ok(None),
        Value::Boolean(b) => Ok(Some(*b)),
        other => Err(ExprError::type_error(format!("{} is not a boolean", other))),
    }
}

fn from_truth(t: Option<bool>) -> Value {
    t.map_or(Value::Null, Value::Boolean)
}

/// Three-valued logic. `args` holds one value for `Not`, two otherwise.
pub(super) fn logical(op: LogicalOp, args: &[Value]) -> ExprResult<Value> {
    let first = truth(&args[0])?;
    let result = match op {
        LogicalOp::Not => first.map(|b| !b),
        LogicalOp::And => match (first, truth(&args[1])?) {
            (Some(false), _) | (_, Some(false)) => Some(false),
            (Some(true), Some(true)) => Some(true),
            _ => None,
        },
        LogicalOp::Or => match (first, truth(&args[1])?) {
            (Some(true), _) | (_, Some(true)) => Some(true),
            (Some(false), Some(false)) => Some(false),
            _ => None,
        },
    };
    Ok(from_truth(result))
}

/// Returns the `AND`/`OR` result decided by the left operand alone.
pub(super) fn short_circuit(op: LogicalOp, left: &Value) -> Option<Value> {
    match (op, left) {
        (LogicalOp::And, Value::Boolean(false)) => Some(Value::Boolean(false)),
        (LogicalOp::Or, Value::Boolean(true)) => Some(Value::Boolean(true)),
        _ => None,
    }
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as i64)
}

fn string_arg<'a>(func: ScalarFunc, v: &'a Value) -> ExprResult<&'a str> {
    v.as_str().ok_or_else(|| {
        ExprError::type_error(format!("{:?} expects a string, got {}", func, v))
    })
}

/// Evaluates a scalar function. Nulls propagate except through `Coalesce`.
pub(super) fn function(func: ScalarFunc, args: &[Value], result: DataType) -> ExprResult<Value> {
    match func {
        ScalarFunc::Now => Ok(Value::Timestamp(now_millis())),
        ScalarFunc::Coalesce => {
            let first = args.iter().find(|v| !v.is_null()).cloned();
            Ok(coerce(first.unwrap_or(Value::Null), result))
        }
        _ if args.iter().any(Value::is_null) => Ok(Value::Null),
        ScalarFunc::Abs => match &args[0] {
            Value::Byte(i) => Ok(Value::Byte(i.wrapping_abs())),
            Value::Short(i) => Ok(Value::Short(i.wrapping_abs())),
            Value::Int(i) => Ok(Value::Int(i.wrapping_abs())),
            Value::Long(i) => Ok(Value::Long(i.wrapping_abs())),
            Value::Double(f) => Ok(Value::Double(f.abs())),
            other => Err(ExprError::type_error(format!("abs of {}", other))),
        },
        ScalarFunc::Lower => Ok(Value::String(string_arg(func, &args[0])?.to_lowercase())),
        ScalarFunc::Upper => Ok(Value::String(string_arg(func, &args[0])?.to_uppercase())),
        ScalarFunc::Length => {
            let len = match &args[0] {
                Value::Binary(b) => b.len(),
                other => string_arg(func, other)?.chars().count(),
            };
            Ok(Value::Int(i32::try_from(len).unwrap_or(i32::MAX)))
        }
        ScalarFunc::Concat => {
            let mut out = String::new();
            for arg in args {
                out.push_str(string_arg(func, arg)?);
            }
            Ok(Value::String(out))
        }
    }
}
