//! Filter pushdown.
//!
//! `column <op> constant` conditions of an `AND` chain can be handed to a
//! [`FilterableTarget`] such as a table scan, which may use them to narrow
//! what it reads. The conditions the target does not take stay in the
//! residual expression.

use std::fmt;

use tracing::debug;

use super::{ComparisonOp, ExprError, ExprKind, ExprResult, ExpressionNode, LogicalOp};
use crate::tuple::Tuple;
use crate::types::Value;

/// A `column <op> value` condition.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnFilter {
    column: String,
    op: ComparisonOp,
    value: Value,
}

impl ColumnFilter {
    /// Creates a filter.
    pub fn new(column: impl Into<String>, op: ComparisonOp, value: Value) -> Self {
        Self {
            column: column.into(),
            op,
            value,
        }
    }

    /// Returns the filtered column.
    pub fn column(&self) -> &str {
        &self.column
    }

    /// Returns the operator, with the column on the left.
    pub fn op(&self) -> ComparisonOp {
        self.op
    }

    /// Returns the constant operand.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Tests a tuple.
    ///
    /// A tuple whose schema lacks the column fails with
    /// [`ExprError::MissingColumn`]; a null column value does not match.
    /// NaN matches only `!=`, like the compiled comparison.
    pub fn matches(&self, tuple: &Tuple) -> ExprResult<bool> {
        let value = tuple
            .column(&self.column)
            .ok_or_else(|| ExprError::MissingColumn {
                column: self.column.clone(),
            })?;
        if value.is_null() {
            return Ok(false);
        }
        if value.is_nan() || self.value.is_nan() {
            return Ok(self.op == ComparisonOp::NotEq);
        }
        let ordering = value.compare(&self.value).ok_or_else(|| {
            ExprError::type_error(format!("cannot compare {} with {}", value, self.value))
        })?;
        Ok(self.op.test(ordering))
    }
}

impl fmt::Display for ColumnFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.column, self.op.symbol(), self.value)
    }
}

/// Something that can apply column filters itself.
pub trait FilterableTarget {
    /// Offers a filter; returns true if the target took it.
    fn add_column_filter(&mut self, filter: &ColumnFilter) -> bool;
}

impl ExpressionNode {
    /// Pushes the `column <op> constant` conjuncts of this bound expression
    /// into `target`.
    ///
    /// Returns what remains to be evaluated, or `None` if the target took
    /// every condition.
    pub fn add_filter(
        mut self,
        target: &mut dyn FilterableTarget,
    ) -> ExprResult<Option<ExpressionNode>> {
        if !self.is_bound() {
            return Err(ExprError::NotBound);
        }
        match self.kind {
            ExprKind::Logical(LogicalOp::And) => {
                let mut children = std::mem::take(&mut self.children).into_iter();
                let (Some(left), Some(right)) = (children.next(), children.next()) else {
                    return Err(ExprError::compile("malformed AND node"));
                };
                match (left.add_filter(target)?, right.add_filter(target)?) {
                    (None, None) => Ok(None),
                    (Some(rest), None) | (None, Some(rest)) => Ok(Some(rest)),
                    (Some(l), Some(r)) => {
                        self.children = vec![l, r];
                        Ok(Some(self))
                    }
                }
            }
            ExprKind::Comparison(op) => match self.as_column_filter(op) {
                Some(filter) if target.add_column_filter(&filter) => {
                    debug!(filter = %filter, "pushed filter into target");
                    Ok(None)
                }
                _ => Ok(Some(self)),
            },
            _ => Ok(Some(self)),
        }
    }

    fn as_column_filter(&self, op: ComparisonOp) -> Option<ColumnFilter> {
        let (left, right) = (&self.children[0], &self.children[1]);
        let constant =
            |node: &ExpressionNode| node.constant_value().filter(|v| !v.is_null()).cloned();
        match (&left.kind, &right.kind) {
            (ExprKind::Column(name), _) => {
                constant(right).map(|v| ColumnFilter::new(name.clone(), op, v))
            }
            (_, ExprKind::Column(name)) => {
                constant(left).map(|v| ColumnFilter::new(name.clone(), op.mirror(), v))
            }
            _ => None,
        }
    }
}
