//! Typed expression trees.
//!
//! An [`ExpressionNode`] tree is built from constructors, bound to a
//! [`TupleSchema`](crate::schema::TupleSchema) with
//! [`bind`](ExpressionNode::bind), and compiled into a
//! [`CompiledEvaluator`] that evaluates it against tuples.
//!
//! ```text
//! build  ──►  bind(schema)  ──►  compile()  ──►  evaluate(&tuple)
//!                 │
//!                 ├─ resolves types and output names (post-order)
//!                 └─ folds constant subtrees
//! ```

mod aggregate;
mod bind;
mod compile;
mod error;
mod filter;
mod ops;

use std::fmt;
use std::sync::Arc;

pub use aggregate::{Accumulator, CompiledAggregate};
pub use compile::CompiledEvaluator;
pub use error::{ExprError, ExprResult};
pub use filter::{ColumnFilter, FilterableTarget};

use crate::schema::TupleSchema;
use crate::types::{DataType, Value};

/// Arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithmeticOp {
    /// `+`
    Add,
    /// `-`
    Subtract,
    /// `*`
    Multiply,
    /// `/`
    Divide,
    /// `%`
    Modulo,
}

impl ArithmeticOp {
    /// Returns the operator symbol.
    pub fn symbol(&self) -> &'static str {
        match self {
            ArithmeticOp::Add => "+",
            ArithmeticOp::Subtract => "-",
            ArithmeticOp::Multiply => "*",
            ArithmeticOp::Divide => "/",
            ArithmeticOp::Modulo => "%",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            ArithmeticOp::Add => "add",
            ArithmeticOp::Subtract => "sub",
            ArithmeticOp::Multiply => "mul",
            ArithmeticOp::Divide => "div",
            ArithmeticOp::Modulo => "mod",
        }
    }
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOp {
    /// `=`
    Eq,
    /// `!=`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
}

impl ComparisonOp {
    /// Returns the operator symbol.
    pub fn symbol(&self) -> &'static str {
        match self {
            ComparisonOp::Eq => "=",
            ComparisonOp::NotEq => "!=",
            ComparisonOp::Lt => "<",
            ComparisonOp::LtEq => "<=",
            ComparisonOp::Gt => ">",
            ComparisonOp::GtEq => ">=",
        }
    }

    /// Returns the operator that gives the same result with swapped
    /// operands (`a < b` is `b > a`).
    pub fn mirror(&self) -> ComparisonOp {
        match self {
            ComparisonOp::Eq => ComparisonOp::Eq,
            ComparisonOp::NotEq => ComparisonOp::NotEq,
            ComparisonOp::Lt => ComparisonOp::Gt,
            ComparisonOp::LtEq => ComparisonOp::GtEq,
            ComparisonOp::Gt => ComparisonOp::Lt,
            ComparisonOp::GtEq => ComparisonOp::LtEq,
        }
    }

    /// Applies the operator to an ordering.
    pub fn test(&self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::*;
        match self {
            ComparisonOp::Eq => ordering == Equal,
            ComparisonOp::NotEq => ordering != Equal,
            ComparisonOp::Lt => ordering == Less,
            ComparisonOp::LtEq => ordering != Greater,
            ComparisonOp::Gt => ordering == Greater,
            ComparisonOp::GtEq => ordering != Less,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            ComparisonOp::Eq => "eq",
            ComparisonOp::NotEq => "ne",
            ComparisonOp::Lt => "lt",
            ComparisonOp::LtEq => "le",
            ComparisonOp::Gt => "gt",
            ComparisonOp::GtEq => "ge",
        }
    }
}

/// Logical operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalOp {
    /// Conjunction.
    And,
    /// Disjunction.
    Or,
    /// Negation (one operand).
    Not,
}

impl LogicalOp {
    fn label(&self) -> &'static str {
        match self {
            LogicalOp::And => "and",
            LogicalOp::Or => "or",
            LogicalOp::Not => "not",
        }
    }
}

/// Aggregate functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateFunc {
    /// Number of tuples, or of non-null operand values.
    Count,
    /// Sum of the operand.
    Sum,
    /// Smallest operand value.
    Min,
    /// Largest operand value.
    Max,
    /// Mean of the operand.
    Avg,
}

impl AggregateFunc {
    fn label(&self) -> &'static str {
        match self {
            AggregateFunc::Count => "count",
            AggregateFunc::Sum => "sum",
            AggregateFunc::Min => "min",
            AggregateFunc::Max => "max",
            AggregateFunc::Avg => "avg",
        }
    }
}

/// Scalar functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarFunc {
    /// Absolute value.
    Abs,
    /// Lower-case string.
    Lower,
    /// Upper-case string.
    Upper,
    /// Character count of a string, byte count of binary.
    Length,
    /// String concatenation.
    Concat,
    /// First non-null argument.
    Coalesce,
    /// Current wall-clock time; never folded.
    Now,
}

impl ScalarFunc {
    /// Returns true if the function always returns the same result for the
    /// same arguments.
    pub fn is_deterministic(&self) -> bool {
        !matches!(self, ScalarFunc::Now)
    }

    fn label(&self) -> &'static str {
        match self {
            ScalarFunc::Abs => "abs",
            ScalarFunc::Lower => "lower",
            ScalarFunc::Upper => "upper",
            ScalarFunc::Length => "length",
            ScalarFunc::Concat => "concat",
            ScalarFunc::Coalesce => "coalesce",
            ScalarFunc::Now => "now",
        }
    }
}

/// The kind of an expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// A constant.
    Literal(Value),
    /// A column reference.
    Column(String),
    /// Binary arithmetic.
    Arithmetic(ArithmeticOp),
    /// Binary comparison.
    Comparison(ComparisonOp),
    /// Boolean logic.
    Logical(LogicalOp),
    /// An aggregate over the input tuples.
    Aggregate(AggregateFunc),
    /// A scalar function call.
    Function(ScalarFunc),
}

impl ExprKind {
    fn label(&self) -> &'static str {
        match self {
            ExprKind::Literal(_) => "literal",
            ExprKind::Column(_) => "column",
            ExprKind::Arithmetic(op) => op.label(),
            ExprKind::Comparison(op) => op.label(),
            ExprKind::Logical(op) => op.label(),
            ExprKind::Aggregate(func) => func.label(),
            ExprKind::Function(func) => func.label(),
        }
    }
}

/// A node of a typed expression tree.
///
/// Children are owned by their parent. Type, output name and folded
/// constant are filled in by [`bind`](Self::bind).
#[derive(Debug, Clone)]
pub struct ExpressionNode {
    kind: ExprKind,
    children: Vec<ExpressionNode>,
    /// True if this node or any descendant is an aggregate.
    has_aggregates: bool,
    data_type: Option<DataType>,
    constant: Option<Value>,
    alias: Option<String>,
    name: Option<String>,
    bound_schema: Option<Arc<TupleSchema>>,
}

impl ExpressionNode {
    fn new(kind: ExprKind, children: Vec<ExpressionNode>) -> Self {
        let has_aggregates = matches!(kind, ExprKind::Aggregate(_))
            || children.iter().any(|c| c.has_aggregates);
        Self {
            kind,
            children,
            has_aggregates,
            data_type: None,
            constant: None,
            alias: None,
            name: None,
            bound_schema: None,
        }
    }

    /// A constant value.
    pub fn literal(value: impl Into<Value>) -> Self {
        Self::new(ExprKind::Literal(value.into()), Vec::new())
    }

    /// A column reference.
    pub fn column(name: impl Into<String>) -> Self {
        Self::new(ExprKind::Column(name.into()), Vec::new())
    }

    /// `left <op> right`.
    pub fn arithmetic(op: ArithmeticOp, left: ExpressionNode, right: ExpressionNode) -> Self {
        Self::new(ExprKind::Arithmetic(op), vec![left, right])
    }

    /// `left <op> right`.
    pub fn comparison(op: ComparisonOp, left: ExpressionNode, right: ExpressionNode) -> Self {
        Self::new(ExprKind::Comparison(op), vec![left, right])
    }

    /// `left AND right`.
    pub fn and(left: ExpressionNode, right: ExpressionNode) -> Self {
        Self::new(ExprKind::Logical(LogicalOp::And), vec![left, right])
    }

    /// `left OR right`.
    pub fn or(left: ExpressionNode, right: ExpressionNode) -> Self {
        Self::new(ExprKind::Logical(LogicalOp::Or), vec![left, right])
    }

    /// `NOT operand`.
    #[allow(clippy::should_implement_trait)]
    pub fn not(operand: ExpressionNode) -> Self {
        Self::new(ExprKind::Logical(LogicalOp::Not), vec![operand])
    }

    /// An aggregate over `operand`.
    pub fn aggregate(func: AggregateFunc, operand: ExpressionNode) -> Self {
        Self::new(ExprKind::Aggregate(func), vec![operand])
    }

    /// `count(*)`.
    pub fn count_all() -> Self {
        Self::new(ExprKind::Aggregate(AggregateFunc::Count), Vec::new())
    }

    /// A scalar function call.
    pub fn function(func: ScalarFunc, args: Vec<ExpressionNode>) -> Self {
        Self::new(ExprKind::Function(func), args)
    }

    /// Sets the output column name.
    pub fn set_alias(&mut self, alias: impl Into<String>) {
        let alias = alias.into();
        if self.bound_schema.is_some() {
            self.name = Some(alias.clone());
        }
        self.alias = Some(alias);
    }

    /// Builder-style [`set_alias`](Self::set_alias).
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.set_alias(alias);
        self
    }

    /// Returns the node kind.
    pub fn kind(&self) -> &ExprKind {
        &self.kind
    }

    /// Returns the children.
    pub fn children(&self) -> &[ExpressionNode] {
        &self.children
    }

    /// Returns the resolved type; `None` until bound.
    pub fn data_type(&self) -> Option<DataType> {
        self.data_type
    }

    /// Returns true if the value was folded at bind time.
    pub fn is_constant(&self) -> bool {
        self.constant.is_some()
    }

    /// Returns the folded value.
    pub fn constant_value(&self) -> Option<&Value> {
        self.constant.as_ref()
    }

    /// Returns true if this node or any descendant is an aggregate.
    pub fn has_aggregates(&self) -> bool {
        self.has_aggregates
    }

    /// Returns true if this node is an aggregate.
    pub fn is_aggregate(&self) -> bool {
        matches!(self.kind, ExprKind::Aggregate(_))
    }

    /// Returns true once the node is bound.
    pub fn is_bound(&self) -> bool {
        self.bound_schema.is_some()
    }

    /// Returns the schema the node is bound to.
    pub fn bound_schema(&self) -> Option<&Arc<TupleSchema>> {
        self.bound_schema.as_ref()
    }

    /// Returns the output column name.
    ///
    /// The alias wins if set; otherwise columns are named after the column
    /// they read and other nodes get the name synthesized by `bind`.
    pub fn column_name(&self) -> Option<&str> {
        if let Some(alias) = &self.alias {
            return Some(alias);
        }
        if let ExprKind::Column(name) = &self.kind {
            return Some(name);
        }
        self.name.as_deref()
    }

    /// Returns the aggregate nodes of the tree, left to right.
    ///
    /// The operands of an aggregate are not searched.
    pub fn collect_aggregates(&self) -> Vec<&ExpressionNode> {
        let mut out = Vec::new();
        self.collect_aggregates_into(&mut out);
        out
    }

    fn collect_aggregates_into<'a>(&'a self, out: &mut Vec<&'a ExpressionNode>) {
        if self.is_aggregate() {
            out.push(self);
            return;
        }
        for child in self.children.iter().filter(|c| c.has_aggregates) {
            child.collect_aggregates_into(out);
        }
    }

    fn display_name(&self) -> String {
        self.column_name().map_or_else(|| self.to_string(), str::to_string)
    }
}

impl fmt::Display for ExpressionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Literal(Value::String(s)) => write!(f, "'{}'", s),
            ExprKind::Literal(v) => write!(f, "{}", v),
            ExprKind::Column(name) => write!(f, "{}", name),
            ExprKind::Arithmetic(op) => {
                write!(f, "({} {} {})", self.children[0], op.symbol(), self.children[1])
            }
            ExprKind::Comparison(op) => {
                write!(f, "({} {} {})", self.children[0], op.symbol(), self.children[1])
            }
            ExprKind::Logical(LogicalOp::Not) => write!(f, "NOT {}", self.children[0]),
            ExprKind::Logical(op) => {
                let word = if *op == LogicalOp::And { "AND" } else { "OR" };
                write!(f, "({} {} {})", self.children[0], word, self.children[1])
            }
            ExprKind::Aggregate(_) | ExprKind::Function(_) => {
                write!(f, "{}(", self.kind.label())?;
                if self.children.is_empty() && self.is_aggregate() {
                    write!(f, "*")?;
                }
                for (i, child) in self.children.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", child)?;
                }
                write!(f, ")")
            }
        }
    }
}
