//! Expression errors.

use thiserror::Error;

/// Errors raised while binding, compiling or evaluating expressions.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    /// Operand types do not fit the operator, or a column is unknown.
    #[error("type error: {message}")]
    Type {
        /// Description of the mismatch.
        message: String,
    },

    /// The expression is already bound to a different schema.
    #[error("expression {name} is bound to a different schema")]
    UnboundColumn {
        /// Output name of the offending node.
        name: String,
    },

    /// A strict filter found no such column in the tuple.
    #[error("missing column: {column}")]
    MissingColumn {
        /// Column name.
        column: String,
    },

    /// The expression cannot be compiled.
    #[error("compile error: {message}")]
    Compile {
        /// Reason.
        message: String,
    },

    /// Division or modulo by zero.
    #[error("division by zero")]
    DivisionByZero,

    /// The operation needs a bound expression.
    #[error("expression is not bound")]
    NotBound,
}

impl ExprError {
    /// Creates a type error.
    pub fn type_error(message: impl Into<String>) -> Self {
        ExprError::Type {
            message: message.into(),
        }
    }

    /// Creates a compile error.
    pub fn compile(message: impl Into<String>) -> Self {
        ExprError::Compile {
            message: message.into(),
        }
    }
}

/// Result type of expression operations.
pub type ExprResult<T> = Result<T, ExprError>;
