//! Column data types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Data types a column can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// Boolean type.
    Boolean,
    /// 8-bit signed integer.
    Byte,
    /// 16-bit signed integer.
    Short,
    /// 32-bit signed integer.
    Int,
    /// 64-bit signed integer.
    Long,
    /// 64-bit floating point.
    Double,
    /// UTF-8 string.
    String,
    /// Binary blob.
    Binary,
    /// Milliseconds since the Unix epoch.
    Timestamp,
    /// A string drawn from a closed set of labels.
    Enum,
}

impl DataType {
    /// Returns true for the integer variants.
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            DataType::Byte | DataType::Short | DataType::Int | DataType::Long
        )
    }

    /// Returns true if this type takes part in arithmetic.
    pub fn is_numeric(&self) -> bool {
        self.is_integer() || matches!(self, DataType::Double)
    }

    /// Returns true for the string-like variants.
    pub fn is_string(&self) -> bool {
        matches!(self, DataType::String | DataType::Enum)
    }

    /// Returns true if values of this type have a total order usable by
    /// `min`/`max` and range comparisons.
    pub fn is_orderable(&self) -> bool {
        !matches!(self, DataType::Boolean | DataType::Binary)
    }

    /// Returns true if two values of these types may be compared.
    pub fn is_comparable_with(&self, other: &DataType) -> bool {
        if self.is_numeric() && other.is_numeric() {
            return true;
        }
        if self.is_string() && other.is_string() {
            return true;
        }
        match (self, other) {
            (DataType::Timestamp, t) | (t, DataType::Timestamp) => {
                *t == DataType::Timestamp || t.is_integer()
            }
            (a, b) => a == b,
        }
    }

    /// Numeric promotion rank; higher ranks absorb lower ones.
    pub(crate) fn numeric_rank(&self) -> Option<u8> {
        match self {
            DataType::Byte => Some(0),
            DataType::Short => Some(1),
            DataType::Int => Some(2),
            DataType::Long => Some(3),
            DataType::Double => Some(4),
            _ => None,
        }
    }

    /// Returns the lower-case name used in messages and schemas.
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Boolean => "boolean",
            DataType::Byte => "byte",
            DataType::Short => "short",
            DataType::Int => "int",
            DataType::Long => "long",
            DataType::Double => "double",
            DataType::String => "string",
            DataType::Binary => "binary",
            DataType::Timestamp => "timestamp",
            DataType::Enum => "enum",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
