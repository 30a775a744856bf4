//! Runtime values.
//!
//! `Value::Null` stands for an absent column value. Numeric values compare
//! across integer and floating variants; timestamps compare with integers.

use std::cmp::Ordering;
use std::fmt;

use super::DataType;

/// A column value.
#[derive(Debug, Clone)]
pub enum Value {
    /// Absent value.
    Null,
    /// Boolean value.
    Boolean(bool),
    /// 8-bit signed integer.
    Byte(i8),
    /// 16-bit signed integer.
    Short(i16),
    /// 32-bit signed integer.
    Int(i32),
    /// 64-bit signed integer.
    Long(i64),
    /// 64-bit floating point.
    Double(f64),
    /// String value.
    String(String),
    /// Binary data.
    Binary(Vec<u8>),
    /// Milliseconds since the Unix epoch.
    Timestamp(i64),
    /// Enumeration label.
    Enum(String),
}

impl Value {
    /// Creates a string value.
    pub fn string(v: impl Into<String>) -> Self {
        Value::String(v.into())
    }

    /// Returns true if this value is absent.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the data type of this value, `None` for `Null`.
    pub fn data_type(&self) -> Option<DataType> {
        Some(match self {
            Value::Null => return None,
            Value::Boolean(_) => DataType::Boolean,
            Value::Byte(_) => DataType::Byte,
            Value::Short(_) => DataType::Short,
            Value::Int(_) => DataType::Int,
            Value::Long(_) => DataType::Long,
            Value::Double(_) => DataType::Double,
            Value::String(_) => DataType::String,
            Value::Binary(_) => DataType::Binary,
            Value::Timestamp(_) => DataType::Timestamp,
            Value::Enum(_) => DataType::Enum,
        })
    }

    /// Returns true for a NaN double.
    pub fn is_nan(&self) -> bool {
        matches!(self, Value::Double(f) if f.is_nan())
    }

    /// Returns the value as an `i64` for integers and timestamps.
    pub fn to_i64(&self) -> Option<i64> {
        match self {
            Value::Byte(i) => Some(i64::from(*i)),
            Value::Short(i) => Some(i64::from(*i)),
            Value::Int(i) => Some(i64::from(*i)),
            Value::Long(i) | Value::Timestamp(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the value as an `f64` for numeric values and timestamps.
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            Value::Double(f) => Some(*f),
            other => other.to_i64().map(|i| i as f64),
        }
    }

    /// Returns the text of string and enum values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Enum(s) => Some(s),
            _ => None,
        }
    }

    /// Converts the value to `target` when no information is lost.
    ///
    /// Integers convert between integer widths and timestamps when they fit,
    /// and to doubles when the double holds them exactly. Strings and enums
    /// convert into each other. Returns `None` otherwise.
    pub fn cast_to(&self, target: DataType) -> Option<Value> {
        if self.data_type() == Some(target) {
            return Some(self.clone());
        }
        match target {
            DataType::Byte => self.to_i64().and_then(|i| i8::try_from(i).ok()).map(Value::Byte),
            DataType::Short => self.to_i64().and_then(|i| i16::try_from(i).ok()).map(Value::Short),
            DataType::Int => self.to_i64().and_then(|i| i32::try_from(i).ok()).map(Value::Int),
            DataType::Long => self.to_i64().map(Value::Long),
            DataType::Timestamp => self.to_i64().map(Value::Timestamp),
            DataType::Double => self.to_i64().and_then(exact_f64).map(Value::Double),
            DataType::String => self.as_str().map(Value::string),
            DataType::Enum => self.as_str().map(|s| Value::Enum(s.to_string())),
            DataType::Boolean | DataType::Binary => None,
        }
    }

    /// Compares two non-null values of comparable types.
    ///
    /// Returns `None` when either side is null or the types cannot be
    /// compared.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, _) | (_, Value::Null) => None,
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            (Value::Binary(a), Value::Binary(b)) => Some(a.cmp(b)),
            (Value::Double(_), _) | (_, Value::Double(_)) => {
                self.to_f64()?.partial_cmp(&other.to_f64()?)
            }
            (a, b) => match (a.to_i64(), b.to_i64()) {
                (Some(x), Some(y)) => Some(x.cmp(&y)),
                _ => Some(a.as_str()?.cmp(b.as_str()?)),
            },
        }
    }
}

/// `i` as a double, if the conversion round-trips.
fn exact_f64(i: i64) -> Option<f64> {
    let f = i as f64;
    // 2^63 saturates back to i64::MAX
    (f < 9_223_372_036_854_775_808.0 && f as i64 == i).then_some(f)
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Null, _) | (_, Value::Null) => false,
            _ => self.compare(other) == Some(Ordering::Equal),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            (Value::Null, _) => Some(Ordering::Less),
            (_, Value::Null) => Some(Ordering::Greater),
            _ => self.compare(other),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Byte(i) => write!(f, "{}", i),
            Value::Short(i) => write!(f, "{}", i),
            Value::Int(i) => write!(f, "{}", i),
            Value::Long(i) => write!(f, "{}", i),
            Value::Double(v) => write!(f, "{}", v),
            Value::String(s) | Value::Enum(s) => write!(f, "{}", s),
            Value::Binary(b) => {
                write!(f, "0x")?;
                for byte in b {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
            Value::Timestamp(t) => write!(f, "ts:{}", t),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Binary(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cast_to() {
        assert_eq!(Value::Long(5).cast_to(DataType::Timestamp), Some(Value::Timestamp(5)));
        assert_eq!(Value::Int(300).cast_to(DataType::Byte), None);
        assert!(matches!(Value::Int(7).cast_to(DataType::Short), Some(Value::Short(7))));
        assert_eq!(Value::Double(1.5).cast_to(DataType::Int), None);
        assert!(matches!(
            Value::string("on").cast_to(DataType::Enum),
            Some(Value::Enum(s)) if s == "on"
        ));
        assert_eq!(Value::Null.cast_to(DataType::Int), None);
    }

    #[test]
    fn test_cast_to_double_is_exact() {
        assert!(matches!(Value::Int(7).cast_to(DataType::Double), Some(Value::Double(f)) if f == 7.0));
        let big = (1_i64 << 53) + 1;
        assert_eq!(Value::Long(big).cast_to(DataType::Double), None);
        assert!(Value::Long(1 << 60).cast_to(DataType::Double).is_some());
        assert_eq!(Value::Long(i64::MAX).cast_to(DataType::Double), None);
        assert!(Value::Long(i64::MIN).cast_to(DataType::Double).is_some());
    }

    #[test]
    fn test_nan() {
        assert!(Value::Double(f64::NAN).is_nan());
        assert!(!Value::Double(1.0).is_nan());
        assert!(!Value::Null.is_nan());
        assert_eq!(Value::Double(f64::NAN).compare(&Value::Int(1)), None);
    }

    #[test]
    fn test_null() {
        assert!(Value::Null.is_null());
        assert_eq!(Value::Null.data_type(), None);
        assert_eq!(Value::Null, Value::Null);
        assert_ne!(Value::Null, Value::Int(0));
    }

    #[test]
    fn test_cross_type_numeric_equality() {
        assert_eq!(Value::Int(10), Value::Double(10.0));
        assert_eq!(Value::Byte(3), Value::Long(3));
        assert!(Value::Int(10) < Value::Double(10.5));
    }

    #[test]
    fn test_timestamp_compares_with_integers() {
        assert_eq!(
            Value::Timestamp(5).compare(&Value::Long(7)),
            Some(Ordering::Less)
        );
    }

    #[test]
    fn test_string_and_enum_compare() {
        assert_eq!(Value::Enum("ON".into()), Value::string("ON"));
        assert!(Value::string("a") < Value::string("b"));
    }

    #[test]
    fn test_incompatible_types_do_not_compare() {
        assert_eq!(Value::string("1").compare(&Value::Int(1)), None);
        assert_ne!(Value::Boolean(true), Value::Int(1));
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Binary(vec![0xde, 0xad]).to_string(), "0xdead");
        assert_eq!(Value::Timestamp(42).to_string(), "ts:42");
        assert_eq!(Value::from("p1").to_string(), "p1");
    }
}
