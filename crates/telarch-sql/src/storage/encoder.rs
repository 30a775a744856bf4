//! Tuple encoding and decoding.
//!
//! Converts between tuples and the key-value records of the raw tuple store.
//!
//! # Encoding Format
//!
//! ## Key Encoding
//! Keys sort by table, then by primary key:
//! - Keyspace tag (1 byte)
//! - Table ID (8 bytes, big-endian)
//! - Primary key values (comparable encoding, in key order)
//!
//! ## Value Encoding
//! - Number of columns (4 bytes, big-endian)
//! - For each column: type tag (1 byte) + data (little-endian; strings,
//!   enums and binary are prefixed by a 4-byte length)

use std::sync::Arc;

use telarch_common::constants::TUPLE_KEYSPACE_TAG;
use telarch_common::error::ArchiveError;
use telarch_common::types::{Key, Value as KvValue};
use telarch_kv::KeyRange;

use crate::encoding::encode_comparable;
use crate::schema::TupleSchema;
use crate::tuple::Tuple;
use crate::types::Value;

use super::error::{StorageError, StorageResult};
use super::table::TableDefinition;

/// Type tags for the value encoding.
#[repr(u8)]
#[derive(Debug, Clone, Copy)]
enum TypeTag {
    Null = 0,
    Boolean = 1,
    Byte = 2,
    Short = 3,
    Int = 4,
    Long = 5,
    Double = 6,
    String = 7,
    Binary = 8,
    Timestamp = 9,
    Enum = 10,
}

impl TypeTag {
    fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(TypeTag::Null),
            1 => Some(TypeTag::Boolean),
            2 => Some(TypeTag::Byte),
            3 => Some(TypeTag::Short),
            4 => Some(TypeTag::Int),
            5 => Some(TypeTag::Long),
            6 => Some(TypeTag::Double),
            7 => Some(TypeTag::String),
            8 => Some(TypeTag::Binary),
            9 => Some(TypeTag::Timestamp),
            10 => Some(TypeTag::Enum),
            _ => None,
        }
    }
}

/// Encodes and decodes the records of one table.
#[derive(Debug, Clone)]
pub struct TupleEncoder {
    table_id: u64,
    primary_key: Vec<usize>,
    schema: Arc<TupleSchema>,
}

impl TupleEncoder {
    /// Creates the encoder of `table`.
    pub fn new(table: &TableDefinition) -> Self {
        Self {
            table_id: table.table_id(),
            primary_key: table.primary_key_indices(),
            schema: Arc::clone(table.schema()),
        }
    }

    /// Returns the schema of decoded tuples.
    pub fn schema(&self) -> &Arc<TupleSchema> {
        &self.schema
    }

    fn prefix_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(64);
        buf.push(TUPLE_KEYSPACE_TAG);
        buf.extend_from_slice(&self.table_id.to_be_bytes());
        buf
    }

    /// Range covering every tuple of the table.
    pub fn table_range(&self) -> KeyRange {
        KeyRange::prefix(Key::from_vec(self.prefix_bytes()))
    }

    /// Key prefix of the tuples whose first primary key column holds `value`.
    pub fn leading_key(&self, value: &Value) -> Key {
        let mut buf = self.prefix_bytes();
        encode_comparable(value, &mut buf);
        Key::from_vec(buf)
    }

    /// Encodes a tuple's primary key to a storage key.
    pub fn encode_key(&self, tuple: &Tuple) -> StorageResult<Key> {
        let mut buf = self.prefix_bytes();
        for &idx in &self.primary_key {
            let value = tuple.get(idx).unwrap_or(&Value::Null);
            if value.is_null() {
                let column = self.schema.column(idx).map_or("?", |c| c.name());
                return Err(StorageError::InvalidTuple(format!(
                    "primary key column {} is null",
                    column
                )));
            }
            encode_comparable(value, &mut buf);
        }
        Ok(Key::from_vec(buf))
    }

    /// Encodes a tuple to a storage value.
    pub fn encode_value(&self, tuple: &Tuple) -> KvValue {
        let mut buf = Vec::with_capacity(128);
        buf.extend_from_slice(&(tuple.len() as u32).to_be_bytes());
        for value in tuple.values() {
            encode_single_value(value, &mut buf);
        }
        KvValue::from_vec(buf)
    }

    /// Decodes a storage value to a tuple of the table's schema.
    pub fn decode(&self, stored: &KvValue) -> StorageResult<Tuple> {
        let bytes = stored.as_bytes();
        if bytes.len() < 4 {
            return Err(corrupt("value too short"));
        }
        let num_cols = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
        if num_cols != self.schema.len() {
            return Err(corrupt(format!(
                "record has {} columns, table has {}",
                num_cols,
                self.schema.len()
            )));
        }

        let mut pos = 4;
        let mut values = Vec::with_capacity(num_cols);
        for _ in 0..num_cols {
            let (value, consumed) = decode_single_value(&bytes[pos..])?;
            values.push(value);
            pos += consumed;
        }
        if pos != bytes.len() {
            return Err(corrupt(format!("{} trailing bytes", bytes.len() - pos)));
        }

        Ok(Tuple::new(Arc::clone(&self.schema), values)?)
    }
}

fn corrupt(message: impl Into<String>) -> StorageError {
    StorageError::Kv(ArchiveError::corruption(message))
}

fn encode_bytes(tag: TypeTag, bytes: &[u8], buf: &mut Vec<u8>) {
    buf.push(tag as u8);
    buf.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
    buf.extend_from_slice(bytes);
}

fn encode_single_value(value: &Value, buf: &mut Vec<u8>) {
    match value {
        Value::Null => buf.push(TypeTag::Null as u8),
        Value::Boolean(b) => {
            buf.push(TypeTag::Boolean as u8);
            buf.push(u8::from(*b));
        }
        Value::Byte(i) => {
            buf.push(TypeTag::Byte as u8);
            buf.extend_from_slice(&i.to_le_bytes());
        }
        Value::Short(i) => {
            buf.push(TypeTag::Short as u8);
            buf.extend_from_slice(&i.to_le_bytes());
        }
        Value::Int(i) => {
            buf.push(TypeTag::Int as u8);
            buf.extend_from_slice(&i.to_le_bytes());
        }
        Value::Long(i) => {
            buf.push(TypeTag::Long as u8);
            buf.extend_from_slice(&i.to_le_bytes());
        }
        Value::Double(f) => {
            buf.push(TypeTag::Double as u8);
            buf.extend_from_slice(&f.to_le_bytes());
        }
        Value::Timestamp(t) => {
            buf.push(TypeTag::Timestamp as u8);
            buf.extend_from_slice(&t.to_le_bytes());
        }
        Value::String(s) => encode_bytes(TypeTag::String, s.as_bytes(), buf),
        Value::Enum(s) => encode_bytes(TypeTag::Enum, s.as_bytes(), buf),
        Value::Binary(b) => encode_bytes(TypeTag::Binary, b, buf),
    }
}

fn fixed<const N: usize>(bytes: &[u8], what: &str) -> StorageResult<[u8; N]> {
    bytes
        .get(1..1 + N)
        .and_then(|b| <[u8; N]>::try_from(b).ok())
        .ok_or_else(|| corrupt(format!("truncated {} value", what)))
}

fn variable(bytes: &[u8], what: &str) -> StorageResult<(Vec<u8>, usize)> {
    let len = u32::from_le_bytes(fixed::<4>(bytes, what)?) as usize;
    let data = bytes
        .get(5..5 + len)
        .ok_or_else(|| corrupt(format!("truncated {} value", what)))?;
    Ok((data.to_vec(), 5 + len))
}

fn utf8(data: Vec<u8>) -> StorageResult<String> {
    String::from_utf8(data).map_err(|e| corrupt(format!("invalid UTF-8: {}", e)))
}

fn decode_single_value(bytes: &[u8]) -> StorageResult<(Value, usize)> {
    let first = *bytes
        .first()
        .ok_or_else(|| corrupt("unexpected end of data"))?;
    let tag =
        TypeTag::from_u8(first).ok_or_else(|| corrupt(format!("unknown type tag: {}", first)))?;

    let decoded = match tag {
        TypeTag::Null => (Value::Null, 1),
        TypeTag::Boolean => (Value::Boolean(fixed::<1>(bytes, "boolean")?[0] != 0), 2),
        TypeTag::Byte => (Value::Byte(i8::from_le_bytes(fixed(bytes, "byte")?)), 2),
        TypeTag::Short => (Value::Short(i16::from_le_bytes(fixed(bytes, "short")?)), 3),
        TypeTag::Int => (Value::Int(i32::from_le_bytes(fixed(bytes, "int")?)), 5),
        TypeTag::Long => (Value::Long(i64::from_le_bytes(fixed(bytes, "long")?)), 9),
        TypeTag::Double => (Value::Double(f64::from_le_bytes(fixed(bytes, "double")?)), 9),
        TypeTag::Timestamp => (
            Value::Timestamp(i64::from_le_bytes(fixed(bytes, "timestamp")?)),
            9,
        ),
        TypeTag::String => {
            let (data, size) = variable(bytes, "string")?;
            (Value::String(utf8(data)?), size)
        }
        TypeTag::Enum => {
            let (data, size) = variable(bytes, "enum")?;
            (Value::Enum(utf8(data)?), size)
        }
        TypeTag::Binary => {
            let (data, size) = variable(bytes, "binary")?;
            (Value::Binary(data), size)
        }
    };
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DataType;

    fn table() -> TableDefinition {
        let schema = TupleSchema::empty()
            .with_column("gentime", DataType::Timestamp)
            .unwrap()
            .with_column("seqnum", DataType::Int)
            .unwrap()
            .with_column("name", DataType::String)
            .unwrap()
            .with_column("raw", DataType::Binary)
            .unwrap()
            .with_column("ok", DataType::Boolean)
            .unwrap()
            .with_column("eng", DataType::Double)
            .unwrap()
            .with_column("status", DataType::Enum)
            .unwrap();
        TableDefinition::new("tm", schema, "gentime")
            .with_primary_key(["gentime", "seqnum"])
            .with_table_id(3)
    }

    fn tuple(encoder: &TupleEncoder, t: i64, seq: i32) -> Tuple {
        Tuple::new(
            Arc::clone(encoder.schema()),
            vec![
                Value::Timestamp(t),
                Value::Int(seq),
                Value::string("a\0b"),
                Value::Binary(vec![0, 1, 2]),
                Value::Boolean(true),
                Value::Double(-2.5),
                Value::Enum("NOMINAL".to_string()),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_value_roundtrip() {
        let encoder = TupleEncoder::new(&table());
        let original = tuple(&encoder, 1000, 7);
        let decoded = encoder.decode(&encoder.encode_value(&original)).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_nulls_roundtrip() {
        let encoder = TupleEncoder::new(&table());
        let mut values = vec![Value::Timestamp(5), Value::Int(1)];
        values.resize(7, Value::Null);
        let original = Tuple::new(Arc::clone(encoder.schema()), values).unwrap();
        let decoded = encoder.decode(&encoder.encode_value(&original)).unwrap();
        assert!(decoded.get(2).unwrap().is_null());
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_keys_sort_by_primary_key() {
        let encoder = TupleEncoder::new(&table());
        let k = |t, s| encoder.encode_key(&tuple(&encoder, t, s)).unwrap();
        assert!(k(-1, 9) < k(0, 0));
        assert!(k(1000, 1) < k(1000, 2));
        assert!(k(1000, 2) < k(2000, -5));
        assert!(encoder.table_range().contains(&k(1000, 1)));
        assert!(k(1000, 1).starts_with(encoder.leading_key(&Value::Timestamp(1000)).as_bytes()));
    }

    #[test]
    fn test_null_key_rejected() {
        let encoder = TupleEncoder::new(&table());
        let mut values = vec![Value::Timestamp(5), Value::Null];
        values.resize(7, Value::Null);
        let tuple = Tuple::new(Arc::clone(encoder.schema()), values).unwrap();
        assert!(matches!(encoder.encode_key(&tuple), Err(StorageError::InvalidTuple(_))));
    }

    #[test]
    fn test_corrupt_records() {
        let encoder = TupleEncoder::new(&table());
        let corrupt = |bytes: &[u8]| {
            matches!(
                encoder.decode(&KvValue::from_bytes(bytes)),
                Err(StorageError::Kv(ArchiveError::Corruption { .. }))
            )
        };
        assert!(corrupt(b"ab"));
        assert!(corrupt(&[0, 0, 0, 1, 0]));
        assert!(corrupt(&[0, 0, 0, 7, 9, 1, 2]));

        let mut trailing = encoder
            .encode_value(&tuple(&encoder, 1, 1))
            .as_bytes()
            .to_vec();
        trailing.push(0);
        assert!(corrupt(&trailing));
    }
}
