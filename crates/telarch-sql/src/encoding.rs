//! Order-preserving value encoding.
//!
//! Encoded values compare bytewise in the same order as the values they
//! encode, so they can be concatenated into KV keys and range-scanned.
//!
//! # Format
//!
//! Every value starts with a one-byte type tag. Then:
//! - integers and timestamps: big-endian with the sign bit flipped
//! - doubles: IEEE bits, all bits flipped for negatives, sign bit flipped
//!   otherwise
//! - strings, enums and binary: bytes with `0x00` escaped as `0x00 0xFF`,
//!   terminated by `0x00 0x00`
//! - booleans: one byte
//!
//! The encoding is prefix-free: no encoded value is a prefix of another.

use crate::types::Value;

const TAG_NULL: u8 = 0x00;
const TAG_BOOLEAN: u8 = 0x01;
const TAG_BYTE: u8 = 0x02;
const TAG_SHORT: u8 = 0x03;
const TAG_INT: u8 = 0x04;
const TAG_LONG: u8 = 0x05;
const TAG_DOUBLE: u8 = 0x06;
const TAG_STRING: u8 = 0x07;
const TAG_BINARY: u8 = 0x08;
const TAG_TIMESTAMP: u8 = 0x09;
const TAG_ENUM: u8 = 0x0A;

const ESCAPE: u8 = 0x00;
const ESCAPED_ZERO: u8 = 0xFF;
const TERMINATOR: u8 = 0x00;

/// Error raised when encoded bytes cannot be decoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed encoding: {0}")]
pub struct DecodeError(pub String);

impl DecodeError {
    fn truncated(what: &str) -> Self {
        DecodeError(format!("truncated {}", what))
    }
}

/// Encodes an `i64` so that byte order matches numeric order.
pub fn encode_sortable_i64(v: i64) -> [u8; 8] {
    ((v as u64) ^ 0x8000_0000_0000_0000).to_be_bytes()
}

/// Inverse of [`encode_sortable_i64`].
pub fn decode_sortable_i64(bytes: &[u8]) -> Result<i64, DecodeError> {
    let raw: [u8; 8] = bytes
        .get(..8)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| DecodeError::truncated("i64"))?;
    Ok((u64::from_be_bytes(raw) ^ 0x8000_0000_0000_0000) as i64)
}

/// Appends the comparable encoding of `value` to `buf`.
pub fn encode_comparable(value: &Value, buf: &mut Vec<u8>) {
    match value {
        Value::Null => buf.push(TAG_NULL),
        Value::Boolean(b) => {
            buf.push(TAG_BOOLEAN);
            buf.push(u8::from(*b));
        }
        Value::Byte(i) => {
            buf.push(TAG_BYTE);
            buf.push((*i as u8) ^ 0x80);
        }
        Value::Short(i) => {
            buf.push(TAG_SHORT);
            buf.extend_from_slice(&((*i as u16) ^ 0x8000).to_be_bytes());
        }
        Value::Int(i) => {
            buf.push(TAG_INT);
            buf.extend_from_slice(&((*i as u32) ^ 0x8000_0000).to_be_bytes());
        }
        Value::Long(i) => {
            buf.push(TAG_LONG);
            buf.extend_from_slice(&encode_sortable_i64(*i));
        }
        Value::Timestamp(t) => {
            buf.push(TAG_TIMESTAMP);
            buf.extend_from_slice(&encode_sortable_i64(*t));
        }
        Value::Double(f) => {
            buf.push(TAG_DOUBLE);
            let bits = f.to_bits();
            let ordered = if bits & 0x8000_0000_0000_0000 != 0 {
                !bits
            } else {
                bits ^ 0x8000_0000_0000_0000
            };
            buf.extend_from_slice(&ordered.to_be_bytes());
        }
        Value::String(s) => {
            buf.push(TAG_STRING);
            encode_escaped(s.as_bytes(), buf);
        }
        Value::Enum(s) => {
            buf.push(TAG_ENUM);
            encode_escaped(s.as_bytes(), buf);
        }
        Value::Binary(b) => {
            buf.push(TAG_BINARY);
            encode_escaped(b, buf);
        }
    }
}

/// Returns the comparable encoding of `value` as a fresh buffer.
pub fn comparable_bytes(value: &Value) -> Vec<u8> {
    let mut buf = Vec::with_capacity(16);
    encode_comparable(value, &mut buf);
    buf
}

fn encode_escaped(bytes: &[u8], buf: &mut Vec<u8>) {
    for &b in bytes {
        if b == ESCAPE {
            buf.push(ESCAPE);
            buf.push(ESCAPED_ZERO);
        } else {
            buf.push(b);
        }
    }
    buf.push(ESCAPE);
    buf.push(TERMINATOR);
}

/// Decodes one comparable value from the front of `bytes`.
///
/// Returns the value and the number of bytes consumed.
pub fn decode_comparable(bytes: &[u8]) -> Result<(Value, usize), DecodeError> {
    let (&tag, rest) = bytes
        .split_first()
        .ok_or_else(|| DecodeError::truncated("type tag"))?;

    let fixed = |n: usize| -> Result<&[u8], DecodeError> {
        rest.get(..n).ok_or_else(|| DecodeError::truncated("fixed-width value"))
    };

    let (value, consumed) = match tag {
        TAG_NULL => (Value::Null, 0),
        TAG_BOOLEAN => (Value::Boolean(fixed(1)?[0] != 0), 1),
        TAG_BYTE => (Value::Byte((fixed(1)?[0] ^ 0x80) as i8), 1),
        TAG_SHORT => {
            let b = fixed(2)?;
            (Value::Short((u16::from_be_bytes([b[0], b[1]]) ^ 0x8000) as i16), 2)
        }
        TAG_INT => {
            let b = fixed(4)?;
            let raw = u32::from_be_bytes([b[0], b[1], b[2], b[3]]);
            (Value::Int((raw ^ 0x8000_0000) as i32), 4)
        }
        TAG_LONG => (Value::Long(decode_sortable_i64(rest)?), 8),
        TAG_TIMESTAMP => (Value::Timestamp(decode_sortable_i64(rest)?), 8),
        TAG_DOUBLE => {
            let b = fixed(8)?;
            let mut raw = [0u8; 8];
            raw.copy_from_slice(b);
            let ordered = u64::from_be_bytes(raw);
            let bits = if ordered & 0x8000_0000_0000_0000 != 0 {
                ordered ^ 0x8000_0000_0000_0000
            } else {
                !ordered
            };
            (Value::Double(f64::from_bits(bits)), 8)
        }
        TAG_STRING | TAG_ENUM => {
            let (raw, n) = decode_escaped(rest)?;
            let s = String::from_utf8(raw).map_err(|e| DecodeError(e.to_string()))?;
            let value = if tag == TAG_STRING {
                Value::String(s)
            } else {
                Value::Enum(s)
            };
            (value, n)
        }
        TAG_BINARY => {
            let (raw, n) = decode_escaped(rest)?;
            (Value::Binary(raw), n)
        }
        other => return Err(DecodeError(format!("unknown type tag 0x{:02x}", other))),
    };

    Ok((value, consumed + 1))
}

fn decode_escaped(bytes: &[u8]) -> Result<(Vec<u8>, usize), DecodeError> {
    let mut out = Vec::new();
    let mut pos = 0;
    loop {
        let b = *bytes
            .get(pos)
            .ok_or_else(|| DecodeError::truncated("variable-length value"))?;
        if b != ESCAPE {
            out.push(b);
            pos += 1;
            continue;
        }
        match bytes.get(pos + 1) {
            Some(&TERMINATOR) => return Ok((out, pos + 2)),
            Some(&ESCAPED_ZERO) => {
                out.push(0);
                pos += 2;
            }
            Some(other) => {
                return Err(DecodeError(format!("bad escape byte 0x{:02x}", other)));
            }
            None => return Err(DecodeError::truncated("escape sequence")),
        }
    }
}
