//! Key layout of histogram records.
//!
//! ```text
//! key:   0x02 | table_id u64 BE | column_ordinal u32 BE | comparable(value) | sortable(start)
//! value: sortable(stop) | count u32 BE
//! ```
//!
//! Keys sort by value, then by start. The comparable value encoding is
//! prefix-free, so the records of one value form a contiguous key range.

use telarch_common::constants::HISTOGRAM_KEYSPACE_TAG;
use telarch_common::types::{Key, Value as KvValue};
use telarch_kv::{KeyRange, KvEntry};

use crate::encoding::{
    decode_comparable, decode_sortable_i64, encode_comparable, encode_sortable_i64, DecodeError,
};
use crate::types::Value;

use super::HistogramInterval;

const RECORD_LEN: usize = 12;

/// The histogram keyspace of one table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HistogramKeyspace {
    table_id: u64,
    column_ordinal: u32,
}

impl HistogramKeyspace {
    /// Creates the keyspace of `column_ordinal` in `table_id`.
    pub fn new(table_id: u64, column_ordinal: u32) -> Self {
        Self {
            table_id,
            column_ordinal,
        }
    }

    fn prefix_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(32);
        buf.push(HISTOGRAM_KEYSPACE_TAG);
        buf.extend_from_slice(&self.table_id.to_be_bytes());
        buf.extend_from_slice(&self.column_ordinal.to_be_bytes());
        buf
    }

    fn value_prefix_bytes(&self, value: &Value) -> Vec<u8> {
        let mut buf = self.prefix_bytes();
        encode_comparable(value, &mut buf);
        buf
    }

    /// Range covering every record of the column.
    pub fn range(&self) -> KeyRange {
        KeyRange::prefix(Key::from_vec(self.prefix_bytes()))
    }

    /// Range covering every record of one value.
    pub fn value_range(&self, value: &Value) -> KeyRange {
        KeyRange::prefix(Key::from_vec(self.value_prefix_bytes(value)))
    }

    /// First key of `value`'s records.
    pub fn value_start(&self, value: &Value) -> Key {
        Key::from_vec(self.value_prefix_bytes(value))
    }

    /// Key of the record of `value` starting at `start`.
    pub fn key(&self, value: &Value, start: i64) -> Key {
        let mut buf = self.value_prefix_bytes(value);
        buf.extend_from_slice(&encode_sortable_i64(start));
        Key::from_vec(buf)
    }

    /// Returns the key and stored value of an interval.
    pub fn encode(&self, interval: &HistogramInterval) -> (Key, KvValue) {
        let mut record = Vec::with_capacity(RECORD_LEN);
        record.extend_from_slice(&encode_sortable_i64(interval.stop()));
        record.extend_from_slice(&interval.count().to_be_bytes());
        (
            self.key(interval.value(), interval.start()),
            KvValue::from_vec(record),
        )
    }

    /// Decodes a record of this keyspace.
    pub fn decode(&self, entry: &KvEntry) -> Result<HistogramInterval, DecodeError> {
        let prefix = self.prefix_bytes();
        let rest = entry
            .key
            .as_bytes()
            .strip_prefix(prefix.as_slice())
            .ok_or_else(|| DecodeError("key outside histogram keyspace".to_string()))?;

        let (value, consumed) = decode_comparable(rest)?;
        let start_bytes = &rest[consumed..];
        if start_bytes.len() != 8 {
            return Err(DecodeError(format!(
                "expected 8 start bytes, found {}",
                start_bytes.len()
            )));
        }
        let start = decode_sortable_i64(start_bytes)?;

        let record = entry.value.as_bytes();
        if record.len() != RECORD_LEN {
            return Err(DecodeError(format!(
                "histogram record has {} bytes, expected {}",
                record.len(),
                RECORD_LEN
            )));
        }
        let stop = decode_sortable_i64(&record[..8])?;
        let count = u32::from_be_bytes([record[8], record[9], record[10], record[11]]);

        Ok(HistogramInterval::new(value, start, stop, count))
    }
}
