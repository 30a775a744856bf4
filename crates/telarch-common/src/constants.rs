//! System-wide constants for telarch.
//!
//! Keyspace tags partition the single ordered key-value store between the
//! raw tuple store and the histogram indexes. Every key written by the
//! archive starts with exactly one of these tags.

// =============================================================================
// Keyspace Tags
// =============================================================================

/// Tag byte prefixing every raw tuple key.
pub const TUPLE_KEYSPACE_TAG: u8 = 0x01;

/// Tag byte prefixing every histogram interval key.
pub const HISTOGRAM_KEYSPACE_TAG: u8 = 0x02;

// =============================================================================
// Key and Value Limits
// =============================================================================

/// Maximum key size in bytes (16 KB).
pub const MAX_KEY_SIZE: usize = 16 * 1024;

/// Maximum value size in bytes (1 MB).
pub const MAX_VALUE_SIZE: usize = 1024 * 1024;

// =============================================================================
// Histogram Defaults
// =============================================================================

/// Default merge gap for histogram intervals, in milliseconds.
///
/// Two consecutive samples of the same value closer than this are
/// coalesced into one interval. Twenty seconds absorbs bursty sampling
/// without bridging genuine outages.
pub const DEFAULT_MERGE_GAP_MS: i64 = 20_000;

/// Upper bound accepted for a configured merge gap (one day).
pub const MAX_MERGE_GAP_MS: i64 = 24 * 60 * 60 * 1000;
