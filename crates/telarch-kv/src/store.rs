//! The key-value store contract.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use telarch_common::error::ArchiveResult;
use telarch_common::types::{Key, Value};

use crate::range::{KeyRange, KvEntry};

/// An ordered key-value store.
///
/// Keys are ordered lexicographically. Implementations must make each
/// `put`/`delete` atomic per key and give every `scan` a consistent view.
pub trait KvStore: Send + Sync + fmt::Debug {
    /// Point lookup.
    fn get(&self, key: &Key) -> ArchiveResult<Option<Value>>;

    /// Inserts or replaces the value stored under `key`.
    fn put(&self, key: Key, value: Value) -> ArchiveResult<()>;

    /// Removes `key`; returns whether it was present.
    fn delete(&self, key: &Key) -> ArchiveResult<bool>;

    /// Opens an ordered scan over `range`.
    fn scan(&self, range: KeyRange) -> ArchiveResult<KvScan>;
}

/// Keeps the store's count of open scans accurate.
///
/// Dropping the lease marks the scan as released.
pub struct ScanLease {
    open: Arc<AtomicUsize>,
}

impl ScanLease {
    /// Registers a new open scan on `open`.
    pub fn acquire(open: Arc<AtomicUsize>) -> Self {
        open.fetch_add(1, Ordering::SeqCst);
        Self { open }
    }
}

impl Drop for ScanLease {
    fn drop(&mut self) {
        self.open.fetch_sub(1, Ordering::SeqCst);
    }
}

impl fmt::Debug for ScanLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanLease").finish_non_exhaustive()
    }
}

/// An owned, ordered cursor over the entries of a scan.
#[derive(Debug)]
pub struct KvScan {
    entries: std::vec::IntoIter<KvEntry>,
    _lease: Option<ScanLease>,
}

impl KvScan {
    /// Creates a scan over already ordered entries.
    pub fn new(entries: Vec<KvEntry>) -> Self {
        Self {
            entries: entries.into_iter(),
            _lease: None,
        }
    }

    /// Attaches a lease released when the scan is dropped.
    pub fn with_lease(mut self, lease: ScanLease) -> Self {
        self._lease = Some(lease);
        self
    }

    /// Returns the next entry without consuming it.
    pub fn peek(&self) -> Option<&KvEntry> {
        self.entries.as_slice().first()
    }

    /// Number of entries left in the scan.
    pub fn remaining(&self) -> usize {
        self.entries.len()
    }
}

impl Iterator for KvScan {
    type Item = KvEntry;

    fn next(&mut self) -> Option<Self::Item> {
        self.entries.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}
