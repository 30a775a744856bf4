//! In-memory ordered key-value store.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::trace;

use telarch_common::config::StorageConfig;
use telarch_common::error::{ArchiveError, ArchiveResult};
use telarch_common::types::{Key, Value};

use crate::range::{KeyRange, KvEntry};
use crate::store::{KvScan, KvStore, ScanLease};

/// Operation counters of a [`MemKvStore`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KvStats {
    /// Number of point lookups.
    pub gets: u64,
    /// Number of puts.
    pub puts: u64,
    /// Number of deletes that removed a key.
    pub deletes: u64,
    /// Number of scans opened.
    pub scans: u64,
}

/// An ordered key-value store held in memory.
///
/// The map sits behind a `RwLock`; scans copy their range while holding the
/// read lock, which gives each scan a snapshot of the store.
#[derive(Debug)]
pub struct MemKvStore {
    /// Ordered entries.
    entries: RwLock<BTreeMap<Key, Value>>,
    /// Size limits.
    limits: StorageConfig,
    /// Operation counters.
    stats: Mutex<KvStats>,
    /// Scans not yet dropped.
    open_scans: Arc<AtomicUsize>,
}

impl MemKvStore {
    /// Creates an empty store with default limits.
    pub fn new() -> Self {
        Self::with_limits(StorageConfig::default())
    }

    /// Creates an empty store enforcing the given key and value limits.
    pub fn with_limits(limits: StorageConfig) -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            limits,
            stats: Mutex::new(KvStats::default()),
            open_scans: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Returns the number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Returns a copy of the operation counters.
    pub fn stats(&self) -> KvStats {
        self.stats.lock().clone()
    }

    /// Returns the number of scans that are still open.
    pub fn open_scans(&self) -> usize {
        self.open_scans.load(Ordering::SeqCst)
    }

    fn check_limits(&self, key: &Key, value: &Value) -> ArchiveResult<()> {
        if key.len() > self.limits.max_key_size {
            return Err(ArchiveError::KeyTooLarge {
                size: key.len(),
                max_size: self.limits.max_key_size,
            });
        }
        if value.len() > self.limits.max_value_size {
            return Err(ArchiveError::ValueTooLarge {
                size: value.len(),
                max_size: self.limits.max_value_size,
            });
        }
        Ok(())
    }
}

impl Default for MemKvStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KvStore for MemKvStore {
    fn get(&self, key: &Key) -> ArchiveResult<Option<Value>> {
        self.stats.lock().gets += 1;
        Ok(self.entries.read().get(key).cloned())
    }

    fn put(&self, key: Key, value: Value) -> ArchiveResult<()> {
        self.check_limits(&key, &value)?;
        self.entries.write().insert(key, value);
        self.stats.lock().puts += 1;
        Ok(())
    }

    fn delete(&self, key: &Key) -> ArchiveResult<bool> {
        let removed = self.entries.write().remove(key).is_some();
        if removed {
            self.stats.lock().deletes += 1;
        }
        Ok(removed)
    }

    fn scan(&self, range: KeyRange) -> ArchiveResult<KvScan> {
        self.stats.lock().scans += 1;

        let entries: Vec<KvEntry> = if range.is_empty() {
            Vec::new()
        } else {
            self.entries
                .read()
                .range::<Key, _>(range.as_bounds())
                .map(|(k, v)| KvEntry::new(k.clone(), v.clone()))
                .collect()
        };
        trace!(entries = entries.len(), "opened key-value scan");

        Ok(KvScan::new(entries).with_lease(ScanLease::acquire(self.open_scans.clone())))
    }
}
