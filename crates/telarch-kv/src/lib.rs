//! # telarch-kv
//!
//! The ordered key-value layer underneath the telarch archive.
//!
//! The archive only needs four operations from its store: point lookup,
//! ordered range scan, put and delete. They are captured by the [`KvStore`]
//! trait so that the tuple store and the histogram indexes can run on any
//! ordered engine. [`MemKvStore`] is the in-process implementation used by
//! the command line tool and the tests.
//!
//! ## Usage
//!
//! ```rust
//! use telarch_common::types::{Key, Value};
//! use telarch_kv::{KeyRange, KvStore, MemKvStore};
//!
//! let store = MemKvStore::new();
//! store.put(Key::from_bytes(b"a:1"), Value::from_bytes(b"x")).unwrap();
//! store.put(Key::from_bytes(b"a:2"), Value::from_bytes(b"y")).unwrap();
//! store.put(Key::from_bytes(b"b:1"), Value::from_bytes(b"z")).unwrap();
//!
//! let scan = store.scan(KeyRange::prefix(Key::from_bytes(b"a:"))).unwrap();
//! assert_eq!(scan.count(), 2);
//! ```
//!
//! ## Consistency
//!
//! Every scan observes a snapshot: entries are materialized under the read
//! lock when the scan is opened, so concurrent writers never produce a
//! partially visible record. Writes are atomic per key.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod memory;
mod range;
mod store;

pub use memory::{KvStats, MemKvStore};
pub use range::{KeyRange, KvEntry};
pub use store::{KvScan, KvStore, ScanLease};
