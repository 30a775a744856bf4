//! # telarch-common
//!
//! Common types, errors, and configuration for the telarch archive.
//!
//! This crate provides the foundational types shared by every telarch
//! component:
//!
//! - **Types**: byte-oriented `Key`/`Value` wrappers used by the key-value
//!   layer, and `TimeInterval` for time-bounded scans
//! - **Errors**: unified error handling with `ArchiveError`
//! - **Config**: archive configuration structures (TOML backed)
//! - **Constants**: keyspace tags and system-wide defaults
//!
//! ## Example
//!
//! ```rust
//! use telarch_common::types::{Key, TimeInterval, Value};
//! use telarch_common::error::ArchiveResult;
//!
//! fn example() -> ArchiveResult<()> {
//!     let key = Key::from_bytes(b"hello");
//!     let value = Value::from_bytes(b"world");
//!     let interval = TimeInterval::new(1_000, 2_000);
//!     assert!(interval.contains(1_500));
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod constants;
pub mod error;
pub mod types;

// Re-export commonly used items at the crate root
pub use constants::*;
pub use error::{ArchiveError, ArchiveResult};
pub use types::{Key, TimeInterval, Value};
