//! Configuration for telarch.
//!
//! This module provides configuration structures for the archive
//! components, loadable from and savable to TOML.

mod archive;

pub use archive::{ArchiveConfig, HistogramConfig, StorageConfig};
