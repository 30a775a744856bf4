//! Error handling for telarch.
//!
//! This module provides a unified error type and result alias used by the
//! key-value layer and surfaced by the storage layer as I/O failures.

mod archive;

pub use archive::{ArchiveError, ErrorCode};

/// Result type alias for archive operations.
pub type ArchiveResult<T> = std::result::Result<T, ArchiveError>;
