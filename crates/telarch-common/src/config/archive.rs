//! Archive configuration structures.
//!
//! These structures define all configurable aspects of an archive instance.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::constants::{DEFAULT_MERGE_GAP_MS, MAX_KEY_SIZE, MAX_MERGE_GAP_MS, MAX_VALUE_SIZE};
use crate::error::{ArchiveError, ArchiveResult};

/// Main archive configuration.
///
/// # Example
///
/// ```rust
/// use telarch_common::config::ArchiveConfig;
///
/// let config = ArchiveConfig::default();
/// assert_eq!(config.histogram.merge_gap_ms, 20_000);
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Histogram index configuration.
    #[serde(default)]
    pub histogram: HistogramConfig,

    /// Key-value storage limits.
    #[serde(default)]
    pub storage: StorageConfig,
}

impl ArchiveConfig {
    /// Creates a configuration with the given histogram merge gap.
    #[must_use]
    pub fn with_merge_gap(merge_gap_ms: i64) -> Self {
        Self {
            histogram: HistogramConfig { merge_gap_ms },
            ..Default::default()
        }
    }

    /// Creates a minimal configuration for testing.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            histogram: HistogramConfig::default(),
            storage: StorageConfig {
                max_key_size: 1024,
                max_value_size: 64 * 1024,
            },
        }
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> ArchiveResult<()> {
        if self.histogram.merge_gap_ms < 0 {
            return Err(ArchiveError::invalid_config(
                "histogram.merge_gap_ms must not be negative",
            ));
        }

        if self.histogram.merge_gap_ms > MAX_MERGE_GAP_MS {
            return Err(ArchiveError::invalid_config(format!(
                "histogram.merge_gap_ms must be at most {MAX_MERGE_GAP_MS}"
            )));
        }

        if self.storage.max_key_size == 0 || self.storage.max_key_size > MAX_KEY_SIZE {
            return Err(ArchiveError::invalid_config(format!(
                "storage.max_key_size must be between 1 and {MAX_KEY_SIZE}"
            )));
        }

        if self.storage.max_value_size == 0 || self.storage.max_value_size > MAX_VALUE_SIZE {
            return Err(ArchiveError::invalid_config(format!(
                "storage.max_value_size must be between 1 and {MAX_VALUE_SIZE}"
            )));
        }

        Ok(())
    }

    /// Loads and validates configuration from a TOML file.
    pub fn from_file(path: &Path) -> ArchiveResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| ArchiveError::invalid_config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Saves configuration to a TOML file, creating parent directories.
    pub fn save(&self, path: &Path) -> ArchiveResult<()> {
        let content = self.to_toml()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Converts configuration to a TOML string.
    pub fn to_toml(&self) -> ArchiveResult<String> {
        toml::to_string_pretty(self).map_err(|e| ArchiveError::invalid_config(e.to_string()))
    }
}

/// Histogram index configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistogramConfig {
    /// Maximum time difference, in milliseconds, between two consecutive
    /// samples of the same value that are still merged into one interval.
    /// Default: 20000
    #[serde(default = "default_merge_gap_ms")]
    pub merge_gap_ms: i64,
}

fn default_merge_gap_ms() -> i64 {
    DEFAULT_MERGE_GAP_MS
}

impl Default for HistogramConfig {
    fn default() -> Self {
        Self {
            merge_gap_ms: default_merge_gap_ms(),
        }
    }
}

/// Key-value storage limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Maximum key size in bytes.
    /// Default: 16384 (16 KB)
    #[serde(default = "default_max_key_size")]
    pub max_key_size: usize,

    /// Maximum value size in bytes.
    /// Default: 1048576 (1 MB)
    #[serde(default = "default_max_value_size")]
    pub max_value_size: usize,
}

fn default_max_key_size() -> usize {
    MAX_KEY_SIZE
}

fn default_max_value_size() -> usize {
    MAX_VALUE_SIZE
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            max_key_size: default_max_key_size(),
            max_value_size: default_max_value_size(),
        }
    }
}
