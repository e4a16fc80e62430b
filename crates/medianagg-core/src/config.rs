//! Module: config
//! Responsibility: accumulation strategy and sort-engine resource limits.
//! Does not own: type resolution or state lifecycle.
//! Boundary: host-supplied policy consumed when a state allocates storage.

use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error as ThisError;

///
/// CONSTANTS
///

/// Default sort-engine memtable budget (4 MiB).
pub const DEFAULT_WORK_MEM_BYTES: usize = 4 * 1024 * 1024;

/// Default maximum number of runs merged in one pass.
pub const DEFAULT_MERGE_FAN_IN: usize = 64;

/// Smallest usable fan-in; a merge pass must reduce the run count.
pub const MIN_MERGE_FAN_IN: usize = 2;

///
/// StorageStrategy
///
/// Accumulation strategy selected for every state created by one aggregate.
/// A state keeps its strategy for its whole lifetime.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Display, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageStrategy {
    #[default]
    #[display("in_memory")]
    InMemory,
    #[display("external_sort")]
    ExternalSort,
}

///
/// ConfigError
///

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("invalid median config: {0}")]
    Parse(String),

    #[error("work_mem_bytes must be greater than zero")]
    ZeroWorkMem,

    #[error("merge_fan_in must be at least {MIN_MERGE_FAN_IN}, found {fan_in}")]
    FanInTooSmall { fan_in: usize },
}

///
/// MedianConfig
///
/// Resource policy for median accumulation.
/// `work_mem_bytes` and `merge_fan_in` only matter for the external-sort
/// strategy; `spill_dir` falls back to the system temp directory.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct MedianConfig {
    pub strategy: StorageStrategy,
    pub work_mem_bytes: usize,
    pub merge_fan_in: usize,
    pub spill_dir: Option<PathBuf>,
}

impl Default for MedianConfig {
    fn default() -> Self {
        Self {
            strategy: StorageStrategy::InMemory,
            work_mem_bytes: DEFAULT_WORK_MEM_BYTES,
            merge_fan_in: DEFAULT_MERGE_FAN_IN,
            spill_dir: None,
        }
    }
}

impl MedianConfig {
    /// Build the default in-memory configuration.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Build an external-sort configuration with the given memtable budget.
    #[must_use]
    pub fn external_sort(work_mem_bytes: usize) -> Self {
        Self {
            strategy: StorageStrategy::ExternalSort,
            work_mem_bytes,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_merge_fan_in(mut self, merge_fan_in: usize) -> Self {
        self.merge_fan_in = merge_fan_in;
        self
    }

    #[must_use]
    pub fn with_spill_dir(mut self, spill_dir: impl Into<PathBuf>) -> Self {
        self.spill_dir = Some(spill_dir.into());
        self
    }

    #[must_use]
    pub fn spill_dir(&self) -> Option<&Path> {
        self.spill_dir.as_deref()
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(source).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;

        Ok(config)
    }

    /// Reject limits the sort engine cannot operate under.
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.work_mem_bytes == 0 {
            return Err(ConfigError::ZeroWorkMem);
        }
        if self.merge_fan_in < MIN_MERGE_FAN_IN {
            return Err(ConfigError::FanInTooSmall {
                fan_in: self.merge_fan_in,
            });
        }

        Ok(())
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_in_memory_and_valid() {
        let config = MedianConfig::default();

        assert_eq!(config.strategy, StorageStrategy::InMemory);
        assert_eq!(config.work_mem_bytes, DEFAULT_WORK_MEM_BYTES);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn toml_overrides_only_named_keys() {
        let config = MedianConfig::from_toml_str(
            r#"
            strategy = "external_sort"
            work_mem_bytes = 1024
            spill_dir = "/var/tmp/median"
            "#,
        )
        .expect("config should parse");

        assert_eq!(config.strategy, StorageStrategy::ExternalSort);
        assert_eq!(config.work_mem_bytes, 1024);
        assert_eq!(config.merge_fan_in, DEFAULT_MERGE_FAN_IN);
        assert_eq!(config.spill_dir(), Some(Path::new("/var/tmp/median")));
    }

    #[test]
    fn toml_rejects_unknown_keys() {
        let err = MedianConfig::from_toml_str("work_mem = 12").expect_err("unknown key");

        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn validation_rejects_degenerate_limits() {
        let err = MedianConfig::external_sort(0)
            .validate()
            .expect_err("zero budget");
        assert!(matches!(err, ConfigError::ZeroWorkMem));

        let err = MedianConfig::external_sort(64)
            .with_merge_fan_in(1)
            .validate()
            .expect_err("fan-in of one");
        assert!(matches!(err, ConfigError::FanInTooSmall { fan_in: 1 }));
    }

    #[test]
    fn strategy_display_matches_toml_spelling() {
        assert_eq!(StorageStrategy::InMemory.to_string(), "in_memory");
        assert_eq!(StorageStrategy::ExternalSort.to_string(), "external_sort");
    }
}
