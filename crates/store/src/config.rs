use hybridx_container::{DEFAULT_COMPRESSION_LEVEL, WriterOptions};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::Path;

use crate::error::StoreError;

/// Compression levels accepted by the container writer.
pub const COMPRESSION_LEVELS: RangeInclusive<i32> = 1..=22;

/// Store settings, loadable from JSON. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Report per-key progress.
    pub verbose: bool,
    /// zstd level for dataset blocks.
    pub compression_level: i32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            verbose: true,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }
}

impl StoreConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let config: Self = serde_json::from_reader(std::fs::File::open(path)?)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        if !COMPRESSION_LEVELS.contains(&self.compression_level) {
            return Err(StoreError::Config(format!(
                "compression_level {} outside {}..={}",
                self.compression_level,
                COMPRESSION_LEVELS.start(),
                COMPRESSION_LEVELS.end()
            )));
        }
        Ok(())
    }

    pub(crate) fn writer_options(&self) -> WriterOptions {
        WriterOptions {
            compression_level: self.compression_level,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_uses_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("store.json");
        std::fs::write(&path, r#"{ "verbose": false }"#).unwrap();

        let config = StoreConfig::from_json_file(&path).unwrap();
        assert!(!config.verbose);
        assert_eq!(config.compression_level, DEFAULT_COMPRESSION_LEVEL);
    }

    #[test]
    fn out_of_range_level_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("store.json");
        std::fs::write(&path, r#"{ "compression_level": 99 }"#).unwrap();

        assert!(matches!(
            StoreConfig::from_json_file(&path),
            Err(StoreError::Config(_))
        ));
    }

    #[test]
    fn malformed_json_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("store.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            StoreConfig::from_json_file(&path),
            Err(StoreError::Json(_))
        ));
    }

    #[test]
    fn missing_file_is_io() {
        let tmp = tempfile::tempdir().unwrap();
        let err = StoreConfig::from_json_file(tmp.path().join("absent.json")).unwrap_err();
        assert!(err.is_io());
    }
}
