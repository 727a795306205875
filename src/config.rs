use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::LogError;
use crate::level::Level;

/// Queue capacity used when `buffer_size` is unset or negative.
pub const DEFAULT_BUFFER_SIZE: usize = 32;

/// Options recognized by [`AsyncLogWriter`](crate::AsyncLogWriter).
///
/// ```toml
/// level = "INFO"
/// buffer_size = 128
/// filename = "logs/app.log"
/// rotate = true
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WriterConfig {
    /// Minimum severity written. Validated when the writer starts.
    pub level: Level,
    /// Queue capacity; `0` makes every write a rendezvous with the consumer.
    pub buffer_size: Option<i64>,
    /// Output file. Standard output when unset.
    pub filename: Option<PathBuf>,
    /// Rotate the output file when the date changes. The date is taken from
    /// each record's own timestamp, so a record stamped just before midnight
    /// stays in that day's file even if it is written after the cache moved on.
    pub rotate: bool,
}

impl WriterConfig {
    pub fn new(level: Level) -> Self {
        Self {
            level,
            ..Self::default()
        }
    }

    pub fn buffer_size(mut self, size: i64) -> Self {
        self.buffer_size = Some(size);
        self
    }

    pub fn filename(mut self, path: impl Into<PathBuf>) -> Self {
        self.filename = Some(path.into());
        self
    }

    pub fn rotate(mut self, rotate: bool) -> Self {
        self.rotate = rotate;
        self
    }

    pub fn effective_capacity(&self) -> usize {
        match self.buffer_size {
            Some(size) if size >= 0 => size as usize,
            _ => DEFAULT_BUFFER_SIZE,
        }
    }

    pub fn from_toml_str(source: &str) -> Result<Self, LogError> {
        Ok(toml::from_str(source)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, LogError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_capacity() {
        assert_eq!(WriterConfig::default().effective_capacity(), DEFAULT_BUFFER_SIZE);
        assert_eq!(WriterConfig::default().buffer_size(-5).effective_capacity(), 32);
        assert_eq!(WriterConfig::default().buffer_size(0).effective_capacity(), 0);
        assert_eq!(WriterConfig::default().buffer_size(7).effective_capacity(), 7);
    }

    #[test]
    fn test_parse_toml() {
        let config = WriterConfig::from_toml_str(
            r#"
            level = "warning"
            buffer_size = 64
            filename = "logs/app.log"
            rotate = true
            "#,
        )
        .unwrap();

        assert_eq!(config.level, Level::WARNING);
        assert_eq!(config.effective_capacity(), 64);
        assert_eq!(config.filename, Some(PathBuf::from("logs/app.log")));
        assert!(config.rotate);
    }

    #[test]
    fn test_parse_raw_level_is_not_validated() {
        let config = WriterConfig::from_toml_str("level = 9").unwrap();
        assert_eq!(config.level, Level::from_raw(9));
        assert!(!config.level.is_valid());
    }

    #[test]
    fn test_parse_rejects_unknown_keys_and_names() {
        assert!(WriterConfig::from_toml_str("colour = true").is_err());
        assert!(WriterConfig::from_toml_str("level = \"loud\"").is_err());
    }

    #[test]
    fn test_defaults() {
        let config = WriterConfig::from_toml_str("").unwrap();
        assert_eq!(config, WriterConfig::default());
        assert_eq!(config.level, Level::DEBUG);
        assert!(!config.rotate);
    }
}
