use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer};

/// Severity of a log record.
///
/// Stored as a raw integer so that values outside the known range can exist
/// (typically coming from configuration) and be rejected when a writer starts,
/// instead of being silently clamped. Ordering follows the raw value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Level(i32);

const LEVEL_NAMES: [&str; 6] = ["DEBUG", "TRACE", "INFO", "WARN", "ERROR", "CRITICAL"];

impl Level {
    pub const DEBUG: Level = Level(0);
    pub const TRACE: Level = Level(1);
    pub const INFO: Level = Level(2);
    pub const WARNING: Level = Level(3);
    pub const ERROR: Level = Level(4);
    pub const CRITICAL: Level = Level(5);

    /// Wraps a raw value without validating it.
    pub const fn from_raw(raw: i32) -> Self {
        Level(raw)
    }

    pub const fn raw(self) -> i32 {
        self.0
    }

    /// True for `DEBUG..=CRITICAL`.
    pub const fn is_valid(self) -> bool {
        self.0 >= Self::DEBUG.0 && self.0 <= Self::CRITICAL.0
    }

    /// Fixed display name, or `"UNKNOWN"` for out-of-range values.
    ///
    /// This sits on the hot path and never fails.
    pub fn as_str(self) -> &'static str {
        if self.is_valid() {
            LEVEL_NAMES[self.0 as usize]
        } else {
            "UNKNOWN"
        }
    }
}

impl Default for Level {
    fn default() -> Self {
        Level::DEBUG
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown log level name `{0}`")]
pub struct ParseLevelError(String);

impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(Level::DEBUG),
            "TRACE" => Ok(Level::TRACE),
            "INFO" => Ok(Level::INFO),
            "WARN" | "WARNING" => Ok(Level::WARNING),
            "ERROR" => Ok(Level::ERROR),
            "CRITICAL" => Ok(Level::CRITICAL),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}

// Accepts either a level name or a raw integer. Raw integers are not
// range-checked here; `AsyncLogWriter::start` does that.
impl<'de> Deserialize<'de> for Level {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Name(String),
            Raw(i32),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Name(name) => name.parse().map_err(serde::de::Error::custom),
            Repr::Raw(raw) => Ok(Level(raw)),
        }
    }
}

/// One leveled message awaiting delivery to the sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    level: Level,
    message: String,
}

impl LogRecord {
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_levels_have_names() {
        for raw in 0..6 {
            let level = Level::from_raw(raw);
            assert!(level.is_valid());
            assert!(!level.as_str().is_empty());
            assert_ne!(level.as_str(), "UNKNOWN");
        }
        assert_eq!(Level::WARNING.as_str(), "WARN");
        assert_eq!(Level::CRITICAL.to_string(), "CRITICAL");
    }

    #[test]
    fn test_out_of_range_is_unknown() {
        for raw in [-100, -1, 6, 7, i32::MAX, i32::MIN] {
            assert_eq!(Level::from_raw(raw).as_str(), "UNKNOWN");
            assert!(!Level::from_raw(raw).is_valid());
        }
    }

    #[test]
    fn test_ordering() {
        assert!(Level::DEBUG < Level::TRACE);
        assert!(Level::TRACE < Level::INFO);
        assert!(Level::INFO < Level::WARNING);
        assert!(Level::WARNING < Level::ERROR);
        assert!(Level::ERROR < Level::CRITICAL);
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("info".parse::<Level>().unwrap(), Level::INFO);
        assert_eq!("Warning".parse::<Level>().unwrap(), Level::WARNING);
        assert_eq!("WARN".parse::<Level>().unwrap(), Level::WARNING);
        assert!("verbose".parse::<Level>().is_err());
    }

    #[test]
    fn test_parse_error_message() {
        let err = "verbose".parse::<Level>().unwrap_err();
        assert_eq!(err, ParseLevelError("verbose".to_string()));
        assert_eq!(err.to_string(), "unknown log level name `verbose`");

        let boxed: Box<dyn std::error::Error> = Box::new(err);
        assert!(boxed.source().is_none());
    }
}
