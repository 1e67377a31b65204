//! Structured log records and their severity labels

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::RecordError;

/// Numeric severities used by pino.
pub mod level {
    pub const TRACE: u64 = 10;
    pub const DEBUG: u64 = 20;
    pub const INFO: u64 = 30;
    pub const WARN: u64 = 40;
    pub const ERROR: u64 = 50;
    pub const FATAL: u64 = 60;
}

/// A single structured log record as produced by the log stream.
///
/// The record keeps every field it arrived with, `level` included, so a
/// formatter sees exactly what the producer wrote.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    level: u64,
    fields: Map<String, Value>,
}

impl LogRecord {
    /// Build a record from a severity and a set of fields.
    ///
    /// The `level` field is overwritten with `level`.
    #[must_use]
    pub fn new(level: u64, mut fields: Map<String, Value>) -> Self {
        fields.insert("level".to_string(), Value::from(level));
        Self { level, fields }
    }

    /// Convenience constructor for a record carrying only a message.
    #[must_use]
    pub fn with_message(level: u64, msg: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert("msg".to_string(), Value::String(msg.into()));
        Self::new(level, fields)
    }

    /// Parse one line of newline-delimited JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the line is not a JSON object with a numeric `level`.
    pub fn parse(line: &str) -> Result<Self, RecordError> {
        Self::try_from(serde_json::from_str::<Value>(line)?)
    }

    pub const fn level(&self) -> u64 {
        self.level
    }

    pub const fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// The record's `msg` field, if it is a string.
    pub fn message(&self) -> Option<&str> {
        self.fields.get("msg").and_then(Value::as_str)
    }
}

impl TryFrom<Value> for LogRecord {
    type Error = RecordError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let Value::Object(fields) = value else {
            return Err(RecordError::NotAnObject);
        };

        let level = fields
            .get("level")
            .and_then(Value::as_u64)
            .ok_or(RecordError::MissingLevel)?;

        Ok(Self { level, fields })
    }
}

/// Lookup from numeric severity to its human readable label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Levels {
    labels: BTreeMap<u64, String>,
}

impl Default for Levels {
    fn default() -> Self {
        Self::from_pairs([
            ("trace", level::TRACE),
            ("debug", level::DEBUG),
            ("info", level::INFO),
            ("warn", level::WARN),
            ("error", level::ERROR),
            ("fatal", level::FATAL),
        ])
    }
}

impl Levels {
    fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, u64)>) -> Self {
        Self {
            labels: pairs
                .into_iter()
                .map(|(label, value)| (value, label.to_string()))
                .collect(),
        }
    }

    /// Pino's default levels extended with custom ones.
    ///
    /// A custom level reusing a default value replaces that label.
    #[must_use]
    pub fn with_custom<I, S>(custom: I) -> Self
    where
        I: IntoIterator<Item = (S, u64)>,
        S: Into<String>,
    {
        let mut levels = Self::default();
        for (label, value) in custom {
            levels.labels.insert(value, label.into());
        }
        levels
    }

    pub fn label(&self, level: u64) -> Option<&str> {
        self.labels.get(&level).map(String::as_str)
    }

    /// Reverse lookup, case-insensitive.
    pub fn value(&self, label: &str) -> Option<u64> {
        self.labels
            .iter()
            .find(|(_, l)| l.eq_ignore_ascii_case(label))
            .map(|(value, _)| *value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pino_line() {
        let record = LogRecord::parse(
            r#"{"level":50,"time":1700000000000,"pid":42,"hostname":"web-1","msg":"boom"}"#,
        )
        .expect("valid record");

        assert_eq!(record.level(), level::ERROR);
        assert_eq!(record.message(), Some("boom"));
        assert_eq!(record.get("pid"), Some(&Value::from(42)));
    }

    #[test]
    fn test_parse_rejects_non_objects_and_missing_levels() {
        assert!(matches!(
            LogRecord::parse("[1, 2]"),
            Err(RecordError::NotAnObject)
        ));
        assert!(matches!(
            LogRecord::parse(r#"{"msg":"no level"}"#),
            Err(RecordError::MissingLevel)
        ));
        assert!(matches!(
            LogRecord::parse(r#"{"level":"error"}"#),
            Err(RecordError::MissingLevel)
        ));
        assert!(matches!(LogRecord::parse("{"), Err(RecordError::Json(_))));
    }

    #[test]
    fn test_new_sets_level_field() {
        let record = LogRecord::with_message(level::FATAL, "down");
        assert_eq!(record.get("level"), Some(&Value::from(60)));
    }

    #[test]
    fn test_default_levels() {
        let levels = Levels::default();
        assert_eq!(levels.label(level::WARN), Some("warn"));
        assert_eq!(levels.label(35), None);
        assert_eq!(levels.value("ERROR"), Some(level::ERROR));
    }

    #[test]
    fn test_custom_levels() {
        let levels = Levels::with_custom([("audit", 35), ("critical", 60)]);
        assert_eq!(levels.label(35), Some("audit"));
        assert_eq!(levels.label(level::FATAL), Some("critical"));
        assert_eq!(levels.label(level::INFO), Some("info"));
        assert_eq!(levels.value("audit"), Some(35));
    }
}
