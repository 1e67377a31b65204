//! Rendering of log records into email subject and body text

use std::fmt::Write;

use serde_json::Value;

use crate::record::LogRecord;

/// Label used when a record's severity has no registered name.
pub const UNKNOWN_LEVEL_LABEL: &str = "USERLVL";

/// Keys rendered in the header line and therefore left out of the field list.
const HEADER_KEYS: &[&str] = &["level", "time", "pid", "hostname", "name", "msg", "v"];

/// Keys treated as error objects, printed via their `stack` when present.
const ERROR_KEYS: &[&str] = &["err", "error"];

/// Turns a record into the text of its notification email.
pub trait Formatter: Send + Sync {
    /// Subject line: the upper-cased severity label followed by ` log`.
    fn subject(&self, _record: &LogRecord, label: &str) -> String {
        format!("[{}] log", label.to_uppercase())
    }

    /// Email body.
    fn body(&self, record: &LogRecord, label: &str) -> String;
}

impl<F> Formatter for F
where
    F: Fn(&LogRecord) -> String + Send + Sync,
{
    fn body(&self, record: &LogRecord, _label: &str) -> String {
        self(record)
    }
}

/// Plain-text rendering in the layout of `pino-pretty` without colours:
///
/// ```text
/// [1700000000000] ERROR (api/42 on web-1): request failed
///     route: "/users"
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct PrettyFormatter;

impl PrettyFormatter {
    fn header(record: &LogRecord, label: &str) -> String {
        let mut out = String::new();

        if let Some(time) = record.get("time") {
            let _ = write!(out, "[{}] ", scalar(time));
        }

        out.push_str(&label.to_uppercase());

        let name = record.get("name").map(scalar);
        let pid = record.get("pid").map(scalar);
        let hostname = record.get("hostname").map(scalar);

        let origin = match (name, pid) {
            (Some(name), Some(pid)) => Some(format!("{name}/{pid}")),
            (Some(one), None) | (None, Some(one)) => Some(one),
            (None, None) => None,
        };

        match (origin, hostname) {
            (Some(origin), Some(host)) => {
                let _ = write!(out, " ({origin} on {host})");
            }
            (Some(origin), None) => {
                let _ = write!(out, " ({origin})");
            }
            (None, Some(host)) => {
                let _ = write!(out, " (on {host})");
            }
            (None, None) => {}
        }

        if let Some(msg) = record.message() {
            let _ = write!(out, ": {msg}");
        }

        out
    }
}

impl Formatter for PrettyFormatter {
    fn body(&self, record: &LogRecord, label: &str) -> String {
        let mut out = Self::header(record, label);
        out.push('\n');

        for (key, value) in record.fields() {
            if HEADER_KEYS.contains(&key.as_str()) {
                continue;
            }

            let stack = ERROR_KEYS
                .contains(&key.as_str())
                .then(|| value.get("stack").and_then(Value::as_str))
                .flatten();

            let rendered = stack.map_or_else(
                || serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string()),
                str::to_string,
            );

            let _ = writeln!(out, "    {key}: {}", indent_continuation(&rendered));
        }

        out
    }
}

/// Strings are shown without quotes, everything else as compact JSON.
fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn indent_continuation(text: &str) -> String {
    text.lines().collect::<Vec<_>>().join("\n    ")
}
