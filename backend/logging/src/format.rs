//! Record rendering for the two sinks.
//!
//! Human lines:
//! `2026-01-02T03:04:05.678Z INFO    message scope=app error="boom" key=value (file.rs:12)`
//!
//! JSON lines (keys sorted, one object per line):
//! `{"@timestamp":"...","data":{"file":"..","line":12,"function":".."},"error":"..","level":"INFO","message":".."}`

use std::fmt::Write as _;

use chrono::SecondsFormat;
use serde_json::{Map, Value};

use crate::record::LogRecord;

const RESERVED_KEYS: [&str; 6] = ["@timestamp", "data", "level", "message", "error", "scope"];

/// Render one human-readable line, newline-terminated.
pub fn human_line(record: &LogRecord) -> String {
    let mut line = format!(
        "{} {:<7} {}",
        record.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
        record.severity.to_string(),
        record.message
    );
    if let Some(scope) = &record.scope {
        let _ = write!(line, " scope={}", text_value(&Value::String(scope.clone())));
    }
    if let Some(error) = &record.error {
        let _ = write!(line, " error={}", text_value(&Value::String(error.clone())));
    }
    for attr in &record.attrs {
        let _ = write!(line, " {}={}", attr.key, text_value(&attr.value));
    }
    let _ = writeln!(line, " ({}:{})", record.site.file, record.site.line);
    line
}

/// Render one JSON object, newline-terminated.
pub fn json_line(record: &LogRecord) -> serde_json::Result<String> {
    let mut line = serde_json::to_string(&json_value(record))?;
    line.push('\n');
    Ok(line)
}

/// The structured form of a record. Reserved keys win over colliding attributes.
pub fn json_value(record: &LogRecord) -> Value {
    let mut object = Map::new();
    object.insert(
        "@timestamp".into(),
        Value::String(record.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)),
    );

    let mut data = Map::new();
    data.insert("file".into(), Value::String(record.site.file.clone()));
    data.insert("line".into(), Value::from(record.site.line));
    data.insert("function".into(), Value::String(record.site.function.clone()));
    object.insert("data".into(), Value::Object(data));

    if let Some(error) = &record.error {
        object.insert("error".into(), Value::String(error.clone()));
    }
    if let Some(scope) = &record.scope {
        object.insert("scope".into(), Value::String(scope.clone()));
    }
    object.insert("level".into(), Value::String(record.severity.to_string()));
    object.insert("message".into(), Value::String(record.message.clone()));

    for attr in &record.attrs {
        if RESERVED_KEYS.contains(&attr.key.as_str()) {
            continue;
        }
        object
            .entry(attr.key.clone())
            .or_insert_with(|| attr.value.clone());
    }
    Value::Object(object)
}

/// Bare strings stay bare unless they need quoting; everything else is JSON.
fn text_value(value: &Value) -> String {
    match value {
        Value::String(s)
            if !s.is_empty()
                && !s.chars().any(|c| c.is_whitespace() || c == '"' || c == '=') =>
        {
            s.clone()
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{kv, CallSite};
    use crate::severity::Severity;
    use chrono::TimeZone;

    fn record() -> LogRecord {
        let mut record = LogRecord::new(
            Severity::INFO,
            "hello \"world\"",
            CallSite::new("src/net/server.rs", 42, "app::net"),
        );
        record.timestamp = chrono::Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        record
    }

    #[test]
    fn test_json_shape_matches_documented_layout() {
        let mut r = record();
        r.error = Some("disk \"full\"".into());
        let line = json_line(&r).unwrap();
        assert_eq!(
            line,
            "{\"@timestamp\":\"2026-01-02T03:04:05.000Z\",\
             \"data\":{\"file\":\"server.rs\",\"function\":\"app::net\",\"line\":42},\
             \"error\":\"disk \\\"full\\\"\",\"level\":\"INFO\",\
             \"message\":\"hello \\\"world\\\"\"}\n"
        );
    }

    #[test]
    fn test_json_attributes_cannot_override_reserved_keys() {
        let mut r = record();
        r.attrs.push(kv("level", "FATAL"));
        r.attrs.push(kv("port", 8080));
        let value = json_value(&r);
        assert_eq!(value["level"], "INFO");
        assert_eq!(value["port"], 8080);
    }

    #[test]
    fn test_human_line() {
        let mut r = record();
        r.scope = Some("app::net".into());
        r.attrs.push(kv("peer", "10.0.0.1"));
        r.attrs.push(kv("reason", "timed out"));
        let line = human_line(&r);
        assert_eq!(
            line,
            "2026-01-02T03:04:05.000Z INFO    hello \"world\" scope=app::net \
             peer=10.0.0.1 reason=\"timed out\" (server.rs:42)\n"
        );
    }
}
