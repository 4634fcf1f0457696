//! Log records and their attributes.

use std::panic::Location;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::severity::Severity;

/// One key/value attachment on a record.
#[derive(Debug, Clone, PartialEq)]
pub struct Attr {
    pub key: String,
    pub value: Value,
}

impl Attr {
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Shorthand for [`Attr::new`].
pub fn kv(key: impl Into<String>, value: impl Into<Value>) -> Attr {
    Attr::new(key, value)
}

/// Where a log call was made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    /// File basename.
    pub file: String,
    pub line: u32,
    /// Qualified name of the calling code region.
    pub function: String,
}

impl CallSite {
    pub fn new(path: &str, line: u32, function: impl Into<String>) -> Self {
        Self {
            file: basename(path).to_string(),
            line,
            function: function.into(),
        }
    }

    /// Call site from a `#[track_caller]` location. Without a bound scope the
    /// source path stands in for the function name.
    pub fn from_location(location: &Location<'_>, scope: Option<&str>) -> Self {
        let function = match scope {
            Some(scope) => scope.to_string(),
            None => location.file().trim_end_matches(".rs").to_string(),
        };
        Self::new(location.file(), location.line(), function)
    }
}

fn basename(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// A single log event, built once per admitted call and dropped after the write.
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    pub message: String,
    pub attrs: Vec<Attr>,
    /// Rendered attached error, if any.
    pub error: Option<String>,
    pub scope: Option<String>,
    pub site: CallSite,
}

impl LogRecord {
    pub fn new(severity: Severity, message: impl Into<String>, site: CallSite) -> Self {
        Self {
            timestamp: Utc::now(),
            severity,
            message: message.into(),
            attrs: Vec::new(),
            error: None,
            scope: None,
            site,
        }
    }

    pub fn attr(&self, key: &str) -> Option<&Value> {
        self.attrs.iter().find(|a| a.key == key).map(|a| &a.value)
    }
}
