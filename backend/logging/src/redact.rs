//! Redacted attribute values.
//!
//! Wraps secrets so they can be attached to a record without ever reaching
//! either log file.

use std::fmt;
use std::ops::Deref;

use serde_json::Value;

/// Text written in place of a redacted value.
pub const REDACTED: &str = "REDACTED";

/// A value that always logs as [`REDACTED`].
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Redacted<T>(pub T);

impl<T> Redacted<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Redacted<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> fmt::Debug for Redacted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl<T> fmt::Display for Redacted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl<T> From<Redacted<T>> for Value {
    fn from(_: Redacted<T>) -> Self {
        Value::String(REDACTED.to_string())
    }
}

impl<T> From<&Redacted<T>> for Value {
    fn from(_: &Redacted<T>) -> Self {
        Value::String(REDACTED.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::kv;

    #[test]
    fn test_redaction() {
        let token = Redacted("sk-0123456789abcdef".to_string());
        assert_eq!(token.len(), 19);
        assert_eq!(format!("{token}"), REDACTED);
        assert_eq!(format!("{token:?}"), REDACTED);

        let attr = kv("token", &token);
        assert_eq!(attr.value, Value::String(REDACTED.into()));
        assert_eq!(token.into_inner(), "sk-0123456789abcdef");
    }
}
