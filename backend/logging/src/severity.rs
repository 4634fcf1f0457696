//! Severity levels.
//!
//! Ranks follow the usual structured-logging layout with gaps between the
//! canonical levels, so custom levels can be slotted in between them.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Ordered log severity. Comparisons use the integer rank. Defaults to INFO.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(from = "String", into = "String")]
pub struct Severity(i8);

impl Severity {
    /// Sentinel for unparseable input. Ranks below every other level.
    pub const UNKNOWN: Severity = Severity(i8::MIN);
    pub const TRACE: Severity = Severity(-8);
    pub const DEBUG: Severity = Severity(-4);
    pub const INFO: Severity = Severity(0);
    pub const NOTICE: Severity = Severity(2);
    pub const WARNING: Severity = Severity(4);
    pub const ERROR: Severity = Severity(8);
    pub const FATAL: Severity = Severity(12);

    const CANONICAL: [(Severity, &'static str); 7] = [
        (Severity::TRACE, "TRACE"),
        (Severity::DEBUG, "DEBUG"),
        (Severity::INFO, "INFO"),
        (Severity::NOTICE, "NOTICE"),
        (Severity::WARNING, "WARNING"),
        (Severity::ERROR, "ERROR"),
        (Severity::FATAL, "FATAL"),
    ];

    /// Build a custom severity from a raw rank.
    pub const fn from_rank(rank: i8) -> Self {
        Severity(rank)
    }

    pub const fn rank(self) -> i8 {
        self.0
    }

    /// Case-insensitive parse. Never fails: unknown names yield [`Severity::UNKNOWN`].
    pub fn parse(input: &str) -> Self {
        match input.trim().to_ascii_uppercase().as_str() {
            "TRACE" => Severity::TRACE,
            "DEBUG" => Severity::DEBUG,
            "INFO" => Severity::INFO,
            "NOTICE" => Severity::NOTICE,
            "WARNING" | "WARN" => Severity::WARNING,
            "ERROR" => Severity::ERROR,
            "FATAL" | "CRIT" => Severity::FATAL,
            _ => Severity::UNKNOWN,
        }
    }

    /// Canonical uppercase name, if this is one of the canonical levels.
    pub fn name(self) -> Option<&'static str> {
        Self::CANONICAL
            .iter()
            .find(|(level, _)| *level == self)
            .map(|(_, name)| *name)
    }
}

impl fmt::Display for Severity {
    /// Canonical levels print their name. Custom ranks print relative to the
    /// closest canonical level below them (`INFO+1`), or `TRACE-n` under TRACE.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Severity::UNKNOWN {
            return f.write_str("UNKNOWN");
        }
        if let Some(name) = self.name() {
            return f.write_str(name);
        }
        match Self::CANONICAL.iter().rev().find(|(level, _)| level.0 < self.0) {
            Some((base, name)) => write!(f, "{}+{}", name, i16::from(self.0) - i16::from(base.0)),
            None => write!(
                f,
                "TRACE-{}",
                i16::from(Severity::TRACE.0) - i16::from(self.0)
            ),
        }
    }
}

impl FromStr for Severity {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Severity::parse(s))
    }
}

impl From<String> for Severity {
    fn from(s: String) -> Self {
        Severity::parse(&s)
    }
}

impl From<Severity> for String {
    fn from(level: Severity) -> Self {
        level.to_string()
    }
}

impl From<tracing::Level> for Severity {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE => Severity::TRACE,
            tracing::Level::DEBUG => Severity::DEBUG,
            tracing::Level::INFO => Severity::INFO,
            tracing::Level::WARN => Severity::WARNING,
            tracing::Level::ERROR => Severity::ERROR,
        }
    }
}
