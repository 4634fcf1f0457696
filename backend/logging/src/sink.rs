//! Record consumers.

use std::io::Write;
use std::sync::atomic::{AtomicI8, Ordering};

use crate::error::{LogError, Result};
use crate::format;
use crate::record::LogRecord;
use crate::severity::Severity;

/// Anything a [`crate::Logger`] can hand finished records to.
pub trait RecordSink: Send + Sync {
    /// Whether records at `level` would be persisted.
    fn enabled(&self, level: Severity) -> bool;

    /// Persist one record.
    fn handle(&self, record: &LogRecord) -> Result<()>;
}

/// Runtime-adjustable minimum severity for a sink.
#[derive(Debug)]
pub struct LevelGate(AtomicI8);

impl LevelGate {
    pub fn new(level: Severity) -> Self {
        Self(AtomicI8::new(level.rank()))
    }

    pub fn set(&self, level: Severity) {
        self.0.store(level.rank(), Ordering::Relaxed);
    }

    pub fn get(&self) -> Severity {
        Severity::from_rank(self.0.load(Ordering::Relaxed))
    }

    pub fn admits(&self, level: Severity) -> bool {
        self.get() <= level
    }
}

/// Human-readable lines on stdout. Used by the process-wide default logger
/// until a file sink is configured.
#[derive(Debug)]
pub struct ConsoleSink {
    level: LevelGate,
}

impl ConsoleSink {
    pub fn new(level: Severity) -> Self {
        Self {
            level: LevelGate::new(level),
        }
    }

    pub fn set_level(&self, level: Severity) {
        self.level.set(level);
    }
}

impl RecordSink for ConsoleSink {
    fn enabled(&self, level: Severity) -> bool {
        self.level.admits(level)
    }

    fn handle(&self, record: &LogRecord) -> Result<()> {
        let line = format::human_line(record);
        std::io::stdout()
            .lock()
            .write_all(line.as_bytes())
            .map_err(|source| LogError::Write {
                sink: "console",
                source,
            })
    }
}

#[cfg(test)]
pub(crate) mod capture {
    use std::sync::{Mutex, PoisonError};

    use super::*;

    /// Keeps every dispatched record in memory.
    pub(crate) struct CaptureSink {
        level: LevelGate,
        records: Mutex<Vec<LogRecord>>,
    }

    impl CaptureSink {
        pub(crate) fn new(level: Severity) -> Self {
            Self {
                level: LevelGate::new(level),
                records: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn records(&self) -> Vec<LogRecord> {
            self.records
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }

        pub(crate) fn last(&self) -> Option<LogRecord> {
            self.records().pop()
        }
    }

    impl RecordSink for CaptureSink {
        fn enabled(&self, level: Severity) -> bool {
            self.level.admits(level)
        }

        fn handle(&self, record: &LogRecord) -> Result<()> {
            self.records
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(record.clone());
            Ok(())
        }
    }
}
