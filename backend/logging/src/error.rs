use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures of the logging engine itself.
///
/// Caller-attached errors are not represented here; those are plain
/// [`anyhow::Error`] payloads carried by a [`crate::Logger`].
#[derive(Debug, Error)]
pub enum LogError {
    #[error("unable to create log directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unable to open log file {path}: {source}")]
    OpenFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unable to rotate {path}: {source}")]
    Rotate {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unable to prune {path}: {source}")]
    Prune {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unable to write {sink} log line: {source}")]
    Write {
        sink: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("unable to read scope config {path}: {source}")]
    ScopeConfig {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("dynamic scopes already attached from {0}")]
    ScopesAlreadyAttached(PathBuf),

    #[error("log sink is closed")]
    SinkClosed,

    #[error("no tokio runtime available for background housekeeping")]
    NoRuntime,

    #[error("watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, LogError>;
