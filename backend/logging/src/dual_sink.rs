//! Paired human/JSON file sink with in-place rotation.
//!
//! Layout under `folder`:
//!
//! ```text
//! <folder>/<prefix>.log
//! <folder>/<prefix>-<ts>.log
//! <folder>/json/<prefix>.log
//! <folder>/json/<prefix>-<ts>.log
//! ```

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};

use crate::error::{LogError, Result};
use crate::format;
use crate::fs::{self as logfs, JSON_DIR};
use crate::global;
use crate::record::{kv, LogRecord};
use crate::severity::Severity;
use crate::sink::{LevelGate, RecordSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Human,
    Json,
}

impl Stream {
    fn name(self) -> &'static str {
        match self {
            Stream::Human => "human",
            Stream::Json => "json",
        }
    }
}

#[derive(Debug, Default)]
struct Handles {
    human: Option<File>,
    json: Option<File>,
}

impl Handles {
    fn get(&self, stream: Stream) -> Option<&File> {
        match stream {
            Stream::Human => self.human.as_ref(),
            Stream::Json => self.json.as_ref(),
        }
    }

    fn slot(&mut self, stream: Stream) -> &mut Option<File> {
        match stream {
            Stream::Human => &mut self.human,
            Stream::Json => &mut self.json,
        }
    }
}

/// What happened to one of the two files during a rotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileRotation {
    /// The live file was renamed to this path and a fresh one opened.
    Archived(PathBuf),
    /// The live file was empty and left alone.
    SkippedEmpty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationReport {
    pub human: FileRotation,
    pub json: FileRotation,
}

/// Owns the live `(human, json)` file pair for one folder/prefix.
///
/// One writer at a time holds the handle lock for both appends, so the two
/// files see records in the same order. Rotation takes the same lock only to
/// swap handles, and the replaced handles are closed after it is released.
#[derive(Debug)]
pub struct DualSink {
    folder: PathBuf,
    json_folder: PathBuf,
    prefix: String,
    level: LevelGate,
    handles: Mutex<Handles>,
    rotation: Mutex<()>,
}

impl DualSink {
    /// Create `folder` and `folder/json` if needed and open both live files.
    pub fn open(folder: impl AsRef<Path>, prefix: impl Into<String>) -> Result<Self> {
        let folder = folder.as_ref().to_path_buf();
        let json_folder = folder.join(JSON_DIR);
        let prefix = prefix.into();

        logfs::create_dir(&folder)?;
        logfs::create_dir(&json_folder)?;
        let (human, json) = logfs::new_files(&folder, &json_folder, &prefix)?;

        Ok(Self {
            folder,
            json_folder,
            prefix,
            level: LevelGate::new(Severity::INFO),
            handles: Mutex::new(Handles {
                human: Some(human),
                json: Some(json),
            }),
            rotation: Mutex::new(()),
        })
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn json_folder(&self) -> &Path {
        &self.json_folder
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn human_path(&self) -> PathBuf {
        logfs::current_path(&self.folder, &self.prefix)
    }

    pub fn json_path(&self) -> PathBuf {
        logfs::current_path(&self.json_folder, &self.prefix)
    }

    pub fn set_level(&self, level: Severity) {
        self.level.set(level);
    }

    pub fn level(&self) -> Severity {
        self.level.get()
    }

    pub fn is_closed(&self) -> bool {
        let handles = self.handles.lock().unwrap_or_else(PoisonError::into_inner);
        handles.human.is_none() && handles.json.is_none()
    }

    /// Append `record` to both files. A human-side failure does not stop the
    /// JSON append; the first failure is returned.
    pub fn write(&self, record: &LogRecord) -> Result<()> {
        let human_line = format::human_line(record);
        let json_line = format::json_line(record)?;

        let handles = self.handles.lock().unwrap_or_else(PoisonError::into_inner);
        let human = append(handles.get(Stream::Human), Stream::Human, &human_line);
        let json = append(handles.get(Stream::Json), Stream::Json, &json_line);
        human.and(json)
    }

    /// Current size of the live JSON file.
    pub fn json_size(&self) -> Result<u64> {
        self.live_size(Stream::Json)
    }

    /// Archive each non-empty live file and open a fresh one in its place.
    ///
    /// The two files rotate independently: whichever succeeded is installed
    /// even if the other failed, and the first failure is returned.
    pub fn rotate(&self) -> Result<RotationReport> {
        let serial = self.rotation.lock().unwrap_or_else(PoisonError::into_inner);
        let at = Utc::now();
        let human = self.prepare(Stream::Human, at);
        let json = self.prepare(Stream::Json, at);

        let (human, fresh_human) = split(human);
        let (json, fresh_json) = split(json);

        let mut retired = Vec::new();
        {
            let mut handles = self.handles.lock().unwrap_or_else(PoisonError::into_inner);
            for (stream, fresh) in [(Stream::Human, fresh_human), (Stream::Json, fresh_json)] {
                let Some(fresh) = fresh else { continue };
                let slot = handles.slot(stream);
                if slot.is_some() {
                    retired.extend(slot.replace(fresh));
                }
            }
        }
        drop(retired);
        drop(serial);

        let log = global::internal_logger(module_path!());
        for (stream, result) in [(Stream::Human, &human), (Stream::Json, &json)] {
            match result {
                Ok(FileRotation::Archived(path)) => {
                    log.info(
                        "rotated log file",
                        &[kv("stream", stream.name()), kv("archive", path.display().to_string())],
                    );
                }
                Ok(FileRotation::SkippedEmpty) => {
                    log.info(
                        "skipping rotation of empty log file",
                        &[kv("stream", stream.name())],
                    );
                }
                // only the human error is returned
                Err(_) if stream == Stream::Json && human.is_err() => {
                    log.with_result(result).error(
                        "unable to rotate log file",
                        &[kv("stream", stream.name())],
                    );
                }
                Err(_) => {}
            }
        }
        Ok(RotationReport {
            human: human?,
            json: json?,
        })
    }

    /// Close both files. Safe to call repeatedly.
    pub fn close(&self) {
        let retired = {
            let mut handles = self.handles.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *handles)
        };
        drop(retired);
    }

    fn dir(&self, stream: Stream) -> &Path {
        match stream {
            Stream::Human => &self.folder,
            Stream::Json => &self.json_folder,
        }
    }

    fn live_size(&self, stream: Stream) -> Result<u64> {
        let handles = self.handles.lock().unwrap_or_else(PoisonError::into_inner);
        let file = handles.get(stream).ok_or(LogError::SinkClosed)?;
        let meta = file.metadata().map_err(|source| LogError::Rotate {
            path: logfs::current_path(self.dir(stream), &self.prefix),
            source,
        })?;
        Ok(meta.len())
    }

    /// Rename the live file and open its replacement. `None` when the live
    /// file is empty.
    fn prepare(&self, stream: Stream, at: DateTime<Utc>) -> Result<Option<(File, PathBuf)>> {
        if self.live_size(stream)? == 0 {
            return Ok(None);
        }
        let dir = self.dir(stream);
        let current = logfs::current_path(dir, &self.prefix);
        let archive = logfs::archive_path(dir, &self.prefix, at);
        let fresh = archive_and_reopen(&current, &archive, logfs::open_append)?;
        Ok(Some((fresh, archive)))
    }
}

/// Move `current` to `archive` and open a new `current`. When the reopen
/// fails the archive is moved back, so the installed handle keeps naming the
/// live path.
fn archive_and_reopen(
    current: &Path,
    archive: &Path,
    reopen: impl FnOnce(&Path) -> Result<File>,
) -> Result<File> {
    fs::rename(current, archive).map_err(|source| LogError::Rotate {
        path: current.to_path_buf(),
        source,
    })?;
    match reopen(current) {
        Ok(fresh) => Ok(fresh),
        Err(e) => {
            if let Err(source) = fs::rename(archive, current) {
                let restore = LogError::Rotate {
                    path: archive.to_path_buf(),
                    source,
                };
                global::internal_logger(module_path!())
                    .with_error(Some(restore))
                    .error(
                        "unable to restore live log file after failed reopen",
                        &[kv("file", current.display().to_string())],
                    );
            }
            Err(e)
        }
    }
}

fn append(file: Option<&File>, stream: Stream, line: &str) -> Result<()> {
    let mut file = file.ok_or(LogError::SinkClosed)?;
    file.write_all(line.as_bytes())
        .map_err(|source| LogError::Write {
            sink: stream.name(),
            source,
        })
}

fn split(prepared: Result<Option<(File, PathBuf)>>) -> (Result<FileRotation>, Option<File>) {
    match prepared {
        Ok(Some((fresh, archive))) => (Ok(FileRotation::Archived(archive)), Some(fresh)),
        Ok(None) => (Ok(FileRotation::SkippedEmpty), None),
        Err(e) => (Err(e), None),
    }
}

impl RecordSink for DualSink {
    fn enabled(&self, level: Severity) -> bool {
        self.level.admits(level)
    }

    fn handle(&self, record: &LogRecord) -> Result<()> {
        self.write(record)
    }
}

impl Drop for DualSink {
    fn drop(&mut self) {
        self.close();
    }
}
