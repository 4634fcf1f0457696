//! File-system helpers shared by the sink, rotation and retention code.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::error::{LogError, Result};

/// Name of the structured sub-folder under a log folder.
pub const JSON_DIR: &str = "json";

/// Format of the timestamp embedded in archived file names (UTC).
pub const ROTATION_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

pub fn file_exists(path: &Path) -> bool {
    !matches!(fs::metadata(path), Err(e) if e.kind() == io::ErrorKind::NotFound)
}

/// `mkdir -p` with 0755 permissions on unix.
pub fn create_dir(path: &Path) -> Result<()> {
    if file_exists(path) {
        return Ok(());
    }
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o755);
    }
    builder.create(path).map_err(|source| LogError::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}

/// Open `path` for appending, creating it with 0644 permissions on unix.
pub fn open_append(path: &Path) -> Result<File> {
    let mut options = OpenOptions::new();
    options.create(true).append(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o644);
    }
    options.open(path).map_err(|source| LogError::OpenFile {
        path: path.to_path_buf(),
        source,
    })
}

/// Path of the live file for `prefix` inside `dir`.
pub fn current_path(dir: &Path, prefix: &str) -> PathBuf {
    dir.join(format!("{prefix}.log"))
}

/// Open the live human and JSON files. If the second open fails the first
/// handle is dropped before the error is returned.
pub fn new_files(dir: &Path, json_dir: &Path, prefix: &str) -> Result<(File, File)> {
    let human = open_append(&current_path(dir, prefix))?;
    let json = open_append(&current_path(json_dir, prefix))?;
    Ok((human, json))
}

/// Free archive name for `prefix` rotated at `at`.
///
/// `<prefix>-<ts>.log`, or `<prefix>-<ts>.<n>.log` when an archive from the
/// same second already exists.
pub fn archive_path(dir: &Path, prefix: &str, at: DateTime<Utc>) -> PathBuf {
    let stamp = at.format(ROTATION_TIMESTAMP_FORMAT);
    let first = dir.join(format!("{prefix}-{stamp}.log"));
    if !file_exists(&first) {
        return first;
    }
    (1u32..)
        .map(|n| dir.join(format!("{prefix}-{stamp}.{n}.log")))
        .find(|candidate| !file_exists(candidate))
        .unwrap_or(first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn test_create_dir_is_recursive_and_idempotent() {
        let tmp = TempDir::new().unwrap();
        let nested = tmp.path().join("a/b/c");
        create_dir(&nested).unwrap();
        create_dir(&nested).unwrap();
        assert!(file_exists(&nested));
    }

    #[cfg(unix)]
    #[test]
    fn test_open_append_mode() {
        use std::os::unix::fs::PermissionsExt;
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("x.log");
        open_append(&path).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        // umask may only remove bits
        assert_eq!(mode & !0o644, 0);
    }

    #[test]
    fn test_new_files_fails_when_json_dir_missing() {
        let tmp = TempDir::new().unwrap();
        let err = new_files(tmp.path(), &tmp.path().join("missing"), "app").unwrap_err();
        assert!(matches!(err, LogError::OpenFile { .. }));
    }

    #[test]
    fn test_archive_path_avoids_collisions() {
        let tmp = TempDir::new().unwrap();
        let at = Utc.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap();
        let first = archive_path(tmp.path(), "app", at);
        assert_eq!(first.file_name().unwrap(), "app-2026-03-04T05:06:07.log");
        fs::write(&first, b"x").unwrap();
        let second = archive_path(tmp.path(), "app", at);
        assert_eq!(second.file_name().unwrap(), "app-2026-03-04T05:06:07.1.log");
    }
}
