//! Bounded log history.
//!
//! Each sweep removes at most one file, the oldest by modification time, so a
//! large backlog drains gradually across sweeps.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::{LogError, Result};

/// Default ceiling for the human-readable folder.
pub const HUMAN_RETENTION_CEILING: usize = 10;
/// Default ceiling for the JSON folder.
pub const JSON_RETENTION_CEILING: usize = 12;

/// If `dir` holds `ceiling` or more regular files, delete the oldest one.
///
/// `protect` names a file that is counted but never deleted (the live file).
/// Returns the removed path, if any.
pub fn truncate_oldest(
    dir: &Path,
    ceiling: usize,
    protect: Option<&Path>,
) -> Result<Option<PathBuf>> {
    let prune_err = |source| LogError::Prune {
        path: dir.to_path_buf(),
        source,
    };
    let protected = protect.and_then(Path::file_name);

    let mut count = 0usize;
    let mut oldest: Option<(SystemTime, PathBuf)> = None;
    for entry in fs::read_dir(dir).map_err(prune_err)? {
        let Ok(entry) = entry else { continue };
        let Ok(meta) = entry.metadata() else { continue };
        if !meta.is_file() {
            continue;
        }
        count += 1;
        if protected == Some(entry.file_name().as_os_str()) {
            continue;
        }
        let Ok(modified) = meta.modified() else { continue };
        if oldest.as_ref().map_or(true, |(t, _)| modified < *t) {
            oldest = Some((modified, entry.path()));
        }
    }

    if count < ceiling {
        return Ok(None);
    }
    let Some((_, victim)) = oldest else {
        return Ok(None);
    };
    fs::remove_file(&victim).map_err(|source| LogError::Prune {
        path: victim.clone(),
        source,
    })?;
    Ok(Some(victim))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Create `n` files with strictly increasing modification times.
    fn populate(dir: &Path, n: usize) -> Vec<PathBuf> {
        let base = SystemTime::now() - Duration::from_secs(10_000);
        (0..n)
            .map(|i| {
                let path = dir.join(format!("app-{i:03}.log"));
                let file = File::create(&path).unwrap();
                file.set_modified(base + Duration::from_secs(i as u64 * 10)).unwrap();
                path
            })
            .collect()
    }

    fn count(dir: &Path) -> usize {
        fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn test_one_file_per_sweep() {
        let tmp = TempDir::new().unwrap();
        let ceiling = HUMAN_RETENTION_CEILING;
        let files = populate(tmp.path(), ceiling + 5);

        let removed = truncate_oldest(tmp.path(), ceiling, None).unwrap();
        assert_eq!(removed.as_ref(), Some(&files[0]));
        assert_eq!(count(tmp.path()), ceiling + 4);

        for _ in 0..4 {
            truncate_oldest(tmp.path(), ceiling, None).unwrap();
        }
        assert_eq!(count(tmp.path()), ceiling);
        assert!(!files[4].exists());
        assert!(files[5].exists());
    }

    #[test]
    fn test_below_ceiling_is_untouched() {
        let tmp = TempDir::new().unwrap();
        populate(tmp.path(), JSON_RETENTION_CEILING - 1);
        assert_eq!(truncate_oldest(tmp.path(), JSON_RETENTION_CEILING, None).unwrap(), None);
        assert_eq!(count(tmp.path()), JSON_RETENTION_CEILING - 1);
    }

    #[test]
    fn test_directories_are_ignored() {
        let tmp = TempDir::new().unwrap();
        populate(tmp.path(), 2);
        fs::create_dir(tmp.path().join("json")).unwrap();
        assert_eq!(truncate_oldest(tmp.path(), 3, None).unwrap(), None);
    }

    #[test]
    fn test_protected_file_is_never_removed() {
        let tmp = TempDir::new().unwrap();
        let files = populate(tmp.path(), 3);
        let removed = truncate_oldest(tmp.path(), 3, Some(&files[0])).unwrap();
        assert_eq!(removed.as_ref(), Some(&files[1]));
        assert!(files[0].exists());
    }

    #[test]
    fn test_missing_dir_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let err = truncate_oldest(&tmp.path().join("nope"), 1, None).unwrap_err();
        assert!(matches!(err, LogError::Prune { .. }));
    }
}
