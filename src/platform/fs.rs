// Flog - platform/fs.rs
//
// Thin filesystem helpers shared by the registry and the archival sweeper.
// Every fallible helper returns `FlogError::Io` carrying the path and the
// operation name, so callers can log-and-drop without adding context.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::util::constants;
use crate::util::error::{FlogError, Result};

/// Create `dir` and any missing parents.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| FlogError::io(dir, "create directory", e))
}

/// Open `path` for appending, creating it if absent.
pub fn open_append(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| FlogError::io(path, "open", e))
}

/// Last-modified time of `path`.
pub fn modified_at(path: &Path) -> io::Result<SystemTime> {
    fs::metadata(path)?.modified()
}

/// `candidate` if nothing exists there, else the first free
/// `<candidate>.1`, `<candidate>.2`, ... up to `MAX_ROTATION_COLLISIONS`.
pub fn free_path(candidate: PathBuf) -> Option<PathBuf> {
    if !candidate.exists() {
        return Some(candidate);
    }
    let base = candidate.display().to_string();
    (1..=constants::MAX_ROTATION_COLLISIONS)
        .map(|n| PathBuf::from(format!("{base}.{n}")))
        .find(|path| !path.exists())
}

/// First free backup name for `path`: `<path>.<suffix>`, then
/// `<path>.<suffix>.1`, ...
pub fn free_backup_path(path: &Path, suffix: &str) -> Option<PathBuf> {
    free_path(PathBuf::from(format!("{}.{}", path.display(), suffix)))
}

/// Move a file, falling back to copy-and-delete when a plain rename fails
/// (e.g. the archive lives on another filesystem). The modification time is
/// carried over so retention is measured from the original write.
pub fn move_file(from: &Path, to: &Path) -> Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            tracing::debug!(
                from = %from.display(),
                to = %to.display(),
                error = %rename_err,
                "Rename failed; falling back to copy"
            );
            let mtime = modified_at(from).map_err(|e| FlogError::io(from, "stat", e))?;
            fs::copy(from, to).map_err(|e| FlogError::io(to, "copy", e))?;
            let copied = OpenOptions::new()
                .write(true)
                .open(to)
                .map_err(|e| FlogError::io(to, "open", e))?;
            if let Err(e) = copied.set_modified(mtime) {
                tracing::debug!(path = %to.display(), error = %e, "Could not preserve mtime");
            }
            fs::remove_file(from).map_err(|e| FlogError::io(from, "remove", e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_ensure_dir_creates_nested() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());
    }

    #[test]
    fn test_ensure_dir_fails_when_a_file_is_in_the_way() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "x").unwrap();
        let err = ensure_dir(&blocker.join("logs")).unwrap_err();
        assert!(matches!(
            err,
            FlogError::Io {
                operation: "create directory",
                ..
            }
        ));
    }

    #[test]
    fn test_free_backup_path_skips_taken_names() {
        let dir = TempDir::new().unwrap();
        let active = dir.path().join("app.log");
        assert_eq!(
            free_backup_path(&active, "101500").unwrap(),
            dir.path().join("app.log.101500")
        );
        fs::write(dir.path().join("app.log.101500"), "old").unwrap();
        assert_eq!(
            free_backup_path(&active, "101500").unwrap(),
            dir.path().join("app.log.101500.1")
        );
    }

    #[test]
    fn test_move_file_keeps_content_and_mtime() {
        let dir = TempDir::new().unwrap();
        let from = dir.path().join("old.log");
        let to = dir.path().join("moved.log");
        fs::write(&from, "payload\n").unwrap();
        let past = SystemTime::now() - Duration::from_secs(3 * 24 * 3600);
        File::options()
            .write(true)
            .open(&from)
            .unwrap()
            .set_modified(past)
            .unwrap();

        move_file(&from, &to).unwrap();

        assert!(!from.exists());
        assert_eq!(fs::read_to_string(&to).unwrap(), "payload\n");
        let moved_mtime = modified_at(&to).unwrap();
        let drift = moved_mtime
            .duration_since(past)
            .unwrap_or_else(|e| e.duration());
        assert!(drift < Duration::from_secs(2), "mtime drifted by {drift:?}");
    }
}
