// Flog - app/registry.rs
//
// File registry: the single owner of open log file handles.
//
// Architecture:
//   - One `parking_lot::Mutex` guards the key -> `FileEntry` map. It is held
//     for lookup-or-open-and-rotate as one unit, and released before the
//     line is written. Concurrent resolvers therefore never open two handles
//     for one path and never double-rotate a file.
//   - `resolve` hands back a `WritableHandle` (a cloned `Arc<File>`). A
//     writer that resolved just before a rotation may still append its line
//     through the old handle; that line lands in the backup file and is
//     never lost.
//   - Stale entries (the key now resolves to a different path, e.g. after a
//     date roll) are synced and dropped before the new handle is opened.
//   - An active file removed from outside the process (logrotate, an
//     operator) is recreated on the next resolve instead of writing into the
//     unlinked inode.
//   - The archive sweeper moves files only inside `with_locked_open_paths`,
//     so a file cannot be opened between its "is it open?" check and its move.
//
// Failure policy:
//   - Every failure is returned as `FlogError::Io`; the dispatcher decides
//     to log and drop.
//   - A failed rotation leaves the previous handle attached to the entry.

use chrono::Local;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::core::naming::LogicalName;
use crate::platform::fs as pfs;
use crate::util::constants;
use crate::util::error::{FlogError, Result};

// =============================================================================
// Handles
// =============================================================================

/// An open append handle for one log file, shareable across threads.
#[derive(Debug, Clone)]
pub struct WritableHandle {
    path: PathBuf,
    file: Arc<File>,
}

impl WritableHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `line` plus a newline in a single write call.
    pub fn write_line(&self, line: &str) -> Result<()> {
        let mut buf = String::with_capacity(line.len() + 1);
        buf.push_str(line);
        buf.push('\n');
        (&*self.file)
            .write_all(buf.as_bytes())
            .map_err(|e| FlogError::io(&self.path, "write", e))
    }
}

/// One cached file. `path` is the path `file` was opened at.
#[derive(Debug)]
struct FileEntry {
    logical_name: String,
    path: PathBuf,
    file: Arc<File>,
}

impl FileEntry {
    fn handle(&self) -> WritableHandle {
        WritableHandle {
            path: self.path.clone(),
            file: Arc::clone(&self.file),
        }
    }
}

/// Best-effort close: push data to disk, log on failure, drop our reference.
fn close_handle(path: &Path, file: Arc<File>, reason: &'static str) {
    if let Err(e) = file.sync_data() {
        tracing::warn!(path = %path.display(), error = %e, reason, "Failed to sync log file on close");
    }
    drop(file);
}

// =============================================================================
// FileRegistry
// =============================================================================

/// Maps logical names to open handles under one root directory.
#[derive(Debug)]
pub struct FileRegistry {
    root: PathBuf,
    /// 0 disables rotation.
    rotate_size_bytes: u64,
    entries: Mutex<HashMap<String, FileEntry>>,
    rotations: AtomicU64,
}

impl FileRegistry {
    pub fn new(root: impl Into<PathBuf>, rotate_size_bytes: u64) -> Self {
        Self {
            root: root.into(),
            rotate_size_bytes,
            entries: Mutex::new(HashMap::new()),
            rotations: AtomicU64::new(0),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of rotations performed since construction.
    pub fn rotations(&self) -> u64 {
        self.rotations.load(Ordering::Relaxed)
    }

    /// Paths of every file currently open for writing.
    #[cfg(test)]
    pub(crate) fn open_paths(&self) -> HashSet<PathBuf> {
        self.with_locked_open_paths(|open| open.clone())
    }

    /// Run `f` with the set of open paths while holding the registry lock.
    /// No handle can be opened, rotated or closed until `f` returns.
    pub fn with_locked_open_paths<R>(&self, f: impl FnOnce(&HashSet<PathBuf>) -> R) -> R {
        let entries = self.entries.lock();
        let open: HashSet<PathBuf> = entries.values().map(|entry| entry.path.clone()).collect();
        f(&open)
    }

    /// Return the handle for `name`, opening or rotating as needed.
    ///
    /// 1. Ensure the root directory exists.
    /// 2. Under the lock: a missing entry, or one whose path no longer matches
    ///    `name.file_name`, gets a fresh append handle (the stale one is closed).
    /// 3. An existing entry with an unchanged path is reopened if its file was
    ///    removed, then rotation-checked.
    pub fn resolve(&self, name: &LogicalName) -> Result<WritableHandle> {
        pfs::ensure_dir(&self.root)?;
        let path = self.root.join(&name.file_name);

        let mut entries = self.entries.lock();

        if let Some(entry) = entries
            .get_mut(&name.key)
            .filter(|entry| entry.path == path)
        {
            if !entry.path.exists() {
                self.reopen(entry, "active file removed")?;
            }
            self.rotate_if_needed(entry)?;
            return Ok(entry.handle());
        }

        if let Some(stale) = entries.remove(&name.key) {
            tracing::debug!(
                key = %stale.logical_name,
                old = %stale.path.display(),
                new = %path.display(),
                "Target path changed; closing stale handle"
            );
            close_handle(&stale.path, stale.file, "stale path");
        }

        let file = pfs::open_append(&path)?;
        tracing::debug!(key = %name.key, path = %path.display(), "Opened log file");
        let entry = FileEntry {
            logical_name: name.key.clone(),
            path,
            file: Arc::new(file),
        };
        let handle = entry.handle();
        entries.insert(name.key.clone(), entry);
        Ok(handle)
    }

    /// Rotate `entry` aside when its file has reached the size threshold.
    ///
    /// Must be called with the registry lock held.
    fn rotate_if_needed(&self, entry: &mut FileEntry) -> Result<()> {
        if self.rotate_size_bytes == 0 {
            return Ok(());
        }

        let size = match entry.file.metadata() {
            Ok(meta) => meta.len(),
            Err(e) => {
                tracing::warn!(
                    path = %entry.path.display(),
                    error = %e,
                    "Cannot stat log file; skipping rotation check"
                );
                return Ok(());
            }
        };
        if size < self.rotate_size_bytes {
            return Ok(());
        }

        let suffix = Local::now()
            .format(constants::ROTATION_SUFFIX_LAYOUT)
            .to_string();
        let backup = pfs::free_backup_path(&entry.path, &suffix).ok_or_else(|| {
            FlogError::io(
                &entry.path,
                "rotate",
                io::Error::new(io::ErrorKind::AlreadyExists, "no free backup file name"),
            )
        })?;

        match fs::rename(&entry.path, &backup) {
            Ok(()) => {}
            // Removed between the existence check and the rename.
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return self.reopen(entry, "active file removed");
            }
            Err(e) => return Err(FlogError::io(&entry.path, "rename", e)),
        }

        // The old handle now points at the backup; it stays attached if the
        // reopen fails so the entry is never left without a handle.
        let fresh = pfs::open_append(&entry.path)?;
        let old = std::mem::replace(&mut entry.file, Arc::new(fresh));
        close_handle(&backup, old, "rotated");

        self.rotations.fetch_add(1, Ordering::Relaxed);
        tracing::info!(
            path = %entry.path.display(),
            backup = %backup.display(),
            size,
            threshold = self.rotate_size_bytes,
            "Rotated log file"
        );
        Ok(())
    }

    /// Replace the entry's handle with a fresh append handle at its path.
    /// On failure the old handle stays attached.
    ///
    /// Must be called with the registry lock held.
    fn reopen(&self, entry: &mut FileEntry, reason: &'static str) -> Result<()> {
        let fresh = pfs::open_append(&entry.path)?;
        let old = std::mem::replace(&mut entry.file, Arc::new(fresh));
        close_handle(&entry.path, old, reason);
        tracing::warn!(path = %entry.path.display(), reason, "Reopened log file");
        Ok(())
    }

    /// Push every open file's data to disk. Failures are logged.
    pub fn sync_all(&self) {
        let entries = self.entries.lock();
        for entry in entries.values() {
            if let Err(e) = entry.file.sync_data() {
                tracing::warn!(path = %entry.path.display(), error = %e, "Failed to sync log file");
            }
        }
    }

    /// Close and forget every handle.
    pub fn close_all(&self) {
        let drained: Vec<FileEntry> = self.entries.lock().drain().map(|(_, e)| e).collect();
        let count = drained.len();
        for entry in drained {
            close_handle(&entry.path, entry.file, "registry closed");
        }
        tracing::debug!(count, root = %self.root.display(), "Registry closed");
    }
}
