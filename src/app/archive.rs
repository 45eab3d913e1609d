// Flog - app/archive.rs
//
// Age-based archival of inactive log files.
//
// Two passes per sweep:
//   1. Regular files directly under the log root whose mtime is older than
//      `ARCHIVE_AFTER_SECS` are moved, under the same name, into the archive
//      subdirectory. Files the registry currently has open are never moved:
//      this pass runs under the registry lock, so no file can be opened
//      between the check and the move. Writers wait for the pass to finish.
//   2. Files directly inside the archive subdirectory older than the
//      retention window are deleted (retention 0 keeps them forever).
//
// Triggering: the dispatcher calls `maybe_sweep` after each write. Sweeps
// are throttled to one per `sweep_interval`; a sweep already running on
// another thread causes the call to return immediately. Throttling delays
// archival but never changes which files end up archived.
//
// Every per-file failure (permission denied, file vanished mid-move) is
// non-fatal: it is logged, recorded in the report, and the sweep continues.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

use crate::app::registry::FileRegistry;
use crate::platform::config::ArchiveConfig;
use crate::platform::fs as pfs;
use crate::util::constants;

/// Outcome of one sweep.
#[derive(Debug, Default, Clone)]
pub struct SweepReport {
    /// Destination paths of files moved into the archive.
    pub archived: Vec<PathBuf>,
    /// Archived files deleted after the retention window.
    pub purged: Vec<PathBuf>,
    /// Human-readable non-fatal failures (capped at `MAX_SWEEP_WARNINGS`).
    pub warnings: Vec<String>,
}

impl SweepReport {
    fn warn(&mut self, msg: String) {
        tracing::warn!(warning = %msg, "Archive sweep warning");
        if self.warnings.len() < constants::MAX_SWEEP_WARNINGS {
            self.warnings.push(msg);
        }
    }
}

/// Moves aged files into the archive and purges expired archived files.
#[derive(Debug)]
pub struct ArchiveSweeper {
    root: PathBuf,
    archive_dir: PathBuf,
    retention: Option<Duration>,
    interval: Duration,
    last_run: Mutex<Option<Instant>>,
}

impl ArchiveSweeper {
    pub fn new(root: impl Into<PathBuf>, config: &ArchiveConfig) -> Self {
        let root = root.into();
        let retention = match config.retention_days {
            0 => None,
            days => Some(Duration::from_secs(u64::from(days) * 24 * 60 * 60)),
        };
        Self {
            archive_dir: root.join(&config.dir_name),
            root,
            retention,
            interval: config.sweep_interval,
            last_run: Mutex::new(None),
        }
    }

    /// Sweep unless one ran within the last `interval` or is running now.
    ///
    /// Must not be called while holding the registry lock.
    pub fn maybe_sweep(&self, registry: &FileRegistry) -> Option<SweepReport> {
        let mut last = self.last_run.try_lock()?;
        if (*last).is_some_and(|at| at.elapsed() < self.interval) {
            return None;
        }
        *last = Some(Instant::now());
        Some(self.sweep_at(SystemTime::now(), registry))
    }

    /// Sweep now, regardless of throttling.
    pub fn sweep(&self, registry: &FileRegistry) -> SweepReport {
        let mut last = self.last_run.lock();
        *last = Some(Instant::now());
        self.sweep_at(SystemTime::now(), registry)
    }

    /// Sweep as if the current time were `now`.
    pub fn sweep_at(&self, now: SystemTime, registry: &FileRegistry) -> SweepReport {
        let mut report = SweepReport::default();

        if !self.root.is_dir() {
            tracing::trace!(root = %self.root.display(), "Log root missing; nothing to sweep");
            return report;
        }

        registry.with_locked_open_paths(|active| self.archive_aged(now, active, &mut report));
        if let Some(retention) = self.retention {
            self.purge_expired(now, retention, &mut report);
        }

        if !report.archived.is_empty() || !report.purged.is_empty() {
            tracing::info!(
                root = %self.root.display(),
                archived = report.archived.len(),
                purged = report.purged.len(),
                warnings = report.warnings.len(),
                "Archive sweep complete"
            );
        }
        report
    }

    fn archive_aged(&self, now: SystemTime, active: &HashSet<PathBuf>, report: &mut SweepReport) {
        let threshold = Duration::from_secs(constants::ARCHIVE_AFTER_SECS);
        let mut archive_ready = false;

        for (path, mtime) in list_files(&self.root, report) {
            if active.contains(&path) || !is_older_than(now, mtime, threshold) {
                continue;
            }

            if !archive_ready {
                if let Err(e) = pfs::ensure_dir(&self.archive_dir) {
                    report.warn(format!("Cannot create archive directory: {e}"));
                    return;
                }
                archive_ready = true;
            }

            let Some(file_name) = path.file_name() else {
                continue;
            };
            let Some(dest) = pfs::free_path(self.archive_dir.join(file_name)) else {
                report.warn(format!(
                    "No free archive name for '{}'; left in place",
                    path.display()
                ));
                continue;
            };

            match pfs::move_file(&path, &dest) {
                Ok(()) => {
                    tracing::debug!(from = %path.display(), to = %dest.display(), "Archived");
                    report.archived.push(dest);
                }
                Err(e) => report.warn(format!("Cannot archive '{}': {e}", path.display())),
            }
        }
    }

    fn purge_expired(&self, now: SystemTime, retention: Duration, report: &mut SweepReport) {
        if !self.archive_dir.is_dir() {
            return;
        }
        for (path, mtime) in list_files(&self.archive_dir, report) {
            if !is_older_than(now, mtime, retention) {
                continue;
            }
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    tracing::debug!(path = %path.display(), "Purged expired archive file");
                    report.purged.push(path);
                }
                Err(e) => report.warn(format!("Cannot delete '{}': {e}", path.display())),
            }
        }
    }
}

/// Regular files directly inside `dir` with their mtimes. Directories
/// (including the archive subdirectory) and symlinks are skipped.
fn list_files(dir: &Path, report: &mut SweepReport) -> Vec<(PathBuf, SystemTime)> {
    let mut files = Vec::new();
    let walker = walkdir::WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false);

    for entry_result in walker {
        let entry = match entry_result {
            Ok(e) => e,
            Err(e) => {
                report.warn(format!("Cannot list '{}': {e}", dir.display()));
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        match entry.metadata().map(|m| m.modified()) {
            Ok(Ok(mtime)) => files.push((entry.into_path(), mtime)),
            Ok(Err(e)) => report.warn(format!(
                "Cannot read mtime of '{}': {e}",
                entry.path().display()
            )),
            Err(e) => report.warn(format!(
                "Cannot read metadata of '{}': {e}",
                entry.path().display()
            )),
        }
    }
    files
}

/// Files with an mtime in the future are never considered old.
fn is_older_than(now: SystemTime, mtime: SystemTime, age: Duration) -> bool {
    now.duration_since(mtime).map(|d| d > age).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::naming::LogicalName;
    use std::fs::{self, File};
    use std::sync::Arc;
    use tempfile::TempDir;

    const DAY: u64 = 24 * 60 * 60;

    fn config(retention_days: u32, interval: Duration) -> ArchiveConfig {
        ArchiveConfig {
            dir_name: "archive".to_string(),
            retention_days,
            sweep_interval: interval,
        }
    }

    fn logical(file_name: &str) -> LogicalName {
        LogicalName {
            key: file_name.to_string(),
            file_name: file_name.to_string(),
        }
    }

    fn write_aged(path: &Path, content: &str, age_secs: u64) {
        fs::write(path, content).unwrap();
        let mtime = SystemTime::now() - Duration::from_secs(age_secs);
        File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(mtime)
            .unwrap();
    }

    #[test]
    fn test_aged_file_is_archived_with_identical_content() {
        let dir = TempDir::new().unwrap();
        let old = dir.path().join("old.log");
        write_aged(&old, "line one\nline two\n", 2 * DAY);

        let sweeper = ArchiveSweeper::new(dir.path(), &config(30, Duration::ZERO));
        let report = sweeper.sweep(&FileRegistry::new(dir.path(), 0));

        let dest = dir.path().join("archive").join("old.log");
        assert_eq!(report.archived, vec![dest.clone()]);
        assert!(!old.exists());
        assert_eq!(fs::read_to_string(&dest).unwrap(), "line one\nline two\n");
    }

    #[test]
    fn test_recent_file_stays_in_place() {
        let dir = TempDir::new().unwrap();
        let fresh = dir.path().join("fresh.log");
        write_aged(&fresh, "x\n", 60);

        let sweeper = ArchiveSweeper::new(dir.path(), &config(30, Duration::ZERO));
        let report = sweeper.sweep(&FileRegistry::new(dir.path(), 0));

        assert!(report.archived.is_empty());
        assert!(fresh.exists());
        assert!(
            !dir.path().join("archive").exists(),
            "archive dir is only created when something is archived"
        );
    }

    #[test]
    fn test_open_file_is_never_archived() {
        let dir = TempDir::new().unwrap();
        let active = dir.path().join("flog.log");
        write_aged(&active, "x\n", 5 * DAY);

        let sweeper = ArchiveSweeper::new(dir.path(), &config(30, Duration::ZERO));
        let registry = FileRegistry::new(dir.path(), 0);
        registry.resolve(&logical("flog.log")).unwrap();
        let report = sweeper.sweep(&registry);

        assert!(report.archived.is_empty());
        assert!(active.exists());
    }

    /// An aged file opened by the registry just before the sweep must stay
    /// in the root, and later writes must keep landing there.
    #[test]
    fn test_file_opened_right_before_sweep_stays_in_root() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("x");
        write_aged(&target, "old\n", 3 * DAY);

        let registry = FileRegistry::new(dir.path(), 0);
        let sweeper = ArchiveSweeper::new(dir.path(), &config(30, Duration::ZERO));

        registry.resolve(&logical("x")).unwrap();
        let report = sweeper.sweep(&registry);
        for line in ["new", "newer"] {
            registry.resolve(&logical("x")).unwrap().write_line(line).unwrap();
        }

        assert!(report.archived.is_empty());
        assert_eq!(fs::read_to_string(&target).unwrap(), "old\nnew\nnewer\n");
        assert!(!dir.path().join("archive").join("x").exists());
    }

    /// Writers opening aged files while sweeps run concurrently: every line
    /// written through the registry must end up in the root file.
    #[test]
    fn test_concurrent_resolve_and_sweep_never_archive_open_files() {
        let dir = TempDir::new().unwrap();
        let keys = ["a", "b", "c", "d"];
        for key in keys {
            write_aged(&dir.path().join(key), "old\n", 3 * DAY);
        }
        let registry = Arc::new(FileRegistry::new(dir.path(), 0));
        let sweeper = Arc::new(ArchiveSweeper::new(
            dir.path(),
            &config(30, Duration::ZERO),
        ));

        let sweeping = {
            let registry = Arc::clone(&registry);
            let sweeper = Arc::clone(&sweeper);
            std::thread::spawn(move || {
                for _ in 0..50 {
                    sweeper.sweep(&registry);
                }
            })
        };
        let writers: Vec<_> = keys
            .iter()
            .map(|key| {
                let registry = Arc::clone(&registry);
                let key = key.to_string();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        registry
                            .resolve(&logical(&key))
                            .unwrap()
                            .write_line(&format!("line {i}"))
                            .unwrap();
                    }
                })
            })
            .collect();
        for w in writers {
            w.join().unwrap();
        }
        sweeping.join().unwrap();

        for key in keys {
            let content = fs::read_to_string(dir.path().join(key)).unwrap();
            let written = content.lines().filter(|l| l.starts_with("line ")).count();
            assert_eq!(written, 100, "key {key}");
            if let Ok(archived) = fs::read_to_string(dir.path().join("archive").join(key)) {
                assert!(!archived.contains("line "), "key {key} archived while open");
            }
        }
    }

    #[test]
    fn test_expired_archive_file_is_purged() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("archive");
        fs::create_dir(&archive).unwrap();
        let expired = archive.join("ancient.log");
        let kept = archive.join("recent.log");
        write_aged(&expired, "old\n", 10 * DAY);
        write_aged(&kept, "newer\n", 3 * DAY);

        let sweeper = ArchiveSweeper::new(dir.path(), &config(7, Duration::ZERO));
        let report = sweeper.sweep(&FileRegistry::new(dir.path(), 0));

        assert_eq!(report.purged, vec![expired.clone()]);
        assert!(!expired.exists());
        assert!(kept.exists());
    }

    #[test]
    fn test_zero_retention_keeps_archive_forever() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("archive");
        fs::create_dir(&archive).unwrap();
        let ancient = archive.join("ancient.log");
        write_aged(&ancient, "old\n", 400 * DAY);

        let sweeper = ArchiveSweeper::new(dir.path(), &config(0, Duration::ZERO));
        let report = sweeper.sweep(&FileRegistry::new(dir.path(), 0));

        assert!(report.purged.is_empty());
        assert!(ancient.exists());
    }

    /// An archived file with the same name as an existing one must not
    /// overwrite it.
    #[test]
    fn test_name_clash_in_archive_gets_numeric_suffix() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("archive");
        fs::create_dir(&archive).unwrap();
        write_aged(&archive.join("d.debug"), "first\n", 2 * DAY);
        write_aged(&dir.path().join("d.debug"), "second\n", 2 * DAY);

        let sweeper = ArchiveSweeper::new(dir.path(), &config(30, Duration::ZERO));
        let report = sweeper.sweep(&FileRegistry::new(dir.path(), 0));

        assert_eq!(report.archived, vec![archive.join("d.debug.1")]);
        assert_eq!(
            fs::read_to_string(archive.join("d.debug")).unwrap(),
            "first\n"
        );
        assert_eq!(
            fs::read_to_string(archive.join("d.debug.1")).unwrap(),
            "second\n"
        );
    }

    #[test]
    fn test_maybe_sweep_is_throttled() {
        let dir = TempDir::new().unwrap();
        let registry = FileRegistry::new(dir.path(), 0);
        let sweeper = ArchiveSweeper::new(dir.path(), &config(30, Duration::from_secs(3600)));

        assert!(sweeper.maybe_sweep(&registry).is_some());
        assert!(sweeper.maybe_sweep(&registry).is_none());
    }

    #[test]
    fn test_maybe_sweep_with_zero_interval_always_runs() {
        let dir = TempDir::new().unwrap();
        let registry = FileRegistry::new(dir.path(), 0);
        let sweeper = ArchiveSweeper::new(dir.path(), &config(30, Duration::ZERO));

        assert!(sweeper.maybe_sweep(&registry).is_some());
        assert!(sweeper.maybe_sweep(&registry).is_some());
    }

    #[test]
    fn test_missing_root_yields_empty_report() {
        let dir = TempDir::new().unwrap();
        let sweeper = ArchiveSweeper::new(dir.path().join("nope"), &config(30, Duration::ZERO));
        let report = sweeper.sweep(&FileRegistry::new(dir.path(), 0));
        assert!(report.archived.is_empty());
        assert!(report.warnings.is_empty());
    }
}
