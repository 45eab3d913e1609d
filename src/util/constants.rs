// Flog - util/constants.rs
//
// Single source of truth for all named constants, limits, and defaults.
// Every default in `platform::config::LoggerConfig` refers back to a value
// defined here so the full set is auditable in one place.

// =============================================================================
// Application metadata
// =============================================================================

/// Application display name.
pub const APP_NAME: &str = "Flog";

/// Application identifier used for config directories.
pub const APP_ID: &str = "flog";

/// Current crate version.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// File layout defaults
// =============================================================================

/// Default root directory for log files, relative to the working directory.
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Default base file name used by the `ByFile` and `ByFileAndLevel` modes.
pub const DEFAULT_FILE_NAME: &str = "flog.log";

/// Default archive subdirectory name (created under the log root).
pub const DEFAULT_ARCHIVE_DIR: &str = "archive";

/// Default separator placed between formatted fields.
pub const DEFAULT_SEPARATOR: &str = " ";

// =============================================================================
// Line format
// =============================================================================

/// chrono layout for the datetime field of a rendered line.
pub const TIMESTAMP_LAYOUT: &str = "%Y-%m-%d %H:%M:%S";

/// chrono layout appended to a file name when it is rotated aside.
pub const ROTATION_SUFFIX_LAYOUT: &str = "%H%M%S";

/// Rendered in place of `file:line` when no caller location is known.
pub const UNKNOWN_LOCATION: &str = "???:0";

// =============================================================================
// Rotation
// =============================================================================

/// Default size threshold at which the active file is rotated aside.
pub const DEFAULT_ROTATE_SIZE_BYTES: u64 = 100 * 1024 * 1024; // 100 MiB

/// Upper bound on the numeric tie-breaker appended to a rotated file name
/// when `<name>.<HHMMSS>` already exists.
pub const MAX_ROTATION_COLLISIONS: u32 = 1_000;

// =============================================================================
// Async delivery
// =============================================================================

/// Default bounded queue capacity in async mode (2^16 messages). The
/// channel allocates every slot up front.
pub const DEFAULT_ASYNC_CAPACITY: usize = 1 << 16;

// =============================================================================
// Archival
// =============================================================================

/// Files untouched for longer than this are moved into the archive.
pub const ARCHIVE_AFTER_SECS: u64 = 24 * 60 * 60; // 1 day

/// Default retention for archived files. 0 keeps archived files forever.
pub const DEFAULT_RETENTION_DAYS: u32 = 30;

/// Minimum time between two opportunistic sweeps.
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

/// Hard upper bound on the configurable sweep interval.
pub const MAX_SWEEP_INTERVAL_SECS: u64 = 24 * 60 * 60;

/// Maximum number of non-fatal warnings kept in a single `SweepReport`.
pub const MAX_SWEEP_WARNINGS: usize = 100;

// =============================================================================
// Diagnostics
// =============================================================================

/// Default level for the diagnostic `tracing` subscriber installed by the CLI.
pub const DEFAULT_DIAGNOSTIC_LEVEL: &str = "info";

// =============================================================================
// Configuration
// =============================================================================

/// Configuration file name.
pub const CONFIG_FILE_NAME: &str = "config.toml";
