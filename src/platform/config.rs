// Flog - platform/config.rs
//
// Logger configuration: the validated `LoggerConfig` value every component
// reads, plus config.toml loading with startup validation.
//
// A `LoggerConfig` is set once when a `Logger` is built and never mutated
// afterwards; components only ever see it through shared references.
//
// Uses the `directories` crate to find the default config.toml for the CLI
// (XDG on Linux, AppData on Windows, Library on macOS).

use crate::core::format::Formatter;
use crate::core::model::{FileNameMode, FormatFlag, Level};
use crate::core::naming::FileNaming;
use crate::util::constants;
use crate::util::error::ConfigError;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use std::time::Duration;

// =============================================================================
// Platform paths
// =============================================================================

/// Resolved platform paths for Flog configuration.
#[derive(Debug, Clone)]
pub struct PlatformPaths {
    /// Configuration directory (e.g. ~/.config/flog/).
    pub config_dir: PathBuf,
}

impl PlatformPaths {
    /// Resolve platform-appropriate paths.
    ///
    /// Falls back to the current directory if platform dirs cannot be determined.
    pub fn resolve() -> Self {
        if let Some(proj_dirs) = ProjectDirs::from("", "", constants::APP_ID) {
            let config_dir = proj_dirs.config_dir().to_path_buf();
            tracing::debug!(config = %config_dir.display(), "Platform paths resolved");
            Self { config_dir }
        } else {
            tracing::warn!("Could not determine platform directories, using current directory");
            Self {
                config_dir: PathBuf::from("."),
            }
        }
    }

    /// Full path of the default config file.
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(constants::CONFIG_FILE_NAME)
    }
}

// =============================================================================
// Validated configuration
// =============================================================================

/// Where file I/O happens. Chosen at construction, fixed for the logger's
/// lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchMode {
    /// The emitting thread writes the line before `emit` returns.
    #[default]
    Sync,
    /// A single background consumer writes; `emit` enqueues into a bounded
    /// queue and blocks only when the queue is full. Capacity 0 selects
    /// `DEFAULT_ASYNC_CAPACITY`.
    Async { capacity: usize },
}

/// Archival settings. Archival is off unless `LoggerConfig::archive` is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveConfig {
    /// Subdirectory of the log root that receives aged files.
    pub dir_name: String,
    /// Archived files older than this many days are deleted. 0 keeps them.
    pub retention_days: u32,
    /// Minimum time between two opportunistic sweeps.
    pub sweep_interval: Duration,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            dir_name: constants::DEFAULT_ARCHIVE_DIR.to_string(),
            retention_days: constants::DEFAULT_RETENTION_DAYS,
            sweep_interval: Duration::from_secs(constants::DEFAULT_SWEEP_INTERVAL_SECS),
        }
    }
}

/// Fully populated logger configuration.
///
/// Precondition: not mutated while a `Logger` built from it is running. The
/// logger keeps its own copy, so this holds unless the caller shares one
/// through interior mutability of their own.
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Root directory for log files.
    pub root: PathBuf,
    /// Messages below this level are dropped before any work is done.
    pub min_level: Level,
    pub file_name_mode: FileNameMode,
    /// Base name for the `ByFile` and `ByFileAndLevel` modes.
    pub file_name: String,
    /// PHP-style date pattern appended to file names (`Ymd` -> `.20261016`).
    pub date_format: Option<String>,
    /// Field order of a rendered line; the body always comes last.
    pub flags: Vec<FormatFlag>,
    pub separator: String,
    /// Active files at or above this size are rotated aside. 0 disables.
    pub rotate_size_bytes: u64,
    pub dispatch: DispatchMode,
    pub archive: Option<ArchiveConfig>,
    /// Level for the CLI's diagnostic subscriber.
    pub diagnostic_level: Option<String>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(constants::DEFAULT_LOG_DIR),
            min_level: Level::Debug,
            file_name_mode: FileNameMode::ByFile,
            file_name: constants::DEFAULT_FILE_NAME.to_string(),
            date_format: None,
            flags: FormatFlag::defaults(),
            separator: constants::DEFAULT_SEPARATOR.to_string(),
            rotate_size_bytes: constants::DEFAULT_ROTATE_SIZE_BYTES,
            dispatch: DispatchMode::Sync,
            archive: None,
            diagnostic_level: None,
        }
    }
}

impl LoggerConfig {
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn with_min_level(mut self, level: Level) -> Self {
        self.min_level = level;
        self
    }

    pub fn with_file_name_mode(mut self, mode: FileNameMode) -> Self {
        self.file_name_mode = mode;
        self
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = name.into();
        self
    }

    pub fn with_date_format(mut self, pattern: impl Into<String>) -> Self {
        self.date_format = Some(pattern.into());
        self
    }

    pub fn with_flags(mut self, flags: Vec<FormatFlag>) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn with_rotate_size(mut self, bytes: u64) -> Self {
        self.rotate_size_bytes = bytes;
        self
    }

    /// Switch to async dispatch. Capacity 0 selects the default.
    pub fn with_async(mut self, capacity: usize) -> Self {
        self.dispatch = DispatchMode::Async { capacity };
        self
    }

    pub fn with_archive(mut self, archive: ArchiveConfig) -> Self {
        self.archive = Some(archive);
        self
    }

    /// The naming policy derived from this configuration.
    pub fn naming(&self) -> FileNaming {
        FileNaming {
            mode: self.file_name_mode,
            file_name: if self.file_name.is_empty() {
                constants::DEFAULT_FILE_NAME.to_string()
            } else {
                self.file_name.clone()
            },
            date_format: self.date_format.clone().filter(|p| !p.is_empty()),
        }
    }

    /// The line formatter derived from this configuration.
    pub fn formatter(&self) -> Formatter {
        Formatter::new(self.flags.clone(), self.separator.clone())
    }
}

// =============================================================================
// config.toml loading and validation
// =============================================================================

/// Raw deserialisable shape of config.toml.
///
/// Unknown keys are silently ignored for forward compatibility.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct RawConfig {
    /// `[logger]` section.
    pub logger: LoggerSection,
    /// `[async]` section.
    #[serde(rename = "async")]
    pub dispatch: AsyncSection,
    /// `[archive]` section.
    pub archive: ArchiveSection,
    /// `[diagnostics]` section.
    pub diagnostics: DiagnosticsSection,
}

/// `[logger]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct LoggerSection {
    /// Log root directory.
    pub root: Option<String>,
    /// Minimum level: "debug", "info", "warning", "error".
    pub level: Option<String>,
    /// File naming mode, e.g. "by_category_and_level".
    pub mode: Option<String>,
    /// Base file name.
    pub file_name: Option<String>,
    /// PHP-style date suffix pattern.
    pub date_format: Option<String>,
    /// Ordered field list, e.g. ["datetime", "shortfile", "level"].
    pub flags: Option<Vec<String>>,
    /// Field separator.
    pub separator: Option<String>,
    /// Rotation threshold in bytes (0 disables).
    pub rotate_size_bytes: Option<u64>,
}

/// `[async]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct AsyncSection {
    pub enabled: Option<bool>,
    /// Queue capacity in messages (0 = default).
    pub capacity: Option<usize>,
}

/// `[archive]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct ArchiveSection {
    pub enabled: Option<bool>,
    /// Archive subdirectory name.
    pub dir: Option<String>,
    pub retention_days: Option<u32>,
    pub sweep_interval_secs: Option<u64>,
}

/// `[diagnostics]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct DiagnosticsSection {
    /// Level: "error", "warn", "info", "debug", "trace".
    pub level: Option<String>,
}

/// Read and validate `path`, surfacing read and parse failures as errors.
///
/// Returns the validated config and a list of non-fatal warnings about
/// values that were ignored.
pub fn try_load_config(path: &Path) -> Result<(LoggerConfig, Vec<String>), ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let raw: RawConfig = toml::from_str(&content).map_err(|source| ConfigError::TomlParse {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(path = %path.display(), "Loaded config.toml");
    Ok(validate(raw))
}

/// Load and validate `path`, never failing.
///
/// A missing file yields defaults with no warnings (first run). An
/// unreadable or unparseable file yields defaults plus a warning.
pub fn load_config(path: &Path) -> (LoggerConfig, Vec<String>) {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "No config.toml found; using defaults");
        return (LoggerConfig::default(), Vec::new());
    }
    match try_load_config(path) {
        Ok(loaded) => loaded,
        Err(e) => {
            let msg = format!("{e}. Using defaults.");
            tracing::warn!("{}", msg);
            (LoggerConfig::default(), vec![msg])
        }
    }
}

/// Parse and validate config.toml content.
pub fn parse_config(content: &str) -> Result<(LoggerConfig, Vec<String>), toml::de::Error> {
    let raw: RawConfig = toml::from_str(content)?;
    Ok(validate(raw))
}

/// Turn a raw config into a `LoggerConfig`, accumulating a warning for
/// every value that cannot be used. Missing values silently take defaults.
fn validate(raw: RawConfig) -> (LoggerConfig, Vec<String>) {
    let mut config = LoggerConfig::default();
    let mut warnings: Vec<String> = Vec::new();
    let logger = raw.logger;

    // -- Logger: root --
    if let Some(root) = logger.root {
        if root.trim().is_empty() {
            warnings.push(format!(
                "[logger] root is empty. Using default ({}).",
                constants::DEFAULT_LOG_DIR
            ));
        } else {
            config.root = PathBuf::from(root);
        }
    }

    // -- Logger: level --
    if let Some(ref level) = logger.level {
        match level.parse::<Level>() {
            Ok(l) => config.min_level = l,
            Err(e) => warnings.push(format!("[logger] level: {e}. Using default (debug).")),
        }
    }

    // -- Logger: mode --
    if let Some(ref mode) = logger.mode {
        match mode.parse::<FileNameMode>() {
            Ok(m) => config.file_name_mode = m,
            Err(e) => warnings.push(format!("[logger] mode: {e}. Using default (by_file).")),
        }
    }

    // -- Logger: file_name --
    if let Some(name) = logger.file_name {
        if is_plain_file_name(&name) {
            config.file_name = name;
        } else {
            warnings.push(format!(
                "[logger] file_name = \"{name}\" must be a plain file name. Using default ({}).",
                constants::DEFAULT_FILE_NAME
            ));
        }
    }

    // -- Logger: date_format --
    if let Some(pattern) = logger.date_format {
        config.date_format = Some(pattern).filter(|p| !p.is_empty());
    }

    // -- Logger: flags --
    if let Some(names) = logger.flags {
        let mut flags = Vec::with_capacity(names.len());
        for name in &names {
            match name.parse::<FormatFlag>() {
                Ok(f) => flags.push(f),
                Err(e) => warnings.push(format!("[logger] flags: {e}. Flag ignored.")),
            }
        }
        if !flags.is_empty() {
            config.flags = flags;
        }
    }

    // -- Logger: separator --
    if let Some(sep) = logger.separator {
        if !sep.is_empty() {
            config.separator = sep;
        }
    }

    // -- Logger: rotate_size_bytes --
    if let Some(bytes) = logger.rotate_size_bytes {
        config.rotate_size_bytes = bytes;
    }

    // -- Async --
    if raw.dispatch.enabled.unwrap_or(false) {
        let capacity = raw.dispatch.capacity.unwrap_or(0);
        config.dispatch = DispatchMode::Async { capacity };
    } else if raw.dispatch.capacity.is_some() {
        warnings.push(
            "[async] capacity is set but async is not enabled. Set enabled = true to use it."
                .to_string(),
        );
    }

    // -- Archive --
    if raw.archive.enabled.unwrap_or(false) {
        let mut archive = ArchiveConfig::default();
        if let Some(dir) = raw.archive.dir {
            if is_plain_file_name(&dir) {
                archive.dir_name = dir;
            } else {
                warnings.push(format!(
                    "[archive] dir = \"{dir}\" must be a plain directory name. Using default ({}).",
                    constants::DEFAULT_ARCHIVE_DIR
                ));
            }
        }
        if let Some(days) = raw.archive.retention_days {
            archive.retention_days = days;
        }
        if let Some(secs) = raw.archive.sweep_interval_secs {
            if secs <= constants::MAX_SWEEP_INTERVAL_SECS {
                archive.sweep_interval = Duration::from_secs(secs);
            } else {
                warnings.push(format!(
                    "[archive] sweep_interval_secs = {secs} is out of range (0-{}). Using default ({}).",
                    constants::MAX_SWEEP_INTERVAL_SECS,
                    constants::DEFAULT_SWEEP_INTERVAL_SECS,
                ));
            }
        }
        config.archive = Some(archive);
    }

    // -- Diagnostics: level --
    if let Some(ref level) = raw.diagnostics.level {
        let valid = ["error", "warn", "info", "debug", "trace"];
        if valid.contains(&level.to_lowercase().as_str()) {
            config.diagnostic_level = Some(level.clone());
        } else {
            warnings.push(format!(
                "[diagnostics] level = \"{level}\" is not recognised. \
                 Valid values: error, warn, info, debug, trace. Using default (info).",
            ));
        }
    }

    if !warnings.is_empty() {
        tracing::warn!(
            count = warnings.len(),
            "Config validation produced warnings"
        );
    }

    (config, warnings)
}

/// Non-empty, no path separators, not `.` or `..`.
fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = LoggerConfig::default();
        assert_eq!(config.root, PathBuf::from("logs"));
        assert_eq!(config.file_name, "flog.log");
        assert_eq!(config.min_level, Level::Debug);
        assert_eq!(config.file_name_mode, FileNameMode::ByFile);
        assert_eq!(
            config.flags,
            vec![
                FormatFlag::Datetime,
                FormatFlag::LongFile,
                FormatFlag::Category,
                FormatFlag::Level
            ]
        );
        assert_eq!(config.separator, " ");
        assert_eq!(config.rotate_size_bytes, 100 * 1024 * 1024);
        assert_eq!(config.dispatch, DispatchMode::Sync);
        assert!(config.archive.is_none());
    }

    #[test]
    fn test_full_config_parses() {
        let (config, warnings) = parse_config(
            r#"
            [logger]
            root = "/var/log/app"
            level = "warning"
            mode = "by_category_and_level"
            file_name = "app.log"
            date_format = "Ymd"
            flags = ["level", "category", "datetime"]
            separator = " | "
            rotate_size_bytes = 4096

            [async]
            enabled = true
            capacity = 128

            [archive]
            enabled = true
            dir = "old"
            retention_days = 7
            sweep_interval_secs = 5

            [diagnostics]
            level = "debug"
            "#,
        )
        .unwrap();

        assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
        assert_eq!(config.root, PathBuf::from("/var/log/app"));
        assert_eq!(config.min_level, Level::Warning);
        assert_eq!(config.file_name_mode, FileNameMode::ByCategoryAndLevel);
        assert_eq!(config.file_name, "app.log");
        assert_eq!(config.date_format.as_deref(), Some("Ymd"));
        assert_eq!(
            config.flags,
            vec![FormatFlag::Level, FormatFlag::Category, FormatFlag::Datetime]
        );
        assert_eq!(config.separator, " | ");
        assert_eq!(config.rotate_size_bytes, 4096);
        assert_eq!(config.dispatch, DispatchMode::Async { capacity: 128 });
        let archive = config.archive.unwrap();
        assert_eq!(archive.dir_name, "old");
        assert_eq!(archive.retention_days, 7);
        assert_eq!(archive.sweep_interval, Duration::from_secs(5));
        assert_eq!(config.diagnostic_level.as_deref(), Some("debug"));
    }

    /// Missing fields are defaults, never errors.
    #[test]
    fn test_empty_config_is_all_defaults() {
        let (config, warnings) = parse_config("").unwrap();
        assert!(warnings.is_empty());
        assert_eq!(config.file_name, "flog.log");
        assert_eq!(config.dispatch, DispatchMode::Sync);
    }

    #[test]
    fn test_invalid_values_warn_and_keep_defaults() {
        let (config, warnings) = parse_config(
            r#"
            [logger]
            level = "loud"
            mode = "by_moon_phase"
            file_name = "../escape.log"
            flags = ["level", "thread"]

            [archive]
            enabled = true
            dir = "a/b"
            sweep_interval_secs = 999999999
            "#,
        )
        .unwrap();

        assert_eq!(config.min_level, Level::Debug);
        assert_eq!(config.file_name_mode, FileNameMode::ByFile);
        assert_eq!(config.file_name, "flog.log");
        assert_eq!(config.flags, vec![FormatFlag::Level]);
        let archive = config.archive.unwrap();
        assert_eq!(archive.dir_name, "archive");
        assert_eq!(archive.sweep_interval, Duration::from_secs(60));
        assert_eq!(warnings.len(), 6, "warnings: {warnings:?}");
    }

    #[test]
    fn test_capacity_without_enabled_warns() {
        let (config, warnings) = parse_config("[async]\ncapacity = 10\n").unwrap();
        assert_eq!(config.dispatch, DispatchMode::Sync);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_load_missing_file_returns_defaults_without_warnings() {
        let dir = TempDir::new().unwrap();
        let (config, warnings) = load_config(&dir.path().join("config.toml"));
        assert!(warnings.is_empty());
        assert_eq!(config.root, PathBuf::from("logs"));
    }

    #[test]
    fn test_load_malformed_file_warns_and_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[logger\nlevel = ").unwrap();

        let (config, warnings) = load_config(&path);
        assert_eq!(warnings.len(), 1);
        assert_eq!(config.min_level, Level::Debug);

        assert!(matches!(
            try_load_config(&path),
            Err(ConfigError::TomlParse { .. })
        ));
    }

    #[test]
    fn test_naming_falls_back_for_empty_file_name() {
        let config = LoggerConfig::default()
            .with_file_name("")
            .with_date_format("");
        let naming = config.naming();
        assert_eq!(naming.file_name, "flog.log");
        assert!(naming.date_format.is_none());
    }
}
