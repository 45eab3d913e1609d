// Flog - core/model.rs
//
// Core data model types. Pure data definitions with no I/O and no platform
// dependencies.
//
// These types are the shared vocabulary across all layers: the facade builds
// `LogMessage`s, the formatter reads them, the dispatcher moves them between
// threads, and the registry never sees them at all (it only sees names and
// rendered lines).

use chrono::{DateTime, Local};
use std::panic::Location;
use std::str::FromStr;

use crate::util::constants;

// =============================================================================
// Level
// =============================================================================

/// Message severity, ordered from least to most severe.
///
/// A message is written only when its level is `>=` the configured minimum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Level {
    #[default]
    Debug,
    Info,
    Warning,
    Error,
}

impl Level {
    /// Lowercase name used in file names (`flog.log.warning`).
    pub fn name(&self) -> &'static str {
        match self {
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warning => "warning",
            Level::Error => "error",
        }
    }

    /// Uppercase label used in rendered lines.
    pub fn label(&self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "warn" | "warning" => Ok(Level::Warning),
            "error" => Ok(Level::Error),
            other => Err(format!(
                "unknown level \"{other}\" (expected debug, info, warning or error)"
            )),
        }
    }
}

// =============================================================================
// File naming mode
// =============================================================================

/// How a message is mapped to the name of the file it is written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FileNameMode {
    /// `<file_name>`
    #[default]
    ByFile,
    /// `<file_name>.<level>`
    ByFileAndLevel,
    /// `<category>`
    ByCategory,
    /// `<category>.<level>`
    ByCategoryAndLevel,
}

impl FromStr for FileNameMode {
    type Err = String;

    /// Accepts `by_file_and_level`, `by-file-and-level`, `ByFileAndLevel` and
    /// the short form `file_level` (likewise for the other modes).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalised: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        match normalised.as_str() {
            "byfile" | "file" => Ok(FileNameMode::ByFile),
            "byfileandlevel" | "filelevel" => Ok(FileNameMode::ByFileAndLevel),
            "bycategory" | "category" => Ok(FileNameMode::ByCategory),
            "bycategoryandlevel" | "categorylevel" => Ok(FileNameMode::ByCategoryAndLevel),
            _ => Err(format!(
                "unknown file name mode \"{s}\" (expected by_file, by_file_and_level, \
                 by_category or by_category_and_level)"
            )),
        }
    }
}

// =============================================================================
// Format flags
// =============================================================================

/// One field of a rendered line. The configured order of flags is the order
/// of fields in the line; the message body always comes last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatFlag {
    /// `YYYY-MM-DD HH:MM:SS`
    Datetime,
    /// Caller file name without directories, plus line.
    ShortFile,
    /// Caller file path as compiled, plus line.
    LongFile,
    /// Message category.
    Category,
    /// Uppercased level label.
    Level,
}

impl FormatFlag {
    /// Default field order: datetime, long file, category, level.
    pub fn defaults() -> Vec<FormatFlag> {
        vec![
            FormatFlag::Datetime,
            FormatFlag::LongFile,
            FormatFlag::Category,
            FormatFlag::Level,
        ]
    }
}

impl FromStr for FormatFlag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalised: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        match normalised.as_str() {
            "datetime" | "date" | "time" => Ok(FormatFlag::Datetime),
            "shortfile" => Ok(FormatFlag::ShortFile),
            "longfile" | "file" => Ok(FormatFlag::LongFile),
            "category" | "cate" => Ok(FormatFlag::Category),
            "level" => Ok(FormatFlag::Level),
            _ => Err(format!(
                "unknown format flag \"{s}\" (expected datetime, shortfile, longfile, \
                 category or level)"
            )),
        }
    }
}

// =============================================================================
// Caller location
// =============================================================================

/// Source location of the public emit call that produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerLocation {
    pub file: &'static str,
    pub line: u32,
}

impl CallerLocation {
    /// `path/as/compiled.rs:42`
    pub fn long(&self) -> String {
        format!("{}:{}", self.file, self.line)
    }

    /// `compiled.rs:42`
    pub fn short(&self) -> String {
        let name = self.file.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(self.file);
        format!("{}:{}", name, self.line)
    }
}

impl From<&'static Location<'static>> for CallerLocation {
    fn from(loc: &'static Location<'static>) -> Self {
        Self {
            file: loc.file(),
            line: loc.line(),
        }
    }
}

/// Render an optional location, falling back to the unknown sentinel.
pub fn location_or_unknown(loc: Option<&CallerLocation>, short: bool) -> String {
    match loc {
        Some(l) if short => l.short(),
        Some(l) => l.long(),
        None => constants::UNKNOWN_LOCATION.to_string(),
    }
}

// =============================================================================
// Log message
// =============================================================================

/// A single emitted message.
///
/// Built on the producer thread and owned by whichever component is
/// processing it: the caller until enqueue, then the async consumer. Only
/// the rendered line is filled in after construction.
#[derive(Debug, Clone)]
pub struct LogMessage {
    timestamp: DateTime<Local>,
    level: Level,
    category: String,
    body: String,
    location: Option<CallerLocation>,
    rendered: Option<String>,
}

impl LogMessage {
    /// Build a message stamped with the current local time.
    ///
    /// One message is always exactly one line in the output file: trailing
    /// line breaks are removed from `body` and interior ones are escaped as
    /// the two characters `\n` (or `\r` for a lone carriage return). The
    /// category gets the same treatment.
    pub fn new(level: Level, category: impl Into<String>, body: impl Into<String>) -> Self {
        let body = single_line(body.into());
        Self {
            timestamp: Local::now(),
            level,
            category: single_line(category.into()),
            body,
            location: None,
            rendered: None,
        }
    }

    pub fn with_location(mut self, location: CallerLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Local>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn location(&self) -> Option<&CallerLocation> {
        self.location.as_ref()
    }

    /// The rendered line, if the formatter has already run.
    pub fn rendered(&self) -> Option<&str> {
        self.rendered.as_deref()
    }

    /// Store the rendered line. The first rendering wins.
    pub(crate) fn set_rendered(&mut self, line: String) {
        if self.rendered.is_none() {
            self.rendered = Some(line);
        }
    }
}

fn single_line(mut body: String) -> String {
    let trimmed_len = body.trim_end_matches(&['\n', '\r'][..]).len();
    body.truncate(trimmed_len);
    if !body.contains(&['\n', '\r'][..]) {
        return body;
    }
    body.replace("\r\n", "\\n")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
}

// =============================================================================
// Delivery statistics
// =============================================================================

/// Counters describing what happened to emitted messages.
///
/// `dropped` counts messages that passed the level filter but were never
/// written: I/O failures, and emits after `close()`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryStats {
    pub written: u64,
    pub dropped: u64,
    pub rotations: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_are_ordered_by_severity() {
        assert!(Level::Debug < Level::Info);
        assert!(Level::Info < Level::Warning);
        assert!(Level::Warning < Level::Error);
        assert_eq!(Level::default(), Level::Debug);
    }

    #[test]
    fn test_level_parse_accepts_warn_alias() {
        assert_eq!("WARN".parse::<Level>().unwrap(), Level::Warning);
        assert_eq!(" error ".parse::<Level>().unwrap(), Level::Error);
        assert!("fatal".parse::<Level>().is_err());
    }

    #[test]
    fn test_file_name_mode_parse_variants() {
        assert_eq!(
            "by_category_and_level".parse::<FileNameMode>().unwrap(),
            FileNameMode::ByCategoryAndLevel
        );
        assert_eq!(
            "ByFileAndLevel".parse::<FileNameMode>().unwrap(),
            FileNameMode::ByFileAndLevel
        );
        assert_eq!(
            "category".parse::<FileNameMode>().unwrap(),
            FileNameMode::ByCategory
        );
        assert!("by_day".parse::<FileNameMode>().is_err());
    }

    #[test]
    fn test_format_flag_parse() {
        assert_eq!(
            "short_file".parse::<FormatFlag>().unwrap(),
            FormatFlag::ShortFile
        );
        assert_eq!("Level".parse::<FormatFlag>().unwrap(), FormatFlag::Level);
        assert!("thread".parse::<FormatFlag>().is_err());
    }

    #[test]
    fn test_short_location_strips_directories() {
        let loc = CallerLocation {
            file: "src/app/logger.rs",
            line: 42,
        };
        assert_eq!(loc.short(), "logger.rs:42");
        assert_eq!(loc.long(), "src/app/logger.rs:42");
    }

    #[test]
    fn test_missing_location_renders_sentinel() {
        assert_eq!(location_or_unknown(None, true), "???:0");
        assert_eq!(location_or_unknown(None, false), "???:0");
    }

    #[test]
    fn test_message_body_trailing_newlines_trimmed() {
        let msg = LogMessage::new(Level::Info, "net", "connected\r\n\n");
        assert_eq!(msg.body(), "connected");
    }

    #[test]
    fn test_interior_line_breaks_are_escaped() {
        let msg = LogMessage::new(Level::Info, "net", "first\nsecond\r\nthird\rfourth\n");
        assert_eq!(msg.body(), r"first\nsecond\nthird\rfourth");
        assert_eq!(msg.body().lines().count(), 1);

        let msg = LogMessage::new(Level::Info, "a\nb", "x");
        assert_eq!(msg.category(), r"a\nb");
    }

    #[test]
    fn test_rendered_line_is_set_once() {
        let mut msg = LogMessage::new(Level::Info, "net", "x");
        assert!(msg.rendered().is_none());
        msg.set_rendered("first".to_string());
        msg.set_rendered("second".to_string());
        assert_eq!(msg.rendered(), Some("first"));
    }
}
