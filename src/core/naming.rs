// Flog - core/naming.rs
//
// Logical file names: which file a message belongs in.
//
// A `LogicalName` has two parts. The `key` is the name derived from the
// naming mode, category and level; it identifies a registry entry. The
// `file_name` is the key plus the optional date suffix and is what ends up
// on disk. Keeping the date out of the key means a date roll replaces the
// cached handle for the key instead of leaking one handle per day.

use chrono::{DateTime, Local};

use crate::core::model::{FileNameMode, Level};
use crate::util::date;

/// Registry key plus the on-disk file name it currently resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalName {
    pub key: String,
    pub file_name: String,
}

/// Naming policy: mode, base file name and optional date suffix pattern.
#[derive(Debug, Clone)]
pub struct FileNaming {
    pub mode: FileNameMode,
    pub file_name: String,
    pub date_format: Option<String>,
}

impl FileNaming {
    /// Compute the logical name for a message emitted at `now`.
    pub fn name_for(&self, level: Level, category: &str, now: &DateTime<Local>) -> LogicalName {
        let category = sanitise_component(category);
        let stem = match self.mode {
            FileNameMode::ByFile => self.file_name.clone(),
            FileNameMode::ByFileAndLevel => format!("{}.{}", self.file_name, level.name()),
            FileNameMode::ByCategory if category.is_empty() => self.file_name.clone(),
            FileNameMode::ByCategory => category,
            FileNameMode::ByCategoryAndLevel if category.is_empty() => {
                format!("{}.{}", self.file_name, level.name())
            }
            FileNameMode::ByCategoryAndLevel => format!("{}.{}", category, level.name()),
        };

        let file_name = match self.date_format.as_deref() {
            Some(pattern) if !pattern.is_empty() => {
                format!("{}.{}", stem, date::format_date(pattern, now))
            }
            _ => stem.clone(),
        };

        LogicalName {
            key: stem,
            file_name,
        }
    }
}

/// Keep category-derived names flat under the log root: path separators
/// become underscores and a bare `.`/`..` is rejected.
fn sanitise_component(raw: &str) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    if cleaned == "." || cleaned == ".." {
        String::new()
    } else {
        cleaned
    }
}
