// Flog - core/format.rs
//
// Line rendering: a message plus an ordered flag list plus a separator in,
// one line of text out. Pure: no I/O, no shared state, no failure modes.
//
// The returned line carries no trailing newline; the registry adds it when
// the line is written.

use crate::core::model::{location_or_unknown, FormatFlag, LogMessage};
use crate::util::constants;

/// Render one message as a single line.
///
/// One field is produced per flag, in flag order; the body is appended last.
/// All fields, body included, are joined with `separator`.
pub fn render(message: &LogMessage, flags: &[FormatFlag], separator: &str) -> String {
    let mut fields: Vec<String> = Vec::with_capacity(flags.len() + 1);
    for flag in flags {
        let field = match flag {
            FormatFlag::Datetime => message
                .timestamp()
                .format(constants::TIMESTAMP_LAYOUT)
                .to_string(),
            FormatFlag::Level => message.level().label().to_string(),
            FormatFlag::Category => message.category().to_string(),
            FormatFlag::LongFile => location_or_unknown(message.location(), false),
            FormatFlag::ShortFile => location_or_unknown(message.location(), true),
        };
        fields.push(field);
    }
    fields.push(message.body().to_string());
    fields.join(separator)
}

/// Flag order and separator bundled for repeated rendering.
#[derive(Debug, Clone)]
pub struct Formatter {
    flags: Vec<FormatFlag>,
    separator: String,
}

impl Formatter {
    /// An empty separator falls back to a single space.
    pub fn new(flags: Vec<FormatFlag>, separator: impl Into<String>) -> Self {
        let separator = separator.into();
        let separator = if separator.is_empty() {
            constants::DEFAULT_SEPARATOR.to_string()
        } else {
            separator
        };
        Self { flags, separator }
    }

    pub fn render(&self, message: &LogMessage) -> String {
        render(message, &self.flags, &self.separator)
    }

    /// Render into the message's own slot unless it is already rendered.
    pub fn render_into(&self, message: &mut LogMessage) {
        if message.rendered().is_none() {
            let line = self.render(message);
            message.set_rendered(line);
        }
    }
}

impl Default for Formatter {
    fn default() -> Self {
        Self::new(FormatFlag::defaults(), constants::DEFAULT_SEPARATOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{CallerLocation, Level};
    use chrono::{Local, TimeZone};

    fn sample() -> LogMessage {
        LogMessage::new(Level::Warning, "db", "pool exhausted")
            .with_timestamp(Local.with_ymd_and_hms(2026, 10, 16, 8, 30, 5).unwrap())
            .with_location(CallerLocation {
                file: "src/db/pool.rs",
                line: 17,
            })
    }

    #[test]
    fn test_default_flags_render_all_fields_in_order() {
        let line = Formatter::default().render(&sample());
        assert_eq!(
            line,
            "2026-10-16 08:30:05 src/db/pool.rs:17 db WARNING pool exhausted"
        );
    }

    #[test]
    fn test_custom_order_and_separator() {
        let line = render(
            &sample(),
            &[FormatFlag::Level, FormatFlag::Category, FormatFlag::Datetime],
            " | ",
        );
        let fields: Vec<&str> = line.split(" | ").collect();
        assert_eq!(fields[0], "WARNING");
        assert_eq!(fields[1], "db");
        assert!(fields[2].starts_with("2026-10-16"));
        assert_eq!(fields[3], "pool exhausted");
    }

    #[test]
    fn test_short_file_flag() {
        let line = render(&sample(), &[FormatFlag::ShortFile], " ");
        assert_eq!(line, "pool.rs:17 pool exhausted");
    }

    #[test]
    fn test_no_flags_renders_body_only() {
        assert_eq!(render(&sample(), &[], " "), "pool exhausted");
    }

    #[test]
    fn test_missing_location_uses_sentinel() {
        let msg = LogMessage::new(Level::Info, "cli", "hello");
        assert_eq!(render(&msg, &[FormatFlag::LongFile], " "), "???:0 hello");
    }

    #[test]
    fn test_empty_separator_falls_back_to_space() {
        let fmt = Formatter::new(vec![FormatFlag::Category], "");
        assert_eq!(fmt.render(&sample()), "db pool exhausted");
    }

    #[test]
    fn test_render_into_is_idempotent() {
        let fmt = Formatter::new(vec![FormatFlag::Level], " ");
        let mut msg = sample();
        fmt.render_into(&mut msg);
        let first = msg.rendered().map(str::to_string);
        fmt.render_into(&mut msg);
        assert_eq!(msg.rendered().map(str::to_string), first);
        assert_eq!(msg.rendered(), Some("WARNING pool exhausted"));
    }
}
