// Flog - util/date.rs
//
// PHP-style date patterns for date-suffixed log file names.
//
// Pattern letters: Y (4-digit year), m (month), d (day), H (hour, 24h),
// i (minute), s (second), all zero-padded. Every other character is copied
// through literally, so "Y-m-d" renders as "2026-10-16".

use chrono::{DateTime, TimeZone};
use std::fmt::Display;

/// Translate a PHP-style pattern into a chrono `strftime` layout.
pub fn to_strftime(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() * 2);
    for c in pattern.chars() {
        match c {
            'Y' => out.push_str("%Y"),
            'm' => out.push_str("%m"),
            'd' => out.push_str("%d"),
            'H' => out.push_str("%H"),
            'i' => out.push_str("%M"),
            's' => out.push_str("%S"),
            '%' => out.push_str("%%"),
            other => out.push(other),
        }
    }
    out
}

/// Render `at` with a PHP-style pattern.
pub fn format_date<Tz>(pattern: &str, at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    at.format(&to_strftime(pattern)).to_string()
}
