// Flog - lib.rs
//
// Library entry point. Leveled, file-based logging with per-category file
// naming, size-triggered rotation, age-triggered archival and an optional
// background writer.
//
// Layers:
//   util      constants, errors, diagnostics, date patterns
//   core      message model, line rendering, file naming (pure)
//   platform  configuration and filesystem helpers
//   app       registry, archive sweeper, dispatcher, Logger

pub mod app;
pub mod core;
pub mod platform;
pub mod util;

pub use app::archive::SweepReport;
pub use app::logger::Logger;
pub use core::model::{DeliveryStats, FileNameMode, FormatFlag, Level};
pub use platform::config::{ArchiveConfig, DispatchMode, LoggerConfig};
pub use util::error::{ConfigError, FlogError, Result};
