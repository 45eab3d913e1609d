// Flog - app/logger.rs
//
// Public facade: level filtering, message construction and lifecycle.
//
// A `Logger` is `Send + Sync`; share it behind an `Arc` (or a `static`) and
// emit from any number of threads. Emitting never returns an error: I/O
// failures are reported through `tracing` and counted in `stats().dropped`.
//
// Lifecycle: `close()` is idempotent and also runs on drop. An `RwLock`
// separates emitters (shared) from `close` (exclusive), so no message can
// slip in while the registry is being torn down; emits that arrive after
// close are dropped and counted.

use parking_lot::RwLock;
use std::fmt::Display;
use std::panic::Location;
use std::path::PathBuf;

use crate::app::archive::SweepReport;
use crate::app::dispatch::Dispatcher;
use crate::core::model::{CallerLocation, DeliveryStats, Level, LogMessage};
use crate::platform::config::LoggerConfig;
use crate::util::error::Result;

/// Leveled file logger.
#[derive(Debug)]
pub struct Logger {
    config: LoggerConfig,
    dispatcher: Dispatcher,
    closed: RwLock<bool>,
}

impl Logger {
    /// Build a logger. In async mode this starts the consumer thread; the
    /// only possible failure is the OS refusing to spawn it.
    pub fn new(config: LoggerConfig) -> Result<Self> {
        let dispatcher = Dispatcher::new(&config)?;
        tracing::info!(
            root = %config.root.display(),
            min_level = %config.min_level,
            mode = ?config.file_name_mode,
            dispatch = ?config.dispatch,
            archive = config.archive.is_some(),
            "Logger started"
        );
        Ok(Self {
            config,
            dispatcher,
            closed: RwLock::new(false),
        })
    }

    /// A logger with default settings writing under `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Result<Self> {
        Self::new(LoggerConfig::default().with_root(root))
    }

    pub fn config(&self) -> &LoggerConfig {
        &self.config
    }

    /// Whether a message at `level` would be delivered.
    pub fn enabled(&self, level: Level) -> bool {
        level >= self.config.min_level
    }

    #[track_caller]
    pub fn debug(&self, category: &str, body: impl Display) {
        self.emit(Level::Debug, category, body, Location::caller());
    }

    #[track_caller]
    pub fn info(&self, category: &str, body: impl Display) {
        self.emit(Level::Info, category, body, Location::caller());
    }

    #[track_caller]
    pub fn warning(&self, category: &str, body: impl Display) {
        self.emit(Level::Warning, category, body, Location::caller());
    }

    #[track_caller]
    pub fn error(&self, category: &str, body: impl Display) {
        self.emit(Level::Error, category, body, Location::caller());
    }

    /// Emit at a level chosen at runtime.
    #[track_caller]
    pub fn log(&self, level: Level, category: &str, body: impl Display) {
        self.emit(level, category, body, Location::caller());
    }

    fn emit(
        &self,
        level: Level,
        category: &str,
        body: impl Display,
        location: &'static Location<'static>,
    ) {
        if !self.enabled(level) {
            return;
        }

        let closed = self.closed.read();
        if *closed {
            self.dispatcher.record_drop();
            return;
        }

        let message = LogMessage::new(level, category, body.to_string())
            .with_location(CallerLocation::from(location));
        self.dispatcher.dispatch(message);
    }

    /// Block until everything emitted so far is written and synced to disk.
    pub fn flush(&self) {
        let closed = self.closed.read();
        if !*closed {
            self.dispatcher.flush();
        }
    }

    /// Drain pending messages, close every file and stop the consumer.
    /// Later calls do nothing.
    pub fn close(&self) {
        let mut closed = self.closed.write();
        if *closed {
            return;
        }
        *closed = true;
        self.dispatcher.close();

        let stats = self.dispatcher.stats();
        tracing::info!(
            written = stats.written,
            dropped = stats.dropped,
            rotations = stats.rotations,
            "Logger closed"
        );
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.read()
    }

    pub fn stats(&self) -> DeliveryStats {
        self.dispatcher.stats()
    }

    /// Archive aged files and purge expired ones now, ignoring the sweep
    /// interval. `None` when archival is not configured.
    pub fn sweep_archive(&self) -> Option<SweepReport> {
        self.dispatcher.sweep_now()
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        self.close();
    }
}
