// Flog - main.rs
//
// Command-line entry point. Reads lines from stdin and appends each one to
// the log tree as a message at the chosen level and category. Handles:
// 1. CLI argument parsing
// 2. Configuration loading (explicit --config or the platform default)
// 3. Diagnostics initialisation (debug mode support)
// 4. The stdin -> Logger pump

use clap::Parser;
use flog::core::model::Level;
use flog::platform::config::{self, PlatformPaths};
use flog::util;
use flog::Logger;
use std::io::BufRead;
use std::path::PathBuf;
use std::process::ExitCode;

/// Flog - append stdin to a leveled, rotating log tree.
#[derive(Parser, Debug)]
#[command(name = "flog", version, about)]
struct Cli {
    /// Config file (defaults to the platform config directory).
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Log root directory (overrides [logger] root).
    #[arg(short = 'r', long = "root")]
    root: Option<PathBuf>,

    /// Level every input line is emitted at.
    #[arg(short = 'l', long = "level", default_value = "info")]
    level: Level,

    /// Category every input line is emitted under.
    #[arg(short = 'C', long = "category", default_value = "stdin")]
    category: String,

    /// Write from a background thread (queue capacity; 0 = default).
    #[arg(short = 'a', long = "async", num_args = 0..=1, default_missing_value = "0")]
    async_capacity: Option<usize>,

    /// Enable debug diagnostics (equivalent to RUST_LOG=debug).
    #[arg(short = 'd', long = "debug")]
    debug: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Set up from `cli`, pump stdin, and report whether every line was written.
fn run(cli: Cli) -> flog::Result<ExitCode> {
    // An explicit --config must be valid; the platform default may be absent.
    let (mut logger_config, warnings) = match cli.config {
        Some(ref path) => config::try_load_config(path)?,
        None => config::load_config(&PlatformPaths::resolve().config_file()),
    };

    util::logging::init(cli.debug, logger_config.diagnostic_level.as_deref());
    for warning in &warnings {
        tracing::warn!(warning = %warning, "Config warning");
    }

    if let Some(root) = cli.root {
        logger_config = logger_config.with_root(root);
    }
    if let Some(capacity) = cli.async_capacity {
        logger_config = logger_config.with_async(capacity);
    }

    tracing::info!(
        version = util::constants::APP_VERSION,
        root = %logger_config.root.display(),
        level = %cli.level,
        category = %cli.category,
        "Flog starting"
    );

    let logger = Logger::new(logger_config)?;

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        match line {
            Ok(line) => logger.log(cli.level, &cli.category, line),
            Err(e) => {
                tracing::error!(error = %e, "Failed to read stdin");
                break;
            }
        }
    }

    logger.close();
    let stats = logger.stats();
    if stats.dropped > 0 {
        eprintln!(
            "Error: {} of {} messages could not be written (see diagnostics)",
            stats.dropped,
            stats.written + stats.dropped
        );
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
