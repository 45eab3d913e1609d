// Flog - util/logging.rs
//
// Diagnostic logging for Flog itself: where dropped messages, rotation
// failures and sweep warnings are reported.
//
// The library only emits `tracing` events and never installs a subscriber;
// embedding applications route those events wherever they like. The `flog`
// binary calls `init` to send them to stderr.
//
// Activation:
//   - Environment variable: RUST_LOG=debug (or trace)
//   - CLI flag: --debug
//   - Config file: [diagnostics] level = "debug"

use tracing_subscriber::EnvFilter;

/// Initialise the diagnostic subscriber.
///
/// Priority: RUST_LOG env var > CLI --debug flag > config level > default "info".
pub fn init(debug_flag: bool, config_level: Option<&str>) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if debug_flag {
        EnvFilter::new("debug")
    } else if let Some(level) = config_level {
        EnvFilter::new(level)
    } else {
        EnvFilter::new(super::constants::DEFAULT_DIAGNOSTIC_LEVEL)
    };

    // try_init: a host application may already own the global subscriber.
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(true)
        .compact()
        .try_init()
        .is_ok();

    tracing::debug!(
        app = super::constants::APP_NAME,
        version = super::constants::APP_VERSION,
        installed,
        "Diagnostics initialised"
    );
}
