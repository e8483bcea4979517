use std::sync::Once;

use cashledger_rs::logging::setup_stdout_logger;
use log::LevelFilter;

static LOGGER_INIT: Once = Once::new();

// Set up a logger that logs all log messages with level `level` and above, once per test binary.
pub(crate) fn setup_logger(level: LevelFilter) {
    LOGGER_INIT.call_once(|| {
        setup_stdout_logger(level).unwrap();
    })
}

/// Log `message` at Info level, prefixed with the name of the terminal it concerns, if any.
pub(crate) fn log_with_context(terminal: Option<&str>, message: &str) {
    match terminal {
        Some(terminal) => log::info!("[{}] {}", terminal, message),
        None => log::info!("[Test] {}", message),
    }
}
