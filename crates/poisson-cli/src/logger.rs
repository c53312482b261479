//! Minimal stderr backend for the `log` facade.

use log::{LevelFilter, Log, Metadata, Record};

/// Environment variable holding the maximum level.
pub const LOG_ENV: &str = "POISSON_LOG";

struct StderrLogger;

static LOGGER: StderrLogger = StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{:<5}] {}: {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

pub fn level_from(raw: Option<&str>) -> LevelFilter {
    raw.and_then(|v| v.trim().parse().ok()).unwrap_or(LevelFilter::Warn)
}

/// Install the logger; a second call is a no-op.
pub fn init() {
    let level = level_from(std::env::var(LOG_ENV).ok().as_deref());
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}
