use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::{self, Write};

pub struct StderrLogger {
    max_level: LevelFilter,
}

impl StderrLogger {
    #[must_use]
    pub const fn new(max_level: LevelFilter) -> Self {
        Self { max_level }
    }

    /// Level from `var` (`error`, `warn`, `info`, `debug`, `trace`, `off`),
    /// falling back to `default` when unset or unparsable.
    #[must_use]
    pub fn from_env(var: &str, default: LevelFilter) -> Self {
        let max_level = std::env::var(var)
            .ok()
            .and_then(|level| level.parse().ok())
            .unwrap_or(default);
        Self::new(max_level)
    }

    /// Call this once, before anything logs.
    ///
    /// # Errors
    /// If a logger was already installed.
    pub fn init(self) -> Result<(), SetLoggerError> {
        let max_level = self.max_level;
        // set_logger expects &'static dyn Log; the logger lives as long as the process.
        log::set_logger(Box::leak(Box::new(self)))?;
        log::set_max_level(max_level);
        Ok(())
    }
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        // Format: "[LEVEL] target: message\n"
        // Best-effort; a closed stderr is not worth failing over.
        let _ = writeln!(
            io::stderr().lock(),
            "[{}] {}: {}",
            record.level(),
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
    }
}
