// Tue Jan 13 2026 - Alex

use colored::*;
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

pub struct LoggingUtils;

impl LoggingUtils {
    /// Installs the colored stderr logger. A no-op if a logger is already set.
    pub fn init_logger(level: LevelFilter) {
        let logger = Box::new(ColoredLogger::new(level));
        if log::set_boxed_logger(logger).is_ok() {
            log::set_max_level(level);
        }
    }

    /// Installs `env_logger`, configured from `RUST_LOG`.
    pub fn init_from_env() {
        let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).try_init();
    }

    /// Logger for unit tests; output is captured by the test harness.
    pub fn init_for_tests() {
        let _ = env_logger::builder()
            .is_test(true)
            .filter_level(LevelFilter::Debug)
            .try_init();
    }

    pub fn level_from_str(s: &str) -> LevelFilter {
        match s.to_lowercase().as_str() {
            "error" => LevelFilter::Error,
            "warn" | "warning" => LevelFilter::Warn,
            "info" => LevelFilter::Info,
            "debug" => LevelFilter::Debug,
            "trace" => LevelFilter::Trace,
            "off" => LevelFilter::Off,
            _ => LevelFilter::Info,
        }
    }
}

struct ColoredLogger {
    level: LevelFilter,
    use_color: AtomicBool,
}

impl ColoredLogger {
    fn new(level: LevelFilter) -> Self {
        Self {
            level,
            use_color: AtomicBool::new(std::env::var_os("NO_COLOR").is_none()),
        }
    }

    fn format_level(&self, level: Level) -> ColoredString {
        match level {
            Level::Error => "ERROR".red().bold(),
            Level::Warn => "WARN ".yellow().bold(),
            Level::Info => "INFO ".green().bold(),
            Level::Debug => "DEBUG".blue().bold(),
            Level::Trace => "TRACE".magenta().bold(),
        }
    }
}

impl Log for ColoredLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let level = if self.use_color.load(Ordering::Relaxed) {
            self.format_level(record.level()).to_string()
        } else {
            format!("{:5}", record.level())
        };
        eprintln!("{} {} {}", level, format!("[{}]", record.target()).dimmed(), record.args());
    }

    fn flush(&self) {}
}

/// Logs how long a scope took at debug level when dropped.
pub struct ScopedTimer {
    label: String,
    start: Instant,
}

impl ScopedTimer {
    pub fn new(label: &str) -> Self {
        log::trace!("{} started", label);
        Self {
            label: label.to_string(),
            start: Instant::now(),
        }
    }

    pub fn elapsed_micros(&self) -> u128 {
        self.start.elapsed().as_micros()
    }
}

impl Drop for ScopedTimer {
    fn drop(&mut self) {
        log::debug!("{} took {}µs", self.label, self.elapsed_micros());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_from_str() {
        assert_eq!(LoggingUtils::level_from_str("WARNING"), LevelFilter::Warn);
        assert_eq!(LoggingUtils::level_from_str("trace"), LevelFilter::Trace);
        assert_eq!(LoggingUtils::level_from_str("bogus"), LevelFilter::Info);
    }

    #[test]
    fn test_colored_logger_filters_by_level() {
        let logger = ColoredLogger::new(LevelFilter::Warn);
        let warn = Metadata::builder().level(Level::Warn).target("struct_marshal").build();
        let debug = Metadata::builder().level(Level::Debug).target("struct_marshal").build();
        assert!(logger.enabled(&warn));
        assert!(!logger.enabled(&debug));
        assert!(logger.format_level(Level::Error).to_string().contains("ERROR"));

        logger.log(
            &Record::builder()
                .metadata(warn)
                .args(format_args!("layout rebuilt"))
                .build(),
        );
        logger.flush();
    }

    #[test]
    fn test_init_is_idempotent() {
        LoggingUtils::init_for_tests();
        LoggingUtils::init_from_env();
        LoggingUtils::init_logger(LevelFilter::Debug);
        log::debug!("logger installed once");
    }

    #[test]
    fn test_scoped_timer() {
        LoggingUtils::init_for_tests();
        let timer = ScopedTimer::new("layout point");
        assert!(timer.elapsed_micros() < 60_000_000);
    }
}
