use std::sync::{Arc, OnceLock};

/// Sink for log lines emitted by stowage, implemented by the host application.
///
/// ```rust
/// use stowage::primitives::logger::{LogLevel, Logger};
///
/// struct StderrLogger;
///
/// impl Logger for StderrLogger {
///     fn log(&self, level: LogLevel, message: String) {
///         eprintln!("[{level:?}] {message}");
///     }
/// }
/// ```
///
/// ## Kotlin
///
/// ```kotlin
/// class StowageLogBridge : Logger {
///     override fun log(level: LogLevel, message: String) {
///         Timber.tag("stowage").log(level.toPriority(), message)
///     }
/// }
///
/// setLogger(StowageLogBridge()) // once, at application start
/// ```
#[uniffi::export(with_foreign)]
pub trait Logger: Sync + Send {
    /// Receives one formatted log line.
    fn log(&self, level: LogLevel, message: String);
}

/// Severity of a log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum LogLevel {
    /// Very detailed tracing output.
    Trace,
    /// Debugging information.
    Debug,
    /// Progress of a scan or migration run.
    Info,
    /// Recoverable problems, e.g. a single item failing to migrate.
    Warn,
    /// Failures that end a run early.
    Error,
}

impl From<log::Level> for LogLevel {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => Self::Error,
            log::Level::Warn => Self::Warn,
            log::Level::Info => Self::Info,
            log::Level::Debug => Self::Debug,
            log::Level::Trace => Self::Trace,
        }
    }
}

/// Bridges the `log` facade to the host `Logger`.
struct ForeignLogger;

impl ForeignLogger {
    /// Debug and trace lines are only forwarded when they originate in this crate;
    /// dependencies are too chatty at those levels.
    fn should_forward(record: &log::Record) -> bool {
        if record.level() <= log::Level::Info {
            return true;
        }
        record
            .module_path()
            .is_some_and(|module_path| module_path.starts_with("stowage"))
    }
}

impl log::Log for ForeignLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        if !Self::should_forward(record) {
            return;
        }

        match LOGGER_INSTANCE.get() {
            Some(logger) => logger.log(record.level().into(), record.args().to_string()),
            None => eprintln!("stowage logger not set: {}", record.args()),
        }
    }

    fn flush(&self) {}
}

static LOGGER_INSTANCE: OnceLock<Arc<dyn Logger>> = OnceLock::new();

/// Installs the host logger and routes the `log` facade to it.
///
/// Only the first call takes effect. Returns `false` when a logger was already set.
#[allow(clippy::module_name_repetitions)]
#[uniffi::export]
pub fn set_logger(logger: Arc<dyn Logger>) -> bool {
    if LOGGER_INSTANCE.set(logger).is_err() {
        return false;
    }

    static FORWARDER: ForeignLogger = ForeignLogger;
    if log::set_logger(&FORWARDER).is_ok() {
        log::set_max_level(log::LevelFilter::Trace);
    }
    true
}

/// Logs a trace-level message, prefixed with the active [`LogContext`].
#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => {
        match $crate::primitives::logger::get_context() {
            Some(ctx) => log::trace!("{} {}", ctx, format_args!($($arg)*)),
            None => log::trace!($($arg)*),
        }
    };
}

/// Logs a debug-level message, prefixed with the active [`LogContext`].
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {
        match $crate::primitives::logger::get_context() {
            Some(ctx) => log::debug!("{} {}", ctx, format_args!($($arg)*)),
            None => log::debug!($($arg)*),
        }
    };
}

/// Logs an info-level message, prefixed with the active [`LogContext`].
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        match $crate::primitives::logger::get_context() {
            Some(ctx) => log::info!("{} {}", ctx, format_args!($($arg)*)),
            None => log::info!($($arg)*),
        }
    };
}

/// Logs a warning, prefixed with the active [`LogContext`].
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        match $crate::primitives::logger::get_context() {
            Some(ctx) => log::warn!("{} {}", ctx, format_args!($($arg)*)),
            None => log::warn!($($arg)*),
        }
    };
}

/// Logs an error, prefixed with the active [`LogContext`].
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        match $crate::primitives::logger::get_context() {
            Some(ctx) => log::error!("{} {}", ctx, format_args!($($arg)*)),
            None => log::error!($($arg)*),
        }
    };
}

/// Thread-local logging scopes.
pub mod context;
pub use context::{get_context, in_log_context, LogContext, WithLogContext};

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CapturingLogger {
        lines: Mutex<Vec<(LogLevel, String)>>,
    }

    impl Logger for CapturingLogger {
        fn log(&self, level: LogLevel, message: String) {
            self.lines.lock().unwrap().push((level, message));
        }
    }

    #[test]
    fn maps_log_levels() {
        assert_eq!(LogLevel::from(log::Level::Warn), LogLevel::Warn);
        assert_eq!(LogLevel::from(log::Level::Trace), LogLevel::Trace);
    }

    #[test]
    #[serial]
    fn forwards_context_prefixed_lines() {
        let logger = Arc::new(CapturingLogger::default());
        // Another test binary run may already have installed a logger.
        let installed = set_logger(logger.clone());

        {
            let _ctx = LogContext::new("Scanner");
            crate::info!("scan.completed items={}", 3);
        }

        if installed {
            let lines = logger.lines.lock().unwrap();
            assert!(lines
                .iter()
                .any(|(level, line)| *level == LogLevel::Info
                    && line == "[Scanner] scan.completed items=3"));
        }
        assert!(!set_logger(Arc::new(CapturingLogger::default())));
    }
}
