//! Utilities: logging (dynamic level, stderr), ANSI colour for diagnostics
//! (respects NO_COLOR and terminal detection).
//!
//! Key items:
//!   init_logging / derive_level / level_from_env
//!   log_info! / log_debug! / log_trace!
//!   output::{paint, color_enabled}

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Logging helpers.
pub mod logging {
    use super::*;

    #[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
    pub enum LogLevel {
        Error = 0,
        Info = 1,
        Debug = 2,
        Trace = 3,
    }

    impl LogLevel {
        pub fn as_str(&self) -> &'static str {
            match self {
                LogLevel::Error => "ERROR",
                LogLevel::Info => "INFO",
                LogLevel::Debug => "DEBUG",
                LogLevel::Trace => "TRACE",
            }
        }

        /// Case-insensitive level name (`warn` is folded into `error`).
        pub fn from_str_ci(s: &str) -> Option<Self> {
            match s.trim().to_ascii_lowercase().as_str() {
                "error" | "warn" => Some(LogLevel::Error),
                "info" => Some(LogLevel::Info),
                "debug" => Some(LogLevel::Debug),
                "trace" => Some(LogLevel::Trace),
                _ => None,
            }
        }
    }

    static GLOBAL_LEVEL: OnceLock<AtomicU8> = OnceLock::new();

    fn inner_cell() -> &'static AtomicU8 {
        GLOBAL_LEVEL.get_or_init(|| AtomicU8::new(LogLevel::Info as u8))
    }

    pub fn init_logging(level: LogLevel) {
        set_log_level(level);
    }

    pub fn set_log_level(level: LogLevel) {
        inner_cell().store(level as u8, Ordering::Relaxed);
    }

    pub fn current_log_level() -> LogLevel {
        match inner_cell().load(Ordering::Relaxed) {
            0 => LogLevel::Error,
            1 => LogLevel::Info,
            2 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }

    /// Level selected by the per-command `-v` / `-q` flags.
    pub fn derive_level(verbose: bool, quiet: bool) -> LogLevel {
        if quiet {
            return LogLevel::Error;
        }
        if verbose {
            LogLevel::Debug
        } else {
            LogLevel::Info
        }
    }

    /// Level named by `lookup(KES_LOG_LEVEL)`; unknown or missing names give `Info`.
    pub fn level_from_env_with<F>(lookup: F) -> LogLevel
    where
        F: Fn(&str) -> Option<String>,
    {
        lookup(crate::config::LOG_LEVEL_ENV)
            .and_then(|s| LogLevel::from_str_ci(&s))
            .unwrap_or(LogLevel::Info)
    }

    pub fn level_from_env() -> LogLevel {
        level_from_env_with(crate::config::process_env)
    }

    fn timestamp() -> u128 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0)
    }

    fn should_emit(level: LogLevel) -> bool {
        level <= current_log_level()
    }

    pub fn log(level: LogLevel, msg: impl AsRef<str>) {
        if should_emit(level) {
            eprintln!("[{}][{}] {}", level.as_str(), timestamp(), msg.as_ref());
        }
    }

    pub fn info(msg: impl AsRef<str>) {
        log(LogLevel::Info, msg);
    }
    pub fn debug(msg: impl AsRef<str>) {
        log(LogLevel::Debug, msg);
    }
    pub fn trace(msg: impl AsRef<str>) {
        log(LogLevel::Trace, msg);
    }

    #[macro_export]
    macro_rules! log_info {
        ($($t:tt)*) => { $crate::utils::logging::info(format!($($t)*)) };
    }
    #[macro_export]
    macro_rules! log_debug {
        ($($t:tt)*) => { $crate::utils::logging::debug(format!($($t)*)) };
    }
    #[macro_export]
    macro_rules! log_trace {
        ($($t:tt)*) => { $crate::utils::logging::trace(format!($($t)*)) };
    }
}

pub use logging::{LogLevel, derive_level, init_logging, level_from_env};

/// ANSI colour for diagnostics.
pub mod output {
    /// Colour only when the stream is a terminal and NO_COLOR is unset.
    pub fn color_enabled(stream_is_terminal: bool) -> bool {
        stream_is_terminal && std::env::var_os("NO_COLOR").is_none()
    }

    pub fn paint(c: Color, text: impl AsRef<str>) -> String {
        format!("{}{}{}", c.as_code(), text.as_ref(), "\x1b[0m")
    }

    #[derive(Copy, Clone)]
    pub enum Color {
        Red,
    }

    impl Color {
        fn as_code(&self) -> &'static str {
            match self {
                Color::Red => "\x1b[31m",
            }
        }
    }
}

/* --------------------------------- Tests ---------------------------------- */
