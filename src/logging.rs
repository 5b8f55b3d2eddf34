use chrono::Local;
use log::{LevelFilter, Metadata, Record, SetLoggerError};
use std::collections::HashSet;
use std::io::{self, Write};
use std::sync::OnceLock;

// Custom logger structure
#[derive(Debug)]
struct TankMazeLogger {
    level: LevelFilter,
    debug_filters: Option<HashSet<String>>,
}

impl TankMazeLogger {
    // Turns "Turn N" in a message into a fixed-width [TNNN] prefix
    fn context_prefix(message: &str) -> String {
        let mut context = String::new();

        if let Some(turn_idx) = message.find("Turn ") {
            let digits: String = message[turn_idx + 5..]
                .chars()
                .take_while(|c| c.is_ascii_digit())
                .collect();
            if let Ok(turn) = digits.parse::<u32>() {
                context.push_str(&format!("[T{:03}]", turn));
            }
        }

        if !context.is_empty() {
            context.push(' ');
        }
        context
    }
}

impl log::Log for TankMazeLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        if metadata.level() <= self.level {
            // Debug topics can be narrowed with --debug-filter
            if let Some(filters) = &self.debug_filters {
                if metadata.level() == log::Level::Debug || metadata.level() == log::Level::Trace {
                    return filters.contains(metadata.target())
                        || filters.iter().any(|f| metadata.target().starts_with(f));
                }
            }
            return true;
        }
        false
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let level_color = match record.level() {
            log::Level::Error => "\x1B[31m", // Red
            log::Level::Warn => "\x1B[33m",  // Yellow
            log::Level::Info => "\x1B[32m",  // Green
            log::Level::Debug => "\x1B[36m", // Cyan
            log::Level::Trace => "\x1B[35m", // Magenta
        };
        let reset = "\x1B[0m";
        let timestamp = Local::now().format("%H:%M:%S%.3f");

        let message = record.args().to_string();
        let context = Self::context_prefix(&message);

        let mut output = format!(
            "{timestamp} {level_color}{level:5}{reset} {context}{target}: {message}",
            level = record.level(),
            target = record.target(),
        );

        if let Some(module_path) = record.module_path() {
            if module_path != record.target() {
                output.push_str(&format!(" [{}]", module_path));
            }
        }

        // A closed stdout has nowhere to report to
        let mut stdout = io::stdout().lock();
        let _ = writeln!(stdout, "{}", output);
        let _ = stdout.flush();
    }

    fn flush(&self) {
        let _ = io::stdout().flush();
    }
}

static LOGGER: OnceLock<TankMazeLogger> = OnceLock::new();

/// Installs the game logger.
///
/// When `RUST_LOG` is set the standard `env_logger` backend is used instead,
/// so the usual `target=level` directives work.
pub fn init_logger(level: LevelFilter, debug_filter: Option<String>) -> Result<(), SetLoggerError> {
    if std::env::var_os("RUST_LOG").is_some() {
        return env_logger::Builder::from_default_env().try_init();
    }

    let debug_filters = debug_filter.map(|filter_str| {
        filter_str
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<HashSet<String>>()
    });

    let logger = LOGGER.get_or_init(|| TankMazeLogger {
        level,
        debug_filters,
    });

    log::set_logger(logger).map(|()| log::set_max_level(level))
}

/// Parses a `--log-level` string, defaulting to Info.
pub fn parse_level(name: &str) -> LevelFilter {
    match name.to_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

// Helper macros for specific debug topics
#[macro_export]
macro_rules! debug_maze {
    ($($arg:tt)*) => {
        log::debug!(target: "maze", "{}", format_args!($($arg)*))
    }
}

#[macro_export]
macro_rules! debug_tank {
    ($side:expr, $($arg:tt)*) => {
        log::debug!(target: "tank", "[{}] {}", $side.tag(), format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! debug_card {
    ($side:expr, $($arg:tt)*) => {
        log::debug!(target: "card", "[{}] {}", $side.tag(), format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! debug_projectile {
    ($side:expr, $($arg:tt)*) => {
        log::debug!(target: "projectile", "[{}] {}", $side.tag(), format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! debug_ai {
    ($($arg:tt)*) => {
        log::debug!(target: "ai", "{}", format_args!($($arg)*))
    }
}

#[macro_export]
macro_rules! debug_round {
    ($turn:expr, $step:expr, $($arg:tt)*) => {
        log::debug!(target: "round", "Turn {} step {}: {}", $turn, $step, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! debug_shop {
    ($($arg:tt)*) => {
        log::debug!(target: "shop", "{}", format_args!($($arg)*))
    }
}
