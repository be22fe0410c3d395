//! Logging setup
//!
//! The library logs through the `log` facade. The binary installs
//! `env_logger`, configured from [`LoggingConfig`] unless `RUST_LOG` says
//! otherwise. Dispatch turns also open `tracing` spans; those are only
//! rendered when `logging.tracing` installs a `tracing-subscriber`.

use crate::config::LoggingConfig;
use anyhow::Result;

/// Log level enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// Trace level (most verbose)
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    /// Logging disabled
    Off,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        }
    }

    /// Parse a level name, case-insensitively
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            "off" | "none" => Some(LogLevel::Off),
            _ => None,
        }
    }

    pub fn to_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Off => log::LevelFilter::Off,
        }
    }
}

/// Default filter string for the given config and `--debug` flag.
///
/// Unknown level names are passed through untouched so that full
/// `env_logger` directives such as `tether=debug,warn` still work.
pub fn default_filter(config: &LoggingConfig, force_debug: bool) -> String {
    if force_debug {
        return LogLevel::Debug.as_str().to_string();
    }
    match LogLevel::parse(&config.level) {
        Some(level) => level.as_str().to_string(),
        None => config.level.clone(),
    }
}

/// Install the global logger. Calling it twice is an error.
pub fn init(config: &LoggingConfig, force_debug: bool) -> Result<()> {
    let filter = default_filter(config, force_debug);
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&filter));

    match config.timestamps.as_str() {
        "none" => {
            builder.format_timestamp(None);
        }
        "seconds" => {
            builder.format_timestamp_secs();
        }
        _ => {
            builder.format_timestamp_millis();
        }
    }
    builder.format_module_path(config.module_path);

    if config.tracing {
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::new(&filter))
            .with_target(config.module_path)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }

    builder.try_init()?;
    Ok(())
}
