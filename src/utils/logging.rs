//! Logging configuration and subscriber setup

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::error::TimemarkError;

/// Logging configuration options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Global log level
    pub level: LogLevel,
    /// Output format
    pub format: LogFormat,
}

/// Log level configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable multi-line format
    Pretty,
    /// Single-line text format
    Compact,
    /// JSON format for structured logging
    Json,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
        }
    }
}

impl LogLevel {
    fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_filter())
    }
}

impl FromStr for LogLevel {
    type Err = TimemarkError;

    fn from_str(level_str: &str) -> Result<Self, Self::Err> {
        match level_str.to_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(TimemarkError::Config {
                message: format!(
                    "Invalid log level: {}. Valid levels: trace, debug, info, warn, error",
                    level_str
                ),
            }),
        }
    }
}

impl FromStr for LogFormat {
    type Err = TimemarkError;

    fn from_str(format_str: &str) -> Result<Self, Self::Err> {
        match format_str.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            _ => Err(TimemarkError::Config {
                message: format!(
                    "Invalid log format: {}. Valid formats: pretty, compact, json",
                    format_str
                ),
            }),
        }
    }
}

/// Install the global tracing subscriber
///
/// `RUST_LOG` takes precedence over the configured level. Logs go to stderr
/// so stdout stays clean for command output. Calling this twice is a no-op.
pub fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_filter()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let result = match config.format {
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    if result.is_ok() {
        tracing::debug!(level = %config.level, format = ?config.format, "Logging initialized");
    }
}
