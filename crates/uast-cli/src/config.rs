//! Logging settings for the CLI.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Filter applied when `--log-filter` is not given.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Supported logging output formats.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// Structured JSON suitable for ingestion by logging stacks.
    Json,
    /// Human-readable single line output.
    #[default]
    Compact,
}

/// Errors encountered while parsing a [`LogFormat`] from text.
pub type LogFormatParseError = strum::ParseError;

/// Resolved logging configuration for one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    log_format: LogFormat,
    log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::new(LogFormat::default(), DEFAULT_LOG_FILTER)
    }
}

impl Config {
    /// Creates a configuration.
    #[must_use]
    pub fn new(log_format: LogFormat, log_filter: impl Into<String>) -> Self {
        Self {
            log_format,
            log_filter: log_filter.into(),
        }
    }

    /// Returns the log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Returns the `tracing` filter directive.
    #[must_use]
    pub const fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }
}
