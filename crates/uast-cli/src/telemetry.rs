//! Diagnostics output for `uast` runs.
//!
//! Standard output carries the normalized tree, so every event is written to
//! standard error. The global subscriber is installed by the first run in a
//! process; later runs only validate their filter.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::fmt::{self, time::UtcTime};
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::config::{Config, LogFormat};

static INSTALLED: OnceCell<LogFormat> = OnceCell::new();

/// Outcome of [`initialise`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetryHandle {
    format: LogFormat,
    installed_now: bool,
}

impl TelemetryHandle {
    /// Format of the subscriber serving this process.
    #[must_use]
    pub const fn format(&self) -> LogFormat {
        self.format
    }

    /// Whether this call installed the subscriber.
    #[must_use]
    pub const fn installed_now(&self) -> bool {
        self.installed_now
    }
}

/// Errors encountered while configuring diagnostics.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum TelemetryError {
    /// The `--log-filter` directive does not parse.
    #[error("invalid log filter '{filter}': {source}")]
    Filter {
        /// The rejected directive.
        filter: String,
        /// Parser diagnostic.
        #[source]
        source: ParseError,
    },
    /// Another subscriber already owns the process.
    #[error("failed to install diagnostics subscriber: {0}")]
    Install(#[from] TryInitError),
}

/// Installs the stderr subscriber on the first call in a process.
///
/// The filter is parsed on every call, so a bad `--log-filter` is reported
/// even when an earlier run already installed a subscriber. Later calls keep
/// the format chosen by the first one.
///
/// # Errors
///
/// Returns [`TelemetryError::Filter`] for an unparsable filter and
/// [`TelemetryError::Install`] when a foreign subscriber is already set.
pub fn initialise(config: &Config) -> Result<TelemetryHandle, TelemetryError> {
    let filter = parse_filter(config.log_filter())?;
    let mut installed_now = false;
    let format = INSTALLED.get_or_try_init(|| {
        install(config.log_format(), filter)?;
        installed_now = true;
        Ok::<_, TelemetryError>(config.log_format())
    })?;
    Ok(TelemetryHandle {
        format: *format,
        installed_now,
    })
}

fn parse_filter(directive: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(directive).map_err(|source| TelemetryError::Filter {
        filter: directive.to_owned(),
        source,
    })
}

fn install(format: LogFormat, filter: EnvFilter) -> Result<(), TryInitError> {
    let stderr_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_timer(UtcTime::rfc_3339())
        .with_target(true);
    let output: Box<dyn Layer<Registry> + Send + Sync> = match format {
        LogFormat::Json => Box::new(stderr_layer.json().flatten_event(true)),
        LogFormat::Compact => Box::new(stderr_layer.compact()),
    };
    tracing_subscriber::registry()
        .with(output)
        .with(filter)
        .try_init()
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::unknown_level("uast=loud")]
    #[case::unknown_nested_level("warn,uast_core=chatty")]
    fn bad_filters_are_rejected_on_every_call(#[case] directive: &str) {
        let err = initialise(&Config::new(LogFormat::Compact, directive))
            .expect_err("filter should not parse");
        assert!(matches!(err, TelemetryError::Filter { ref filter, .. } if filter == directive));
    }

    #[test]
    fn later_calls_keep_the_installed_format() {
        let first = initialise(&Config::new(LogFormat::Compact, "off")).expect("first");
        let second = initialise(&Config::new(LogFormat::Json, "off")).expect("second");
        assert!(!second.installed_now());
        assert_eq!(second.format(), first.format());
    }
}
