//! Error types for the CLI runtime.

use std::io;
use std::path::PathBuf;

use thiserror::Error;
use uast_typescript::{DriverError, NativeError};

use crate::telemetry::TelemetryError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error("failed to initialise telemetry: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("failed to read native response from stdin: {0}")]
    ReadStdin(io::Error),
    #[error("failed to read {}: {source}", .path.display())]
    ReadFile { path: PathBuf, source: io::Error },
    #[error(transparent)]
    Native(#[from] NativeError),
    #[error(transparent)]
    Driver(#[from] DriverError),
    #[error("failed to serialise tree: {0}")]
    SerialiseTree(serde_json::Error),
    #[error("failed to write output: {0}")]
    WriteOutput(io::Error),
}
