//! Command-line runtime for the `uast` normalizer.
//!
//! `uast normalize` reads a TypeScript parser response and the source it was
//! parsed from, runs the TypeScript driver and writes the normalized tree as
//! JSON to standard output. Diagnostics go to standard error through
//! `tracing`; any failure ends with a one-line message and exit code 1.
//!
//! The runtime takes its streams as parameters so tests can drive it
//! in-process.

use std::ffi::OsString;
use std::fs;
use std::io::{Read, Write};
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, error};
use uast_core::{Encoding, Mode, OffsetUnit};
use uast_typescript::{Driver, NativeResponse};

mod cli;
mod config;
mod errors;
pub mod telemetry;

use cli::{Cli, CliCommand, NormalizeArgs};
pub use config::{Config, DEFAULT_LOG_FILTER, LogFormat, LogFormatParseError};
use errors::AppError;

/// Tracing target for CLI runs.
const CLI_TARGET: &str = "uast_cli";

/// Runs the CLI using the provided arguments and IO handles.
///
/// `stdin` is only read when the response argument is `-`.
#[must_use]
pub fn run<I, R, W, E>(args: I, stdin: R, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    R: Read,
    W: Write,
    E: Write,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(usage) if !usage.use_stderr() => {
            return match write!(stdout, "{usage}") {
                Ok(()) => ExitCode::SUCCESS,
                Err(_) => ExitCode::FAILURE,
            };
        }
        Err(usage) => return report(&AppError::CliUsage(usage), stderr),
    };

    match execute(&cli, stdin, stdout) {
        Ok(()) => ExitCode::SUCCESS,
        Err(failure) => {
            error!(target: CLI_TARGET, error = %failure, "uast failed");
            report(&failure, stderr)
        }
    }
}

fn report<E: Write>(failure: &AppError, stderr: &mut E) -> ExitCode {
    if let Err(write_error) = writeln!(stderr, "uast: {failure}") {
        debug!(target: CLI_TARGET, %write_error, "could not report failure");
    }
    ExitCode::FAILURE
}

fn execute<R: Read, W: Write>(cli: &Cli, stdin: R, stdout: &mut W) -> Result<(), AppError> {
    let telemetry = telemetry::initialise(&cli.config())?;
    debug!(
        target: CLI_TARGET,
        format = %telemetry.format(),
        installed_now = telemetry.installed_now(),
        "diagnostics ready"
    );
    match &cli.command {
        CliCommand::Normalize(args) => normalize(args, stdin, stdout),
    }
}

fn normalize<R: Read, W: Write>(
    args: &NormalizeArgs,
    stdin: R,
    stdout: &mut W,
) -> Result<(), AppError> {
    let input = if args.reads_stdin() {
        read_stdin(stdin)?
    } else {
        read_file(&args.input)?
    };
    let source = read_file(&args.source)?;
    let mode = Mode::from(args.mode);
    let encoding = Encoding::from(args.encoding);
    let unit = OffsetUnit::from(args.unit);
    debug!(
        target: CLI_TARGET,
        source = %args.source.display(),
        %mode,
        ?encoding,
        ?unit,
        "normalizing document"
    );

    let response = NativeResponse::from_slice(&input)?;
    let tree = Driver::new(unit).normalize(response, &source, encoding, mode)?;

    let rendered = if args.pretty {
        serde_json::to_string_pretty(&tree)
    } else {
        serde_json::to_string(&tree)
    }
    .map_err(AppError::SerialiseTree)?;
    writeln!(stdout, "{rendered}").map_err(AppError::WriteOutput)?;
    stdout.flush().map_err(AppError::WriteOutput)
}

fn read_stdin<R: Read>(mut stdin: R) -> Result<Vec<u8>, AppError> {
    let mut bytes = Vec::new();
    stdin.read_to_end(&mut bytes).map_err(AppError::ReadStdin)?;
    Ok(bytes)
}

fn read_file(path: &Path) -> Result<Vec<u8>, AppError> {
    fs::read(path).map_err(|source| AppError::ReadFile {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests;
