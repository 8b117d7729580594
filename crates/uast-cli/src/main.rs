//! CLI entrypoint for the `uast` normalizer.
//!
//! The binary delegates to [`uast_cli::run`] with the process streams.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    uast_cli::run(std::env::args_os(), io::stdin().lock(), &mut stdout, &mut stderr)
}
