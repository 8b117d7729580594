//! Command-line argument definitions for `uast`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use uast_core::{Encoding, Mode, OffsetUnit};

use crate::config::{Config, DEFAULT_LOG_FILTER, LogFormat};

/// Normalizes native parser trees into language-neutral trees.
#[derive(Parser, Debug)]
#[command(name = "uast", version, disable_help_subcommand = true)]
pub(crate) struct Cli {
    /// Log output format (`json` or `compact`).
    #[arg(long, global = true, default_value_t = LogFormat::Compact)]
    pub(crate) log_format: LogFormat,
    /// `tracing` filter directive for diagnostics on stderr.
    #[arg(long, global = true, default_value = DEFAULT_LOG_FILTER)]
    pub(crate) log_filter: String,
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

impl Cli {
    pub(crate) fn config(&self) -> Config {
        Config::new(self.log_format, self.log_filter.as_str())
    }
}

#[derive(Subcommand, Debug)]
pub(crate) enum CliCommand {
    /// Normalizes one TypeScript parser response and prints the tree as JSON.
    Normalize(NormalizeArgs),
}

#[derive(Args, Debug)]
pub(crate) struct NormalizeArgs {
    /// Native parser response, or `-` to read it from stdin.
    #[arg(value_name = "NATIVE_JSON")]
    pub(crate) input: PathBuf,
    /// Source file the response was parsed from.
    #[arg(long, value_name = "FILE")]
    pub(crate) source: PathBuf,
    /// How far to normalize.
    #[arg(long, value_enum, default_value_t = ModeArg::Semantic)]
    pub(crate) mode: ModeArg,
    /// Encoding of the source file.
    #[arg(long, value_enum, default_value_t = EncodingArg::Utf8)]
    pub(crate) encoding: EncodingArg,
    /// Unit columns are counted in.
    #[arg(long, value_enum, default_value_t = UnitArg::CodeUnit)]
    pub(crate) unit: UnitArg,
    /// Pretty-prints the JSON output.
    #[arg(long)]
    pub(crate) pretty: bool,
}

impl NormalizeArgs {
    pub(crate) fn reads_stdin(&self) -> bool {
        self.input.as_os_str() == "-"
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub(crate) enum ModeArg {
    /// Conversion and positions only.
    Native,
    /// Stops after the preprocessing phase.
    Preprocessed,
    /// Runs every phase.
    Semantic,
}

impl From<ModeArg> for Mode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Native => Self::Native,
            ModeArg::Preprocessed => Self::Preprocessed,
            ModeArg::Semantic => Self::Semantic,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub(crate) enum EncodingArg {
    #[value(name = "utf-8")]
    Utf8,
    #[value(name = "utf-16le")]
    Utf16Le,
    #[value(name = "utf-16be")]
    Utf16Be,
}

impl From<EncodingArg> for Encoding {
    fn from(encoding: EncodingArg) -> Self {
        match encoding {
            EncodingArg::Utf8 => Self::Utf8,
            EncodingArg::Utf16Le => Self::Utf16Le,
            EncodingArg::Utf16Be => Self::Utf16Be,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub(crate) enum UnitArg {
    Byte,
    CodeUnit,
    CodePoint,
}

impl From<UnitArg> for OffsetUnit {
    fn from(unit: UnitArg) -> Self {
        match unit {
            UnitArg::Byte => Self::Byte,
            UnitArg::CodeUnit => Self::CodeUnit,
            UnitArg::CodePoint => Self::CodePoint,
        }
    }
}
