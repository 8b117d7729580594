//! Error types for the normalization pipeline.
//!
//! Every stage fails fast for the whole document: the first error aborts the
//! run and is returned with the stage that raised it and the path of the
//! offending node.

use std::fmt;

use thiserror::Error;

use crate::path::NodePath;

/// The pipeline stage that reported an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Field fixups run on untyped records.
    Fixup,
    /// Untyped records converted into canonical nodes.
    Convert,
    /// Line and column resolution from offsets.
    Position,
    /// A rewrite phase applying mappings.
    Rewrite,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Fixup => "fixup",
            Self::Convert => "convert",
            Self::Position => "position",
            Self::Rewrite => "rewrite",
        };
        f.write_str(name)
    }
}

/// Errors raised while normalizing a native tree.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum NormalizeError {
    /// The native tree violates the node/scalar/sequence contract.
    #[error("invalid shape at {path}: {message}")]
    InvalidShape {
        /// Location of the offending value.
        path: NodePath,
        /// Description of the violation.
        message: String,
    },

    /// A record accepted as a node has no usable kind.
    #[error("missing kind field '{field}' at {path}")]
    MissingKind {
        /// Location of the offending record.
        path: NodePath,
        /// The configured kind field.
        field: String,
    },

    /// A positional field holds a value that cannot be a position.
    #[error("invalid position field '{field}' at {path}: {message}")]
    InvalidPosition {
        /// Stage that found the problem.
        stage: Stage,
        /// Location of the offending node.
        path: NodePath,
        /// The positional field involved.
        field: String,
        /// Description of the problem, including the offending value.
        message: String,
    },

    /// An offset points past the end of the source buffer.
    #[error("offset {offset} at {path} exceeds source length {len}")]
    OffsetOutOfRange {
        /// Location of the offending node.
        path: NodePath,
        /// The offending offset.
        offset: usize,
        /// Length of the source buffer in bytes.
        len: usize,
    },

    /// A field fixup rejected a record.
    #[error("fixup '{fixup}' failed at {path}: {source}")]
    Fixup {
        /// Name of the failing fixup.
        fixup: String,
        /// Location of the rejected record.
        path: NodePath,
        /// The error reported by the fixup.
        #[source]
        source: FixupError,
    },

    /// A rewrite rule matched but could not build its replacement.
    #[error("rule #{index} '{rule}' of phase '{phase}' failed at {path}: {message}")]
    RuleApplication {
        /// Name of the phase holding the rule.
        phase: String,
        /// Position of the rule inside its phase.
        index: usize,
        /// Name of the rule.
        rule: String,
        /// Location of the matched node.
        path: NodePath,
        /// Description of the failure.
        message: String,
    },
}

impl NormalizeError {
    /// Creates an invalid shape error.
    #[must_use]
    pub fn invalid_shape(path: &NodePath, message: impl Into<String>) -> Self {
        Self::InvalidShape {
            path: path.clone(),
            message: message.into(),
        }
    }

    /// Creates a missing kind error.
    #[must_use]
    pub fn missing_kind(path: &NodePath, field: impl Into<String>) -> Self {
        Self::MissingKind {
            path: path.clone(),
            field: field.into(),
        }
    }

    /// Creates an invalid position error.
    #[must_use]
    pub fn invalid_position(
        stage: Stage,
        path: &NodePath,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidPosition {
            stage,
            path: path.clone(),
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates an offset out of range error.
    #[must_use]
    pub fn offset_out_of_range(path: &NodePath, offset: usize, len: usize) -> Self {
        Self::OffsetOutOfRange {
            path: path.clone(),
            offset,
            len,
        }
    }

    /// Wraps an error reported by a fixup.
    #[must_use]
    pub fn fixup(fixup: impl Into<String>, path: &NodePath, source: FixupError) -> Self {
        Self::Fixup {
            fixup: fixup.into(),
            path: path.clone(),
            source,
        }
    }

    /// Creates a rule application error.
    #[must_use]
    pub fn rule_application(
        phase: impl Into<String>,
        index: usize,
        rule: impl Into<String>,
        path: &NodePath,
        message: impl Into<String>,
    ) -> Self {
        Self::RuleApplication {
            phase: phase.into(),
            index,
            rule: rule.into(),
            path: path.clone(),
            message: message.into(),
        }
    }

    /// Returns the stage that raised this error.
    #[must_use]
    pub const fn stage(&self) -> Stage {
        match self {
            Self::InvalidShape { .. } | Self::MissingKind { .. } => Stage::Convert,
            Self::InvalidPosition { stage, .. } => *stage,
            Self::OffsetOutOfRange { .. } => Stage::Position,
            Self::Fixup { .. } => Stage::Fixup,
            Self::RuleApplication { .. } => Stage::Rewrite,
        }
    }

    /// Returns the location of the node that caused this error.
    #[must_use]
    pub const fn path(&self) -> &NodePath {
        match self {
            Self::InvalidShape { path, .. }
            | Self::MissingKind { path, .. }
            | Self::InvalidPosition { path, .. }
            | Self::OffsetOutOfRange { path, .. }
            | Self::Fixup { path, .. }
            | Self::RuleApplication { path, .. } => path,
        }
    }
}

/// Shape violation reported by a field fixup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("field '{field}': {message}")]
pub struct FixupError {
    field: String,
    message: String,
}

impl FixupError {
    /// Creates a fixup error for `field`.
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Returns the field the fixup was repairing.
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Returns the description of the violation.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}
