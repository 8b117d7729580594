//! The assembled normalization pipeline.
//!
//! A [`Pipeline`] is configured once and then run independently for every
//! document: fixups and conversion, position resolution, the preprocessing
//! phase and the semantic phase. It holds no per-run state and is
//! `Send + Sync`, so one instance can serve any number of threads.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::convert::ObjectToNode;
use crate::error::NormalizeError;
use crate::node::Node;
use crate::position::{Encoding, Positioner};
use crate::rewrite::Phase;

/// Tracing target for pipeline runs.
const PIPELINE_TARGET: &str = "uast_core::pipeline";

/// Name of the structural rewrite phase.
pub const PREPROCESSING_PHASE: &str = "preprocessing";

/// Name of the language-aware rewrite phase.
pub const SEMANTIC_PHASE: &str = "semantic";

/// How far a run proceeds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Conversion and position resolution only.
    Native,
    /// Additionally applies the preprocessing phase.
    Preprocessed,
    /// Runs every stage.
    #[default]
    Semantic,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Native => "native",
            Self::Preprocessed => "preprocessed",
            Self::Semantic => "semantic",
        };
        f.write_str(name)
    }
}

/// Error returned when parsing an unknown [`Mode`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown mode '{0}', expected native, preprocessed or semantic")]
pub struct ParseModeError(String);

impl FromStr for Mode {
    type Err = ParseModeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "native" => Ok(Self::Native),
            "preprocessed" => Ok(Self::Preprocessed),
            "semantic" => Ok(Self::Semantic),
            _ => Err(ParseModeError(value.to_owned())),
        }
    }
}

/// Immutable configuration for normalizing documents of one language.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use uast_core::{Encoding, ObjectToNode, OffsetUnit, Pipeline, Positioner};
///
/// let to_node = ObjectToNode::new("kind").offset_key("pos");
/// let pipeline = Pipeline::builder(to_node, Positioner::new(OffsetUnit::Byte)).build();
/// let tree = pipeline.run(json!({"kind": "Program", "pos": 0}), b"", Encoding::Utf8)?;
/// assert_eq!(tree.kind(), "Program");
/// # Ok::<(), uast_core::NormalizeError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Pipeline {
    to_node: ObjectToNode,
    positioner: Positioner,
    preprocess: Phase,
    normalize: Phase,
}

impl Pipeline {
    /// Starts a builder around the converter and position resolver.
    ///
    /// Both are required: the column unit must match what the native parser
    /// counts in, so there is no fallback.
    #[must_use]
    pub fn builder(to_node: ObjectToNode, positioner: Positioner) -> PipelineBuilder {
        PipelineBuilder {
            to_node,
            positioner,
            preprocess: Phase::new(PREPROCESSING_PHASE),
            normalize: Phase::new(SEMANTIC_PHASE),
        }
    }

    /// Returns the converter configuration.
    #[must_use]
    pub const fn to_node(&self) -> &ObjectToNode {
        &self.to_node
    }

    /// Returns the position resolver configuration.
    #[must_use]
    pub const fn positioner(&self) -> &Positioner {
        &self.positioner
    }

    /// Returns the preprocessing phase.
    #[must_use]
    pub const fn preprocessors(&self) -> &Phase {
        &self.preprocess
    }

    /// Returns the semantic phase.
    #[must_use]
    pub const fn normalizers(&self) -> &Phase {
        &self.normalize
    }

    /// Normalizes one document into its semantic tree.
    ///
    /// # Errors
    ///
    /// Returns the first [`NormalizeError`] raised by any stage.
    pub fn run(
        &self,
        raw: Value,
        source: &[u8],
        encoding: Encoding,
    ) -> Result<Node, NormalizeError> {
        self.run_mode(raw, source, encoding, Mode::Semantic)
    }

    /// Normalizes one document, stopping after the stage selected by `mode`.
    ///
    /// # Errors
    ///
    /// Returns the first [`NormalizeError`] raised by any stage that runs.
    pub fn run_mode(
        &self,
        raw: Value,
        source: &[u8],
        encoding: Encoding,
        mode: Mode,
    ) -> Result<Node, NormalizeError> {
        let converted = self.to_node.convert(raw)?;
        let mut node = self.positioner.resolve(converted, source, encoding)?;
        if mode != Mode::Native {
            node = self.preprocess.apply(node)?;
        }
        if mode == Mode::Semantic {
            node = self.normalize.apply(node)?;
        }
        debug!(
            target: PIPELINE_TARGET,
            %mode,
            root = node.kind(),
            "normalized document"
        );
        Ok(node)
    }
}

/// Builder for [`Pipeline`].
#[derive(Debug, Clone)]
pub struct PipelineBuilder {
    to_node: ObjectToNode,
    positioner: Positioner,
    preprocess: Phase,
    normalize: Phase,
}

impl PipelineBuilder {
    /// Sets the preprocessing phase.
    #[must_use]
    pub fn preprocess(mut self, phase: Phase) -> Self {
        self.preprocess = phase;
        self
    }

    /// Sets the semantic phase.
    #[must_use]
    pub fn normalize(mut self, phase: Phase) -> Self {
        self.normalize = phase;
        self
    }

    /// Finishes the configuration.
    #[must_use]
    pub fn build(self) -> Pipeline {
        Pipeline {
            to_node: self.to_node,
            positioner: self.positioner,
            preprocess: self.preprocess,
            normalize: self.normalize,
        }
    }
}
