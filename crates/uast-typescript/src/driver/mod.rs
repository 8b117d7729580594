//! Runs native parser responses through the TypeScript pipeline.

use thiserror::Error;
use tracing::{debug, warn};
use uast_core::{Encoding, Mode, Node, NodePath, NormalizeError, OffsetUnit, Pipeline};

use crate::native::{NativeError, NativeResponse};
use crate::rules::{self, SEMANTIC_BLACKLIST};

/// Tracing target for driver runs.
const DRIVER_TARGET: &str = "uast_typescript::driver";

/// Errors raised while normalizing one document.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DriverError {
    /// The native response could not be used.
    #[error(transparent)]
    Native(#[from] NativeError),

    /// A pipeline stage failed.
    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    /// Native kinds survived the semantic phase.
    #[error("{} node(s) kept a native kind after normalization, first at {first}", .paths.len())]
    NativeKinds {
        /// Path of the first offending node.
        first: NodePath,
        /// Paths of every offending node in pre-order.
        paths: Vec<NodePath>,
    },
}

/// Normalizes TypeScript documents.
///
/// The driver is immutable once built and may be shared between threads.
#[derive(Debug, Clone)]
pub struct Driver {
    pipeline: Pipeline,
    blacklist: &'static [&'static str],
}

impl Default for Driver {
    fn default() -> Self {
        Self::new(rules::DEFAULT_UNIT)
    }
}

impl Driver {
    /// Creates a driver counting columns in `unit`.
    #[must_use]
    pub fn new(unit: OffsetUnit) -> Self {
        Self::with_pipeline(rules::pipeline(unit))
    }

    /// Creates a driver around a custom pipeline.
    #[must_use]
    pub const fn with_pipeline(pipeline: Pipeline) -> Self {
        Self {
            pipeline,
            blacklist: SEMANTIC_BLACKLIST,
        }
    }

    /// Replaces the kinds rejected by [`Driver::check_semantic`].
    #[must_use]
    pub const fn with_blacklist(mut self, kinds: &'static [&'static str]) -> Self {
        self.blacklist = kinds;
        self
    }

    /// Returns the pipeline.
    #[must_use]
    pub const fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Normalizes the tree carried by `response`.
    ///
    /// In [`Mode::Semantic`] the result is additionally checked with
    /// [`Driver::check_semantic`].
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Native`] when the response carries no usable
    /// tree, [`DriverError::Normalize`] when a stage fails and
    /// [`DriverError::NativeKinds`] when the semantic check fails.
    pub fn normalize(
        &self,
        response: NativeResponse,
        source: &[u8],
        encoding: Encoding,
        mode: Mode,
    ) -> Result<Node, DriverError> {
        let raw = response.into_ast()?;
        let node = self.pipeline.run_mode(raw, source, encoding, mode)?;
        if mode == Mode::Semantic {
            self.check_semantic(&node)?;
        }
        debug!(
            target: DRIVER_TARGET,
            %mode,
            source_len = source.len(),
            "document normalized"
        );
        Ok(node)
    }

    /// Verifies that no blacklisted native kind remains in `node`.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::NativeKinds`] listing every offending node.
    pub fn check_semantic(&self, node: &Node) -> Result<(), DriverError> {
        let paths = node.find_kinds(self.blacklist);
        let Some(first) = paths.first().cloned() else {
            return Ok(());
        };
        warn!(
            target: DRIVER_TARGET,
            count = paths.len(),
            first = %first,
            "native kinds survived the semantic phase"
        );
        Err(DriverError::NativeKinds { first, paths })
    }
}
