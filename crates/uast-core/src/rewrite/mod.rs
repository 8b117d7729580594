//! Rule-based rewriting of canonical trees.
//!
//! A [`Phase`] is an ordered list of [`Mapping`]s. Applying a phase rewrites
//! the tree bottom-up: every child is rewritten before its parent is tested,
//! so parent rules always see final child shapes. Each node is tested
//! against the mappings top to bottom and the first match replaces it;
//! nodes matching nothing pass through unchanged. A replacement is not
//! tested again within the same phase.

mod capture;
mod matching;
mod pattern;
mod template;

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::error::NormalizeError;
use crate::node::{Node, Slot};
use crate::path::NodePath;

use self::capture::Bindings;

pub use capture::{Captured, Captures};
pub use pattern::{KindTest, NodePattern, PropertyTest, SlotPattern, TokenTest};
pub use template::{
    Action, NodeTemplate, PositionSource, PropertyEdit, ScalarTemplate, SlotEdit, SlotTemplate,
    TokenTemplate, ValueTemplate,
};

/// Tracing target for rewriting.
const REWRITE_TARGET: &str = "uast_core::rewrite";

/// A named pattern and the action applied to nodes it matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapping {
    name: String,
    pattern: NodePattern,
    action: Action,
}

impl Mapping {
    /// Creates a mapping.
    #[must_use]
    pub fn new(name: impl Into<String>, pattern: NodePattern, action: Action) -> Self {
        Self {
            name: name.into(),
            pattern,
            action,
        }
    }

    /// Returns the mapping name used in errors and logs.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the pattern.
    #[must_use]
    pub const fn pattern(&self) -> &NodePattern {
        &self.pattern
    }

    /// Returns the action.
    #[must_use]
    pub const fn action(&self) -> &Action {
        &self.action
    }

    /// Tests the mapping against a single node without rewriting it.
    #[must_use]
    pub fn captures(&self, node: &Node) -> Option<Captures> {
        let mut bindings = Bindings::default();
        matching::matches(&self.pattern, node, &mut bindings).then(|| bindings.into_captures())
    }
}

/// An ordered list of mappings applied as one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Phase {
    name: String,
    mappings: Vec<Mapping>,
}

impl Phase {
    /// Creates an empty phase.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mappings: Vec::new(),
        }
    }

    /// Appends a mapping, returning the extended phase.
    #[must_use]
    pub fn with(mut self, mapping: Mapping) -> Self {
        self.mappings.push(mapping);
        self
    }

    /// Appends mappings in order, returning the extended phase.
    #[must_use]
    pub fn with_all(mut self, mappings: impl IntoIterator<Item = Mapping>) -> Self {
        self.mappings.extend(mappings);
        self
    }

    /// Returns the phase name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the mappings in application order.
    #[must_use]
    pub fn mappings(&self) -> &[Mapping] {
        &self.mappings
    }

    /// Returns whether the phase has no mappings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Rewrites `node` and all its descendants.
    ///
    /// # Errors
    ///
    /// Returns [`NormalizeError::RuleApplication`] when a matching rule's
    /// action cannot build its replacement. The first failure in document
    /// order aborts the phase.
    pub fn apply(&self, node: Node) -> Result<Node, NormalizeError> {
        if self.mappings.is_empty() {
            return Ok(node);
        }

        let mut rewriter = Rewriter {
            phase: self,
            path: NodePath::root(),
            rewritten: 0,
        };
        let rewritten = rewriter.rewrite(node)?;
        debug!(
            target: REWRITE_TARGET,
            phase = %self.name,
            rules = self.mappings.len(),
            rewritten = rewriter.rewritten,
            "applied phase"
        );
        Ok(rewritten)
    }
}

struct Rewriter<'p> {
    phase: &'p Phase,
    path: NodePath,
    rewritten: usize,
}

impl Rewriter<'_> {
    fn rewrite(&mut self, mut node: Node) -> Result<Node, NormalizeError> {
        let children = node.take_children();
        let mut rebuilt = IndexMap::with_capacity(children.len());
        for (name, slot) in children {
            self.path.push_field(&name);
            let rewritten_slot = match slot {
                Slot::Single(child) => Slot::Single(Box::new(self.rewrite(*child)?)),
                Slot::Sequence(nodes) => {
                    let mut rewritten = Vec::with_capacity(nodes.len());
                    for (index, child) in nodes.into_iter().enumerate() {
                        self.path.push_index(index);
                        rewritten.push(self.rewrite(child)?);
                        self.path.pop();
                    }
                    Slot::Sequence(rewritten)
                }
            };
            self.path.pop();
            rebuilt.insert(name, rewritten_slot);
        }
        *node.children_mut() = rebuilt;

        self.apply_first_match(node)
    }

    fn apply_first_match(&mut self, node: Node) -> Result<Node, NormalizeError> {
        for (index, mapping) in self.phase.mappings.iter().enumerate() {
            let Some(captures) = mapping.captures(&node) else {
                continue;
            };

            trace!(
                target: REWRITE_TARGET,
                phase = %self.phase.name,
                rule = %mapping.name,
                index,
                path = %self.path,
                kind = node.kind(),
                "rule matched"
            );
            self.rewritten += 1;
            return mapping.action.apply(node, &captures).map_err(|err| {
                NormalizeError::rule_application(
                    &self.phase.name,
                    index,
                    &mapping.name,
                    &self.path,
                    err.to_string(),
                )
            });
        }
        Ok(node)
    }
}
