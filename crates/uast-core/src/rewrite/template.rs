//! Actions that build replacement nodes from a match.
//!
//! An [`Action`] either builds a node from a [`NodeTemplate`] or replaces
//! the matched node by one of its bindings. Templates are plain data, so a
//! rule set can be inspected and compared without running it.

use thiserror::Error;

use crate::node::{Node, Position, Scalar, Slot};

use super::capture::{Captured, Captures};

/// What a rule does with a matched node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Builds a fresh node. Its position defaults to the matched node's.
    Build(NodeTemplate),
    /// Applies the template's edits to the matched node itself.
    Edit(NodeTemplate),
    /// Replaces the matched node by a node bound in the pattern.
    Replace(String),
}

/// A string produced from a match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueTemplate {
    /// Fixed text.
    Literal(String),
    /// The text of a scalar binding.
    Var(String),
    /// The kind of the matched node.
    MatchedKind,
    /// The token of the matched node.
    MatchedToken,
    /// The text of a scalar binding with a leading `from` replaced by `to`.
    ///
    /// Text without the prefix is used unchanged.
    PrefixReplaced {
        /// Name of the binding.
        var: String,
        /// Prefix to replace.
        from: String,
        /// Text put in its place.
        to: String,
    },
}

impl From<&str> for ValueTemplate {
    fn from(text: &str) -> Self {
        Self::Literal(text.to_owned())
    }
}

/// A property value produced from a match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScalarTemplate {
    /// A fixed value.
    Literal(Scalar),
    /// A scalar binding.
    Var(String),
    /// The kind of the matched node, as a string.
    MatchedKind,
}

impl From<Scalar> for ScalarTemplate {
    fn from(value: Scalar) -> Self {
        Self::Literal(value)
    }
}

impl From<bool> for ScalarTemplate {
    fn from(flag: bool) -> Self {
        Self::Literal(Scalar::Bool(flag))
    }
}

impl From<&str> for ScalarTemplate {
    fn from(text: &str) -> Self {
        Self::Literal(Scalar::from(text))
    }
}

/// Content of a child slot produced from a match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotTemplate {
    /// A node or sequence binding. Fails when unbound.
    Var(String),
    /// A node or sequence binding. The slot is left out when unbound.
    VarIfBound(String),
    /// A freshly built child.
    Node(Box<NodeTemplate>),
    /// A sequence assembled from the items in order. Sequence bindings are
    /// spliced in place.
    Sequence(Vec<SlotTemplate>),
    /// A kindless leaf holding only token text.
    Token(ValueTemplate),
}

/// Source of the built node's position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PositionSource {
    /// The matched node's position.
    #[default]
    Matched,
    /// The position of a node binding.
    Binding(String),
    /// No position.
    None,
}

/// Change applied to a token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TokenTemplate {
    /// Keep the base token (none for a fresh node).
    #[default]
    Keep,
    /// Remove the token.
    Clear,
    /// Set the token.
    Set(ValueTemplate),
}

/// Change applied to properties, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyEdit {
    /// Inserts or overwrites a property.
    Set(String, ScalarTemplate),
    /// Removes a property if present.
    Remove(String),
    /// Renames a property in place. Missing properties are ignored.
    Rename {
        /// Current key.
        from: String,
        /// New key.
        to: String,
    },
}

/// Change applied to child slots, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotEdit {
    /// Inserts or overwrites a slot.
    Set(String, SlotTemplate),
    /// Removes a slot if present.
    Remove(String),
    /// Renames a slot in place. Missing slots are ignored.
    Rename {
        /// Current name.
        from: String,
        /// New name.
        to: String,
    },
}

/// Description of a node built by an [`Action`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeTemplate {
    kind: Option<ValueTemplate>,
    token: TokenTemplate,
    position: PositionSource,
    properties: Vec<PropertyEdit>,
    slots: Vec<SlotEdit>,
}

impl NodeTemplate {
    /// A template producing nodes of a fixed kind.
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self::default().kind(ValueTemplate::Literal(kind.into()))
    }

    /// A template that leaves the base node unchanged until edits are added.
    #[must_use]
    pub fn keep() -> Self {
        Self::default()
    }

    /// Sets the kind.
    #[must_use]
    pub fn kind(mut self, kind: ValueTemplate) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Sets the token.
    #[must_use]
    pub fn token(mut self, token: ValueTemplate) -> Self {
        self.token = TokenTemplate::Set(token);
        self
    }

    /// Removes the token.
    #[must_use]
    pub fn clear_token(mut self) -> Self {
        self.token = TokenTemplate::Clear;
        self
    }

    /// Sets where the position comes from.
    #[must_use]
    pub fn position(mut self, source: PositionSource) -> Self {
        self.position = source;
        self
    }

    /// Sets a property.
    #[must_use]
    pub fn set_property(
        mut self,
        key: impl Into<String>,
        value: impl Into<ScalarTemplate>,
    ) -> Self {
        self.properties.push(PropertyEdit::Set(key.into(), value.into()));
        self
    }

    /// Removes a property.
    #[must_use]
    pub fn remove_property(mut self, key: impl Into<String>) -> Self {
        self.properties.push(PropertyEdit::Remove(key.into()));
        self
    }

    /// Renames a property.
    #[must_use]
    pub fn rename_property(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.properties.push(PropertyEdit::Rename {
            from: from.into(),
            to: to.into(),
        });
        self
    }

    /// Sets a child slot.
    #[must_use]
    pub fn set_slot(mut self, name: impl Into<String>, content: SlotTemplate) -> Self {
        self.slots.push(SlotEdit::Set(name.into(), content));
        self
    }

    /// Removes a child slot.
    #[must_use]
    pub fn remove_slot(mut self, name: impl Into<String>) -> Self {
        self.slots.push(SlotEdit::Remove(name.into()));
        self
    }

    /// Renames a child slot.
    #[must_use]
    pub fn rename_slot(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.slots.push(SlotEdit::Rename {
            from: from.into(),
            to: to.into(),
        });
        self
    }
}

/// Reasons an action cannot produce a node.
#[derive(Debug, Error, PartialEq, Eq)]
pub(super) enum BuildError {
    #[error("binding '{0}' is not bound")]
    Unbound(String),
    #[error("binding '{name}' holds {found}, expected {expected}")]
    Mismatch {
        name: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("built node has an empty kind")]
    EmptyKind,
    #[error("matched node has no token")]
    MissingToken,
    #[error("renaming '{from}' to '{to}' collides with an existing entry")]
    Collision { from: String, to: String },
}

/// What the action may read from the matched node after it has been taken
/// apart.
struct Matched {
    kind: String,
    token: Option<String>,
    position: Option<Position>,
}

impl Action {
    /// Produces the replacement for `node`.
    pub(super) fn apply(&self, node: Node, captures: &Captures) -> Result<Node, BuildError> {
        let matched = Matched {
            kind: node.kind().to_owned(),
            token: node.token().map(str::to_owned),
            position: node.position().copied(),
        };
        let builder = Builder {
            matched: &matched,
            captures,
        };
        match self {
            Self::Replace(name) => builder.node(name).cloned(),
            Self::Build(template) => builder.fresh(template),
            Self::Edit(template) => builder.build(template, node, false),
        }
    }
}

struct Builder<'a> {
    matched: &'a Matched,
    captures: &'a Captures,
}

impl Builder<'_> {
    fn build(
        &self,
        template: &NodeTemplate,
        mut base: Node,
        fresh: bool,
    ) -> Result<Node, BuildError> {
        if let Some(kind) = &template.kind {
            base.set_kind(self.text(kind)?);
        }
        if base.kind().is_empty() {
            return Err(BuildError::EmptyKind);
        }

        match &template.token {
            TokenTemplate::Keep => {}
            TokenTemplate::Clear => base.set_token(None),
            TokenTemplate::Set(value) => base.set_token(Some(self.text(value)?)),
        }

        match &template.position {
            PositionSource::Matched if fresh => base.set_position(self.matched.position),
            PositionSource::Matched => {}
            PositionSource::Binding(name) => {
                let position = self.node(name)?.position().copied();
                base.set_position(position);
            }
            PositionSource::None => base.set_position(None),
        }

        for edit in &template.properties {
            self.edit_property(&mut base, edit)?;
        }
        for edit in &template.slots {
            self.edit_slot(&mut base, edit)?;
        }
        Ok(base)
    }

    fn edit_property(&self, node: &mut Node, edit: &PropertyEdit) -> Result<(), BuildError> {
        let properties = node.properties_mut();
        match edit {
            PropertyEdit::Set(key, value) => {
                properties.insert(key.clone(), self.scalar(value)?);
            }
            PropertyEdit::Remove(key) => {
                properties.shift_remove(key);
            }
            PropertyEdit::Rename { from, to } => {
                if from != to && properties.contains_key(from) {
                    if properties.contains_key(to) {
                        return Err(BuildError::Collision {
                            from: from.clone(),
                            to: to.clone(),
                        });
                    }
                    if let Some((index, _, value)) = properties.shift_remove_full(from) {
                        properties.shift_insert(index, to.clone(), value);
                    }
                }
            }
        }
        Ok(())
    }

    fn edit_slot(&self, node: &mut Node, edit: &SlotEdit) -> Result<(), BuildError> {
        match edit {
            SlotEdit::Set(name, content) => {
                if let Some(slot) = self.slot(content)? {
                    node.children_mut().insert(name.clone(), slot);
                }
            }
            SlotEdit::Remove(name) => {
                node.children_mut().shift_remove(name);
            }
            SlotEdit::Rename { from, to } => {
                let children = node.children_mut();
                if from != to && children.contains_key(from) {
                    if children.contains_key(to) {
                        return Err(BuildError::Collision {
                            from: from.clone(),
                            to: to.clone(),
                        });
                    }
                    if let Some((index, _, slot)) = children.shift_remove_full(from) {
                        children.shift_insert(index, to.clone(), slot);
                    }
                }
            }
        }
        Ok(())
    }

    fn slot(&self, content: &SlotTemplate) -> Result<Option<Slot>, BuildError> {
        let slot = match content {
            SlotTemplate::Var(name) => Some(self.bound_slot(name)?),
            SlotTemplate::VarIfBound(name) => match self.captures.get(name) {
                Some(_) => Some(self.bound_slot(name)?),
                None => None,
            },
            SlotTemplate::Node(template) => Some(Slot::Single(Box::new(self.fresh(template)?))),
            SlotTemplate::Token(text) => Some(Slot::Single(Box::new(Node::pure_token(
                self.text(text)?,
            )))),
            SlotTemplate::Sequence(items) => {
                let mut nodes = Vec::with_capacity(items.len());
                for item in items {
                    match self.slot(item)? {
                        Some(Slot::Single(node)) => nodes.push(*node),
                        Some(Slot::Sequence(spliced)) => nodes.extend(spliced),
                        None => {}
                    }
                }
                Some(Slot::Sequence(nodes))
            }
        };
        Ok(slot)
    }

    fn fresh(&self, template: &NodeTemplate) -> Result<Node, BuildError> {
        self.build(template, Node::new(String::new()), true)
    }

    fn bound_slot(&self, name: &str) -> Result<Slot, BuildError> {
        match self.captures.get(name) {
            Some(Captured::Single(node)) => Ok(Slot::Single(Box::new(node.clone()))),
            Some(Captured::Multiple(nodes)) => Ok(Slot::Sequence(nodes.clone())),
            Some(other @ Captured::Scalar(_)) => Err(BuildError::Mismatch {
                name: name.to_owned(),
                expected: "a node or node sequence",
                found: other.describe(),
            }),
            None => Err(BuildError::Unbound(name.to_owned())),
        }
    }

    fn node(&self, name: &str) -> Result<&Node, BuildError> {
        match self.captures.get(name) {
            Some(Captured::Single(node)) => Ok(node),
            Some(other) => Err(BuildError::Mismatch {
                name: name.to_owned(),
                expected: "a node",
                found: other.describe(),
            }),
            None => Err(BuildError::Unbound(name.to_owned())),
        }
    }

    fn bound_scalar(&self, name: &str) -> Result<&Scalar, BuildError> {
        match self.captures.get(name) {
            Some(Captured::Scalar(value)) => Ok(value),
            Some(other) => Err(BuildError::Mismatch {
                name: name.to_owned(),
                expected: "a scalar",
                found: other.describe(),
            }),
            None => Err(BuildError::Unbound(name.to_owned())),
        }
    }

    fn text(&self, value: &ValueTemplate) -> Result<String, BuildError> {
        match value {
            ValueTemplate::Literal(text) => Ok(text.clone()),
            ValueTemplate::Var(name) => self.bound_text(name),
            ValueTemplate::MatchedKind => Ok(self.matched.kind.clone()),
            ValueTemplate::MatchedToken => {
                self.matched.token.clone().ok_or(BuildError::MissingToken)
            }
            ValueTemplate::PrefixReplaced { var, from, to } => {
                let bound = self.bound_text(var)?;
                Ok(bound
                    .strip_prefix(from.as_str())
                    .map_or_else(|| bound.clone(), |rest| format!("{to}{rest}")))
            }
        }
    }

    fn bound_text(&self, name: &str) -> Result<String, BuildError> {
        let scalar = self.bound_scalar(name)?;
        scalar.to_text().ok_or_else(|| BuildError::Mismatch {
            name: name.to_owned(),
            expected: "text",
            found: "null",
        })
    }

    fn scalar(&self, value: &ScalarTemplate) -> Result<Scalar, BuildError> {
        match value {
            ScalarTemplate::Literal(scalar) => Ok(scalar.clone()),
            ScalarTemplate::Var(name) => self.bound_scalar(name).cloned(),
            ScalarTemplate::MatchedKind => Ok(Scalar::String(self.matched.kind.clone())),
        }
    }
}
