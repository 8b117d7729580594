//! Bindings recorded while matching a pattern.

use std::collections::BTreeMap;

use crate::node::{Node, Scalar};

/// A value bound by a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Captured {
    /// A single child node.
    Single(Node),
    /// The nodes of a sequence slot, in order.
    Multiple(Vec<Node>),
    /// A property value or token text.
    Scalar(Scalar),
}

impl Captured {
    /// Returns the capture as a single node, if applicable.
    #[must_use]
    pub const fn as_single(&self) -> Option<&Node> {
        match self {
            Self::Single(node) => Some(node),
            Self::Multiple(_) | Self::Scalar(_) => None,
        }
    }

    /// Returns the capture as a node sequence, if applicable.
    #[must_use]
    pub fn as_multiple(&self) -> Option<&[Node]> {
        match self {
            Self::Multiple(nodes) => Some(nodes),
            Self::Single(_) | Self::Scalar(_) => None,
        }
    }

    /// Returns the capture as a scalar, if applicable.
    #[must_use]
    pub const fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Self::Scalar(value) => Some(value),
            Self::Single(_) | Self::Multiple(_) => None,
        }
    }

    pub(crate) const fn describe(&self) -> &'static str {
        match self {
            Self::Single(_) => "a node",
            Self::Multiple(_) => "a node sequence",
            Self::Scalar(_) => "a scalar",
        }
    }
}

/// Named bindings produced by one successful match.
///
/// Names are kept sorted so that iterating the bindings never depends on
/// the order in which a pattern happened to record them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captures {
    inner: BTreeMap<String, Captured>,
}

impl Captures {
    /// Returns the binding for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Captured> {
        self.inner.get(name)
    }

    /// Returns the number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns whether nothing was bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Iterates bindings in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Captured)> {
        self.inner.iter().map(|(name, value)| (name.as_str(), value))
    }
}

/// A binding borrowed from the node under test.
#[derive(Debug, Clone, Copy)]
pub(super) enum Bound<'a> {
    Single(&'a Node),
    Multiple(&'a [Node]),
    Scalar(&'a Scalar),
    Token(&'a str),
}

impl Bound<'_> {
    fn same_value(self, other: Self) -> bool {
        match (self, other) {
            (Self::Single(left), Self::Single(right)) => left == right,
            (Self::Multiple(left), Self::Multiple(right)) => left == right,
            (Self::Scalar(left), Self::Scalar(right)) => left == right,
            (Self::Token(left), Self::Token(right)) => left == right,
            (Self::Token(text), Self::Scalar(Scalar::String(value)))
            | (Self::Scalar(Scalar::String(value)), Self::Token(text)) => text == value,
            _ => false,
        }
    }

    fn to_captured(self) -> Captured {
        match self {
            Self::Single(node) => Captured::Single(node.clone()),
            Self::Multiple(nodes) => Captured::Multiple(nodes.to_vec()),
            Self::Scalar(value) => Captured::Scalar(value.clone()),
            Self::Token(text) => Captured::Scalar(Scalar::from(text)),
        }
    }
}

/// Bindings recorded during a match attempt.
///
/// Values stay borrowed until the match succeeds, so a failed attempt never
/// copies a subtree.
#[derive(Debug, Default)]
pub(super) struct Bindings<'a> {
    inner: BTreeMap<&'a str, Bound<'a>>,
}

impl<'a> Bindings<'a> {
    /// Binds `name`, or checks an existing binding holds the same value.
    ///
    /// The name `_` matches anything and binds nothing.
    pub(super) fn insert_consistent(&mut self, name: &'a str, next: Bound<'a>) -> bool {
        if name == "_" {
            return true;
        }

        match self.inner.get(name) {
            Some(existing) => existing.same_value(next),
            None => {
                self.inner.insert(name, next);
                true
            }
        }
    }

    /// Copies the bound values out of the matched tree.
    pub(super) fn into_captures(self) -> Captures {
        Captures {
            inner: self
                .inner
                .into_iter()
                .map(|(name, bound)| (name.to_owned(), bound.to_captured()))
                .collect(),
        }
    }
}
