//! The canonical node model shared by every pipeline stage.
//!
//! Nodes are built only by the converter and the rewrite engine; everything
//! else gets read access. Children and properties keep the field order of
//! the native tree, so serializing the same tree twice yields identical
//! bytes.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use crate::path::NodePath;

/// A scalar property value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    /// An explicit null.
    Null,
    /// A boolean flag.
    Bool(bool),
    /// A number, kept in the representation the native tree used.
    Number(serde_json::Number),
    /// A string.
    String(String),
}

impl Scalar {
    /// Converts an untyped value into a scalar.
    ///
    /// Returns `None` for records and sequences.
    #[must_use]
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(Self::Null),
            Value::Bool(flag) => Some(Self::Bool(*flag)),
            Value::Number(number) => Some(Self::Number(number.clone())),
            Value::String(text) => Some(Self::String(text.clone())),
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Returns the string payload, if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(text) => Some(text),
            _ => None,
        }
    }

    /// Returns the boolean payload, if this is a boolean.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(flag) => Some(*flag),
            _ => None,
        }
    }

    /// Renders the scalar as token text.
    ///
    /// Strings are returned verbatim, numbers and booleans in their JSON
    /// form; null has no text.
    #[must_use]
    pub fn to_text(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Bool(flag) => Some(flag.to_string()),
            Self::Number(number) => Some(number.to_string()),
            Self::String(text) => Some(text.clone()),
        }
    }
}

impl From<bool> for Scalar {
    fn from(flag: bool) -> Self {
        Self::Bool(flag)
    }
}

impl From<&str> for Scalar {
    fn from(text: &str) -> Self {
        Self::String(text.to_owned())
    }
}

impl From<String> for Scalar {
    fn from(text: String) -> Self {
        Self::String(text)
    }
}

impl From<i64> for Scalar {
    fn from(number: i64) -> Self {
        Self::Number(number.into())
    }
}

impl From<u64> for Scalar {
    fn from(number: u64) -> Self {
        Self::Number(number.into())
    }
}

/// A location in the source buffer.
///
/// `offset` is a byte index. `line` and `column` are one-based and stay
/// unset until the native tree supplies them or the position resolver fills
/// them in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Point {
    offset: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    column: Option<u32>,
}

impl Point {
    /// Creates a point with no line/column information.
    #[must_use]
    pub const fn at_offset(offset: usize) -> Self {
        Self {
            offset,
            line: None,
            column: None,
        }
    }

    /// Creates a fully resolved point.
    #[must_use]
    pub const fn new(offset: usize, line: u32, column: u32) -> Self {
        Self {
            offset,
            line: Some(line),
            column: Some(column),
        }
    }

    /// Returns the byte offset.
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Returns the one-based line, if known.
    #[must_use]
    pub const fn line(&self) -> Option<u32> {
        self.line
    }

    /// Returns the one-based column, if known.
    #[must_use]
    pub const fn column(&self) -> Option<u32> {
        self.column
    }

    /// Returns whether both line and column are known.
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        self.line.is_some() && self.column.is_some()
    }

    pub(crate) const fn with_line_column(self, line: Option<u32>, column: Option<u32>) -> Self {
        Self {
            offset: self.offset,
            line,
            column,
        }
    }
}

/// The source range covered by a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Position {
    start: Point,
    #[serde(skip_serializing_if = "Option::is_none")]
    end: Option<Point>,
}

impl Position {
    /// Creates a position from its start and optional end.
    #[must_use]
    pub const fn new(start: Point, end: Option<Point>) -> Self {
        Self { start, end }
    }

    /// Returns the start point.
    #[must_use]
    pub const fn start(&self) -> &Point {
        &self.start
    }

    /// Returns the end point, if the native tree supplied one.
    #[must_use]
    pub const fn end(&self) -> Option<&Point> {
        self.end.as_ref()
    }

    pub(crate) const fn start_mut(&mut self) -> &mut Point {
        &mut self.start
    }

    pub(crate) const fn end_mut(&mut self) -> Option<&mut Point> {
        self.end.as_mut()
    }
}

/// A named child slot of a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Slot {
    /// A single child node.
    Single(Box<Node>),
    /// An ordered sequence of child nodes.
    Sequence(Vec<Node>),
}

impl Slot {
    /// Returns the nodes held by this slot in order.
    #[must_use]
    pub fn as_slice(&self) -> &[Node] {
        match self {
            Self::Single(node) => std::slice::from_ref(node.as_ref()),
            Self::Sequence(nodes) => nodes,
        }
    }

    /// Returns the child if this is a single slot.
    #[must_use]
    pub fn as_single(&self) -> Option<&Node> {
        match self {
            Self::Single(node) => Some(node),
            Self::Sequence(_) => None,
        }
    }

    /// Returns the children if this is a sequence slot.
    #[must_use]
    pub fn as_sequence(&self) -> Option<&[Node]> {
        match self {
            Self::Sequence(nodes) => Some(nodes),
            Self::Single(_) => None,
        }
    }
}

/// A node of the canonical tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Node {
    kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    position: Option<Position>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    properties: IndexMap<String, Scalar>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    children: IndexMap<String, Slot>,
}

impl Node {
    pub(crate) fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            token: None,
            position: None,
            properties: IndexMap::new(),
            children: IndexMap::new(),
        }
    }

    /// A leaf carrying only token text and no kind.
    pub(crate) fn pure_token(text: impl Into<String>) -> Self {
        Self {
            token: Some(text.into()),
            ..Self::new(String::new())
        }
    }

    /// Returns the node kind.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Returns the token text of a leaf, if any.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Returns the source position, if known.
    #[must_use]
    pub const fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    /// Returns the scalar properties in native field order.
    #[must_use]
    pub const fn properties(&self) -> &IndexMap<String, Scalar> {
        &self.properties
    }

    /// Returns a single property.
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&Scalar> {
        self.properties.get(key)
    }

    /// Returns the child slots in native field order.
    #[must_use]
    pub const fn children(&self) -> &IndexMap<String, Slot> {
        &self.children
    }

    /// Returns a single child slot.
    #[must_use]
    pub fn slot(&self, name: &str) -> Option<&Slot> {
        self.children.get(name)
    }

    /// Returns the child held by a single slot.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&Node> {
        self.slot(name).and_then(Slot::as_single)
    }

    /// Returns the children held by a sequence slot.
    #[must_use]
    pub fn sequence(&self, name: &str) -> Option<&[Node]> {
        self.slot(name).and_then(Slot::as_sequence)
    }

    /// Returns whether this node is a kind-less token leaf.
    #[must_use]
    pub fn is_pure_token(&self) -> bool {
        self.kind.is_empty()
            && self.token.is_some()
            && self.properties.is_empty()
            && self.children.is_empty()
    }

    /// Iterates over this node and all descendants in document order.
    #[must_use]
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    /// Returns the paths of all nodes whose kind is one of `kinds`.
    ///
    /// Paths are listed in document order.
    #[must_use]
    pub fn find_kinds(&self, kinds: &[&str]) -> Vec<NodePath> {
        let mut found = Vec::new();
        let mut path = NodePath::root();
        collect_kinds(self, kinds, &mut path, &mut found);
        found
    }

    pub(crate) fn set_kind(&mut self, kind: impl Into<String>) {
        self.kind = kind.into();
    }

    pub(crate) fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    pub(crate) const fn set_position(&mut self, position: Option<Position>) {
        self.position = position;
    }

    pub(crate) const fn position_mut(&mut self) -> Option<&mut Position> {
        self.position.as_mut()
    }

    pub(crate) const fn properties_mut(&mut self) -> &mut IndexMap<String, Scalar> {
        &mut self.properties
    }

    pub(crate) const fn children_mut(&mut self) -> &mut IndexMap<String, Slot> {
        &mut self.children
    }

    pub(crate) fn take_children(&mut self) -> IndexMap<String, Slot> {
        std::mem::take(&mut self.children)
    }
}

fn collect_kinds(node: &Node, kinds: &[&str], path: &mut NodePath, found: &mut Vec<NodePath>) {
    if kinds.contains(&node.kind()) {
        found.push(path.clone());
    }

    for (name, slot) in node.children() {
        path.push_field(name);
        match slot {
            Slot::Single(child) => collect_kinds(child, kinds, path, found),
            Slot::Sequence(nodes) => {
                for (index, child) in nodes.iter().enumerate() {
                    path.push_index(index);
                    collect_kinds(child, kinds, path, found);
                    path.pop();
                }
            }
        }
        path.pop();
    }
}

/// Depth-first iterator over a node and its descendants.
#[derive(Debug)]
pub struct Descendants<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        // Reversed so the first field's first child is popped next.
        for slot in node.children.values().rev() {
            self.stack.extend(slot.as_slice().iter().rev());
        }
        Some(node)
    }
}
