//! Locations of nodes and records inside a tree.
//!
//! Paths are rendered as `$` for the root followed by `.field` and `[index]`
//! segments, for example `$.statements[0].name`.

use std::fmt;

/// One step from a parent to a child.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// A named field slot.
    Field(String),
    /// A position inside a sequence slot.
    Index(usize),
}

/// A path from the root of a tree to one of its nodes.
///
/// Traversals keep a single path and push/pop segments as they descend, so
/// a path is only cloned when an error needs to carry it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NodePath {
    segments: Vec<PathSegment>,
}

impl NodePath {
    /// Returns the path of the root node.
    #[must_use]
    pub const fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Returns the segments from the root downwards.
    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Returns whether this is the root path.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns a copy of this path extended by a field segment.
    #[must_use]
    pub fn join_field(&self, name: &str) -> Self {
        let mut next = self.clone();
        next.push_field(name);
        next
    }

    /// Returns a copy of this path extended by an index segment.
    #[must_use]
    pub fn join_index(&self, index: usize) -> Self {
        let mut next = self.clone();
        next.push_index(index);
        next
    }

    pub(crate) fn push_field(&mut self, name: &str) {
        self.segments.push(PathSegment::Field(name.to_owned()));
    }

    pub(crate) fn push_index(&mut self, index: usize) {
        self.segments.push(PathSegment::Index(index));
    }

    pub(crate) fn pop(&mut self) {
        self.segments.pop();
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("$")?;
        for segment in &self.segments {
            match segment {
                PathSegment::Field(name) => write!(f, ".{name}")?,
                PathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}
