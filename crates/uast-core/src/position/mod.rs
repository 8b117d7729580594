//! Line and column resolution from source offsets.
//!
//! Native parsers frequently report only offsets, or report line and column
//! numbers in a unit that does not match the consumer's expectations. The
//! [`Positioner`] walks a converted tree in document order and derives
//! one-based line and column numbers from the source bytes.
//!
//! Offsets are byte indices into the source buffer. Columns are counted in
//! the configured [`OffsetUnit`], which must match the unit the native parser
//! used; a mismatch silently shifts columns on lines holding multi-byte
//! characters.

mod cursor;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::NormalizeError;
use crate::node::{Node, Point, Position, Slot};
use crate::path::NodePath;

use self::cursor::LineCursor;

/// Tracing target for position resolution.
const POSITION_TARGET: &str = "uast_core::position";

/// Encoding of the source buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Encoding {
    /// UTF-8.
    #[default]
    Utf8,
    /// UTF-16, little endian.
    Utf16Le,
    /// UTF-16, big endian.
    Utf16Be,
}

impl Encoding {
    /// Returns the width of one code unit in bytes.
    #[must_use]
    pub const fn unit_width(self) -> usize {
        match self {
            Self::Utf8 => 1,
            Self::Utf16Le | Self::Utf16Be => 2,
        }
    }

    /// Combines a two-byte chunk into a UTF-16 code unit.
    fn decode_unit(self, bytes: &[u8]) -> u16 {
        match (self, bytes) {
            (Self::Utf16Le, [low, high]) | (Self::Utf16Be, [high, low]) => {
                (u16::from(*high) << 8) | u16::from(*low)
            }
            _ => 0,
        }
    }
}

/// Unit in which columns are counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OffsetUnit {
    /// Raw bytes of the source buffer.
    Byte,
    /// Code units of the source encoding (bytes for UTF-8, 16-bit units for
    /// UTF-16).
    CodeUnit,
    /// Unicode scalar values.
    CodePoint,
}

/// Whether existing line and column numbers are trusted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolveMode {
    /// Only points without a line and column are resolved.
    #[default]
    FillMissing,
    /// Every point is resolved, replacing what the native parser reported.
    Recompute,
}

/// Derives line and column numbers from node offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Positioner {
    unit: OffsetUnit,
    mode: ResolveMode,
}

impl Positioner {
    /// Creates a positioner counting columns in `unit`.
    #[must_use]
    pub const fn new(unit: OffsetUnit) -> Self {
        Self {
            unit,
            mode: ResolveMode::FillMissing,
        }
    }

    /// Sets the resolution mode.
    #[must_use]
    pub const fn with_mode(mut self, mode: ResolveMode) -> Self {
        self.mode = mode;
        self
    }

    /// Returns the column counting unit.
    #[must_use]
    pub const fn unit(&self) -> OffsetUnit {
        self.unit
    }

    /// Returns the resolution mode.
    #[must_use]
    pub const fn mode(&self) -> ResolveMode {
        self.mode
    }

    /// Resolves line and column numbers for every positioned node.
    ///
    /// Start points are resolved before a node's children and end points
    /// after them, so lookups follow the source from front to back.
    ///
    /// # Errors
    ///
    /// Returns [`NormalizeError::OffsetOutOfRange`] when an offset exceeds
    /// the length of `source`, and [`NormalizeError::InvalidPosition`] when
    /// an offset splits a UTF-16 code unit.
    pub fn resolve(
        &self,
        mut node: Node,
        source: &[u8],
        encoding: Encoding,
    ) -> Result<Node, NormalizeError> {
        let mut walker = Walker {
            mode: self.mode,
            cursor: LineCursor::new(source, encoding, self.unit),
            path: NodePath::root(),
            resolved: 0,
        };
        walker.visit(&mut node)?;
        debug!(
            target: POSITION_TARGET,
            resolved = walker.resolved,
            lines = walker.cursor.lines_seen(),
            bytes = source.len(),
            "resolved positions"
        );
        Ok(node)
    }
}

struct Walker<'s> {
    mode: ResolveMode,
    cursor: LineCursor<'s>,
    path: NodePath,
    resolved: usize,
}

impl Walker<'_> {
    fn visit(&mut self, node: &mut Node) -> Result<(), NormalizeError> {
        if let Some(position) = node.position_mut() {
            let start = self.point(*position.start(), "start")?;
            *position.start_mut() = start;
        }

        for (name, slot) in node.children_mut().iter_mut() {
            self.path.push_field(name);
            match slot {
                Slot::Single(child) => self.visit(child)?,
                Slot::Sequence(children) => {
                    for (index, child) in children.iter_mut().enumerate() {
                        self.path.push_index(index);
                        self.visit(child)?;
                        self.path.pop();
                    }
                }
            }
            self.path.pop();
        }

        if let Some(end) = node.position_mut().and_then(Position::end_mut) {
            *end = self.point(*end, "end")?;
        }
        Ok(())
    }

    fn point(&mut self, point: Point, field: &str) -> Result<Point, NormalizeError> {
        if self.mode == ResolveMode::FillMissing && point.is_resolved() {
            self.cursor.check(point.offset(), &self.path, field)?;
            return Ok(point);
        }
        let (line, column) = self.cursor.locate(point.offset(), &self.path, field)?;
        self.resolved += 1;
        Ok(point.with_line_column(Some(line), Some(column)))
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};
    use serde_json::{Value, json};

    use super::*;
    use crate::convert::ObjectToNode;

    #[fixture]
    fn to_node() -> ObjectToNode {
        ObjectToNode::new("kind")
            .offset_key("pos")
            .end_offset_key("end")
            .line_key("line")
            .column_key("col")
            .token_key("text")
    }

    fn convert(to_node: &ObjectToNode, value: Value) -> Node {
        to_node.convert(value).expect("convert")
    }

    fn start(node: &Node) -> (Option<u32>, Option<u32>) {
        let point = node.position().map(Position::start).expect("position");
        (point.line(), point.column())
    }

    #[rstest]
    fn resolves_nested_points(to_node: ObjectToNode) {
        let source = b"let a;\nfoo(bar);\n";
        let tree = convert(
            &to_node,
            json!({
                "kind": "SourceFile", "pos": 0, "end": 17,
                "statements": [
                    {"kind": "VariableStatement", "pos": 0, "end": 6},
                    {"kind": "ExpressionStatement", "pos": 7, "end": 16,
                     "expression": {"kind": "Identifier", "pos": 11, "end": 14, "text": "bar"}}
                ]
            }),
        );
        let node = Positioner::new(OffsetUnit::Byte)
            .resolve(tree, source, Encoding::Utf8)
            .expect("resolve");

        assert_eq!(start(&node), (Some(1), Some(1)));
        let end = node.position().and_then(Position::end).copied();
        assert_eq!(end, Some(Point::new(17, 3, 1)));

        let statements = node.sequence("statements").expect("statements");
        let call = statements.get(1).expect("second statement");
        assert_eq!(start(call), (Some(2), Some(1)));
        let name = call.child("expression").expect("expression");
        assert_eq!(start(name), (Some(2), Some(5)));
    }

    #[rstest]
    #[case(ResolveMode::FillMissing, (Some(9), Some(9)))]
    #[case(ResolveMode::Recompute, (Some(1), Some(3)))]
    fn mode_controls_reported_points(
        to_node: ObjectToNode,
        #[case] mode: ResolveMode,
        #[case] expected: (Option<u32>, Option<u32>),
    ) {
        let tree = convert(&to_node, json!({"kind": "A", "pos": 2, "line": 9, "col": 9}));
        let node = Positioner::new(OffsetUnit::Byte)
            .with_mode(mode)
            .resolve(tree, b"abcdef", Encoding::Utf8)
            .expect("resolve");
        assert_eq!(start(&node), expected);
    }

    #[rstest]
    fn end_past_buffer_is_out_of_range(to_node: ObjectToNode) {
        let tree = convert(
            &to_node,
            json!({"kind": "SourceFile", "pos": 0, "end": 4,
                   "body": {"kind": "Block", "pos": 1, "end": 9}}),
        );
        let err = Positioner::new(OffsetUnit::Byte)
            .resolve(tree, b"abcd", Encoding::Utf8)
            .expect_err("out of range");
        match err {
            NormalizeError::OffsetOutOfRange { path, offset, len } => {
                assert_eq!(path.to_string(), "$.body");
                assert_eq!(offset, 9);
                assert_eq!(len, 4);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[rstest]
    #[case::past_the_end(Encoding::Utf8, json!({"kind": "A", "pos": 500, "line": 1, "col": 1}))]
    #[case::split_unit(Encoding::Utf16Le, json!({"kind": "A", "pos": 1, "line": 1, "col": 1}))]
    fn reported_points_are_still_checked(
        to_node: ObjectToNode,
        #[case] encoding: Encoding,
        #[case] raw: Value,
    ) {
        let tree = convert(&to_node, raw);
        let err = Positioner::new(OffsetUnit::CodeUnit)
            .resolve(tree, b"abcd", encoding)
            .expect_err("offset should be rejected");
        match (encoding, err) {
            (Encoding::Utf8, NormalizeError::OffsetOutOfRange { offset, len, .. }) => {
                assert_eq!((offset, len), (500, 4));
            }
            (Encoding::Utf16Le, NormalizeError::InvalidPosition { field, .. }) => {
                assert_eq!(field, "start");
            }
            (_, other) => panic!("unexpected error: {other}"),
        }
    }

    #[rstest]
    fn nodes_without_positions_are_skipped(to_node: ObjectToNode) {
        let tree = convert(&to_node, json!({"kind": "A", "child": {"kind": "B"}}));
        let node = Positioner::new(OffsetUnit::CodePoint)
            .resolve(tree, b"", Encoding::Utf8)
            .expect("resolve");
        assert!(node.descendants().all(|n| n.position().is_none()));
    }

    #[rstest]
    fn sibling_lines_never_decrease(to_node: ObjectToNode) {
        let source = b"a\nbb\n\nccc\nd";
        let items: Vec<Value> = [0, 2, 5, 6, 10]
            .into_iter()
            .map(|pos| json!({"kind": "Item", "pos": pos}))
            .collect();
        let tree = convert(&to_node, json!({"kind": "List", "items": items}));
        let node = Positioner::new(OffsetUnit::Byte)
            .resolve(tree, source, Encoding::Utf8)
            .expect("resolve");

        let lines: Vec<u32> = node
            .sequence("items")
            .expect("items")
            .iter()
            .filter_map(|item| start(item).0)
            .collect();
        assert_eq!(lines, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn decodes_both_utf16_byte_orders() {
        assert_eq!(Encoding::Utf16Le.decode_unit(&[0x0A, 0x00]), 0x000A);
        assert_eq!(Encoding::Utf16Be.decode_unit(&[0x00, 0x0A]), 0x000A);
        assert_eq!(Encoding::Utf16Be.decode_unit(&[0xD8, 0x3D]), 0xD83D);
    }
}
