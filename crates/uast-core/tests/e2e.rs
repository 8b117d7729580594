//! End-to-end tests for uast-core using insta for snapshot testing.
//!
//! These tests drive the public pipeline API from raw native trees to
//! semantic trees, covering happy and unhappy paths.

use insta::assert_snapshot;
use rstest::{fixture, rstest};
use serde_json::{Value, json};

use uast_core::{
    Action, Encoding, FlagsToSet, Mapping, Node, NodePattern, NodeTemplate, NormalizeError,
    ObjectToNode, OffsetUnit, Phase, Pipeline, Point, Positioner, ScalarTemplate, Slot,
    ValueTemplate,
};

// =============================================================================
// Helpers
// =============================================================================

#[fixture]
fn pipeline() -> Pipeline {
    let to_node = ObjectToNode::new("kind")
        .offset_key("pos")
        .end_offset_key("end")
        .token_key("text")
        .with_fixup(FlagsToSet::new("flags"));
    let semantic = Phase::new("semantic").with(Mapping::new(
        "declarations",
        NodePattern::one_of(["FunctionDecl", "ClassDecl"]),
        Action::Edit(
            NodeTemplate::keep()
                .kind(ValueTemplate::from("uast:Declaration"))
                .set_property("native_kind", ScalarTemplate::MatchedKind),
        ),
    ));
    Pipeline::builder(to_node, Positioner::new(OffsetUnit::CodeUnit))
        .normalize(semantic)
        .build()
}

fn program() -> Value {
    json!({
        "kind": "Program", "pos": 0, "end": 20,
        "children": [{
            "kind": "FunctionDecl", "pos": 0, "end": 20, "flags": ["export"],
            "name": {"kind": "Identifier", "pos": 9, "end": 12, "text": "foo"}
        }]
    })
}

const SOURCE: &[u8] = b"export function foo ";

fn point(point: &Point) -> String {
    let line = point.line().map_or_else(|| "?".to_owned(), |line| line.to_string());
    let column = point
        .column()
        .map_or_else(|| "?".to_owned(), |column| column.to_string());
    format!("{line}:{column}")
}

fn outline(node: &Node) -> String {
    let mut out = String::new();
    write_node(&mut out, "", node, 0);
    out.trim_end().to_owned()
}

fn write_node(out: &mut String, label: &str, node: &Node, depth: usize) {
    out.push_str(&"  ".repeat(depth));
    out.push_str(label);
    out.push_str(if node.kind().is_empty() { "<token>" } else { node.kind() });
    if let Some(token) = node.token() {
        out.push_str(&format!(" '{token}'"));
    }
    if let Some(position) = node.position() {
        out.push_str(&format!(" {}", point(position.start())));
        if let Some(end) = position.end() {
            out.push_str(&format!("-{}", point(end)));
        }
    }
    for (key, value) in node.properties() {
        let text = value.to_text().unwrap_or_else(|| "null".to_owned());
        out.push_str(&format!(" {key}={text}"));
    }
    out.push('\n');

    for (name, slot) in node.children() {
        match slot {
            Slot::Single(child) => write_node(out, &format!("{name}: "), child, depth + 1),
            Slot::Sequence(children) => {
                for (index, child) in children.iter().enumerate() {
                    write_node(out, &format!("{name}[{index}]: "), child, depth + 1);
                }
            }
        }
    }
}

// =============================================================================
// Happy Path
// =============================================================================

#[rstest]
fn exported_function_becomes_a_declaration(pipeline: Pipeline) {
    let tree = pipeline
        .run(program(), SOURCE, Encoding::Utf8)
        .unwrap_or_else(|err| panic!("run: {err}"));

    assert_snapshot!(outline(&tree), @r"
    Program 1:1-1:21
      children[0]: uast:Declaration 1:1-1:21 export=true native_kind=FunctionDecl
        name: Identifier 'foo' 1:10-1:13
    ");
}

#[rstest]
fn serialized_tree_keeps_native_field_order(pipeline: Pipeline) {
    let tree = pipeline
        .run(
            json!({"kind": "Identifier", "pos": 0, "end": 3, "text": "foo", "optional": false}),
            b"foo",
            Encoding::Utf8,
        )
        .unwrap_or_else(|err| panic!("run: {err}"));
    let json = serde_json::to_string(&tree).unwrap_or_else(|err| panic!("serialize: {err}"));

    assert_snapshot!(json, @r#"{"kind":"Identifier","token":"foo","position":{"start":{"offset":0,"line":1,"column":1},"end":{"offset":3,"line":1,"column":4}},"properties":{"optional":false}}"#);
}

#[rstest]
fn multi_line_utf16_source_resolves_code_unit_columns(pipeline: Pipeline) {
    let text = "let é;\nclass Ünïcode {}\n";
    let source: Vec<u8> = text
        .encode_utf16()
        .flat_map(|unit| {
            let low = u8::try_from(unit & 0x00FF).unwrap_or_default();
            let high = u8::try_from(unit >> 8).unwrap_or_default();
            [low, high]
        })
        .collect();
    // Offsets are bytes into the UTF-16 buffer.
    let raw = json!({
        "kind": "Program", "pos": 0, "end": 48,
        "statements": [
            {"kind": "VariableStatement", "pos": 0, "end": 12},
            {"kind": "ClassDecl", "pos": 14, "end": 46,
             "name": {"kind": "Identifier", "pos": 26, "end": 40, "text": "Ünïcode"}}
        ]
    });

    let tree = pipeline
        .run(raw, &source, Encoding::Utf16Le)
        .unwrap_or_else(|err| panic!("run: {err}"));

    assert_snapshot!(outline(&tree), @r"
    Program 1:1-3:1
      statements[0]: VariableStatement 1:1-1:7
      statements[1]: uast:Declaration 2:1-2:17 native_kind=ClassDecl
        name: Identifier 'Ünïcode' 2:7-2:14
    ");
}

#[rstest]
fn sibling_positions_follow_the_source(pipeline: Pipeline) {
    let source = b"a;\nb;\nc;\n";
    let raw = json!({
        "kind": "Program", "pos": 0, "end": 9,
        "statements": [
            {"kind": "ExpressionStatement", "pos": 0, "end": 2},
            {"kind": "ExpressionStatement", "pos": 3, "end": 5},
            {"kind": "ExpressionStatement", "pos": 6, "end": 8}
        ]
    });
    let tree = pipeline
        .run(raw, source, Encoding::Utf8)
        .unwrap_or_else(|err| panic!("run: {err}"));
    let statements = tree.sequence("statements").unwrap_or_default();

    let starts: Vec<(usize, Option<u32>)> = statements
        .iter()
        .filter_map(Node::position)
        .map(|position| (position.start().offset(), position.start().line()))
        .collect();
    assert!(starts.windows(2).all(|pair| match pair {
        [(left_offset, left_line), (right_offset, right_line)] =>
            left_offset <= right_offset && left_line <= right_line,
        _ => true,
    }));
    assert_eq!(starts.len(), 3);
}

#[rstest]
fn repeated_runs_are_byte_identical(pipeline: Pipeline) {
    let outputs: Vec<String> = (0..3)
        .map(|_| {
            let tree = pipeline
                .run(program(), SOURCE, Encoding::Utf8)
                .unwrap_or_else(|err| panic!("run: {err}"));
            serde_json::to_string(&tree).unwrap_or_else(|err| panic!("serialize: {err}"))
        })
        .collect();
    assert!(outputs.windows(2).all(|pair| pair.first() == pair.last()));
}

// =============================================================================
// Unhappy Path
// =============================================================================

#[rstest]
fn end_offset_past_the_source_is_out_of_range(pipeline: Pipeline) {
    let mut raw = program();
    if let Some(end) = raw.pointer_mut("/children/0/end") {
        *end = json!(64);
    }

    let err = pipeline
        .run(raw, SOURCE, Encoding::Utf8)
        .expect_err("offset past the source");
    assert!(matches!(err, NormalizeError::OffsetOutOfRange { .. }));
    assert_snapshot!(err.to_string(), @"offset 64 at $.children[0] exceeds source length 20");
}

#[rstest]
#[case::numeric_flag(
    json!({"kind": "Program", "flags": ["export", 1]}),
    "fixup 'flags_to_set' failed at $: field 'flags': entry 1 is not a string: 1"
)]
#[case::mixed_sequence(
    json!({"kind": "Program", "children": [{"kind": "A"}, "b"]}),
    "invalid shape at $.children[1]: sequences may only hold nodes, found a string"
)]
#[case::empty_kind(
    json!({"kind": "Program", "body": {"kind": ""}}),
    "missing kind field 'kind' at $.body"
)]
fn malformed_input_is_rejected(pipeline: Pipeline, #[case] raw: Value, #[case] message: &str) {
    let err = pipeline
        .run(raw, SOURCE, Encoding::Utf8)
        .expect_err("malformed input");
    assert_eq!(err.to_string(), message);
}
