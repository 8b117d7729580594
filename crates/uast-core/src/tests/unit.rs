//! Unit tests spanning several pipeline stages.

use rstest::{fixture, rstest};
use serde_json::{Value, json};

use crate::{
    Action, Encoding, FlagsToSet, Mapping, Mode, NodePattern, NodeTemplate, NormalizeError,
    ObjectToNode, OffsetUnit, Phase, Pipeline, Positioner, SlotTemplate, Stage, ValueTemplate,
};

#[fixture]
fn pipeline() -> Pipeline {
    let to_node = ObjectToNode::new("kind")
        .offset_key("pos")
        .end_offset_key("end")
        .token_key("text")
        .with_fixup(FlagsToSet::new("flags"));
    let preprocess = Phase::new("preprocessing").with(Mapping::new(
        "escaped_identifiers",
        NodePattern::kind("Identifier").bind_property("escapedText", "name"),
        Action::Edit(
            NodeTemplate::keep()
                .token(ValueTemplate::Var("name".to_owned()))
                .remove_property("escapedText"),
        ),
    ));
    let semantic = Phase::new("semantic")
        .with(Mapping::new(
            "identifiers",
            NodePattern::kind("Identifier"),
            Action::Edit(NodeTemplate::keep().kind(ValueTemplate::from("uast:Identifier"))),
        ))
        .with(Mapping::new(
            "functions",
            NodePattern::kind("FunctionDecl").bind_slot("name", "name"),
            Action::Build(
                NodeTemplate::new("uast:Declaration")
                    .set_property("declaration_kind", "function")
                    .set_slot("name", SlotTemplate::Var("name".to_owned())),
            ),
        ));
    Pipeline::builder(to_node, Positioner::new(OffsetUnit::CodePoint))
        .preprocess(preprocess)
        .normalize(semantic)
        .build()
}

fn native() -> Value {
    json!({
        "kind": "SourceFile", "pos": 0, "end": 17,
        "statements": [{
            "kind": "FunctionDecl", "pos": 0, "end": 17,
            "name": {"kind": "Identifier", "pos": 9, "end": 12, "escapedText": "foo"}
        }]
    })
}

const SOURCE: &[u8] = b"function foo() {}";

#[rstest]
#[case(Mode::Native, "Identifier", None)]
#[case(Mode::Preprocessed, "Identifier", Some("foo"))]
#[case(Mode::Semantic, "uast:Identifier", Some("foo"))]
fn modes_stop_after_their_stage(
    pipeline: Pipeline,
    #[case] mode: Mode,
    #[case] expected_kind: &str,
    #[case] expected_token: Option<&str>,
) {
    let tree = pipeline
        .run_mode(native(), SOURCE, Encoding::Utf8, mode)
        .expect("run");
    let name = tree
        .sequence("statements")
        .and_then(<[crate::Node]>::first)
        .and_then(|statement| statement.child("name"))
        .expect("name");
    assert_eq!(name.kind(), expected_kind);
    assert_eq!(name.token(), expected_token);
}

#[rstest]
fn semantic_output_carries_resolved_positions(pipeline: Pipeline) {
    let tree = pipeline.run(native(), SOURCE, Encoding::Utf8).expect("run");
    let declaration = tree
        .sequence("statements")
        .and_then(<[crate::Node]>::first)
        .expect("declaration");
    assert_eq!(declaration.kind(), "uast:Declaration");
    let name = declaration.child("name").expect("name");
    let start = name.position().map(|position| *position.start());
    assert_eq!(start.and_then(|point| point.column()), Some(10));
}

#[rstest]
fn runs_are_byte_identical(pipeline: Pipeline) {
    let first = pipeline.run(native(), SOURCE, Encoding::Utf8).expect("first");
    let second = pipeline.run(native(), SOURCE, Encoding::Utf8).expect("second");
    assert_eq!(
        serde_json::to_vec(&first).expect("serialize"),
        serde_json::to_vec(&second).expect("serialize")
    );
}

#[rstest]
fn semantic_phase_is_idempotent(pipeline: Pipeline) {
    let once = pipeline.run(native(), SOURCE, Encoding::Utf8).expect("run");
    let again = pipeline.normalizers().apply(once.clone()).expect("reapply");
    assert_eq!(once, again);
}

#[rstest]
#[case::fixup(json!({"kind": "A", "flags": [true]}), Stage::Fixup)]
#[case::convert(json!({"kind": "A", "items": [1]}), Stage::Convert)]
#[case::position(json!({"kind": "A", "pos": 0, "end": 99}), Stage::Position)]
fn errors_report_their_stage(pipeline: Pipeline, #[case] raw: Value, #[case] stage: Stage) {
    let err = pipeline
        .run(raw, SOURCE, Encoding::Utf8)
        .expect_err("run should fail");
    assert_eq!(err.stage(), stage);
}

#[rstest]
fn rule_failures_abort_the_document() {
    let to_node = ObjectToNode::new("kind");
    let pipeline = Pipeline::builder(to_node, Positioner::new(OffsetUnit::Byte))
        .normalize(Phase::new("semantic").with(Mapping::new(
            "unwrap",
            NodePattern::kind("Wrapper"),
            Action::Replace("inner".to_owned()),
        )))
        .build();
    let err = pipeline
        .run(json!({"kind": "Root", "child": {"kind": "Wrapper"}}), b"", Encoding::Utf8)
        .expect_err("unbound replacement");
    assert!(matches!(err, NormalizeError::RuleApplication { .. }));
    assert_eq!(err.path().to_string(), "$.child");
    assert_eq!(
        err.to_string(),
        "rule #0 'unwrap' of phase 'semantic' failed at $.child: binding 'inner' is not bound"
    );
}

#[test]
fn pipeline_is_shareable_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Pipeline>();
}

#[rstest]
fn find_kinds_lists_remaining_native_kinds(pipeline: Pipeline) {
    let native_tree = pipeline
        .run_mode(native(), SOURCE, Encoding::Utf8, Mode::Native)
        .expect("run");
    let paths: Vec<String> = native_tree
        .find_kinds(&["Identifier", "FunctionDecl"])
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(paths, vec!["$.statements[0]", "$.statements[0].name"]);

    let semantic = pipeline.run(native(), SOURCE, Encoding::Utf8).expect("run");
    assert!(semantic.find_kinds(&["Identifier", "FunctionDecl"]).is_empty());
}

#[rstest]
#[case::bytes(OffsetUnit::Byte, 5)]
#[case::code_points(OffsetUnit::CodePoint, 4)]
fn columns_follow_the_configured_unit(#[case] unit: OffsetUnit, #[case] expected_column: u32) {
    let to_node = ObjectToNode::new("kind").offset_key("pos");
    let pipeline = Pipeline::builder(to_node, Positioner::new(unit)).build();
    let tree = pipeline
        .run(json!({"kind": "A", "pos": 4}), "é=xy".as_bytes(), Encoding::Utf8)
        .expect("run");
    assert_eq!(pipeline.positioner().unit(), unit);
    let column = tree.position().and_then(|position| position.start().column());
    assert_eq!(column, Some(expected_column));
}
