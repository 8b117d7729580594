//! Unit tests for the native response envelope.

use rstest::rstest;
use serde_json::json;

use super::*;

#[test]
fn ok_response_yields_the_tree() {
    let response = NativeResponse::from_slice(
        br#"{"status": "ok", "ast": {"kind": "SourceFile"}, "errors": []}"#,
    )
    .expect("decode");
    assert_eq!(response.status(), Status::Ok);
    assert_eq!(
        response.into_ast().expect("ast"),
        json!({"kind": "SourceFile"})
    );
}

#[test]
fn errors_field_is_optional() {
    let response =
        NativeResponse::from_slice(br#"{"status": "ok", "ast": {}}"#).expect("decode");
    assert!(response.errors().is_empty());
}

#[rstest]
#[case::error(
    br#"{"status": "error", "errors": [{"message": "';' expected."}, {"message": "Unexpected token."}]}"#.as_slice(),
    "native parser reported error: ';' expected.; Unexpected token."
)]
#[case::fatal(br#"{"status": "fatal"}"#.as_slice(), "native parser reported fatal: no diagnostics")]
#[case::missing_ast(br#"{"status": "ok"}"#.as_slice(), "native parser reported ok without an ast")]
fn unusable_responses_are_rejected(#[case] bytes: &[u8], #[case] expected: &str) {
    let response = NativeResponse::from_slice(bytes).expect("decode");
    let err = response.into_ast().expect_err("unusable response");
    assert_eq!(err.to_string(), expected);
}

#[test]
fn error_response_keeps_a_partial_tree_out() {
    let response = NativeResponse::from_slice(
        br#"{"status": "error", "ast": {"kind": "SourceFile"}, "errors": [{"message": "boom"}]}"#,
    )
    .expect("decode");
    assert!(response.ast().is_some());
    assert!(matches!(
        response.into_ast(),
        Err(NativeError::Rejected { status: Status::Error, .. })
    ));
}

#[rstest]
#[case::not_json(b"not json".as_slice())]
#[case::unknown_status(br#"{"status": "maybe"}"#.as_slice())]
#[case::missing_status(br#"{"ast": {}}"#.as_slice())]
fn malformed_envelopes_fail_to_decode(#[case] bytes: &[u8]) {
    let err = NativeResponse::from_slice(bytes).expect_err("malformed envelope");
    assert!(matches!(err, NativeError::Decode(_)));
    assert!(err.to_string().starts_with("failed to deserialise native response"));
}

#[test]
fn constructed_responses_serialize_like_the_parser() {
    let failure = NativeResponse::failure(Status::Fatal, vec![NativeMessage::new("crashed")]);
    assert_eq!(
        serde_json::to_value(&failure).expect("serialise"),
        json!({"status": "fatal", "errors": [{"message": "crashed"}]})
    );
    let ok = NativeResponse::ok(json!({"kind": "SourceFile"}));
    assert_eq!(ok.errors().len(), 0);
}

#[test]
fn status_parses_from_its_display_form() {
    for status in [Status::Ok, Status::Error, Status::Fatal] {
        assert_eq!(status.to_string().parse::<Status>().expect("parse"), status);
    }
}
