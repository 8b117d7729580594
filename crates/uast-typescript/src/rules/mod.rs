//! Conversion settings and rewrite rules for TypeScript compiler trees.
//!
//! The native parser serializes the TypeScript compiler AST with a string
//! `kind`, byte offsets in `pos`/`end` and modifier names in a `flags`
//! array. Identifiers keep their name in `escapedText` rather than a token
//! field, which the preprocessing phase repairs before the semantic rules
//! run. The compiler escapes names starting with `__` by prepending one more
//! underscore; the token drops it again.

use uast_core::{
    Action, FlagsToSet, HasStringField, Mapping, NodePattern, NodeTemplate, ObjectToNode,
    OffsetUnit, PREPROCESSING_PHASE, Phase, Pipeline, Positioner, SEMANTIC_PHASE,
    ScalarTemplate, TokenTest, ValueTemplate,
};

/// Field holding the native node kind.
pub const KIND_KEY: &str = "kind";

/// Kind given to every unified declaration.
pub const DECLARATION_KIND: &str = "uast:Declaration";

/// Column unit used when none is configured.
///
/// Code units are 16 bits wide for UTF-16 sources, which matches the
/// compiler's string indices. For UTF-8 sources a code unit is a byte.
pub const DEFAULT_UNIT: OffsetUnit = OffsetUnit::CodeUnit;

/// Declaration kinds and the `declaration_kind` each one maps to.
const DECLARATIONS: &[(&str, &str)] = &[
    ("FunctionDecl", "function"),
    ("FunctionDeclaration", "function"),
    ("MethodDeclaration", "method"),
    ("ClassDeclaration", "class"),
    ("InterfaceDeclaration", "interface"),
    ("TypeAliasDeclaration", "type_alias"),
    ("EnumDeclaration", "enum"),
];

/// Leaf kinds renamed one to one.
const LEAVES: &[(&str, &str)] = &[
    ("Identifier", "uast:Identifier"),
    ("StringLiteral", "uast:String"),
    ("NumericLiteral", "uast:Number"),
];

/// Native kinds the semantic phase must leave behind.
pub const SEMANTIC_BLACKLIST: &[&str] = &[
    "FunctionDecl",
    "FunctionDeclaration",
    "MethodDeclaration",
    "ClassDeclaration",
    "InterfaceDeclaration",
    "TypeAliasDeclaration",
    "EnumDeclaration",
    "Identifier",
    "PrivateIdentifier",
    "StringLiteral",
    "NumericLiteral",
];

const IDENTIFIERS: [&str; 2] = ["Identifier", "PrivateIdentifier"];

/// Converter settings for the compiler's JSON output.
#[must_use]
pub fn to_node() -> ObjectToNode {
    ObjectToNode::new(KIND_KEY)
        .offset_key("pos")
        .end_offset_key("end")
        .line_key("line")
        .column_key("col")
        .token_key("text")
        .with_predicate(HasStringField::new(KIND_KEY))
        .with_fixup(FlagsToSet::new("flags"))
}

/// Structural repairs applied before the semantic rules.
#[must_use]
pub fn preprocessors() -> Phase {
    Phase::new(PREPROCESSING_PHASE)
        .with(Mapping::new(
            "escaped_text_token",
            NodePattern::one_of(IDENTIFIERS)
                .token(TokenTest::Absent)
                .bind_property("escapedText", "name"),
            Action::Edit(
                NodeTemplate::keep()
                    .token(ValueTemplate::PrefixReplaced {
                        var: "name".to_owned(),
                        from: "___".to_owned(),
                        to: "__".to_owned(),
                    })
                    .remove_property("escapedText"),
            ),
        ))
        .with(Mapping::new(
            "escaped_text_duplicate",
            NodePattern::one_of(IDENTIFIERS).has_property("escapedText"),
            Action::Edit(NodeTemplate::keep().remove_property("escapedText")),
        ))
}

/// Semantic rules mapping compiler kinds onto shared shapes.
#[must_use]
pub fn normalizers() -> Phase {
    let declarations = DECLARATIONS.iter().map(|&(native, declaration_kind)| {
        Mapping::new(
            native,
            NodePattern::kind(native),
            Action::Edit(
                NodeTemplate::keep()
                    .kind(ValueTemplate::from(DECLARATION_KIND))
                    .set_property("declaration_kind", declaration_kind)
                    .set_property("native_kind", ScalarTemplate::MatchedKind)
                    .rename_slot("parameters", "params")
                    .rename_slot("members", "body"),
            ),
        )
    });
    let leaves = LEAVES.iter().map(|&(native, semantic)| {
        Mapping::new(
            native,
            NodePattern::kind(native),
            Action::Edit(NodeTemplate::keep().kind(ValueTemplate::from(semantic))),
        )
    });

    Phase::new(SEMANTIC_PHASE)
        .with_all(declarations)
        .with_all(leaves)
        .with(Mapping::new(
            "PrivateIdentifier",
            NodePattern::kind("PrivateIdentifier"),
            Action::Edit(
                NodeTemplate::keep()
                    .kind(ValueTemplate::from("uast:Identifier"))
                    .set_property("private", true),
            ),
        ))
}

/// The assembled TypeScript pipeline, counting columns in `unit`.
#[must_use]
pub fn pipeline(unit: OffsetUnit) -> Pipeline {
    Pipeline::builder(to_node(), Positioner::new(unit))
        .preprocess(preprocessors())
        .normalize(normalizers())
        .build()
}
