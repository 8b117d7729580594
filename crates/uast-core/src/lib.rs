//! Normalization of native parser trees into a language-neutral tree.
//!
//! A native parser hands over an untyped tree (records, sequences and
//! scalars) together with the source bytes it parsed. This crate turns that
//! into a [`Node`] tree in four stages:
//!
//! - **Field fixups** ([`Fixup`]) repair record shapes the generic converter
//!   cannot express, such as bare flag arrays.
//! - **Conversion** ([`ObjectToNode`]) lifts configured kind, token and
//!   position fields into canonical nodes.
//! - **Position resolution** ([`Positioner`]) derives line and column
//!   numbers from byte offsets.
//! - **Rewriting** ([`Phase`]) applies ordered pattern/action [`Mapping`]s,
//!   first a structural preprocessing phase and then a semantic phase that
//!   maps native kinds onto shared semantic shapes.
//!
//! [`Pipeline`] chains the stages. It is built once and reused for every
//! document; each run either yields a complete tree or the first
//! [`NormalizeError`] encountered.
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use uast_core::{
//!     Action, Encoding, FlagsToSet, Mapping, NodePattern, NodeTemplate, ObjectToNode,
//!     OffsetUnit, Phase, Pipeline, Positioner, ValueTemplate,
//! };
//!
//! let to_node = ObjectToNode::new("kind")
//!     .offset_key("pos")
//!     .end_offset_key("end")
//!     .token_key("text")
//!     .with_fixup(FlagsToSet::new("flags"));
//! let semantic = Phase::new("semantic").with(Mapping::new(
//!     "functions",
//!     NodePattern::kind("FunctionDecl"),
//!     Action::Edit(NodeTemplate::keep().kind(ValueTemplate::from("uast:Declaration"))),
//! ));
//! let pipeline = Pipeline::builder(to_node, Positioner::new(OffsetUnit::Byte))
//!     .normalize(semantic)
//!     .build();
//!
//! let tree = pipeline.run(
//!     json!({"kind": "FunctionDecl", "pos": 0, "end": 3, "flags": ["export"]}),
//!     b"f()",
//!     Encoding::Utf8,
//! )?;
//! assert_eq!(tree.kind(), "uast:Declaration");
//! # Ok::<(), uast_core::NormalizeError>(())
//! ```

mod convert;
mod error;
mod node;
mod path;
mod pipeline;
mod position;
mod rewrite;

pub use convert::{
    FieldNames, Fixup, FixupChain, FlagsToSet, FnFixup, HasStringField, NodePredicate,
    ObjectToNode, fixup_fn,
};
pub use error::{FixupError, NormalizeError, Stage};
pub use node::{Descendants, Node, Point, Position, Scalar, Slot};
pub use path::{NodePath, PathSegment};
pub use pipeline::{
    Mode, PREPROCESSING_PHASE, ParseModeError, Pipeline, PipelineBuilder, SEMANTIC_PHASE,
};
pub use position::{Encoding, OffsetUnit, Positioner, ResolveMode};
pub use rewrite::{
    Action, Captured, Captures, KindTest, Mapping, NodePattern, NodeTemplate, Phase,
    PositionSource, PropertyEdit, PropertyTest, ScalarTemplate, SlotEdit, SlotPattern,
    SlotTemplate, TokenTemplate, TokenTest, ValueTemplate,
};

#[cfg(test)]
mod tests;
