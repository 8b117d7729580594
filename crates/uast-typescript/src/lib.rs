//! TypeScript driver for the `uast-core` normalization pipeline.
//!
//! The native side is a TypeScript compiler process that serializes its AST
//! as JSON inside a [`NativeResponse`] envelope. This crate supplies the
//! converter settings and rewrite rules for that tree and a [`Driver`] that
//! takes a response plus the source bytes to a normalized [`uast_core::Node`].
//!
//! # Example
//!
//! ```
//! use uast_core::{Encoding, Mode};
//! use uast_typescript::{Driver, NativeResponse};
//!
//! let response = NativeResponse::from_slice(
//!     br#"{"status": "ok", "ast": {"kind": "Identifier", "pos": 0, "end": 1, "escapedText": "x"}}"#,
//! )?;
//! let tree = Driver::default().normalize(response, b"x", Encoding::Utf8, Mode::Semantic)?;
//! assert_eq!(tree.kind(), "uast:Identifier");
//! assert_eq!(tree.token(), Some("x"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod driver;
mod native;
mod rules;

pub use driver::{Driver, DriverError};
pub use native::{NativeError, NativeMessage, NativeResponse, Status};
pub use rules::{
    DECLARATION_KIND, DEFAULT_UNIT, KIND_KEY, SEMANTIC_BLACKLIST, normalizers, pipeline,
    preprocessors, to_node,
};
