//! The envelope the native TypeScript parser answers with.
//!
//! The parser writes one JSON document per request:
//!
//! ```json
//! {"status": "ok", "ast": {"kind": "SourceFile"}, "errors": []}
//! ```
//!
//! `status` is `ok` when `ast` holds a tree, `error` when the source could
//! not be parsed and `fatal` when the parser itself failed. `errors` carries
//! the parser's messages in either case.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Outcome reported by the native parser.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Status {
    /// The source parsed and `ast` holds the tree.
    Ok,
    /// The source could not be parsed.
    Error,
    /// The parser failed.
    Fatal,
}

/// One diagnostic emitted by the native parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeMessage {
    message: String,
}

impl NativeMessage {
    /// Creates a diagnostic.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the message text.
    #[must_use]
    pub const fn message(&self) -> &str {
        self.message.as_str()
    }
}

/// A decoded native parser response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativeResponse {
    status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ast: Option<Value>,
    #[serde(default)]
    errors: Vec<NativeMessage>,
}

impl NativeResponse {
    /// Creates a successful response carrying `ast`.
    #[must_use]
    pub const fn ok(ast: Value) -> Self {
        Self {
            status: Status::Ok,
            ast: Some(ast),
            errors: Vec::new(),
        }
    }

    /// Creates a failed response with diagnostics.
    #[must_use]
    pub const fn failure(status: Status, errors: Vec<NativeMessage>) -> Self {
        Self {
            status,
            ast: None,
            errors,
        }
    }

    /// Decodes a response from JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`NativeError::Decode`] when the bytes are not a valid
    /// response document.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, NativeError> {
        serde_json::from_slice(bytes).map_err(NativeError::Decode)
    }

    /// Returns the reported status.
    #[must_use]
    pub const fn status(&self) -> Status {
        self.status
    }

    /// Returns the raw tree, if any.
    #[must_use]
    pub const fn ast(&self) -> Option<&Value> {
        self.ast.as_ref()
    }

    /// Returns the parser diagnostics.
    #[must_use]
    pub fn errors(&self) -> &[NativeMessage] {
        &self.errors
    }

    /// Consumes the response, yielding the raw tree of a successful parse.
    ///
    /// # Errors
    ///
    /// Returns [`NativeError::Rejected`] for `error` and `fatal` responses
    /// and [`NativeError::MissingAst`] when an `ok` response has no tree.
    pub fn into_ast(self) -> Result<Value, NativeError> {
        match (self.status, self.ast) {
            (Status::Ok, Some(ast)) => Ok(ast),
            (Status::Ok, None) => Err(NativeError::MissingAst),
            (status, _) => Err(NativeError::Rejected {
                status,
                messages: self.errors.into_iter().map(|error| error.message).collect(),
            }),
        }
    }
}

/// Errors raised while reading a native parser response.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum NativeError {
    /// The response is not valid JSON or does not have the envelope shape.
    #[error("failed to deserialise native response: {0}")]
    Decode(#[source] serde_json::Error),

    /// The parser reported a failure.
    #[error("native parser reported {status}: {}", summary(.messages))]
    Rejected {
        /// Reported status.
        status: Status,
        /// Parser diagnostics in emission order.
        messages: Vec<String>,
    },

    /// The parser reported success but sent no tree.
    #[error("native parser reported ok without an ast")]
    MissingAst,
}

fn summary(messages: &[String]) -> String {
    if messages.is_empty() {
        "no diagnostics".to_owned()
    } else {
        messages.join("; ")
    }
}

#[cfg(test)]
mod tests;
