//! Generic conversion of untyped native trees into canonical nodes.
//!
//! A native tree is an arbitrary nest of records, sequences and scalars.
//! [`ObjectToNode`] turns it into a [`Node`] tree using a handful of
//! configured field names and a [`NodePredicate`] that tells node records
//! apart from plain data:
//!
//! - node records become nodes; the kind, token and positional fields are
//!   lifted into the node itself;
//! - a field holding a node record becomes a single child slot, a field
//!   holding a sequence of node records becomes a sequence slot;
//! - scalar fields become properties, and the scalar fields of non-node
//!   records are flattened into the enclosing node's properties.
//!
//! Anything else (sequences of scalars, mixed sequences, nodes hidden inside
//! plain records) is rejected with [`NormalizeError::InvalidShape`].

mod fixup;

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{NormalizeError, Stage};
use crate::node::{Node, Point, Position, Scalar, Slot};
use crate::path::NodePath;

pub use fixup::{Fixup, FixupChain, FlagsToSet, FnFixup, fixup_fn};

/// Tracing target for conversion.
const CONVERT_TARGET: &str = "uast_core::convert";

/// Decides whether an untyped record is a node.
pub trait NodePredicate: Send + Sync {
    /// Returns `true` when `record` should become a [`Node`].
    fn is_node(&self, record: &Map<String, Value>) -> bool;
}

impl<F> NodePredicate for F
where
    F: Fn(&Map<String, Value>) -> bool + Send + Sync,
{
    fn is_node(&self, record: &Map<String, Value>) -> bool {
        self(record)
    }
}

/// Accepts records that hold a string under the given field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HasStringField {
    field: String,
}

impl HasStringField {
    /// Creates the predicate for `field`.
    #[must_use]
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }
}

impl NodePredicate for HasStringField {
    fn is_node(&self, record: &Map<String, Value>) -> bool {
        record.get(&self.field).is_some_and(Value::is_string)
    }
}

/// Native field names that carry node metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldNames {
    kind: String,
    offset: Option<String>,
    end_offset: Option<String>,
    line: Option<String>,
    column: Option<String>,
    end_line: Option<String>,
    end_column: Option<String>,
    tokens: Vec<String>,
}

impl FieldNames {
    /// Returns the kind field.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Returns the start offset field.
    #[must_use]
    pub fn offset(&self) -> Option<&str> {
        self.offset.as_deref()
    }

    /// Returns the end offset field.
    #[must_use]
    pub fn end_offset(&self) -> Option<&str> {
        self.end_offset.as_deref()
    }

    /// Returns the token fields in lookup order.
    #[must_use]
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    fn positional(&self) -> [Option<&str>; 6] {
        [
            self.offset.as_deref(),
            self.end_offset.as_deref(),
            self.line.as_deref(),
            self.column.as_deref(),
            self.end_line.as_deref(),
            self.end_column.as_deref(),
        ]
    }

    fn is_positional(&self, key: &str) -> bool {
        self.positional().contains(&Some(key))
    }
}

/// Configuration for converting native trees into canonical nodes.
///
/// Built once at start-up and shared read-only afterwards.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use uast_core::ObjectToNode;
///
/// let to_node = ObjectToNode::new("kind")
///     .offset_key("pos")
///     .end_offset_key("end")
///     .token_key("text");
/// let node = to_node.convert(json!({"kind": "Identifier", "pos": 0, "end": 3, "text": "foo"}))?;
/// assert_eq!(node.token(), Some("foo"));
/// # Ok::<(), uast_core::NormalizeError>(())
/// ```
#[derive(Clone)]
pub struct ObjectToNode {
    fields: FieldNames,
    predicate: Arc<dyn NodePredicate>,
    fixups: FixupChain,
}

impl ObjectToNode {
    /// Creates a converter reading node kinds from `kind_key`.
    ///
    /// The default predicate accepts records holding a string under
    /// `kind_key`.
    #[must_use]
    pub fn new(kind_key: impl Into<String>) -> Self {
        let kind = kind_key.into();
        Self {
            predicate: Arc::new(HasStringField::new(kind.clone())),
            fields: FieldNames {
                kind,
                offset: None,
                end_offset: None,
                line: None,
                column: None,
                end_line: None,
                end_column: None,
                tokens: Vec::new(),
            },
            fixups: FixupChain::new(),
        }
    }

    /// Sets the field holding start byte offsets.
    #[must_use]
    pub fn offset_key(mut self, key: impl Into<String>) -> Self {
        self.fields.offset = Some(key.into());
        self
    }

    /// Sets the field holding end byte offsets.
    #[must_use]
    pub fn end_offset_key(mut self, key: impl Into<String>) -> Self {
        self.fields.end_offset = Some(key.into());
        self
    }

    /// Sets the field holding one-based start lines.
    #[must_use]
    pub fn line_key(mut self, key: impl Into<String>) -> Self {
        self.fields.line = Some(key.into());
        self
    }

    /// Sets the field holding one-based start columns.
    #[must_use]
    pub fn column_key(mut self, key: impl Into<String>) -> Self {
        self.fields.column = Some(key.into());
        self
    }

    /// Sets the field holding one-based end lines.
    #[must_use]
    pub fn end_line_key(mut self, key: impl Into<String>) -> Self {
        self.fields.end_line = Some(key.into());
        self
    }

    /// Sets the field holding one-based end columns.
    #[must_use]
    pub fn end_column_key(mut self, key: impl Into<String>) -> Self {
        self.fields.end_column = Some(key.into());
        self
    }

    /// Adds a token field. Earlier fields take precedence.
    #[must_use]
    pub fn token_key(mut self, key: impl Into<String>) -> Self {
        self.fields.tokens.push(key.into());
        self
    }

    /// Replaces the node predicate.
    #[must_use]
    pub fn with_predicate(mut self, predicate: impl NodePredicate + 'static) -> Self {
        self.predicate = Arc::new(predicate);
        self
    }

    /// Appends a fixup to the chain.
    #[must_use]
    pub fn with_fixup(mut self, fixup: impl Fixup + 'static) -> Self {
        self.fixups.push(fixup);
        self
    }

    /// Replaces the fixup chain.
    #[must_use]
    pub fn with_fixups(mut self, fixups: FixupChain) -> Self {
        self.fixups = fixups;
        self
    }

    /// Returns the configured field names.
    #[must_use]
    pub const fn fields(&self) -> &FieldNames {
        &self.fields
    }

    /// Returns the fixup chain.
    #[must_use]
    pub const fn fixups(&self) -> &FixupChain {
        &self.fixups
    }

    /// Converts a native tree into a canonical node tree.
    ///
    /// The root record is always converted as a node, whatever the
    /// predicate says about it.
    ///
    /// # Errors
    ///
    /// Returns the first [`NormalizeError`] found in document order: a
    /// fixup failure, an invalid shape, a missing kind or an invalid
    /// position.
    pub fn convert(&self, value: Value) -> Result<Node, NormalizeError> {
        let mut converter = Converter {
            config: self,
            path: NodePath::root(),
            nodes: 0,
        };

        let mut record = match value {
            Value::Object(record) => record,
            other => {
                return Err(NormalizeError::invalid_shape(
                    &converter.path,
                    format!("root must be a record, found {}", describe(&other)),
                ));
            }
        };

        self.fixups.apply(&mut record, &converter.path)?;
        let node = converter.node(record)?;
        debug!(
            target: CONVERT_TARGET,
            nodes = converter.nodes,
            root = node.kind(),
            "converted native tree"
        );
        Ok(node)
    }
}

impl fmt::Debug for ObjectToNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectToNode")
            .field("fields", &self.fields)
            .field("fixups", &self.fixups)
            .finish_non_exhaustive()
    }
}

/// Per-document conversion state.
struct Converter<'c> {
    config: &'c ObjectToNode,
    path: NodePath,
    nodes: usize,
}

impl Converter<'_> {
    fn node(&mut self, record: Map<String, Value>) -> Result<Node, NormalizeError> {
        self.nodes = self.nodes.saturating_add(1);
        let config = self.config;
        let fields = &config.fields;

        let kind = match record.get(&fields.kind) {
            Some(Value::String(kind)) if !kind.is_empty() => kind.clone(),
            _ => return Err(NormalizeError::missing_kind(&self.path, &fields.kind)),
        };

        let mut node = Node::new(kind);
        let (token, token_key) = self.token(&record)?;
        node.set_token(token);
        node.set_position(self.position(&record)?);

        for (key, value) in record {
            let consumed = key == fields.kind
                || fields.is_positional(&key)
                || token_key.as_deref() == Some(key.as_str())
                || (value.is_null() && fields.tokens.contains(&key));
            if consumed {
                continue;
            }

            self.path.push_field(&key);
            let result = self.field(&mut node, key, value);
            self.path.pop();
            result?;
        }

        Ok(node)
    }

    fn token(
        &self,
        record: &Map<String, Value>,
    ) -> Result<(Option<String>, Option<String>), NormalizeError> {
        for key in &self.config.fields.tokens {
            let Some(value) = record.get(key).filter(|value| !value.is_null()) else {
                continue;
            };

            let text = Scalar::from_json(value)
                .as_ref()
                .and_then(Scalar::to_text)
                .ok_or_else(|| {
                    NormalizeError::invalid_shape(
                        &self.path.join_field(key),
                        format!("token must be a scalar, found {}", describe(value)),
                    )
                })?;
            return Ok((Some(text), Some(key.clone())));
        }

        Ok((None, None))
    }

    fn position(&self, record: &Map<String, Value>) -> Result<Option<Position>, NormalizeError> {
        let fields = &self.config.fields;
        let start_offset = self.offset(record, fields.offset.as_deref())?;
        let end_offset = self.offset(record, fields.end_offset.as_deref())?;
        let line = self.line_or_column(record, fields.line.as_deref())?;
        let column = self.line_or_column(record, fields.column.as_deref())?;
        let end_line = self.line_or_column(record, fields.end_line.as_deref())?;
        let end_column = self.line_or_column(record, fields.end_column.as_deref())?;

        let Some(start) = start_offset else {
            let orphan = [
                (end_offset.is_some(), &fields.end_offset),
                (line.is_some(), &fields.line),
                (column.is_some(), &fields.column),
                (end_line.is_some(), &fields.end_line),
                (end_column.is_some(), &fields.end_column),
            ]
            .into_iter()
            .find_map(|(present, key)| key.as_deref().filter(|_| present));
            if let Some(key) = orphan {
                return Err(NormalizeError::invalid_position(
                    Stage::Convert,
                    &self.path,
                    key,
                    "positional field present without a start offset",
                ));
            }
            return Ok(None);
        };

        let end_point = match end_offset {
            Some(end) if end < start => {
                return Err(NormalizeError::invalid_position(
                    Stage::Convert,
                    &self.path,
                    fields.end_offset.as_deref().unwrap_or_default(),
                    format!("end offset {end} precedes start offset {start}"),
                ));
            }
            Some(end) => Some(Point::at_offset(end).with_line_column(end_line, end_column)),
            None => {
                let orphan = [
                    (end_line.is_some(), &fields.end_line),
                    (end_column.is_some(), &fields.end_column),
                ]
                .into_iter()
                .find_map(|(present, key)| key.as_deref().filter(|_| present));
                if let Some(key) = orphan {
                    return Err(NormalizeError::invalid_position(
                        Stage::Convert,
                        &self.path,
                        key,
                        "end line or column present without an end offset",
                    ));
                }
                None
            }
        };

        let start_point = Point::at_offset(start).with_line_column(line, column);
        Ok(Some(Position::new(start_point, end_point)))
    }

    fn offset(
        &self,
        record: &Map<String, Value>,
        field: Option<&str>,
    ) -> Result<Option<usize>, NormalizeError> {
        let Some((key, raw)) = self.integer(record, field)? else {
            return Ok(None);
        };
        usize::try_from(raw).map(Some).map_err(|_| {
            NormalizeError::invalid_position(
                Stage::Convert,
                &self.path,
                key,
                format!("offset {raw} does not fit in memory"),
            )
        })
    }

    fn line_or_column(
        &self,
        record: &Map<String, Value>,
        field: Option<&str>,
    ) -> Result<Option<u32>, NormalizeError> {
        let Some((key, raw)) = self.integer(record, field)? else {
            return Ok(None);
        };
        match u32::try_from(raw) {
            Ok(0) => Err(NormalizeError::invalid_position(
                Stage::Convert,
                &self.path,
                key,
                "lines and columns are one-based, found 0",
            )),
            Ok(value) => Ok(Some(value)),
            Err(_) => Err(NormalizeError::invalid_position(
                Stage::Convert,
                &self.path,
                key,
                format!("{raw} is too large for a line or column"),
            )),
        }
    }

    fn integer<'k>(
        &self,
        record: &Map<String, Value>,
        field: Option<&'k str>,
    ) -> Result<Option<(&'k str, u64)>, NormalizeError> {
        let Some(key) = field else {
            return Ok(None);
        };
        match record.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(number)) => {
                number.as_u64().map(|raw| Some((key, raw))).ok_or_else(|| {
                    NormalizeError::invalid_position(
                        Stage::Convert,
                        &self.path,
                        key,
                        format!("expected a non-negative integer, found {number}"),
                    )
                })
            }
            Some(other) => Err(NormalizeError::invalid_position(
                Stage::Convert,
                &self.path,
                key,
                format!("expected a number, found {}", describe(other)),
            )),
        }
    }

    /// Classifies one field of a node record. `self.path` already points at
    /// the field.
    fn field(&mut self, node: &mut Node, key: String, value: Value) -> Result<(), NormalizeError> {
        match value {
            Value::Object(mut record) => {
                self.config.fixups.apply(&mut record, &self.path)?;
                if self.config.predicate.is_node(&record) {
                    let child = self.node(record)?;
                    node.children_mut().insert(key, Slot::Single(Box::new(child)));
                    Ok(())
                } else {
                    self.flatten(node, record)
                }
            }
            Value::Array(items) => {
                let children = self.sequence(items)?;
                node.children_mut().insert(key, Slot::Sequence(children));
                Ok(())
            }
            scalar => self.property(node, key, &scalar),
        }
    }

    fn flatten(
        &mut self,
        node: &mut Node,
        record: Map<String, Value>,
    ) -> Result<(), NormalizeError> {
        for (key, value) in record {
            self.path.push_field(&key);
            let result = match value {
                Value::Object(nested) => self.flatten_nested(node, nested),
                Value::Array(_) => Err(NormalizeError::invalid_shape(
                    &self.path,
                    "sequence nested inside a record that is not a node",
                )),
                scalar => self.property(node, key, &scalar),
            };
            self.path.pop();
            result?;
        }
        Ok(())
    }

    fn flatten_nested(
        &mut self,
        node: &mut Node,
        mut nested: Map<String, Value>,
    ) -> Result<(), NormalizeError> {
        self.config.fixups.apply(&mut nested, &self.path)?;
        if self.config.predicate.is_node(&nested) {
            return Err(NormalizeError::invalid_shape(
                &self.path,
                "node nested inside a record that is not a node",
            ));
        }
        self.flatten(node, nested)
    }

    fn property(&self, node: &mut Node, key: String, value: &Value) -> Result<(), NormalizeError> {
        let Some(scalar) = Scalar::from_json(value) else {
            return Err(NormalizeError::invalid_shape(
                &self.path,
                format!("expected a scalar, found {}", describe(value)),
            ));
        };
        if node.properties().contains_key(&key) {
            return Err(NormalizeError::invalid_shape(
                &self.path,
                format!("property '{key}' is defined twice"),
            ));
        }
        node.properties_mut().insert(key, scalar);
        Ok(())
    }

    fn sequence(&mut self, items: Vec<Value>) -> Result<Vec<Node>, NormalizeError> {
        let mut nodes = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            self.path.push_index(index);
            let result = self.sequence_item(item);
            self.path.pop();
            nodes.push(result?);
        }
        Ok(nodes)
    }

    fn sequence_item(&mut self, item: Value) -> Result<Node, NormalizeError> {
        let mut record = match item {
            Value::Object(record) => record,
            other => {
                return Err(NormalizeError::invalid_shape(
                    &self.path,
                    format!("sequences may only hold nodes, found {}", describe(&other)),
                ));
            }
        };

        self.config.fixups.apply(&mut record, &self.path)?;
        if !self.config.predicate.is_node(&record) {
            return Err(NormalizeError::invalid_shape(
                &self.path,
                "sequences may only hold nodes, found a record that is not a node",
            ));
        }
        self.node(record)
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a record",
    }
}
