//! Record repairs applied before generic conversion.
//!
//! Some native shapes cannot be expressed by the generic converter, for
//! example bare string arrays at the top level of a record. A [`Fixup`]
//! rewrites such fields in place on the untyped record. Fixups run in the
//! order they were registered, on every record the converter visits, and
//! must leave an already repaired record unchanged.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::{FixupError, NormalizeError};
use crate::path::NodePath;

/// A named repair applied to untyped records before conversion.
pub trait Fixup: Send + Sync {
    /// Returns the name reported in errors and logs.
    fn name(&self) -> &str;

    /// Repairs `record` in place.
    ///
    /// # Errors
    ///
    /// Returns a [`FixupError`] when the record holds a shape the fixup
    /// cannot repair. The error aborts conversion of the whole document.
    fn apply(&self, record: &mut Map<String, Value>) -> Result<(), FixupError>;
}

/// Collapses an array of string flags into a `{flag: true}` mapping.
///
/// Records without the field, or where it already holds a mapping, are left
/// untouched.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use uast_core::{FlagsToSet, Fixup};
///
/// let mut record = json!({"kind": "FunctionDecl", "flags": ["export"]});
/// let map = record.as_object_mut().unwrap();
/// FlagsToSet::new("flags").apply(map).unwrap();
/// assert_eq!(map["flags"], json!({"export": true}));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagsToSet {
    field: String,
}

impl FlagsToSet {
    /// Creates the fixup for the given field name.
    #[must_use]
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }

    /// Returns the repaired field name.
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }
}

impl Fixup for FlagsToSet {
    fn name(&self) -> &str {
        "flags_to_set"
    }

    fn apply(&self, record: &mut Map<String, Value>) -> Result<(), FixupError> {
        let Some(Value::Array(flags)) = record.get(&self.field) else {
            return Ok(());
        };

        let mut set = Map::with_capacity(flags.len());
        for (index, flag) in flags.iter().enumerate() {
            let Value::String(name) = flag else {
                return Err(FixupError::new(
                    &self.field,
                    format!("entry {index} is not a string: {flag}"),
                ));
            };
            set.insert(name.clone(), Value::Bool(true));
        }

        record.insert(self.field.clone(), Value::Object(set));
        Ok(())
    }
}

/// A fixup backed by a closure.
pub struct FnFixup<F> {
    name: String,
    repair: F,
}

impl<F> Fixup for FnFixup<F>
where
    F: Fn(&mut Map<String, Value>) -> Result<(), FixupError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, record: &mut Map<String, Value>) -> Result<(), FixupError> {
        (self.repair)(record)
    }
}

impl<F> fmt::Debug for FnFixup<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnFixup").field("name", &self.name).finish()
    }
}

/// Wraps a closure as a named [`Fixup`].
#[must_use]
pub fn fixup_fn<F>(name: impl Into<String>, repair: F) -> FnFixup<F>
where
    F: Fn(&mut Map<String, Value>) -> Result<(), FixupError> + Send + Sync,
{
    FnFixup {
        name: name.into(),
        repair,
    }
}

/// An ordered list of fixups.
#[derive(Clone, Default)]
pub struct FixupChain {
    fixups: Vec<Arc<dyn Fixup>>,
}

impl FixupChain {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a fixup, returning the extended chain.
    #[must_use]
    pub fn with(mut self, fixup: impl Fixup + 'static) -> Self {
        self.push(fixup);
        self
    }

    /// Appends a fixup.
    pub fn push(&mut self, fixup: impl Fixup + 'static) {
        self.fixups.push(Arc::new(fixup));
    }

    /// Returns the number of registered fixups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fixups.len()
    }

    /// Returns whether no fixups are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fixups.is_empty()
    }

    /// Returns the fixup names in application order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.fixups.iter().map(|fixup| fixup.name()).collect()
    }

    /// Runs every fixup on `record`, stopping at the first failure.
    pub(crate) fn apply(
        &self,
        record: &mut Map<String, Value>,
        path: &NodePath,
    ) -> Result<(), NormalizeError> {
        for fixup in &self.fixups {
            fixup
                .apply(record)
                .map_err(|source| NormalizeError::fixup(fixup.name(), path, source))?;
        }
        Ok(())
    }
}

impl fmt::Debug for FixupChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    fn record(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected a record, got {other}"),
        }
    }

    #[test]
    fn flags_collapse_into_set() {
        let mut map = record(json!({"kind": "FunctionDecl", "flags": ["async", "export"]}));
        FlagsToSet::new("flags").apply(&mut map).expect("fixup");
        assert_eq!(map.get("flags"), Some(&json!({"async": true, "export": true})));
    }

    #[test]
    fn non_string_flag_is_rejected() {
        let mut map = record(json!({"flags": ["export", 7]}));
        let err = FlagsToSet::new("flags")
            .apply(&mut map)
            .expect_err("number flag should fail");
        assert_eq!(err.field(), "flags");
        assert!(err.message().contains("entry 1"), "message: {}", err.message());
    }

    #[rstest]
    #[case(json!({"kind": "Identifier"}))]
    #[case(json!({"flags": {"export": true}}))]
    fn untouched_records_stay_equal(#[case] value: Value) {
        let mut map = record(value.clone());
        FlagsToSet::new("flags").apply(&mut map).expect("fixup");
        assert_eq!(Value::Object(map), value);
    }

    #[test]
    fn applying_twice_is_idempotent() {
        let fixup = FlagsToSet::new("flags");
        let mut once = record(json!({"flags": ["export"]}));
        fixup.apply(&mut once).expect("first");
        let mut twice = once.clone();
        fixup.apply(&mut twice).expect("second");
        assert_eq!(once, twice);
    }

    #[test]
    fn chain_reports_failing_fixup_name() {
        let chain = FixupChain::new()
            .with(FlagsToSet::new("flags"))
            .with(fixup_fn("reject_all", |_record| {
                Err(FixupError::new("kind", "rejected"))
            }));
        let mut map = record(json!({"flags": []}));
        let err = chain
            .apply(&mut map, &NodePath::root())
            .expect_err("second fixup fails");
        match err {
            NormalizeError::Fixup { fixup, .. } => assert_eq!(fixup, "reject_all"),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(chain.names(), vec!["flags_to_set", "reject_all"]);
    }
}
