//! Patterns over canonical node shapes.
//!
//! A [`NodePattern`] tests a node's kind, token, properties and child slots,
//! recursing into nested patterns for single children. Tests that name a
//! binding record the matched value in the rule's captures for use by its
//! action.

use crate::node::Scalar;

/// Test applied to a node kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum KindTest {
    /// Any kind.
    #[default]
    Any,
    /// Exactly this kind.
    Is(String),
    /// Any of the listed kinds.
    OneOf(Vec<String>),
}

impl KindTest {
    pub(crate) fn accepts(&self, kind: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Is(expected) => expected == kind,
            Self::OneOf(kinds) => kinds.iter().any(|candidate| candidate == kind),
        }
    }
}

/// Test applied to a node's token text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TokenTest {
    /// Token may or may not be present.
    #[default]
    Any,
    /// A token must be present.
    Present,
    /// No token may be present.
    Absent,
    /// The token must equal this text.
    Equals(String),
    /// A token must be present and is bound to the given name.
    Bind(String),
}

/// Test applied to one property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyTest {
    /// The property must be set.
    Present,
    /// The property must not be set.
    Absent,
    /// The property must hold this value.
    Equals(Scalar),
    /// The property must be set and is bound to the given name.
    Bind(String),
}

/// Test applied to one child slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotPattern {
    /// The slot must not exist.
    Absent,
    /// The slot must hold a single child matching the pattern.
    Single(NodePattern),
    /// The slot must hold a sequence; every element must match `element`
    /// when one is given. The whole sequence is bound to `bind`.
    Sequence {
        /// Pattern every element must satisfy.
        element: Option<NodePattern>,
        /// Binding for the whole sequence.
        bind: Option<String>,
    },
    /// The slot must exist in either form.
    Any {
        /// Binding for the slot content.
        bind: Option<String>,
    },
    /// The slot may be missing; if present it must hold a single child
    /// matching the pattern.
    Optional(NodePattern),
}

/// A pattern over one node and, recursively, its children.
///
/// Unlisted properties and slots are not constrained.
///
/// # Example
///
/// ```
/// use uast_core::NodePattern;
///
/// let pattern = NodePattern::kind("FunctionDecl")
///     .lacks_property("async")
///     .child("name", NodePattern::kind("Identifier").bind_token("name"))
///     .bind_sequence("parameters", "params")
///     .bind("decl");
/// # let _ = pattern;
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodePattern {
    kind: KindTest,
    token: TokenTest,
    properties: Vec<(String, PropertyTest)>,
    slots: Vec<(String, SlotPattern)>,
    bind: Option<String>,
}

impl NodePattern {
    /// A pattern matching any node.
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    /// A pattern matching nodes of exactly `kind`.
    #[must_use]
    pub fn kind(kind: impl Into<String>) -> Self {
        Self {
            kind: KindTest::Is(kind.into()),
            ..Self::default()
        }
    }

    /// A pattern matching nodes of any of `kinds`.
    #[must_use]
    pub fn one_of<I, S>(kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind: KindTest::OneOf(kinds.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    /// Sets the token test.
    #[must_use]
    pub fn token(mut self, test: TokenTest) -> Self {
        self.token = test;
        self
    }

    /// Requires a token and binds it to `name`.
    #[must_use]
    pub fn bind_token(self, name: impl Into<String>) -> Self {
        self.token(TokenTest::Bind(name.into()))
    }

    /// Adds a property test.
    #[must_use]
    pub fn property(mut self, key: impl Into<String>, test: PropertyTest) -> Self {
        self.properties.push((key.into(), test));
        self
    }

    /// Requires `key` to be set.
    #[must_use]
    pub fn has_property(self, key: impl Into<String>) -> Self {
        self.property(key, PropertyTest::Present)
    }

    /// Requires `key` to be unset.
    #[must_use]
    pub fn lacks_property(self, key: impl Into<String>) -> Self {
        self.property(key, PropertyTest::Absent)
    }

    /// Requires `key` to hold `value`.
    #[must_use]
    pub fn property_eq(self, key: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.property(key, PropertyTest::Equals(value.into()))
    }

    /// Requires `key` to be set and binds its value to `name`.
    #[must_use]
    pub fn bind_property(self, key: impl Into<String>, name: impl Into<String>) -> Self {
        self.property(key, PropertyTest::Bind(name.into()))
    }

    /// Adds a slot test.
    #[must_use]
    pub fn slot(mut self, name: impl Into<String>, test: SlotPattern) -> Self {
        self.slots.push((name.into(), test));
        self
    }

    /// Requires a single child under `name` matching `pattern`.
    #[must_use]
    pub fn child(self, name: impl Into<String>, pattern: Self) -> Self {
        self.slot(name, SlotPattern::Single(pattern))
    }

    /// Requires the slot `name` to be missing.
    #[must_use]
    pub fn no_slot(self, name: impl Into<String>) -> Self {
        self.slot(name, SlotPattern::Absent)
    }

    /// Requires the slot `name` to exist and binds its content to `bind`.
    #[must_use]
    pub fn bind_slot(self, name: impl Into<String>, bind: impl Into<String>) -> Self {
        self.slot(
            name,
            SlotPattern::Any {
                bind: Some(bind.into()),
            },
        )
    }

    /// Requires a sequence slot `name` and binds it to `bind`.
    #[must_use]
    pub fn bind_sequence(self, name: impl Into<String>, bind: impl Into<String>) -> Self {
        self.slot(
            name,
            SlotPattern::Sequence {
                element: None,
                bind: Some(bind.into()),
            },
        )
    }

    /// Binds the whole matched node to `name`.
    #[must_use]
    pub fn bind(mut self, name: impl Into<String>) -> Self {
        self.bind = Some(name.into());
        self
    }

    /// Returns the kind test.
    #[must_use]
    pub const fn kind_test(&self) -> &KindTest {
        &self.kind
    }

    /// Returns the token test.
    #[must_use]
    pub const fn token_test(&self) -> &TokenTest {
        &self.token
    }

    /// Returns the property tests in declaration order.
    #[must_use]
    pub fn property_tests(&self) -> &[(String, PropertyTest)] {
        &self.properties
    }

    /// Returns the slot tests in declaration order.
    #[must_use]
    pub fn slot_tests(&self) -> &[(String, SlotPattern)] {
        &self.slots
    }

    /// Returns the whole-node binding, if any.
    #[must_use]
    pub fn binding(&self) -> Option<&str> {
        self.bind.as_deref()
    }
}
