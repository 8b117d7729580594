//! Matching of node patterns against canonical nodes.

use crate::node::{Node, Scalar, Slot};

use super::capture::{Bindings, Bound};
use super::pattern::{NodePattern, PropertyTest, SlotPattern, TokenTest};

/// Tests `node` against `pattern`, recording bindings in `captures`.
///
/// On failure `captures` may hold partial bindings and must be discarded.
pub(super) fn matches<'a>(
    pattern: &'a NodePattern,
    node: &'a Node,
    captures: &mut Bindings<'a>,
) -> bool {
    pattern.kind_test().accepts(node.kind())
        && token_matches(pattern.token_test(), node, captures)
        && pattern
            .property_tests()
            .iter()
            .all(|(key, test)| property_matches(test, node.property(key), captures))
        && pattern
            .slot_tests()
            .iter()
            .all(|(name, test)| slot_matches(test, node.slot(name), captures))
        && pattern
            .binding()
            .is_none_or(|name| captures.insert_consistent(name, Bound::Single(node)))
}

fn token_matches<'a>(test: &'a TokenTest, node: &'a Node, captures: &mut Bindings<'a>) -> bool {
    match (test, node.token()) {
        (TokenTest::Any, _) | (TokenTest::Present, Some(_)) | (TokenTest::Absent, None) => true,
        (TokenTest::Equals(expected), Some(token)) => expected == token,
        (TokenTest::Bind(name), Some(token)) => {
            captures.insert_consistent(name, Bound::Token(token))
        }
        (TokenTest::Present | TokenTest::Equals(_) | TokenTest::Bind(_), None)
        | (TokenTest::Absent, Some(_)) => false,
    }
}

fn property_matches<'a>(
    test: &'a PropertyTest,
    value: Option<&'a Scalar>,
    captures: &mut Bindings<'a>,
) -> bool {
    match (test, value) {
        (PropertyTest::Present, Some(_)) | (PropertyTest::Absent, None) => true,
        (PropertyTest::Equals(expected), Some(actual)) => expected == actual,
        (PropertyTest::Bind(name), Some(actual)) => {
            captures.insert_consistent(name, Bound::Scalar(actual))
        }
        (PropertyTest::Present | PropertyTest::Equals(_) | PropertyTest::Bind(_), None)
        | (PropertyTest::Absent, Some(_)) => false,
    }
}

fn slot_matches<'a>(
    test: &'a SlotPattern,
    slot: Option<&'a Slot>,
    captures: &mut Bindings<'a>,
) -> bool {
    match (test, slot) {
        (SlotPattern::Absent | SlotPattern::Optional(_), None) => true,
        (
            SlotPattern::Single(pattern) | SlotPattern::Optional(pattern),
            Some(Slot::Single(child)),
        ) => matches(pattern, child, captures),
        (SlotPattern::Sequence { element, bind }, Some(Slot::Sequence(nodes))) => {
            element.as_ref().is_none_or(|pattern| {
                nodes.iter().all(|node| matches(pattern, node, captures))
            }) && bind.as_ref().is_none_or(|name| {
                captures.insert_consistent(name, Bound::Multiple(nodes))
            })
        }
        (SlotPattern::Any { bind }, Some(slot)) => bind.as_ref().is_none_or(|name| {
            let value = match slot {
                Slot::Single(child) => Bound::Single(child),
                Slot::Sequence(nodes) => Bound::Multiple(nodes),
            };
            captures.insert_consistent(name, value)
        }),
        (SlotPattern::Absent, Some(_))
        | (
            SlotPattern::Single(_) | SlotPattern::Optional(_),
            Some(Slot::Sequence(_)),
        )
        | (SlotPattern::Single(_) | SlotPattern::Sequence { .. } | SlotPattern::Any { .. }, None)
        | (SlotPattern::Sequence { .. }, Some(Slot::Single(_))) => false,
    }
}
