//! Crate-level tests for uast-core.

mod unit;
