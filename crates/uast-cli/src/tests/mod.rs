//! Unit tests for the CLI runtime.
