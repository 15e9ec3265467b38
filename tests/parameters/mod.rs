//! Integration tests for the parameter system
//!
//! These tests drive the expression language and the link-resolving
//! parameter table through the public API.

// Tests for Expression parsing and evaluation
mod expression_tests;

// Tests for link expressions between parameters
mod link_tests;
