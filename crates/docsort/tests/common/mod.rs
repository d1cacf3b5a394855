//! Shared test utilities for docsort integration tests.

pub mod harness;

pub use harness::{TestHarness, MIDDLING_INVOICE_TEXT, STRONG_INVOICE_TEXT};
