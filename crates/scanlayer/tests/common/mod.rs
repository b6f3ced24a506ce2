//! Shared test utilities for scanlayer integration tests.
//!
//! This module provides:
//! - `TestHarness` for isolated source/OCR/output trees in a temp directory
//! - `FakeEngine` standing in for a real OCR engine
//! - `ConfigBuilder` for writing config files programmatically

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::{FakeEngine, TestHarness};
