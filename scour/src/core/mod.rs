//! Deterministic, pure logic shared by the cleaning engine.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod frame;
pub mod metrics;
pub mod plan;
pub mod profile;
pub mod sanitize;
pub mod state;
