//! Plan-driven tabular data cleaning with model-generated transformations.
//!
//! This crate turns a numbered cleaning plan into a sequence of sandboxed
//! transformations over a CSV dataset, retrying each step until its effect is
//! acceptable. The architecture enforces a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (frames, plan segmentation,
//!   metrics, profiling). No I/O, fully testable in isolation.
//! - **[`sandbox`]**: The interpreted transformation language and its
//!   allow-listed vocabulary. Generated code never touches a host runtime.
//! - **[`io`]**: Side-effecting operations (filesystem, process execution,
//!   prompt rendering). Isolated to enable mocking in tests.
//!
//! The [`engine`] module coordinates core logic, sandbox, and I/O to
//! implement the CLI commands.

pub mod core;
pub mod engine;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod sandbox;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
