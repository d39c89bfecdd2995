//! The execution sandbox for generated transformation code.
//!
//! Generated code is interpreted, never compiled or handed to a host
//! runtime. The grammar ([`lang`]) admits only assignments and literal-argument
//! method chains, and the interpreter ([`executor`]) dispatches exclusively
//! into the allow-listed vocabulary ([`ops`]), so the sandbox boundary is the
//! language itself rather than a process or permission barrier.

pub mod executor;
pub mod lang;
pub mod ops;

pub use executor::{ExecOutcome, RESULT_BINDING, execute};
