//! Side-effecting modules: filesystem, child processes, prompt rendering.

pub mod attempt_log;
pub mod collab;
pub mod config;
pub mod dataset;
pub mod process;
pub mod prompt;
