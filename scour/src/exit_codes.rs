//! Stable exit codes for scour CLI commands.

/// Command succeeded.
pub const OK: i32 = 0;
/// Command failed due to invalid input/config or other errors.
pub const INVALID: i32 = 1;
/// `scour run` aborted because a step exhausted its attempt budget.
pub const STEP_FAILED: i32 = 3;
