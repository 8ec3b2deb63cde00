//! Stable exit codes for ballast CLI commands.

/// Command succeeded (including `ctx restore` with no history).
pub const OK: i32 = 0;
/// Precondition failure, invalid argument, verification failure, or
/// unrecoverable state.
pub const FAILURE: i32 = 1;
