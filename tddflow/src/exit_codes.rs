//! Stable exit codes for `tddflow` commands.

/// Command succeeded.
pub const OK: i32 = 0;
/// Invalid input, invalid config, or any other error.
pub const INVALID: i32 = 1;
/// `tddflow session show` found no active session.
pub const NO_SESSION: i32 = 2;
