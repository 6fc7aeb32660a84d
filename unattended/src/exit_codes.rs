//! Stable exit codes for the `unattended` CLI.

/// Command succeeded.
pub const OK: i32 = 0;
/// Usage error, or the script or config could not be loaded.
pub const INVALID: i32 = 1;
/// The script cannot run unattended with the supplied answers.
pub const REJECTED: i32 = 2;
