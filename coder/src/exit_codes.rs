//! Stable exit codes for coder CLI commands.

/// Command succeeded.
pub const OK: i32 = 0;
/// Command failed due to invalid config, arguments, missing project or other errors.
pub const INVALID: i32 = 1;
/// `coder apply` finished but at least one directive was rejected or failed.
pub const DIRECTIVE_FAILURES: i32 = 2;
