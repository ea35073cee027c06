//! Stable exit codes for pipeline CLI commands.

/// Command completed. Pipeline failures captured as artifacts still exit here.
pub const OK: i32 = 0;
/// Command failed on invalid input, missing artifacts, config or selection errors.
pub const INVALID: i32 = 1;
