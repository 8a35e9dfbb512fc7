//! Stable exit codes for semrel CLI commands.

/// Command succeeded (the release tool, if run, exited zero).
pub const OK: i32 = 0;
/// Invalid input, config, settings, or any other wrapper error.
pub const INVALID: i32 = 1;
/// `semrel release` ran the release tool and it exited non-zero.
pub const RELEASE_FAILED: i32 = 2;
/// `semrel release` killed the release tool after the timeout.
pub const TIMED_OUT: i32 = 3;
