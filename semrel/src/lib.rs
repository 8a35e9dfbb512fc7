//! Configurable semantic-release wrapper.
//!
//! Patches a `.releaserc.json` on demand for local, dry-run, or unlisted
//! branch runs, then runs `semantic-release` in a container with a GitHub
//! or GitLab token. The crate keeps a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (config model, reconciliation,
//!   command construction). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (git, releaserc files, settings,
//!   container processes). Isolated behind traits to enable fakes in tests.
//!
//! [`release`] coordinates core logic with I/O to implement CLI commands.

pub mod core;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod release;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
