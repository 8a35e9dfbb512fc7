//! I/O helpers for semrel commands.

pub mod config;
pub mod container;
pub mod git;
pub mod process;
pub mod releaserc;
