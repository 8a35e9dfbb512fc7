//! Deterministic, pure logic for release configuration.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod command;
pub mod reconcile;
pub mod types;
