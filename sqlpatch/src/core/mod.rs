//! Deterministic, pure logic shared by the patch runner.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod batch;
pub mod naming;
pub mod pending;
pub mod types;
