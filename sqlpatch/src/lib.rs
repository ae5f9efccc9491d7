//! Sequential, idempotent SQL patch runner.
//!
//! Patch files are discovered on disk, compared against a ledger table in the
//! target SQLite database, and every file not yet recorded is applied in name
//! order under a single new batch number. The architecture enforces a strict
//! separation:
//!
//! - **[`core`]**: Pure, deterministic logic (naming, pending set, batch numbers).
//!   No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (database, ledger, filesystem, prompts).
//!   Isolated behind traits to enable fakes in tests.
//!
//! Orchestration modules ([`run`], [`install`], [`make`], [`status`]) coordinate
//! core logic with I/O to implement CLI commands; [`cli`] wires them to arguments.

pub mod cli;
pub mod core;
pub mod error;
pub mod exit_codes;
pub mod install;
pub mod io;
pub mod logging;
pub mod make;
pub mod run;
pub mod status;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
