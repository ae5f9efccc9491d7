//! Failure taxonomy for patch runs.
//!
//! Operations return `anyhow::Result`. A [`PatchError`] is attached as context at
//! the point of failure, so callers can classify with
//! `err.downcast_ref::<PatchError>()` while `{:#}` still prints the cause chain.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchError {
    /// The database or ledger table could not be reached, read or provisioned.
    #[error("ledger unavailable")]
    LedgerUnavailable,

    /// `install` was asked to create a ledger table that already exists.
    #[error("ledger table '{table}' already exists")]
    AlreadyProvisioned { table: String },

    /// Neither a registration nor the file contents yielded a unit.
    #[error("unresolvable patch {name} ({})", .path.display())]
    UnresolvablePatch { name: String, path: PathBuf },

    /// A unit's `apply` failed, or its transaction could not begin or commit.
    #[error("patch {name} failed")]
    PatchExecution { name: String },

    /// Two different files derive the same patch name.
    #[error("duplicate patch name {name}: {} and {}", .first.display(), .second.display())]
    DuplicatePatch {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },
}

/// Classify an error produced by this crate, if it carries a [`PatchError`].
pub fn classify(err: &anyhow::Error) -> Option<&PatchError> {
    err.downcast_ref::<PatchError>()
}
